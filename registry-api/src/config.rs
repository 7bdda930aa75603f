use std::{str::FromStr, time::Duration};

use serde::Deserialize;
use serde_with::serde_as;
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use strum::{Display, EnumString};

use crate::domain::search::{IndexerConfig, SearchConfig, WorkerConfig};

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub search: SearchSettings,
    pub jobs: JobSettings,
}

#[serde_as]
#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub port: u16,
    pub host: String,
    pub disable_auth: bool,
}

#[serde_as]
#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub port: u16,
    pub host: String,
    pub database_name: String,
    pub require_ssl: bool,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub max_connections: u32,
}

/// Bearer token verification. Tokens are HS256 JWTs signed with
/// `internal_secret` whose audience is `application_id`.
#[derive(Deserialize, Clone)]
pub struct AuthSettings {
    pub application_id: String,
    pub internal_secret: String,
}

#[serde_as]
#[derive(Deserialize, Clone, Debug)]
pub struct SearchSettings {
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub default_limit: i64,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub max_limit: i64,
    pub rebuild_on_startup: bool,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub rebuild_batch_size: i64,
}

#[serde_as]
#[derive(Deserialize, Clone, Debug)]
pub struct JobSettings {
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub worker_count: usize,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub queue_capacity: usize,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub max_attempts: u32,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub retry_delay_ms: u64,
}

impl DatabaseSettings {
    pub fn without_db(&self) -> PgConnectOptions {
        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };

        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .password(&self.password)
            .ssl_mode(ssl_mode)
    }

    pub fn with_db(&self) -> PgConnectOptions {
        self.without_db().database(&self.database_name)
    }
}

impl SearchSettings {
    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            default_limit: self.default_limit,
            max_limit: self.max_limit,
        }
    }

    pub fn indexer_config(&self) -> IndexerConfig {
        IndexerConfig {
            rebuild_batch_size: self.rebuild_batch_size,
        }
    }
}

impl JobSettings {
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            worker_count: self.worker_count,
            max_attempts: self.max_attempts,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

pub fn read_config() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().map_err(|e| {
        config::ConfigError::Message(format!("Failed to determine the current directory: {e}"))
    })?;
    let config_directory = base_path.join("config");

    let environment = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "local".into());
    let environment = Environment::from_str(&environment).map_err(|_| {
        config::ConfigError::Message(format!("Failed to parse APP_ENVIRONMENT: {environment}"))
    })?;
    let environment_filename = format!("{}.yaml", environment);

    let settings = config::Config::builder()
        .add_source(config::File::from(config_directory.join("base.yaml")))
        .add_source(config::File::from(
            config_directory.join(environment_filename),
        ))
        .add_source(
            config::Environment::with_prefix("REGISTRY")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}

#[derive(Display, Debug, EnumString, PartialEq)]
pub enum Environment {
    #[strum(ascii_case_insensitive, serialize = "local")]
    Local,
    #[strum(ascii_case_insensitive, serialize = "production")]
    Production,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_parses_case_insensitively() {
        assert_eq!(Environment::from_str("Local").unwrap(), Environment::Local);
        assert_eq!(
            Environment::from_str("PRODUCTION").unwrap(),
            Environment::Production
        );
        assert!(Environment::from_str("staging").is_err());
        assert_eq!(Environment::Production.to_string(), "production");
    }

    #[test]
    fn base_config_deserializes() {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(
                include_str!("../config/base.yaml"),
                config::FileFormat::Yaml,
            ))
            .add_source(config::File::from_str(
                include_str!("../config/local.yaml"),
                config::FileFormat::Yaml,
            ))
            .build()
            .unwrap()
            .try_deserialize::<Settings>()
            .unwrap();

        assert_eq!(settings.search.search_config().default_limit, 50);
        assert_eq!(settings.search.search_config().max_limit, 100);
        assert_eq!(settings.jobs.worker_config().max_attempts, 5);
        assert!(settings.jobs.queue_capacity > 0);
    }
}
