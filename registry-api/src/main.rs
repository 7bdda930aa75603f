use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{
    app_state::RecordStores,
    config::Settings,
    domain::{
        models::OrganizationId,
        search::{index::PgSearchIndex, spawn_index_workers, ChannelJobQueue, JobQueue},
    },
};

mod app_state;
mod auth;
mod config;
mod domain;
mod repositories;
mod router;
mod routes;

use app_state::AppState;

#[derive(Parser)]
#[command(name = "registry-api", about = "Organization registry with full-text search")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API and the index workers (default)
    Serve,
    /// Recreate the search index from the relational records
    RebuildIndex,
    /// Write the current document of one organization
    IndexOrganization {
        /// Organization id
        id: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "registry_api=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let settings = config::read_config().context("Failed to read configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(settings.database.max_connections)
        .connect_with(settings.database.with_db())
        .await
        .context("Failed to connect to Postgres")?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let index = PgSearchIndex::new(pool.clone());
    index.ensure_index().await?;

    let (queue, receiver) = ChannelJobQueue::bounded(settings.jobs.queue_capacity);
    let queue: Arc<dyn JobQueue> = Arc::new(queue);
    let app_state = AppState::from_settings(
        RecordStores::postgres(pool),
        Arc::new(index),
        queue.clone(),
        &settings,
    );

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            spawn_index_workers(
                receiver,
                queue,
                app_state.indexer.clone(),
                settings.jobs.worker_config(),
            );
            serve(app_state, &settings).await
        }
        Command::RebuildIndex => {
            let stats = app_state.indexer.rebuild().await?;
            tracing::info!(
                organizations = stats.organizations_indexed,
                batches = stats.batches,
                "Search index rebuilt"
            );
            Ok(())
        }
        Command::IndexOrganization { id } => {
            let outcome = app_state
                .indexer
                .index_organization(OrganizationId::new(id))
                .await?;
            app_state.indexer.refresh_index().await?;
            tracing::info!(?outcome, "Organization indexed");
            Ok(())
        }
    }
}

async fn serve(app_state: AppState, settings: &Settings) -> anyhow::Result<()> {
    if settings.search.rebuild_on_startup {
        let indexer = app_state.indexer.clone();
        tokio::spawn(async move {
            match indexer.rebuild().await {
                Ok(stats) => tracing::info!(
                    organizations = stats.organizations_indexed,
                    "Search index rebuilt on startup"
                ),
                Err(err) => tracing::error!(error = %err, "Startup rebuild failed"),
            }
        });
    }

    let app = router::create(app_state);

    let addr = format!("{}:{}", settings.application.host, settings.application.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    Ok(())
}
