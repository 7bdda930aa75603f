use itertools::Itertools;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{Location, OrganizationId, OrganizationNameId, MAX_FIELD_LENGTH};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Organization {
    pub id: OrganizationId,
    pub website: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// One alias an organization is known by. Every name is searchable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct OrganizationName {
    pub id: OrganizationNameId,
    pub organization_id: OrganizationId,
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewOrganization {
    pub website: Option<String>,
    #[serde(default)]
    pub names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("an organization needs at least one name")]
    Missing,
    #[error("name can't be blank")]
    Blank,
    #[error("name is too long (maximum is {MAX_FIELD_LENGTH} characters)")]
    TooLong,
}

/// Trims a candidate name and checks it against the column limits.
pub fn validate_name(content: &str) -> Result<String, NameError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(NameError::Blank);
    }
    if content.chars().count() > MAX_FIELD_LENGTH {
        return Err(NameError::TooLong);
    }
    Ok(content.to_string())
}

/// An organization together with everything that feeds its index document.
#[derive(Debug, Clone, PartialEq)]
pub struct OrganizationAggregate {
    pub organization: Organization,
    /// Ordered by name id.
    pub names: Vec<OrganizationName>,
    /// Ordered by location id.
    pub locations: Vec<Location>,
    /// Names of every tag applied to the organization, one entry per application.
    pub tag_names: Vec<String>,
}

impl OrganizationAggregate {
    pub fn id(&self) -> OrganizationId {
        self.organization.id
    }

    pub fn name_strings(&self) -> Vec<String> {
        self.names.iter().map(|name| name.content.clone()).collect()
    }

    /// Applied tag names, sorted, each once.
    pub fn distinct_tag_names(&self) -> Vec<String> {
        self.tag_names.iter().sorted().dedup().cloned().collect()
    }
}
