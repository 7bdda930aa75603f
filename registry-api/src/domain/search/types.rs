//! Core types for the search domain.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::domain::models::OrganizationId;

/// Kind of record a reindex job refers to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityType {
    Organization,
    Location,
    AppliedTag,
}

/// Location fields copied into an organization document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSummary {
    pub city: Option<String>,
    pub country: Option<String>,
    pub content: Option<String>,
}

/// Point-in-time serialization of an organization, keyed by its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub organization_id: OrganizationId,
    pub names: Vec<String>,
    pub locations: Vec<LocationSummary>,
    /// Distinct tag names, sorted.
    pub tags: Vec<String>,
}

impl IndexDocument {
    /// Names joined by newlines so substring matches never span two names.
    pub fn names_text(&self) -> String {
        self.names.join("\n")
    }

    /// Secondary searchable text: tags and location fields.
    pub fn extra_text(&self) -> String {
        let locations = self.locations.iter().flat_map(|location| {
            [&location.city, &location.country, &location.content]
                .into_iter()
                .flatten()
        });
        self.tags
            .iter()
            .chain(locations)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A query against the index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexQuery {
    pub term: String,
    pub limit: i64,
}

/// One ranked match from the index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub organization_id: OrganizationId,
    /// Relevance score (higher is better).
    pub score: f64,
}

/// Work item carried by the job queue. Holds identity only; the handler
/// reloads current state when it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReindexJob {
    pub entity_type: EntityType,
    pub entity_id: i64,
    /// Zero-based delivery attempt.
    pub attempt: u32,
}

impl ReindexJob {
    pub fn new(entity_type: EntityType, entity_id: i64) -> Self {
        Self {
            entity_type,
            entity_id,
            attempt: 0,
        }
    }

    pub fn next_attempt(self) -> Self {
        Self {
            attempt: self.attempt + 1,
            ..self
        }
    }
}

impl std::fmt::Display for ReindexJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.entity_type, self.entity_id)
    }
}

/// What a reindex job ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReindexOutcome {
    /// The organization document was written.
    Indexed(OrganizationId),
    /// The organization no longer exists; its document was deleted.
    Removed(OrganizationId),
    /// The referenced record no longer exists; nothing to do.
    Skipped,
}

/// Statistics from a full rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildStats {
    pub organizations_indexed: usize,
    pub batches: usize,
}
