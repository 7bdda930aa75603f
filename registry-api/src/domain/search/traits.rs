//! Trait definitions for search domain abstractions.
//!
//! These traits enable dependency injection and easy testing through in-memory
//! implementations.

use async_trait::async_trait;

use super::types::{IndexDocument, IndexQuery, SearchHit};
use crate::domain::models::OrganizationId;
use crate::repositories::RepositoryError;

/// Failure inside the index engine.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Index database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Index unavailable: {0}")]
    Unavailable(String),
}

/// Error type for search operations.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Search term must not be empty")]
    MissingTerm,

    #[error("Argument 'first' must not be negative, got {0}")]
    InvalidLimit(i64),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("Record lookup failed: {0}")]
    Records(#[from] RepositoryError),
}

impl SearchError {
    /// Whether the caller sent something invalid, as opposed to a backend failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::MissingTerm | Self::InvalidLimit(_))
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;

/// The search engine holding organization documents.
///
/// Writes are independent per document; nothing is transactional across ids.
/// Implementations may buffer writes until [`refresh_index`](Self::refresh_index).
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Insert or replace the document for `doc.organization_id`.
    async fn upsert(&self, doc: &IndexDocument) -> std::result::Result<(), IndexError>;

    /// Remove the document for `id`.
    ///
    /// Returns true if a document was deleted. Deleting a missing id is not an error.
    async fn delete(&self, id: OrganizationId) -> std::result::Result<bool, IndexError>;

    /// Relevance-ranked matches, score descending, ties broken by id ascending.
    async fn search(&self, query: &IndexQuery) -> std::result::Result<Vec<SearchHit>, IndexError>;

    /// Drop and recreate the index structure. Queries may see an empty index meanwhile.
    async fn recreate_index(&self) -> std::result::Result<(), IndexError>;

    /// Make all buffered writes visible to subsequent searches.
    async fn refresh_index(&self) -> std::result::Result<(), IndexError>;

    /// Fetch a stored document.
    async fn get(
        &self,
        id: OrganizationId,
    ) -> std::result::Result<Option<IndexDocument>, IndexError>;

    /// Total number of visible documents.
    async fn count(&self) -> std::result::Result<i64, IndexError>;
}
