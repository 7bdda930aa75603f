use thiserror::Error;

use super::models::{LocationError, NameError};
use super::search::DispatchError;
use crate::repositories::RepositoryError;

/// Errors returned by record mutations.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid name: {0}")]
    Name(#[from] NameError),
    #[error("invalid location: {0}")]
    Location(#[from] LocationError),
    #[error("{0} can't be blank")]
    Blank(&'static str),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    /// The change was committed but its reindex could not be scheduled.
    #[error("change saved but search reindex could not be scheduled: {0}")]
    Dispatch(#[from] DispatchError),
}

impl ServiceError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::Repository(RepositoryError::NotFound(what.into()))
    }
}
