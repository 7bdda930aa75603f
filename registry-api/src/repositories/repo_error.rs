use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Maps constraint violations to domain errors, leaving everything else
    /// as a database error.
    pub(crate) fn from_write(err: sqlx::Error, what: impl Into<String>) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return Self::Conflict(format!("{} already exists", what.into()));
            }
            if db_err.is_foreign_key_violation() {
                return Self::NotFound(what.into());
            }
        }
        Self::DatabaseError(err)
    }
}
