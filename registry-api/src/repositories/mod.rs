mod location_repo;
#[cfg(test)]
mod memory;
mod organization_repo;
mod repo_error;
mod tag_repo;

pub use location_repo::*;
#[cfg(test)]
pub use memory::InMemoryRecords;
pub use organization_repo::*;
pub use repo_error::RepositoryError;
pub use tag_repo::*;
