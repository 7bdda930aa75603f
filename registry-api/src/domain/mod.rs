mod error;
pub mod models;
pub mod search;
mod services;

pub use error::ServiceError;
pub use services::OrganizationService;
