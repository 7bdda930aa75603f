pub(crate) mod error;
pub(crate) mod graphql;
pub(crate) mod organizations;

pub(crate) use error::ApiError;
