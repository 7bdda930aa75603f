use serde::{Deserialize, Serialize};
use std::fmt;

/// Declares a database identifier newtype.
///
/// All registry tables use `BIGSERIAL` keys, so every id wraps an `i64`.
macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
            sqlx::Type,
        )]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $name(i64);

        impl $name {
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            pub fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

record_id!(
    /// Durable organization identifier. Also the key of its index document.
    OrganizationId
);
record_id!(OrganizationNameId);
record_id!(LocationId);
record_id!(TagId);
record_id!(
    /// The import (source or actor) that applied a tag.
    ImportId
);
record_id!(AppliedTagId);
