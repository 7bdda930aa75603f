use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{AppliedTagId, ImportId, OrganizationId, TagId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
}

/// A source of bulk data (a partner feed, a spreadsheet upload, ...) that
/// applies tags to organizations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Import {
    pub id: ImportId,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// One application of a tag to an organization by one import.
///
/// The same tag applied by two imports is two rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct AppliedTag {
    pub id: AppliedTagId,
    pub organization_id: OrganizationId,
    pub tag_id: TagId,
    pub import_id: ImportId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplyTag {
    pub tag: String,
    pub import_id: ImportId,
}
