//! Records that feed organization documents.

use super::types::{EntityType, IndexDocument, LocationSummary, ReindexJob};
use crate::domain::models::{AppliedTag, Location, OrganizationAggregate, OrganizationId};

/// A record whose changes must be reflected in an organization document.
pub trait Indexable {
    const ENTITY_TYPE: EntityType;

    fn entity_id(&self) -> i64;

    /// The organization whose document this record contributes to.
    fn indexed_organization(&self) -> OrganizationId;

    fn reindex_job(&self) -> ReindexJob {
        ReindexJob::new(Self::ENTITY_TYPE, self.entity_id())
    }
}

impl Indexable for OrganizationAggregate {
    const ENTITY_TYPE: EntityType = EntityType::Organization;

    fn entity_id(&self) -> i64 {
        self.id().as_i64()
    }

    fn indexed_organization(&self) -> OrganizationId {
        self.id()
    }
}

impl Indexable for Location {
    const ENTITY_TYPE: EntityType = EntityType::Location;

    fn entity_id(&self) -> i64 {
        self.id.as_i64()
    }

    fn indexed_organization(&self) -> OrganizationId {
        self.organization_id
    }
}

impl Indexable for AppliedTag {
    const ENTITY_TYPE: EntityType = EntityType::AppliedTag;

    fn entity_id(&self) -> i64 {
        self.id.as_i64()
    }

    fn indexed_organization(&self) -> OrganizationId {
        self.organization_id
    }
}

impl OrganizationAggregate {
    /// Serializes the loaded state. Deterministic for a given aggregate.
    pub fn to_index_document(&self) -> IndexDocument {
        IndexDocument {
            organization_id: self.id(),
            names: self.name_strings(),
            locations: self
                .locations
                .iter()
                .map(|location| LocationSummary {
                    city: location.city.clone(),
                    country: location.country.clone(),
                    content: location.content.clone(),
                })
                .collect(),
            tags: self.distinct_tag_names(),
        }
    }
}
