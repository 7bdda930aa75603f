//! In-memory record store for testing.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use time::OffsetDateTime;

use crate::domain::models::{
    AppliedTag, AppliedTagId, Import, ImportId, Location, LocationId, LocationInput,
    NewOrganization, Organization, OrganizationAggregate, OrganizationId, OrganizationName,
    OrganizationNameId, Tag, TagId,
};

use super::{LocationRepository, OrganizationRepository, RepositoryError, TagRepository};

#[derive(Default)]
struct Tables {
    next_id: i64,
    organizations: BTreeMap<OrganizationId, Organization>,
    names: BTreeMap<OrganizationNameId, OrganizationName>,
    locations: BTreeMap<LocationId, Location>,
    tags: BTreeMap<TagId, Tag>,
    imports: BTreeMap<ImportId, Import>,
    applied_tags: BTreeMap<AppliedTagId, AppliedTag>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn aggregate(&self, id: OrganizationId) -> Option<OrganizationAggregate> {
        let organization = self.organizations.get(&id)?.clone();
        let tag_names = self
            .applied_tags
            .values()
            .filter(|applied| applied.organization_id == id)
            .filter_map(|applied| self.tags.get(&applied.tag_id))
            .map(|tag| tag.name.clone())
            .collect();

        Some(OrganizationAggregate {
            organization,
            names: self
                .names
                .values()
                .filter(|name| name.organization_id == id)
                .cloned()
                .collect(),
            locations: self
                .locations
                .values()
                .filter(|location| location.organization_id == id)
                .cloned()
                .collect(),
            tag_names,
        })
    }

    fn require_organization(&self, id: OrganizationId) -> Result<(), RepositoryError> {
        if self.organizations.contains_key(&id) {
            Ok(())
        } else {
            Err(RepositoryError::NotFound(format!("organization {id}")))
        }
    }
}

/// Implements every record repository over shared in-memory tables with the
/// same cascade and uniqueness rules as the Postgres schema.
#[derive(Clone, Default)]
pub struct InMemoryRecords {
    tables: Arc<RwLock<Tables>>,
}

#[allow(dead_code)]
impl InMemoryRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn organization_count(&self) -> usize {
        self.tables.read().unwrap().organizations.len()
    }
}

#[async_trait]
impl OrganizationRepository for InMemoryRecords {
    async fn create_organization(
        &self,
        new: &NewOrganization,
    ) -> Result<Organization, RepositoryError> {
        let mut tables = self.tables.write().unwrap();
        let now = OffsetDateTime::now_utc();
        let organization = Organization {
            id: OrganizationId::new(tables.next_id()),
            website: new.website.clone(),
            created_at: now,
            updated_at: now,
        };
        tables
            .organizations
            .insert(organization.id, organization.clone());

        for content in &new.names {
            let name = OrganizationName {
                id: OrganizationNameId::new(tables.next_id()),
                organization_id: organization.id,
                content: content.clone(),
            };
            tables.names.insert(name.id, name);
        }

        Ok(organization)
    }

    async fn get_organization(
        &self,
        id: OrganizationId,
    ) -> Result<Option<Organization>, RepositoryError> {
        Ok(self.tables.read().unwrap().organizations.get(&id).cloned())
    }

    async fn update_website(
        &self,
        id: OrganizationId,
        website: Option<&str>,
    ) -> Result<Organization, RepositoryError> {
        let mut tables = self.tables.write().unwrap();
        let organization = tables
            .organizations
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("organization {id}")))?;
        organization.website = website.map(str::to_string);
        organization.updated_at = OffsetDateTime::now_utc();
        Ok(organization.clone())
    }

    async fn delete_organization(&self, id: OrganizationId) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().unwrap();
        if tables.organizations.remove(&id).is_none() {
            return Ok(false);
        }
        tables.names.retain(|_, name| name.organization_id != id);
        tables
            .locations
            .retain(|_, location| location.organization_id != id);
        tables
            .applied_tags
            .retain(|_, applied| applied.organization_id != id);
        Ok(true)
    }

    async fn add_name(
        &self,
        id: OrganizationId,
        content: &str,
    ) -> Result<OrganizationName, RepositoryError> {
        let mut tables = self.tables.write().unwrap();
        tables.require_organization(id)?;
        let name = OrganizationName {
            id: OrganizationNameId::new(tables.next_id()),
            organization_id: id,
            content: content.to_string(),
        };
        tables.names.insert(name.id, name.clone());
        Ok(name)
    }

    async fn load_aggregate(
        &self,
        id: OrganizationId,
    ) -> Result<Option<OrganizationAggregate>, RepositoryError> {
        Ok(self.tables.read().unwrap().aggregate(id))
    }

    async fn load_aggregates(
        &self,
        ids: &[OrganizationId],
    ) -> Result<Vec<OrganizationAggregate>, RepositoryError> {
        let tables = self.tables.read().unwrap();
        // Reverse order so callers cannot rely on the input order.
        Ok(ids.iter().rev().filter_map(|id| tables.aggregate(*id)).collect())
    }

    async fn organization_ids(
        &self,
        after: Option<OrganizationId>,
        limit: i64,
    ) -> Result<Vec<OrganizationId>, RepositoryError> {
        let tables = self.tables.read().unwrap();
        Ok(tables
            .organizations
            .keys()
            .filter(|id| after.map_or(true, |after| **id > after))
            .take(limit.max(0) as usize)
            .copied()
            .collect())
    }
}

#[async_trait]
impl LocationRepository for InMemoryRecords {
    async fn create_location(
        &self,
        organization_id: OrganizationId,
        input: &LocationInput,
    ) -> Result<Location, RepositoryError> {
        let mut tables = self.tables.write().unwrap();
        tables.require_organization(organization_id)?;
        let location = Location {
            id: LocationId::new(tables.next_id()),
            organization_id,
            city: input.city.clone(),
            country: input.country.clone(),
            content: input.content.clone(),
            latitude: input.latitude,
            longitude: input.longitude,
        };
        tables.locations.insert(location.id, location.clone());
        Ok(location)
    }

    async fn get_location(&self, id: LocationId) -> Result<Option<Location>, RepositoryError> {
        Ok(self.tables.read().unwrap().locations.get(&id).cloned())
    }

    async fn update_location(
        &self,
        id: LocationId,
        input: &LocationInput,
    ) -> Result<Location, RepositoryError> {
        let mut tables = self.tables.write().unwrap();
        let location = tables
            .locations
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("location {id}")))?;
        location.city = input.city.clone();
        location.country = input.country.clone();
        location.content = input.content.clone();
        location.latitude = input.latitude;
        location.longitude = input.longitude;
        Ok(location.clone())
    }

    async fn delete_location(&self, id: LocationId) -> Result<Option<Location>, RepositoryError> {
        Ok(self.tables.write().unwrap().locations.remove(&id))
    }
}

#[async_trait]
impl TagRepository for InMemoryRecords {
    async fn find_or_create_tag(&self, name: &str) -> Result<Tag, RepositoryError> {
        let mut tables = self.tables.write().unwrap();
        if let Some(tag) = tables.tags.values().find(|tag| tag.name == name) {
            return Ok(tag.clone());
        }
        let tag = Tag {
            id: TagId::new(tables.next_id()),
            name: name.to_string(),
        };
        tables.tags.insert(tag.id, tag.clone());
        Ok(tag)
    }

    async fn find_tag(&self, name: &str) -> Result<Option<Tag>, RepositoryError> {
        let tables = self.tables.read().unwrap();
        Ok(tables.tags.values().find(|tag| tag.name == name).cloned())
    }

    async fn create_import(&self, name: &str) -> Result<Import, RepositoryError> {
        let mut tables = self.tables.write().unwrap();
        let import = Import {
            id: ImportId::new(tables.next_id()),
            name: name.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        tables.imports.insert(import.id, import.clone());
        Ok(import)
    }

    async fn apply_tag(
        &self,
        organization_id: OrganizationId,
        tag_id: TagId,
        import_id: ImportId,
    ) -> Result<AppliedTag, RepositoryError> {
        let mut tables = self.tables.write().unwrap();
        tables.require_organization(organization_id)?;
        if !tables.tags.contains_key(&tag_id) {
            return Err(RepositoryError::NotFound(format!("tag {tag_id}")));
        }
        if !tables.imports.contains_key(&import_id) {
            return Err(RepositoryError::NotFound(format!("import {import_id}")));
        }
        let duplicate = tables.applied_tags.values().any(|applied| {
            applied.organization_id == organization_id
                && applied.tag_id == tag_id
                && applied.import_id == import_id
        });
        if duplicate {
            return Err(RepositoryError::Conflict(format!(
                "tag {tag_id} from import {import_id} on organization {organization_id} already exists"
            )));
        }

        let applied = AppliedTag {
            id: AppliedTagId::new(tables.next_id()),
            organization_id,
            tag_id,
            import_id,
        };
        tables.applied_tags.insert(applied.id, applied.clone());
        Ok(applied)
    }

    async fn get_applied_tag(
        &self,
        id: AppliedTagId,
    ) -> Result<Option<AppliedTag>, RepositoryError> {
        Ok(self.tables.read().unwrap().applied_tags.get(&id).cloned())
    }

    async fn delete_applied_tag(
        &self,
        id: AppliedTagId,
    ) -> Result<Option<AppliedTag>, RepositoryError> {
        Ok(self.tables.write().unwrap().applied_tags.remove(&id))
    }

    async fn applied_tags_for(
        &self,
        organization_id: OrganizationId,
        tag_id: TagId,
    ) -> Result<Vec<AppliedTag>, RepositoryError> {
        let tables = self.tables.read().unwrap();
        Ok(tables
            .applied_tags
            .values()
            .filter(|applied| applied.organization_id == organization_id && applied.tag_id == tag_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_org(names: &[&str]) -> NewOrganization {
        NewOrganization {
            website: None,
            names: names.iter().map(|n| n.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn applied_tags_are_not_deduplicated_across_imports() {
        let records = InMemoryRecords::new();
        let import_a = records.create_import("a").await.unwrap();
        let import_b = records.create_import("b").await.unwrap();
        let import_c = records.create_import("c").await.unwrap();
        let museum = records.find_or_create_tag("Museum").await.unwrap();

        let org1 = records.create_organization(&new_org(&[])).await.unwrap();
        let org2 = records.create_organization(&new_org(&[])).await.unwrap();

        records.apply_tag(org1.id, museum.id, import_a.id).await.unwrap();
        records.apply_tag(org1.id, museum.id, import_c.id).await.unwrap();
        records.apply_tag(org2.id, museum.id, import_b.id).await.unwrap();

        assert_eq!(records.applied_tags_for(org1.id, museum.id).await.unwrap().len(), 2);
        assert_eq!(records.applied_tags_for(org2.id, museum.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn same_import_cannot_apply_a_tag_twice() {
        let records = InMemoryRecords::new();
        let import = records.create_import("a").await.unwrap();
        let tag = records.find_or_create_tag("Gallery").await.unwrap();
        let org = records.create_organization(&new_org(&[])).await.unwrap();

        records.apply_tag(org.id, tag.id, import.id).await.unwrap();
        let err = records.apply_tag(org.id, tag.id, import.id).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn find_or_create_tag_reuses_existing() {
        let records = InMemoryRecords::new();
        let first = records.find_or_create_tag("Museum").await.unwrap();
        let second = records.find_or_create_tag("Museum").await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn organization_owns_multiple_locations_and_cascades() {
        let records = InMemoryRecords::new();
        let org = records.create_organization(&new_org(&["Gagosian"])).await.unwrap();
        for content in ["980 Madison Ave", "555 W 24th St"] {
            let input = LocationInput {
                content: Some(content.to_string()),
                ..Default::default()
            };
            records.create_location(org.id, &input).await.unwrap();
        }
        let aggregate = records.load_aggregate(org.id).await.unwrap().unwrap();
        assert_eq!(aggregate.locations.len(), 2);
        let location_id = aggregate.locations[0].id;

        assert!(records.delete_organization(org.id).await.unwrap());
        assert!(records.get_location(location_id).await.unwrap().is_none());
        assert!(records.load_aggregate(org.id).await.unwrap().is_none());
        assert!(!records.delete_organization(org.id).await.unwrap());
    }

    #[tokio::test]
    async fn organization_ids_pages_in_order() {
        let records = InMemoryRecords::new();
        let mut created = vec![];
        for _ in 0..5 {
            created.push(records.create_organization(&new_org(&[])).await.unwrap().id);
        }

        let first_page = records.organization_ids(None, 2).await.unwrap();
        assert_eq!(first_page, created[..2]);
        let second_page = records
            .organization_ids(first_page.last().copied(), 10)
            .await
            .unwrap();
        assert_eq!(second_page, created[2..]);
    }
}
