use std::sync::Arc;

use tracing::{info, instrument};

use crate::domain::{
    models::{
        validate_name, AppliedTag, AppliedTagId, ApplyTag, Import, Location, LocationId,
        LocationInput, NameError, NewOrganization, Organization, OrganizationId, OrganizationName,
    },
    search::{ChangeDispatcher, EntityType},
    ServiceError,
};
use crate::repositories::{LocationRepository, OrganizationRepository, TagRepository};

type Result<T> = std::result::Result<T, ServiceError>;

/// Record mutations with their search hooks.
///
/// Every mutation commits first and then schedules the reindex job for the
/// changed record. If scheduling fails the committed change stays, but the
/// caller gets [`ServiceError::Dispatch`] so the missed reindex is not silent.
pub struct OrganizationService {
    organizations: Arc<dyn OrganizationRepository>,
    locations: Arc<dyn LocationRepository>,
    tags: Arc<dyn TagRepository>,
    dispatcher: ChangeDispatcher,
}

impl OrganizationService {
    pub fn new(
        organizations: Arc<dyn OrganizationRepository>,
        locations: Arc<dyn LocationRepository>,
        tags: Arc<dyn TagRepository>,
        dispatcher: ChangeDispatcher,
    ) -> Self {
        Self {
            organizations,
            locations,
            tags,
            dispatcher,
        }
    }

    async fn organization_changed(&self, id: OrganizationId) -> Result<()> {
        self.dispatcher
            .schedule_reindex(EntityType::Organization, id.as_i64())
            .await?;
        Ok(())
    }

    async fn require_organization(&self, id: OrganizationId) -> Result<Organization> {
        self.organizations
            .get_organization(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("organization {id}")))
    }

    #[instrument(skip_all)]
    pub async fn create_organization(&self, new: NewOrganization) -> Result<Organization> {
        if new.names.is_empty() {
            return Err(NameError::Missing.into());
        }
        let names = new
            .names
            .iter()
            .map(|name| validate_name(name))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let website = new.website.and_then(|w| {
            let w = w.trim();
            (!w.is_empty()).then(|| w.to_string())
        });

        let organization = self
            .organizations
            .create_organization(&NewOrganization { website, names })
            .await?;
        info!(org_id = %organization.id, "Created organization");

        self.organization_changed(organization.id).await?;
        Ok(organization)
    }

    /// Deletes the organization with its names, locations and applied tags.
    #[instrument(skip(self))]
    pub async fn destroy_organization(&self, id: OrganizationId) -> Result<()> {
        if !self.organizations.delete_organization(id).await? {
            return Err(ServiceError::not_found(format!("organization {id}")));
        }
        info!(org_id = %id, "Destroyed organization");

        // The job finds the organization gone and deletes its document.
        self.organization_changed(id).await
    }

    #[instrument(skip(self, content))]
    pub async fn add_name(&self, id: OrganizationId, content: &str) -> Result<OrganizationName> {
        let content = validate_name(content)?;
        let name = self.organizations.add_name(id, &content).await?;

        self.organization_changed(id).await?;
        Ok(name)
    }

    #[instrument(skip(self))]
    pub async fn update_website(
        &self,
        id: OrganizationId,
        website: Option<&str>,
    ) -> Result<Organization> {
        let website = website.map(str::trim).filter(|w| !w.is_empty());
        let organization = self.organizations.update_website(id, website).await?;

        self.organization_changed(id).await?;
        Ok(organization)
    }

    #[instrument(skip(self, input))]
    pub async fn add_location(
        &self,
        organization_id: OrganizationId,
        input: LocationInput,
    ) -> Result<Location> {
        input.validate()?;
        let location = self
            .locations
            .create_location(organization_id, &input)
            .await?;

        self.dispatcher.record_changed(&location).await?;
        Ok(location)
    }

    #[instrument(skip(self, input))]
    pub async fn update_location(&self, id: LocationId, input: LocationInput) -> Result<Location> {
        input.validate()?;
        let location = self.locations.update_location(id, &input).await?;

        self.dispatcher.record_changed(&location).await?;
        Ok(location)
    }

    /// Removes the location and reindexes its former owner.
    #[instrument(skip(self))]
    pub async fn remove_location(&self, id: LocationId) -> Result<Location> {
        let location = self
            .locations
            .delete_location(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("location {id}")))?;

        self.organization_changed(location.organization_id).await?;
        Ok(location)
    }

    pub async fn create_import(&self, name: &str) -> Result<Import> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::Blank("import name"));
        }
        Ok(self.tags.create_import(name).await?)
    }

    /// Applies `tag` on behalf of an import, creating the tag on first use.
    #[instrument(skip(self, apply), fields(tag = %apply.tag, import_id = %apply.import_id))]
    pub async fn apply_tag(
        &self,
        organization_id: OrganizationId,
        apply: ApplyTag,
    ) -> Result<AppliedTag> {
        let tag_name = apply.tag.trim();
        if tag_name.is_empty() {
            return Err(ServiceError::Blank("tag"));
        }
        self.require_organization(organization_id).await?;

        let tag = self.tags.find_or_create_tag(tag_name).await?;
        let applied = self
            .tags
            .apply_tag(organization_id, tag.id, apply.import_id)
            .await?;

        self.dispatcher.record_changed(&applied).await?;
        Ok(applied)
    }

    /// Every application of the named tag, one per import that applied it.
    pub async fn applied_tags_for(
        &self,
        organization_id: OrganizationId,
        tag_name: &str,
    ) -> Result<Vec<AppliedTag>> {
        self.require_organization(organization_id).await?;
        match self.tags.find_tag(tag_name.trim()).await? {
            Some(tag) => Ok(self.tags.applied_tags_for(organization_id, tag.id).await?),
            None => Ok(vec![]),
        }
    }

    #[instrument(skip(self))]
    pub async fn remove_applied_tag(&self, id: AppliedTagId) -> Result<AppliedTag> {
        let applied = self
            .tags
            .delete_applied_tag(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("applied tag {id}")))?;

        self.organization_changed(applied.organization_id).await?;
        Ok(applied)
    }
}
