//! Writes organization documents from the current relational state.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use super::indexable::Indexable;
use super::traits::{Result, SearchIndex};
use super::types::{EntityType, RebuildStats, ReindexJob, ReindexOutcome};
use crate::domain::models::{AppliedTagId, LocationId, OrganizationId};
use crate::repositories::{LocationRepository, OrganizationRepository, TagRepository};

/// Configuration for the search indexer.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Organizations loaded per batch during a full rebuild
    pub rebuild_batch_size: i64,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            rebuild_batch_size: 500,
        }
    }
}

/// Applies reindex jobs to the search index.
///
/// Jobs only carry `(entity_type, id)`. Every run reloads the record, so a
/// stale job that runs after a fresher one writes the same current state
/// instead of overwriting it with old data.
#[derive(Clone)]
pub struct SearchIndexer {
    index: Arc<dyn SearchIndex>,
    organizations: Arc<dyn OrganizationRepository>,
    locations: Arc<dyn LocationRepository>,
    tags: Arc<dyn TagRepository>,
    config: IndexerConfig,
}

impl SearchIndexer {
    pub fn new(
        index: Arc<dyn SearchIndex>,
        organizations: Arc<dyn OrganizationRepository>,
        locations: Arc<dyn LocationRepository>,
        tags: Arc<dyn TagRepository>,
        config: IndexerConfig,
    ) -> Self {
        Self {
            index,
            organizations,
            locations,
            tags,
            config,
        }
    }

    /// Handle one job. Idempotent: running it twice leaves the same index state.
    #[instrument(skip_all, fields(job = %job, attempt = job.attempt))]
    pub async fn reindex(&self, job: &ReindexJob) -> Result<ReindexOutcome> {
        let Some(organization_id) = self.resolve(job.entity_type, job.entity_id).await? else {
            debug!("Record no longer exists, skipping");
            return Ok(ReindexOutcome::Skipped);
        };
        self.index_organization(organization_id).await
    }

    /// Follows a record to the organization whose document it feeds.
    async fn resolve(
        &self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> Result<Option<OrganizationId>> {
        let organization_id = match entity_type {
            EntityType::Organization => Some(OrganizationId::new(entity_id)),
            EntityType::Location => self
                .locations
                .get_location(LocationId::new(entity_id))
                .await?
                .map(|location| location.indexed_organization()),
            EntityType::AppliedTag => self
                .tags
                .get_applied_tag(AppliedTagId::new(entity_id))
                .await?
                .map(|applied| applied.indexed_organization()),
        };
        Ok(organization_id)
    }

    /// Write the current document for an organization, or delete it if the
    /// organization is gone.
    pub async fn index_organization(&self, id: OrganizationId) -> Result<ReindexOutcome> {
        match self.organizations.load_aggregate(id).await? {
            Some(aggregate) => {
                self.index.upsert(&aggregate.to_index_document()).await?;
                debug!(organization_id = %id, "Indexed organization");
                Ok(ReindexOutcome::Indexed(id))
            }
            None => {
                let deleted = self.index.delete(id).await?;
                debug!(organization_id = %id, deleted, "Organization gone, removed document");
                Ok(ReindexOutcome::Removed(id))
            }
        }
    }

    /// Synchronously index the organization a record feeds, bypassing the queue.
    pub async fn index_now<T: Indexable>(&self, record: &T) -> Result<ReindexOutcome> {
        self.index_organization(record.indexed_organization()).await
    }

    pub async fn recreate_index(&self) -> Result<()> {
        self.index.recreate_index().await?;
        Ok(())
    }

    pub async fn refresh_index(&self) -> Result<()> {
        self.index.refresh_index().await?;
        Ok(())
    }

    /// Drop the index and write every organization again.
    ///
    /// Searches running meanwhile may see a partially filled index.
    #[instrument(skip(self))]
    pub async fn rebuild(&self) -> Result<RebuildStats> {
        let mut stats = RebuildStats::default();
        info!("Starting full index rebuild");

        self.index.recreate_index().await?;

        let mut after = None;
        loop {
            let ids = self
                .organizations
                .organization_ids(after, self.config.rebuild_batch_size)
                .await?;
            let Some(last) = ids.last().copied() else {
                break;
            };
            after = Some(last);

            let aggregates = self.organizations.load_aggregates(&ids).await?;
            for aggregate in &aggregates {
                self.index.upsert(&aggregate.to_index_document()).await?;
            }

            stats.organizations_indexed += aggregates.len();
            stats.batches += 1;
            debug!(
                batch = stats.batches,
                indexed = stats.organizations_indexed,
                "Rebuild batch written"
            );
        }

        self.index.refresh_index().await?;

        info!(
            organizations = stats.organizations_indexed,
            batches = stats.batches,
            "Index rebuild completed"
        );
        Ok(stats)
    }
}
