use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::{
    auth::TokenVerifier,
    config::Settings,
    domain::{
        search::{
            ChangeDispatcher, IndexerConfig, JobQueue, SearchConfig, SearchIndex, SearchIndexer,
            SearchService,
        },
        OrganizationService,
    },
    repositories::{
        LocationRepository, LocationRepositoryImpl, OrganizationRepository,
        OrganizationRepositoryImpl, TagRepository, TagRepositoryImpl,
    },
};

/// The record repositories shared by the mutation service and the indexer.
#[derive(Clone)]
pub struct RecordStores {
    pub organizations: Arc<dyn OrganizationRepository>,
    pub locations: Arc<dyn LocationRepository>,
    pub tags: Arc<dyn TagRepository>,
}

impl RecordStores {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            organizations: Arc::new(OrganizationRepositoryImpl::new(pool.clone())),
            locations: Arc::new(LocationRepositoryImpl::new(pool.clone())),
            tags: Arc::new(TagRepositoryImpl::new(pool)),
        }
    }

    #[cfg(test)]
    pub fn memory(records: crate::repositories::InMemoryRecords) -> Self {
        Self {
            organizations: Arc::new(records.clone()),
            locations: Arc::new(records.clone()),
            tags: Arc::new(records),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub search: Arc<SearchService>,
    pub organizations: Arc<OrganizationService>,
    pub indexer: Arc<SearchIndexer>,
    token_verifier: Arc<TokenVerifier>,
}

impl AppState {
    pub fn new(
        stores: RecordStores,
        index: Arc<dyn SearchIndex>,
        queue: Arc<dyn JobQueue>,
        token_verifier: TokenVerifier,
        search_config: SearchConfig,
        indexer_config: IndexerConfig,
    ) -> Self {
        let indexer = SearchIndexer::new(
            index.clone(),
            stores.organizations.clone(),
            stores.locations.clone(),
            stores.tags.clone(),
            indexer_config,
        );
        let search = SearchService::new(index, stores.organizations.clone(), search_config);
        let organizations = OrganizationService::new(
            stores.organizations,
            stores.locations,
            stores.tags,
            ChangeDispatcher::new(queue),
        );

        Self {
            search: Arc::new(search),
            organizations: Arc::new(organizations),
            indexer: Arc::new(indexer),
            token_verifier: Arc::new(token_verifier),
        }
    }

    pub fn from_settings(
        stores: RecordStores,
        index: Arc<dyn SearchIndex>,
        queue: Arc<dyn JobQueue>,
        settings: &Settings,
    ) -> Self {
        if settings.application.disable_auth {
            tracing::warn!("Authentication is disabled");
        }

        Self::new(
            stores,
            index,
            queue,
            TokenVerifier::new(&settings.auth, settings.application.disable_auth),
            settings.search.search_config(),
            settings.search.indexer_config(),
        )
    }
}

impl FromRef<AppState> for Arc<TokenVerifier> {
    fn from_ref(state: &AppState) -> Self {
        state.token_verifier.clone()
    }
}
