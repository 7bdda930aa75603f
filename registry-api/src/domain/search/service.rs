//! Organization search over the index, resolved against current records.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::traits::{Result, SearchError, SearchIndex};
use super::types::IndexQuery;
use crate::domain::models::OrganizationAggregate;
use crate::repositories::OrganizationRepository;

/// Configuration for the search service.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Number of results returned when `first` is omitted
    pub default_limit: i64,
    /// Maximum number of results allowed
    pub max_limit: i64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 50,
            max_limit: 100,
        }
    }
}

/// Finds organizations whose names match a term.
///
/// The index only decides which organizations match and in what order. The
/// returned aggregates are always loaded from the record store, so a result
/// never shows stale index content.
pub struct SearchService {
    index: Arc<dyn SearchIndex>,
    organizations: Arc<dyn OrganizationRepository>,
    config: SearchConfig,
}

impl SearchService {
    pub fn new(
        index: Arc<dyn SearchIndex>,
        organizations: Arc<dyn OrganizationRepository>,
        config: SearchConfig,
    ) -> Self {
        Self {
            index,
            organizations,
            config,
        }
    }

    /// Resolves `first` into the number of hits to request.
    fn effective_limit(&self, first: Option<i64>) -> Result<i64> {
        match first {
            Some(first) if first < 0 => Err(SearchError::InvalidLimit(first)),
            Some(first) => Ok(first.min(self.config.max_limit)),
            None => Ok(self.config.default_limit.min(self.config.max_limit)),
        }
    }

    /// Search organizations by name.
    ///
    /// # Arguments
    ///
    /// * `term` - Text to match; surrounding whitespace is ignored, missing or
    ///   blank is rejected
    /// * `first` - Maximum number of results (None uses default, capped at max_limit)
    ///
    /// # Returns
    ///
    /// Organizations in index relevance order. Hits whose record has been
    /// deleted since they were indexed are dropped.
    pub async fn search(
        &self,
        term: Option<&str>,
        first: Option<i64>,
    ) -> Result<Vec<OrganizationAggregate>> {
        let term = term.map(str::trim).unwrap_or_default();
        if term.is_empty() {
            return Err(SearchError::MissingTerm);
        }

        let limit = self.effective_limit(first)?;
        if limit == 0 {
            return Ok(vec![]);
        }

        let hits = self
            .index
            .search(&IndexQuery {
                term: term.to_string(),
                limit,
            })
            .await?;
        if hits.is_empty() {
            return Ok(vec![]);
        }

        let ids: Vec<_> = hits.iter().map(|hit| hit.organization_id).collect();
        let mut by_id: HashMap<_, _> = self
            .organizations
            .load_aggregates(&ids)
            .await?
            .into_iter()
            .map(|aggregate| (aggregate.id(), aggregate))
            .collect();

        let results: Vec<_> = ids.iter().filter_map(|id| by_id.remove(id)).collect();
        debug!(
            term,
            limit,
            hits = ids.len(),
            results = results.len(),
            "Organization search"
        );

        Ok(results)
    }
}
