//! In-memory index for testing.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::domain::models::OrganizationId;
use crate::domain::search::traits::{IndexError, SearchIndex};
use crate::domain::search::types::{IndexDocument, IndexQuery, SearchHit};

type Result<T> = std::result::Result<T, IndexError>;

#[derive(Debug, Clone)]
enum PendingWrite {
    Upsert(IndexDocument),
    Delete(OrganizationId),
}

#[derive(Default)]
struct State {
    visible: BTreeMap<OrganizationId, IndexDocument>,
    pending: Vec<PendingWrite>,
}

/// Near-real-time index: writes are buffered and only become searchable
/// after [`SearchIndex::refresh_index`], like a refresh interval on a
/// document store.
///
/// # Examples
///
/// ```ignore
/// let index = MemorySearchIndex::new();
/// index.upsert(&doc).await?;
/// index.refresh_index().await?;
/// ```
#[derive(Clone, Default)]
pub struct MemorySearchIndex {
    state: Arc<RwLock<State>>,
    unavailable: Arc<AtomicBool>,
}

#[allow(dead_code)]
impl MemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail as if the engine were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn pending_writes(&self) -> usize {
        self.state.read().unwrap().pending.len()
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(IndexError::Unavailable("index engine is down".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Scores how well `term` matches a document. Names dominate; tags and
/// locations only break ties between name matches or catch otherwise
/// unmatched documents.
fn score(doc: &IndexDocument, term: &str) -> Option<f64> {
    let term = term.to_lowercase();
    let name_score = doc
        .names
        .iter()
        .map(|name| {
            let name = name.to_lowercase();
            if name == term {
                3.0
            } else if name.split_whitespace().any(|word| word == term) {
                2.0
            } else if name.contains(&term) {
                1.0
            } else {
                0.0
            }
        })
        .fold(0.0, f64::max);
    let extra_score = if doc.extra_text().to_lowercase().contains(&term) {
        0.5
    } else {
        0.0
    };

    let total = name_score + extra_score;
    (total > 0.0).then_some(total)
}

#[async_trait]
impl SearchIndex for MemorySearchIndex {
    async fn upsert(&self, doc: &IndexDocument) -> Result<()> {
        self.check_available()?;
        let mut state = self.state.write().unwrap();
        state.pending.push(PendingWrite::Upsert(doc.clone()));
        Ok(())
    }

    async fn delete(&self, id: OrganizationId) -> Result<bool> {
        self.check_available()?;
        let mut state = self.state.write().unwrap();
        let upserted_later = state.pending.iter().rev().find_map(|write| match write {
            PendingWrite::Upsert(doc) if doc.organization_id == id => Some(true),
            PendingWrite::Delete(deleted) if *deleted == id => Some(false),
            _ => None,
        });
        let existed = upserted_later.unwrap_or_else(|| state.visible.contains_key(&id));
        state.pending.push(PendingWrite::Delete(id));
        Ok(existed)
    }

    async fn search(&self, query: &IndexQuery) -> Result<Vec<SearchHit>> {
        self.check_available()?;
        let state = self.state.read().unwrap();
        let mut hits: Vec<SearchHit> = state
            .visible
            .values()
            .filter_map(|doc| {
                score(doc, &query.term).map(|score| SearchHit {
                    organization_id: doc.organization_id,
                    score,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.organization_id.cmp(&b.organization_id))
        });
        hits.truncate(query.limit.max(0) as usize);
        Ok(hits)
    }

    async fn recreate_index(&self) -> Result<()> {
        self.check_available()?;
        let mut state = self.state.write().unwrap();
        state.visible.clear();
        state.pending.clear();
        Ok(())
    }

    async fn refresh_index(&self) -> Result<()> {
        self.check_available()?;
        let mut state = self.state.write().unwrap();
        let pending = std::mem::take(&mut state.pending);
        for write in pending {
            match write {
                PendingWrite::Upsert(doc) => {
                    state.visible.insert(doc.organization_id, doc);
                }
                PendingWrite::Delete(id) => {
                    state.visible.remove(&id);
                }
            }
        }
        Ok(())
    }

    async fn get(&self, id: OrganizationId) -> Result<Option<IndexDocument>> {
        self.check_available()?;
        Ok(self.state.read().unwrap().visible.get(&id).cloned())
    }

    async fn count(&self) -> Result<i64> {
        self.check_available()?;
        Ok(self.state.read().unwrap().visible.len() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: i64, names: &[&str]) -> IndexDocument {
        IndexDocument {
            organization_id: OrganizationId::new(id),
            names: names.iter().map(|n| n.to_string()).collect(),
            locations: vec![],
            tags: vec![],
        }
    }

    fn query(term: &str, limit: i64) -> IndexQuery {
        IndexQuery {
            term: term.to_string(),
            limit,
        }
    }

    #[tokio::test]
    async fn writes_are_invisible_until_refresh() {
        let index = MemorySearchIndex::new();
        index.upsert(&doc(1, &["David Zwirner Gallery"])).await.unwrap();

        assert!(index.search(&query("David", 10)).await.unwrap().is_empty());
        assert_eq!(index.pending_writes(), 1);

        index.refresh_index().await.unwrap();
        let hits = index.search(&query("David", 10)).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].organization_id, OrganizationId::new(1));
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let index = MemorySearchIndex::new();
        let document = doc(1, &["Hauser & Wirth"]);

        index.upsert(&document).await.unwrap();
        index.refresh_index().await.unwrap();
        let once = index.search(&query("Wirth", 10)).await.unwrap();

        index.upsert(&document).await.unwrap();
        index.refresh_index().await.unwrap();
        let twice = index.search(&query("Wirth", 10)).await.unwrap();

        assert_eq!(once, twice);
        assert_eq!(index.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let index = MemorySearchIndex::new();
        index.upsert(&doc(1, &["Pace"])).await.unwrap();
        index.refresh_index().await.unwrap();

        assert!(index.delete(OrganizationId::new(1)).await.unwrap());
        assert!(!index.delete(OrganizationId::new(1)).await.unwrap());
        assert!(!index.delete(OrganizationId::new(99)).await.unwrap());
        index.refresh_index().await.unwrap();
        assert_eq!(index.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn ranks_exact_and_word_matches_above_substrings() {
        let index = MemorySearchIndex::new();
        index.upsert(&doc(1, &["Davidson Contemporary"])).await.unwrap();
        index.upsert(&doc(2, &["David"])).await.unwrap();
        index.upsert(&doc(3, &["David Kordansky"])).await.unwrap();
        index.refresh_index().await.unwrap();

        let ids: Vec<i64> = index
            .search(&query("david", 10))
            .await
            .unwrap()
            .iter()
            .map(|hit| hit.organization_id.as_i64())
            .collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[tokio::test]
    async fn ties_break_by_id_and_limit_applies() {
        let index = MemorySearchIndex::new();
        for id in [3, 1, 2] {
            index.upsert(&doc(id, &[&format!("David {id}")])).await.unwrap();
        }
        index.refresh_index().await.unwrap();

        let hits = index.search(&query("David", 2)).await.unwrap();
        let ids: Vec<i64> = hits.iter().map(|hit| hit.organization_id.as_i64()).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn recreate_drops_everything() {
        let index = MemorySearchIndex::new();
        index.upsert(&doc(1, &["Pace"])).await.unwrap();
        index.refresh_index().await.unwrap();
        index.upsert(&doc(2, &["Lisson"])).await.unwrap();

        index.recreate_index().await.unwrap();
        index.refresh_index().await.unwrap();
        assert_eq!(index.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unavailable_engine_fails_writes() {
        let index = MemorySearchIndex::new();
        index.set_unavailable(true);
        let err = index.upsert(&doc(1, &["Pace"])).await.unwrap_err();
        assert!(matches!(err, IndexError::Unavailable(_)));
    }
}
