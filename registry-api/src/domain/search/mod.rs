//! Organization search: a name index kept in sync with the record store.
//!
//! # Architecture
//!
//! - [`SearchIndex`] - The document store answering term queries (PostgreSQL, in-memory)
//! - [`ChangeDispatcher`] - Turns record mutations into `ReindexJob`s on a [`JobQueue`]
//! - [`SearchIndexer`] - Reloads the changed record and writes its owner's document
//! - [`SearchService`] - Runs a query and resolves the hits to current records
//!
//! Only organizations have documents. A location or applied tag change
//! reindexes the organization that owns it, see `Indexable`.
//!
//! # Example
//!
//! ```ignore
//! let (queue, receiver) = ChannelJobQueue::bounded(1024);
//! let dispatcher = ChangeDispatcher::new(Arc::new(queue.clone()));
//! spawn_index_workers(receiver, Arc::new(queue), indexer, WorkerConfig::default());
//!
//! dispatcher.record_changed(&location).await?;
//! let results = service.search("David", Some(10)).await?;
//! ```

mod dispatcher;
mod index_worker;
mod indexable;
mod indexer;
mod service;
mod traits;
mod types;

pub mod index;

pub use dispatcher::{ChangeDispatcher, ChannelJobQueue, DispatchError, JobQueue};
#[cfg(test)]
pub use dispatcher::RecordingJobQueue;
pub use index_worker::{spawn_index_workers, WorkerConfig};
pub use indexer::{IndexerConfig, SearchIndexer};
pub use service::{SearchConfig, SearchService};
pub use traits::SearchIndex;
pub use types::EntityType;
#[cfg(test)]
pub use types::ReindexJob;
