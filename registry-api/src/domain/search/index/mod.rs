//! Search index implementations.

#[cfg(test)]
mod memory;
mod postgres;

#[cfg(test)]
pub use memory::MemorySearchIndex;
pub use postgres::PgSearchIndex;
