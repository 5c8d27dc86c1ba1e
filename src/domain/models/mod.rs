//! Domain models: documents, queries, cache state and configuration.

/// Listener-facing entry state.
pub mod cache_state;
/// Configuration.
pub mod config;
/// Document snapshots.
pub mod document;
/// Query descriptors and cache keys.
pub mod query;

pub use cache_state::{CacheState, EntryStatus};
pub use config::{CacheConfig, Config, LoggingConfig};
pub use document::{DocumentData, DocumentSnapshot};
pub use query::{CollectionQuery, Constraint, Direction, DocumentRef, OrderBy};
