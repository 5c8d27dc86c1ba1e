//! repsync - shared realtime subscription cache
//!
//! Deduplicates live listeners on a hosted document database so that any
//! number of consumers asking for the same logical query share one upstream
//! listener, each receiving the latest `{data, loading, error}` state.
//!
//! # Architecture
//!
//! The crate follows a hexagonal layout:
//!
//! - **Domain Layer** (`domain`): models, errors and the upstream ports
//! - **Service Layer** (`services`): the subscription cache and consumer views
//! - **Adapters** (`adapters`): the in-memory document store
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): the `repsync` binary
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use repsync::{CollectionQuery, Direction, LiveCollection, MemoryStore, SubscriptionCache};
//!
//! let cache = SubscriptionCache::new(Arc::new(MemoryStore::new()));
//! let view = LiveCollection::open(
//!     &cache,
//!     CollectionQuery::new("users/u1/workouts").order_by("createdAt", Direction::Desc),
//!     None,
//! )?;
//! println!("loading = {}", view.state().loading);
//! ```

/// Port implementations.
pub mod adapters;
/// Command-line interface.
pub mod cli;
/// Models, errors and ports.
pub mod domain;
/// Configuration and logging.
pub mod infrastructure;
/// Subscription cache and consumer views.
pub mod services;

// Re-export commonly used types for convenience
pub use adapters::memory::{DeliveryMode, MemoryStore};
pub use domain::models::{
    CacheConfig, CacheState, CollectionQuery, Config, Constraint, Direction, DocumentData,
    DocumentRef, DocumentSnapshot, EntryStatus, LoggingConfig, OrderBy,
};
pub use domain::ports::{DocumentWriter, ListenerRegistration, LiveQuerySource, SnapshotObserver};
pub use domain::{CacheError, CacheResult, ErrorCode, UpstreamError};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    CacheStats, CollectionOptions, DocumentOptions, LiveCollection, LiveDocument, Subscription,
    SubscriptionCache,
};
