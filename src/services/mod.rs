//! Service layer
//!
//! - `subscription_cache`: shared, deduplicated realtime listeners
//! - `live_view`: consumer-side watch views over the cache

/// Watch-channel views over the cache.
pub mod live_view;
/// The shared subscription cache.
pub mod subscription_cache;

pub use live_view::{LiveCollection, LiveDocument};
pub use subscription_cache::{
    CacheStats, CollectionOptions, DocumentOptions, Subscription, SubscriptionCache,
};
