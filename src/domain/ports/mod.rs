//! Port trait definitions (Hexagonal Architecture)
//!
//! - LiveQuerySource: realtime listeners on the hosted document database
//! - DocumentWriter: document writes against the same database
//!
//! The subscription cache only depends on `LiveQuerySource`.

/// Write port.
pub mod document_writer;
/// Realtime read port.
pub mod live_query_source;

pub use document_writer::DocumentWriter;
pub use live_query_source::{ListenerRegistration, LiveQuerySource, SnapshotObserver};
