//! Adapters implementing the domain ports.

/// In-process document store.
pub mod memory;
