//! In-memory document store backing tests, fixtures and the CLI.

mod query_eval;
mod store;

pub use query_eval::evaluate;
pub use store::{DeliveryMode, MemoryStore};
