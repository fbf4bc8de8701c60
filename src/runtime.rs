//! Runtime for tutoring conversations
//!
//! Owns the per-client session map and the per-(client, subject) history map
//! behind the storage traits, and serializes each client's requests.

mod executor;
mod locks;
pub mod store;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::{SessionStatus, TutorRuntime};
pub use store::{EvictionPolicy, MemoryStorage};
pub use traits::*;

use std::sync::Arc;

/// Runtime behind trait objects, as held by the HTTP layer
pub type SharedRuntime = TutorRuntime<Arc<dyn Storage>, Arc<dyn LlmClient>>;
