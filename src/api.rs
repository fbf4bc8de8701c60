//! HTTP API for the tutor
//!
//! A thin JSON transport over [`TutorRuntime`](crate::runtime::TutorRuntime):
//! every tutoring outcome is a 200 reply, only malformed input is an error.

mod handlers;
mod types;

pub use handlers::create_router;

use crate::runtime::SharedRuntime;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<SharedRuntime>,
}

impl AppState {
    pub fn new(runtime: SharedRuntime) -> Self {
        Self {
            runtime: Arc::new(runtime),
        }
    }
}
