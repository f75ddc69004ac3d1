//! Application state for Axum handlers.

use std::sync::Arc;
use vizor_async_queries::AsyncQueryManagerInterface;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub async_queries: Arc<dyn AsyncQueryManagerInterface>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(async_queries: Arc<dyn AsyncQueryManagerInterface>) -> Self {
        Self { async_queries }
    }
}
