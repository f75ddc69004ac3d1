//! # Vizor Server Library
//!
//! HTTP surface for async queries: the event polling endpoint, the
//! channel cookie middleware and component start-up.

pub mod controllers;
pub mod middleware;
pub mod responses;
pub mod router;
pub mod startup;
pub mod state;

pub use router::create_router;
pub use state::AppState;
