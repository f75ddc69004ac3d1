//! # Vizor Config
//!
//! Configuration management for Vizor.
//! Supports layered configuration from files and environment variables,
//! validated once at load time.

mod app_config;
mod cache;
mod loader;
mod validation;

pub use app_config::*;
pub use cache::*;
pub use loader::*;
pub use validation::*;
