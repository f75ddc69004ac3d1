//! # Vizor Core
//!
//! Core types, traits, and error definitions shared by every Vizor crate:
//! the unified error enum, typed identifiers for channels and jobs, and the
//! name-to-constructor registry that lets configuration pick one
//! implementation of a pluggable component at startup.

pub mod error;
pub mod id;
pub mod registry;
pub mod result;
pub mod telemetry;

pub use error::*;
pub use id::*;
pub use registry::*;
pub use result::*;

// Re-export shaku's interface marker for component traits
pub use shaku::Interface;
