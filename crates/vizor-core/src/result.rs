//! Result type aliases for Vizor.

use crate::VizorError;

/// A specialized `Result` type for Vizor operations.
pub type VizorResult<T> = Result<T, VizorError>;
