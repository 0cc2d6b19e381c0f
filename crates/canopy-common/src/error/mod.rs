//! Error handling for canopy.
//!
//! This module provides a unified error type and result alias used
//! across all canopy components.

mod tree;

pub use tree::{CanopyError, ErrorCode};

/// Result type alias for canopy operations.
pub type CanopyResult<T> = std::result::Result<T, CanopyError>;
