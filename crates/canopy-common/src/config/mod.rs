//! Configuration for canopy.
//!
//! This module provides the column mapping, the per-tree configuration
//! and the storage driver configuration.

mod driver;
mod tree;

pub use driver::DriverConfig;
pub use tree::{is_identifier, FieldNames, TreeConfig};
