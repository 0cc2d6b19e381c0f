//! # canopy-common
//!
//! Common types, errors, and configuration for canopy.
//!
//! This crate provides the foundational types shared by the statement
//! builder, the storage drivers and the nested-set engine:
//!
//! - **Types**: the `Value` scalar stored in table cells
//! - **Errors**: unified error handling with `CanopyError`
//! - **Config**: column mapping, tree and driver configuration
//! - **Constants**: default column names and limits
//!
//! ## Example
//!
//! ```rust
//! use canopy_common::config::TreeConfig;
//! use canopy_common::error::CanopyResult;
//! use canopy_common::types::Value;
//!
//! fn example() -> CanopyResult<()> {
//!     let config = TreeConfig::new("categories").with_tree_id(Value::Integer(7));
//!     config.validate()?;
//!     assert!(config.is_multi_tree());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

// Re-export commonly used items at the crate root
pub use config::{DriverConfig, FieldNames, TreeConfig};
pub use error::{CanopyError, CanopyResult, ErrorCode};
pub use types::Value;
