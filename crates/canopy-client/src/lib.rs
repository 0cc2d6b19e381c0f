//! # canopy-client
//!
//! Statement builder and storage driver interface for canopy.
//!
//! ## Features
//!
//! - **Statements**: `Select`, `Insert`, `Update` and `Delete` built as
//!   values, rendered to SQL with bound parameters
//! - **Drivers**: the `StorageDriver` trait the tree engine executes through
//! - **Memory driver**: an all-or-nothing in-memory implementation
//!
//! ## Example
//!
//! ```rust,no_run
//! use canopy_client::driver::{MemoryDriver, StorageDriver};
//! use canopy_client::query::{col, Select, Statement};
//! use canopy_common::DriverConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let driver = MemoryDriver::new();
//!     driver.open(&DriverConfig::default()).await?;
//!     driver.create_table("tree");
//!
//!     let query: Statement = Select::from("tree").filter(col("level").eq(0)).into();
//!     let rows = driver.get_rows(&query).await?;
//!     println!("{} roots", rows.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod driver;
pub mod query;

pub use driver::{
    ConnectionState, DriverFuture, DriverStats, FromValue, MemoryDriver, Row, StorageDriver,
};
pub use query::{col, Condition, Delete, Expr, Insert, Select, Statement, Update};

// Re-export common types
pub use canopy_common::{CanopyError, CanopyResult, DriverConfig, Value};
