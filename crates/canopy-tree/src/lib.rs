//! # canopy-tree
//!
//! Nested-set mutation and relation engine.
//!
//! Trees live in a single flat table: every node carries a `left`/`right`
//! bound pair and the descendants of a node are exactly the rows whose
//! bounds fall strictly inside its own. This crate computes how those
//! bounds move on insert, delete and move, turns that into statement
//! batches for a `StorageDriver`, and answers structural queries.
//!
//! ## Components
//!
//! - `bounds`: pure bound arithmetic
//! - `batch`: statements for each mutation
//! - `TreeManager`: reads, relation classification and verification
//! - `WriteScope`: the only handle through which the tree can be mutated
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use canopy_client::MemoryDriver;
//! use canopy_common::{DriverConfig, TreeConfig};
//! use canopy_tree::{NewNode, NodePosition, NodeRelation, TreeManager};
//!
//! # async fn example() -> canopy_common::CanopyResult<()> {
//! let driver = Arc::new(MemoryDriver::new());
//! driver.create_table("tree");
//! let tree = TreeManager::new(driver, TreeConfig::default())?;
//! tree.open(&DriverConfig::default()).await?;
//!
//! {
//!     let mut scope = tree.begin_write()?;
//!     scope.create_root(NewNode::new(1)).await?;
//!     scope
//!         .add_nodes(vec![NewNode::new(2), NewNode::new(3)], None, NodePosition::LastChild)
//!         .await?;
//! }
//!
//! assert_eq!(tree.get_node_relation(2, 3).await?, NodeRelation::Siblings);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batch;
pub mod bounds;
mod manager;
mod node;
mod position;
mod relation;
mod verify;

mod add;
mod delete;
mod moves;
mod query;

pub use manager::{TreeManager, WriteScope};
pub use node::{NewNode, NodeRef, TreeNode};
pub use position::NodePosition;
pub use relation::NodeRelation;
pub use verify::verify_nodes;
