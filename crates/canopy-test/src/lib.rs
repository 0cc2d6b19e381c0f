//! # canopy-test
//!
//! Integration tests for canopy.
//!
//! This crate contains:
//! - Shared fixtures building trees on the in-memory driver
//! - End-to-end tests of the engine's mutation, query and verification
//!   behavior (under `tests/`)

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use canopy_client::MemoryDriver;
use canopy_common::{DriverConfig, TreeConfig};
use canopy_tree::{NewNode, NodePosition, TreeManager};

/// Bounds of one node as `(left, right, level)`.
pub type Triple = (i64, i64, i64);

/// Installs a test subscriber honoring `RUST_LOG`. Safe to call from every
/// test; only the first call installs it.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("canopy_tree=warn,canopy_client=warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .with_target(true)
        .try_init();
}

/// A tree over a fresh in-memory driver.
pub struct TestTree {
    /// The driver, for fault injection and raw row access.
    pub driver: Arc<MemoryDriver>,
    /// The tree under test.
    pub tree: TreeManager<MemoryDriver>,
}

impl TestTree {
    /// Creates an empty tree with `config` on its own driver.
    pub async fn new(config: TreeConfig) -> anyhow::Result<Self> {
        Self::on_driver(Arc::new(MemoryDriver::new()), config).await
    }

    /// Creates a tree with `config` on a shared driver, provisioning its
    /// table if needed.
    pub async fn on_driver(driver: Arc<MemoryDriver>, config: TreeConfig) -> anyhow::Result<Self> {
        init_tracing();
        driver.create_table(config.table.clone());
        let tree = TreeManager::new(Arc::clone(&driver), config)?;
        tree.open(&DriverConfig::default().application_name("canopy-test"))
            .await?;
        Ok(Self { driver, tree })
    }

    /// Creates a root named `root` (id 1) with children A, B and C
    /// (ids 2, 3 and 4).
    pub async fn abc() -> anyhow::Result<Self> {
        let fixture = Self::new(TreeConfig::default()).await?;
        fixture.seed_abc().await?;
        Ok(fixture)
    }

    /// Adds the root and the A, B, C children to an empty tree.
    pub async fn seed_abc(&self) -> anyhow::Result<()> {
        let mut scope = self.tree.begin_write()?;
        scope.create_root(node(1, "root")).await?;
        scope
            .add_nodes(
                vec![node(2, "A"), node(3, "B"), node(4, "C")],
                None,
                NodePosition::LastChild,
            )
            .await?;
        Ok(())
    }

    /// Returns `(left, right, level)` of a live node.
    pub async fn bounds(&self, id: i64) -> anyhow::Result<Triple> {
        let node = self
            .tree
            .get_node(id)
            .await?
            .with_context(|| format!("node {} not found", id))?;
        Ok((node.left, node.right, node.level))
    }

    /// Returns the bounds of every live node keyed by name.
    pub async fn snapshot(&self) -> anyhow::Result<BTreeMap<String, Triple>> {
        Ok(self
            .tree
            .get_all_nodes()
            .await?
            .into_iter()
            .map(|n| (n.name.to_string(), (n.left, n.right, n.level)))
            .collect())
    }

    /// Returns the names of all live nodes in preorder.
    pub async fn preorder(&self) -> anyhow::Result<Vec<String>> {
        Ok(self
            .tree
            .get_all_nodes()
            .await?
            .into_iter()
            .map(|n| n.name.to_string())
            .collect())
    }
}

/// A new node with an integer id and a name.
pub fn node(id: i64, name: &str) -> NewNode {
    NewNode::new(id).with_name(name)
}
