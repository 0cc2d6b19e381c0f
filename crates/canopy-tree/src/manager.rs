//! Tree manager and write scope.
//!
//! `TreeManager` is the composition root of the engine. Reads are plain
//! `&self` methods spread over the capability modules (`query`,
//! `relation`, `verify`); mutations are only reachable through a
//! `WriteScope`, which holds the manager's single-writer gate for as long
//! as it lives.
//!
//! ```text
//!   begin_write() ──▶ WriteScope ──▶ add / delete / move ──▶ StorageDriver::exec
//!        │                 │
//!        └── gate taken    └── gate released on drop
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use canopy_client::driver::{FromValue, StorageDriver};
use canopy_client::query::{Select, Statement};
use canopy_common::{CanopyError, CanopyResult, DriverConfig, TreeConfig, Value};

use crate::batch::StatementPlanner;
use crate::node::{NewNode, NodeRef, TreeNode};
use crate::position::NodePosition;

/// Nested-set tree stored in one table (or one partition of a shared table).
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use canopy_client::MemoryDriver;
/// use canopy_common::{DriverConfig, TreeConfig};
/// use canopy_tree::{NewNode, NodePosition, TreeManager};
///
/// # async fn example() -> canopy_common::CanopyResult<()> {
/// let driver = Arc::new(MemoryDriver::new());
/// driver.create_table("tree");
///
/// let tree = TreeManager::new(driver, TreeConfig::default())?;
/// tree.open(&DriverConfig::default()).await?;
///
/// let mut scope = tree.begin_write()?;
/// scope.create_root(NewNode::new(1).with_name("root")).await?;
/// scope.add_node(NewNode::new(2), Some(1.into()), NodePosition::LastChild).await?;
/// drop(scope);
///
/// tree.verify().await?;
/// # Ok(())
/// # }
/// ```
pub struct TreeManager<D: StorageDriver> {
    /// Storage driver.
    driver: Arc<D>,
    /// Tree configuration.
    config: TreeConfig,
    /// Statement builder for this tree.
    planner: StatementPlanner,
    /// Single-writer gate.
    writing: AtomicBool,
}

impl<D: StorageDriver> TreeManager<D> {
    /// Creates a manager over `driver`. Fails if the configuration is invalid.
    pub fn new(driver: Arc<D>, config: TreeConfig) -> CanopyResult<Self> {
        config.validate()?;
        let planner = StatementPlanner::new(&config);
        Ok(Self {
            driver,
            config,
            planner,
            writing: AtomicBool::new(false),
        })
    }

    /// Opens the underlying driver.
    pub async fn open(&self, config: &DriverConfig) -> CanopyResult<()> {
        self.driver.open(config).await.map_err(|e| {
            tracing::warn!(error = %e, table = %self.config.table, "failed to open storage driver");
            e
        })
    }

    /// Returns true once the driver is usable.
    pub fn is_ready(&self) -> bool {
        self.driver.is_ready()
    }

    /// Returns the tree configuration.
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Returns the storage driver.
    pub fn driver(&self) -> &Arc<D> {
        &self.driver
    }

    /// Returns true while a write scope is open.
    pub fn is_writing(&self) -> bool {
        self.writing.load(Ordering::SeqCst)
    }

    /// Opens the write scope.
    ///
    /// Fails with `InvalidUpdate` if another scope is already open; callers
    /// are never queued.
    pub fn begin_write(&self) -> CanopyResult<WriteScope<'_, D>> {
        if self
            .writing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!(table = %self.config.table, "write scope refused: another scope is open");
            return Err(CanopyError::invalid_update("a write scope is already open"));
        }

        tracing::info!(table = %self.config.table, "write scope opened");
        Ok(WriteScope { manager: self })
    }

    /// Runs `f` inside a write scope and closes the scope afterwards,
    /// whether `f` succeeded or not.
    ///
    /// ```rust,no_run
    /// # use canopy_client::MemoryDriver;
    /// # use canopy_tree::{NewNode, TreeManager};
    /// # async fn example(tree: &TreeManager<MemoryDriver>) -> canopy_common::CanopyResult<()> {
    /// tree.write(|scope| {
    ///     Box::pin(async move {
    ///         scope.create_root(NewNode::new(1)).await?;
    ///         Ok(())
    ///     })
    /// })
    /// .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn write<'m, F, T>(&'m self, f: F) -> CanopyResult<T>
    where
        F: for<'s> FnOnce(
            &'s mut WriteScope<'m, D>,
        ) -> Pin<Box<dyn Future<Output = CanopyResult<T>> + Send + 's>>,
        T: Send,
    {
        let mut scope = self.begin_write()?;
        let result = f(&mut scope).await;
        drop(scope);
        result
    }

    pub(crate) fn planner(&self) -> &StatementPlanner {
        &self.planner
    }

    pub(crate) fn is_multi_tree(&self) -> bool {
        self.config.is_multi_tree()
    }

    /// Partition a reference points into: its own, or this manager's.
    pub(crate) fn partition_of<'a>(&'a self, node: &'a NodeRef) -> Option<&'a Value> {
        node.tree_id.as_ref().or(self.config.tree_id.as_ref())
    }

    /// Fails if `node` belongs to a partition other than this manager's.
    pub(crate) fn check_partition(&self, node: &NodeRef) -> CanopyResult<()> {
        if same_partition(self.partition_of(node), self.config.tree_id.as_ref()) {
            Ok(())
        } else {
            Err(CanopyError::invalid_operation(format!(
                "{} is not part of this tree",
                node
            )))
        }
    }

    /// Submits one mutation's statements as a single atomic batch.
    pub(crate) async fn exec(&self, operation: &str, batch: Vec<Statement>) -> CanopyResult<()> {
        tracing::debug!(
            operation,
            statements = batch.len(),
            table = %self.config.table,
            "submitting statement batch"
        );
        for statement in &batch {
            tracing::trace!(sql = %statement, "batch statement");
        }

        let affected = self.driver.exec(&batch).await?;
        tracing::debug!(operation, affected, "statement batch applied");
        Ok(())
    }

    /// Reads rows and converts them to nodes.
    pub(crate) async fn fetch_nodes(&self, select: Select) -> CanopyResult<Vec<TreeNode>> {
        let statement = Statement::from(select);
        let rows = self.driver.get_rows(&statement).await?;
        rows.into_iter()
            .map(|row| TreeNode::from_row(row, &self.config.fields, self.is_multi_tree()))
            .collect()
    }

    /// Reads at most one node.
    pub(crate) async fn fetch_node(&self, select: Select) -> CanopyResult<Option<TreeNode>> {
        Ok(self.fetch_nodes(select.limit(1)).await?.into_iter().next())
    }

    /// Counts the rows a select matches.
    pub(crate) async fn fetch_count(&self, select: Select) -> CanopyResult<i64> {
        let statement = Statement::from(select.count());
        let value = self.driver.get_scalar(&statement).await?;
        if value.is_null() {
            return Ok(0);
        }
        i64::from_value(&value).ok_or_else(|| CanopyError::TypeMismatch {
            expected: i64::type_name().to_string(),
            actual: value.type_name().to_string(),
        })
    }
}

/// Compares partition keys; two absent keys are the same partition.
pub(crate) fn same_partition(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.sql_eq(b),
        _ => false,
    }
}

/// An open write scope.
///
/// Every mutating operation lives here, so calling one without holding the
/// scope does not compile. Dropping the scope releases the gate.
pub struct WriteScope<'m, D: StorageDriver> {
    manager: &'m TreeManager<D>,
}

impl<'m, D: StorageDriver> WriteScope<'m, D> {
    /// Returns the manager, for reads inside the scope.
    pub fn tree(&self) -> &'m TreeManager<D> {
        self.manager
    }

    /// Creates the root of an empty tree.
    pub async fn create_root(&mut self, node: NewNode) -> CanopyResult<TreeNode> {
        self.manager.create_root(node).await
    }

    /// Inserts `nodes` at `position` relative to `reference` (the root when
    /// `None`), in the given order.
    pub async fn add_nodes(
        &mut self,
        nodes: Vec<NewNode>,
        reference: Option<NodeRef>,
        position: NodePosition,
    ) -> CanopyResult<()> {
        self.manager.add_nodes(nodes, reference, position).await
    }

    /// Inserts one node and returns it as stored.
    pub async fn add_node(
        &mut self,
        node: NewNode,
        reference: Option<NodeRef>,
        position: NodePosition,
    ) -> CanopyResult<TreeNode> {
        let id = NodeRef::id(node.id.clone());
        self.manager.add_nodes(vec![node], reference, position).await?;
        self.manager.require_node(&id).await
    }

    /// Deletes a node and its subtree; `only_mark` keeps the rows with
    /// negated bounds.
    pub async fn delete_node(
        &mut self,
        node: impl Into<NodeRef>,
        only_mark: bool,
    ) -> CanopyResult<()> {
        self.manager.delete_node(&node.into(), only_mark).await
    }

    /// Moves a node and its subtree to `position` relative to `target`.
    pub async fn move_node(
        &mut self,
        node: impl Into<NodeRef>,
        target: impl Into<NodeRef>,
        position: NodePosition,
    ) -> CanopyResult<()> {
        self.manager
            .move_node(&node.into(), &target.into(), position)
            .await
    }

    /// Moves a node one place up among its siblings.
    pub async fn move_up_node(&mut self, node: impl Into<NodeRef>) -> CanopyResult<()> {
        self.manager.move_up_node(&node.into()).await
    }

    /// Moves a node one place down among its siblings.
    pub async fn move_down_node(&mut self, node: impl Into<NodeRef>) -> CanopyResult<()> {
        self.manager.move_down_node(&node.into()).await
    }
}

impl<D: StorageDriver> Drop for WriteScope<'_, D> {
    fn drop(&mut self) {
        self.manager.writing.store(false, Ordering::SeqCst);
        tracing::info!(table = %self.manager.config.table, "write scope closed");
    }
}
