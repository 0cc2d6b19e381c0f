//! Root creation and insertion.

use canopy_client::driver::StorageDriver;
use canopy_common::constants::MAX_BATCH_NODES;
use canopy_common::{CanopyError, CanopyResult, Value};

use crate::bounds;
use crate::manager::TreeManager;
use crate::node::{NewNode, NodeRef, TreeNode};
use crate::position::NodePosition;

impl<D: StorageDriver> TreeManager<D> {
    pub(crate) async fn create_root(&self, node: NewNode) -> CanopyResult<TreeNode> {
        if self.has_root().await? {
            return Err(CanopyError::invalid_operation("tree already has a root"));
        }
        self.check_new_ids(std::slice::from_ref(&node)).await?;

        let id = NodeRef::id(node.id.clone());
        let statement = self.planner().plan_root(&node)?;
        self.exec("create_root", vec![statement]).await?;

        tracing::info!(table = %self.config().table, root = %node.id, "root created");
        self.require_node(&id).await
    }

    pub(crate) async fn add_nodes(
        &self,
        nodes: Vec<NewNode>,
        reference: Option<NodeRef>,
        position: NodePosition,
    ) -> CanopyResult<()> {
        if nodes.is_empty() {
            return Ok(());
        }
        if nodes.len() > MAX_BATCH_NODES {
            return Err(CanopyError::invalid_argument(format!(
                "cannot add {} nodes at once (limit {})",
                nodes.len(),
                MAX_BATCH_NODES
            )));
        }

        let reference = match reference {
            Some(reference) => self.require_node(&reference).await?,
            None => self
                .get_root()
                .await?
                .ok_or_else(|| CanopyError::not_found("root node"))?,
        };
        if reference.is_root() && position.is_sibling() {
            return Err(CanopyError::invalid_operation(format!(
                "the root cannot take a {}",
                position
            )));
        }

        self.check_new_ids(&nodes).await?;

        let width = 2 * nodes.len() as i64;
        let gap = bounds::open_gap(reference.bounds(), position, width);
        let batch = self.planner().plan_add(&nodes, &gap)?;
        self.exec("add_nodes", batch).await
    }

    /// Rejects ids repeated within `nodes` or already used in the partition.
    async fn check_new_ids(&self, nodes: &[NewNode]) -> CanopyResult<()> {
        let mut ids: Vec<Value> = Vec::with_capacity(nodes.len());
        for node in nodes {
            if node.id.is_null() {
                return Err(CanopyError::invalid_argument("node id must not be null"));
            }
            if ids.iter().any(|id| id.sql_eq(&node.id)) {
                return Err(CanopyError::invalid_operation(format!(
                    "node id {} appears more than once",
                    node.id
                )));
            }
            ids.push(node.id.clone());
        }

        if self.any_id_exists(&ids).await? {
            return Err(CanopyError::invalid_operation(
                "a node with one of the given ids already exists",
            ));
        }
        Ok(())
    }
}
