//! Read primitives.
//!
//! Every read is restricted to live nodes (positive bounds) of the
//! manager's partition, and every lookup taking a node re-reads it by id
//! first.

use canopy_client::driver::StorageDriver;
use canopy_client::query::col;
use canopy_common::config::is_identifier;
use canopy_common::constants::ROOT_LEFT;
use canopy_common::{CanopyError, CanopyResult, Value};

use crate::manager::TreeManager;
use crate::node::{NodeRef, TreeNode};

impl<D: StorageDriver> TreeManager<D> {
    /// Reads a live node by reference.
    pub async fn get_node(&self, node: impl Into<NodeRef>) -> CanopyResult<Option<TreeNode>> {
        let node = node.into();
        self.check_partition(&node)?;
        let fields = self.planner().fields();
        self.fetch_node(self.planner().select_live().filter(col(&fields.id).eq(node.id)))
            .await
    }

    /// Reads a live node, failing with `NotFound` if it is absent.
    pub(crate) async fn require_node(&self, node: &NodeRef) -> CanopyResult<TreeNode> {
        self.get_node(node)
            .await?
            .ok_or_else(|| CanopyError::not_found(node.to_string()))
    }

    /// Reads live nodes by id, in bound order. Unknown ids are skipped.
    pub async fn get_nodes(&self, ids: &[Value]) -> CanopyResult<Vec<TreeNode>> {
        let fields = self.planner().fields();
        self.fetch_nodes(
            self.planner()
                .select_live()
                .filter(col(&fields.id).in_list(ids.iter().cloned()))
                .order_by(&fields.left),
        )
        .await
    }

    /// Finds the first live node, in bound order, whose `column` equals
    /// `value`.
    pub async fn find_node(
        &self,
        column: &str,
        value: impl Into<Value>,
    ) -> CanopyResult<Option<TreeNode>> {
        Ok(self.find_nodes(column, value).await?.into_iter().next())
    }

    /// Finds every live node whose `column` equals `value`, in bound order.
    pub async fn find_nodes(
        &self,
        column: &str,
        value: impl Into<Value>,
    ) -> CanopyResult<Vec<TreeNode>> {
        if !is_identifier(column) {
            return Err(CanopyError::invalid_argument(format!(
                "'{}' is not a valid column name",
                column
            )));
        }
        let fields = self.planner().fields();
        self.fetch_nodes(
            self.planner()
                .select_live()
                .filter(col(column).eq(value.into()))
                .order_by(&fields.left),
        )
        .await
    }

    /// Reads the root.
    pub async fn get_root(&self) -> CanopyResult<Option<TreeNode>> {
        let fields = self.planner().fields();
        self.fetch_node(
            self.planner()
                .select_live()
                .filter(col(&fields.left).eq(ROOT_LEFT)),
        )
        .await
    }

    /// Returns true if the tree has a root.
    pub async fn has_root(&self) -> CanopyResult<bool> {
        Ok(self.get_root().await?.is_some())
    }

    /// Reads the direct children of a node, in order.
    pub async fn get_children(&self, node: impl Into<NodeRef>) -> CanopyResult<Vec<TreeNode>> {
        let node = self.require_node(&node.into()).await?;
        let fields = self.planner().fields();
        self.fetch_nodes(
            self.planner()
                .select_live()
                .filter(col(&fields.left).gt(node.left))
                .filter(col(&fields.right).lt(node.right))
                .filter(col(&fields.level).eq(node.level + 1))
                .order_by(&fields.left),
        )
        .await
    }

    /// Reads the descendants of a node in preorder.
    ///
    /// `depth` limits the result to descendants at most that many levels
    /// below the node; `include_self` puts the node itself first.
    pub async fn get_descendants(
        &self,
        node: impl Into<NodeRef>,
        include_self: bool,
        depth: Option<i64>,
    ) -> CanopyResult<Vec<TreeNode>> {
        let node = self.require_node(&node.into()).await?;
        let fields = self.planner().fields();

        let mut select = self.planner().select_live();
        select = if include_self {
            select
                .filter(col(&fields.left).ge(node.left))
                .filter(col(&fields.right).le(node.right))
        } else {
            select
                .filter(col(&fields.left).gt(node.left))
                .filter(col(&fields.right).lt(node.right))
        };
        if let Some(depth) = depth {
            select = select.filter(col(&fields.level).le(node.level + depth));
        }

        self.fetch_nodes(select.order_by(&fields.left)).await
    }

    /// Counts the descendants of a node.
    pub async fn get_descendants_count(&self, node: impl Into<NodeRef>) -> CanopyResult<i64> {
        let node = self.require_node(&node.into()).await?;
        let fields = self.planner().fields();
        self.fetch_count(
            self.planner()
                .select_live()
                .filter(col(&fields.left).gt(node.left))
                .filter(col(&fields.right).lt(node.right)),
        )
        .await
    }

    /// Reads the ancestors of a node, root first.
    pub async fn get_ancestors(&self, node: impl Into<NodeRef>) -> CanopyResult<Vec<TreeNode>> {
        let node = self.require_node(&node.into()).await?;
        let fields = self.planner().fields();
        self.fetch_nodes(
            self.planner()
                .select_live()
                .filter(col(&fields.left).lt(node.left))
                .filter(col(&fields.right).gt(node.right))
                .order_by(&fields.left),
        )
        .await
    }

    /// Counts the ancestors of a node.
    pub async fn get_ancestors_count(&self, node: impl Into<NodeRef>) -> CanopyResult<i64> {
        let node = self.require_node(&node.into()).await?;
        let fields = self.planner().fields();
        self.fetch_count(
            self.planner()
                .select_live()
                .filter(col(&fields.left).lt(node.left))
                .filter(col(&fields.right).gt(node.right)),
        )
        .await
    }

    /// Reads the immediate parent: the nearest enclosing interval.
    pub async fn get_parent(&self, node: impl Into<NodeRef>) -> CanopyResult<Option<TreeNode>> {
        let node = self.require_node(&node.into()).await?;
        self.parent_of(&node).await
    }

    pub(crate) async fn parent_of(&self, node: &TreeNode) -> CanopyResult<Option<TreeNode>> {
        let fields = self.planner().fields();
        self.fetch_node(
            self.planner()
                .select_live()
                .filter(col(&fields.left).lt(node.left))
                .filter(col(&fields.right).gt(node.right))
                .order_by_desc(&fields.left),
        )
        .await
    }

    /// Reads the other children of the node's parent, in order. The root
    /// has no siblings.
    pub async fn get_siblings(
        &self,
        node: impl Into<NodeRef>,
        include_self: bool,
    ) -> CanopyResult<Vec<TreeNode>> {
        let node = self.require_node(&node.into()).await?;
        let Some(parent) = self.parent_of(&node).await? else {
            return Ok(if include_self { vec![node] } else { Vec::new() });
        };

        let children = self.get_children(&parent).await?;
        Ok(children
            .into_iter()
            .filter(|child| include_self || !child.id.sql_eq(&node.id))
            .collect())
    }

    /// Reads the sibling directly after a node.
    pub async fn get_next_sibling(
        &self,
        node: impl Into<NodeRef>,
    ) -> CanopyResult<Option<TreeNode>> {
        let node = self.require_node(&node.into()).await?;
        let fields = self.planner().fields();
        self.fetch_node(
            self.planner()
                .select_live()
                .filter(col(&fields.left).eq(node.right + 1))
                .filter(col(&fields.level).eq(node.level)),
        )
        .await
    }

    /// Reads the sibling directly before a node.
    pub async fn get_previous_sibling(
        &self,
        node: impl Into<NodeRef>,
    ) -> CanopyResult<Option<TreeNode>> {
        let node = self.require_node(&node.into()).await?;
        let fields = self.planner().fields();
        self.fetch_node(
            self.planner()
                .select_live()
                .filter(col(&fields.right).eq(node.left - 1))
                .filter(col(&fields.level).eq(node.level)),
        )
        .await
    }

    /// Reads the whole tree in bound order.
    pub async fn get_all_nodes(&self) -> CanopyResult<Vec<TreeNode>> {
        let fields = self.planner().fields();
        self.fetch_nodes(self.planner().select_live().order_by(&fields.left))
            .await
    }

    /// Reads the soft-deleted rows kept for audit, in the order of their
    /// original bounds.
    pub async fn get_marked_nodes(&self) -> CanopyResult<Vec<TreeNode>> {
        let fields = self.planner().fields();
        self.fetch_nodes(self.planner().select_marked().order_by_desc(&fields.left))
            .await
    }

    /// Counts the live nodes of the tree.
    pub async fn get_node_count(&self) -> CanopyResult<i64> {
        self.fetch_count(self.planner().select_live()).await
    }

    /// Returns true if any row of the partition, live or soft-deleted,
    /// already uses one of `ids`.
    pub(crate) async fn any_id_exists(&self, ids: &[Value]) -> CanopyResult<bool> {
        let fields = self.planner().fields();
        let count = self
            .fetch_count(
                self.planner()
                    .select_any()
                    .filter(col(&fields.id).in_list(ids.iter().cloned())),
            )
            .await?;
        Ok(count > 0)
    }
}
