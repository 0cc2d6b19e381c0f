//! Subtree relocation.
//!
//! A move runs as one batch: the source subtree is soft-deleted (which
//! detaches it from every positive-bound range update), the tree is
//! compacted, room is opened at the destination exactly as for an insert,
//! and the detached rows are translated back into positive bounds inside
//! that room.

use canopy_client::driver::StorageDriver;
use canopy_common::{CanopyError, CanopyResult};

use crate::bounds;
use crate::manager::{same_partition, TreeManager};
use crate::node::{NodeRef, TreeNode};
use crate::position::NodePosition;

/// Checks whether `source` may be moved to `position` relative to
/// `target`. Returns the reason when it may not.
pub(crate) fn check_move(
    source: &TreeNode,
    target: &TreeNode,
    position: NodePosition,
) -> Result<(), &'static str> {
    if source.id.sql_eq(&target.id) {
        return Err("a node cannot be moved relative to itself");
    }
    if source.contains(target) {
        return Err("a node cannot be moved into its own subtree");
    }
    if target.is_root() && position.is_sibling() {
        return Err("the root cannot have siblings");
    }
    Ok(())
}

impl<D: StorageDriver> TreeManager<D> {
    /// Returns true if `node` can be moved to `position` relative to
    /// `target`.
    ///
    /// Nodes of different partitions can never be moved onto each other.
    /// Fails with `NotFound` if either node is absent.
    pub async fn can_move_to(
        &self,
        node: impl Into<NodeRef>,
        target: impl Into<NodeRef>,
        position: NodePosition,
    ) -> CanopyResult<bool> {
        let (node, target) = (node.into(), target.into());
        if !same_partition(self.partition_of(&node), self.partition_of(&target)) {
            return Ok(false);
        }

        let source = self.require_node(&node).await?;
        let target = self.require_node(&target).await?;
        Ok(check_move(&source, &target, position).is_ok())
    }

    pub(crate) async fn move_node(
        &self,
        node: &NodeRef,
        target: &NodeRef,
        position: NodePosition,
    ) -> CanopyResult<()> {
        if !same_partition(self.partition_of(node), self.partition_of(target)) {
            return Err(CanopyError::invalid_operation(format!(
                "cannot move {} into another tree",
                node
            )));
        }

        let source = self.require_node(node).await?;
        let target = self.require_node(target).await?;
        check_move(&source, &target, position).map_err(CanopyError::invalid_operation)?;

        let subtree_ids = self
            .get_descendants(&source, true, None)
            .await?
            .into_iter()
            .map(|n| n.id)
            .collect();

        // Where the target sits once the source is out of the way.
        let detached = bounds::close_gap(source.bounds()).apply(target.bounds());
        let gap = bounds::open_gap(detached, position, source.bounds().width());
        let batch = self
            .planner()
            .plan_move(source.bounds(), subtree_ids, &gap);

        tracing::debug!(
            node = %source.id,
            target = %target.id,
            %position,
            "moving subtree"
        );
        self.exec("move_node", batch).await
    }

    /// Moves a node before its previous sibling or, at the start of its
    /// parent, after the parent.
    pub(crate) async fn move_up_node(&self, node: &NodeRef) -> CanopyResult<()> {
        let current = self.require_node(node).await?;
        match self.get_previous_sibling(&current).await? {
            Some(sibling) => {
                self.move_node(node, &NodeRef::from(&sibling), NodePosition::PreviousSibling)
                    .await
            }
            None => self.move_out_of_parent(&current, "up").await,
        }
    }

    /// Moves a node after its next sibling or, at the end of its parent,
    /// after the parent.
    pub(crate) async fn move_down_node(&self, node: &NodeRef) -> CanopyResult<()> {
        let current = self.require_node(node).await?;
        match self.get_next_sibling(&current).await? {
            Some(sibling) => {
                self.move_node(node, &NodeRef::from(&sibling), NodePosition::NextSibling)
                    .await
            }
            None => self.move_out_of_parent(&current, "down").await,
        }
    }

    /// Makes `node` the next sibling of its parent. Fails at the top level,
    /// where the parent is the root.
    async fn move_out_of_parent(&self, node: &TreeNode, direction: &str) -> CanopyResult<()> {
        let parent = self.parent_of(node).await?.ok_or_else(|| {
            CanopyError::invalid_operation(format!("the root cannot be moved {}", direction))
        })?;
        if parent.is_root() {
            return Err(CanopyError::invalid_operation(format!(
                "node {} cannot be moved further {}",
                node.id, direction
            )));
        }

        self.move_node(
            &NodeRef::from(node),
            &NodeRef::from(&parent),
            NodePosition::NextSibling,
        )
        .await
    }
}
