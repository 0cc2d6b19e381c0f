//! Subtree deletion.

use canopy_client::driver::StorageDriver;
use canopy_common::CanopyResult;

use crate::manager::TreeManager;
use crate::node::NodeRef;

impl<D: StorageDriver> TreeManager<D> {
    pub(crate) async fn delete_node(&self, node: &NodeRef, only_mark: bool) -> CanopyResult<()> {
        let target = self.require_node(node).await?;
        let batch = self.planner().plan_delete(target.bounds(), only_mark);

        tracing::debug!(
            node = %target.id,
            descendants = target.descendant_count(),
            only_mark,
            "deleting subtree"
        );
        self.exec(if only_mark { "mark_deleted" } else { "delete_node" }, batch)
            .await
    }
}
