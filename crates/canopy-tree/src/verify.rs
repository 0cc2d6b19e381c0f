//! Nested-set invariant verification.

use canopy_client::driver::StorageDriver;
use canopy_common::constants::{ROOT_LEFT, ROOT_LEVEL};
use canopy_common::{CanopyError, CanopyResult};

use crate::manager::TreeManager;
use crate::node::TreeNode;

/// Checks that `nodes` form one well-formed nested-set tree.
///
/// Walks the nodes in bound order with a stack of open ancestors and stops
/// at the first violation. Bounds must be contiguous starting at the root's
/// `1`, widths odd, every node strictly inside its parent at exactly one
/// level deeper. An empty list is a valid (empty) tree.
pub fn verify_nodes(nodes: &[TreeNode]) -> CanopyResult<()> {
    let mut ordered: Vec<&TreeNode> = nodes.iter().collect();
    ordered.sort_by_key(|n| n.left);

    let mut open: Vec<&TreeNode> = Vec::new();
    // Highest bound value consumed so far.
    let mut cursor = ROOT_LEFT - 1;

    for (i, node) in ordered.iter().copied().enumerate() {
        if i == 0 && !(node.left == ROOT_LEFT && node.level == ROOT_LEVEL) {
            return Err(CanopyError::verify(
                &node.id,
                format!("first node must be the root at [{}, ..] level {}", ROOT_LEFT, ROOT_LEVEL),
            ));
        }

        while let Some(top) = open.last() {
            if top.right >= node.left {
                break;
            }
            close(top, cursor)?;
            cursor = top.right;
            open.pop();
        }

        if node.left != cursor + 1 {
            return Err(CanopyError::verify(
                &node.id,
                format!("left bound {} where {} was expected", node.left, cursor + 1),
            ));
        }

        if i > 0 {
            let Some(parent) = open.last() else {
                return Err(CanopyError::verify(&node.id, "node lies outside the root"));
            };
            if node.level != parent.level + 1 {
                return Err(CanopyError::verify(
                    &node.id,
                    format!(
                        "level {} under parent {} at level {}",
                        node.level, parent.id, parent.level
                    ),
                ));
            }
            if node.right >= parent.right {
                return Err(CanopyError::verify(
                    &node.id,
                    format!("right bound {} escapes parent {}", node.right, parent.id),
                ));
            }
        }

        let width = node.right - node.left;
        if width <= 0 {
            return Err(CanopyError::verify(&node.id, "left bound is not below right bound"));
        }
        if width % 2 == 0 {
            return Err(CanopyError::verify(
                &node.id,
                format!("even width {}", width),
            ));
        }

        if width == 1 {
            cursor = node.right;
        } else {
            cursor = node.left;
            open.push(node);
        }
    }

    while let Some(top) = open.pop() {
        close(top, cursor)?;
        cursor = top.right;
    }

    Ok(())
}

/// An ancestor closes right after its last descendant.
fn close(node: &TreeNode, cursor: i64) -> CanopyResult<()> {
    if node.right != cursor + 1 {
        return Err(CanopyError::verify(
            &node.id,
            format!(
                "right bound {} where {} was expected",
                node.right,
                cursor + 1
            ),
        ));
    }
    Ok(())
}

impl<D: StorageDriver> TreeManager<D> {
    /// Verifies the whole tree. Fails with a verification error naming the
    /// first offending node.
    pub async fn verify(&self) -> CanopyResult<()> {
        let nodes = self.get_all_nodes().await?;
        verify_nodes(&nodes).map_err(|e| {
            tracing::warn!(table = %self.config().table, error = %e, "tree verification failed");
            e
        })
    }
}
