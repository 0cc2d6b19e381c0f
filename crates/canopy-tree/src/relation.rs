//! Relation classification.

use std::fmt;

use serde::{Deserialize, Serialize};

use canopy_client::driver::StorageDriver;
use canopy_client::query::col;
use canopy_common::{CanopyError, CanopyResult};

use crate::manager::{same_partition, TreeManager};
use crate::node::{NodeRef, TreeNode};

/// How a node relates to another node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeRelation {
    /// Both refer to the same node.
    SelfNode,
    /// The first node lies inside the second.
    Descendants,
    /// The first node encloses the second.
    Ancestors,
    /// Both share the same parent.
    Siblings,
    /// Different parents, same depth.
    SameLevel,
    /// Same partition, otherwise unrelated.
    SameTree,
    /// Different partitions.
    DifferentTree,
    /// At least one node is soft-deleted.
    Unknown,
}

impl fmt::Display for NodeRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeRelation::SelfNode => "self",
            NodeRelation::Descendants => "descendants",
            NodeRelation::Ancestors => "ancestors",
            NodeRelation::Siblings => "siblings",
            NodeRelation::SameLevel => "same level",
            NodeRelation::SameTree => "same tree",
            NodeRelation::DifferentTree => "different tree",
            NodeRelation::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Classifies by bounds alone; `None` means the parents must be compared.
fn classify_by_bounds(a: &TreeNode, b: &TreeNode) -> Option<NodeRelation> {
    if a.is_marked() || b.is_marked() {
        return Some(NodeRelation::Unknown);
    }
    if a.id.sql_eq(&b.id) {
        return Some(NodeRelation::SelfNode);
    }
    if b.contains(a) {
        return Some(NodeRelation::Descendants);
    }
    if a.contains(b) {
        return Some(NodeRelation::Ancestors);
    }
    None
}

impl<D: StorageDriver> TreeManager<D> {
    /// Classifies how node `a` relates to node `b`.
    ///
    /// Checks run in a fixed order: partition, identity, containment, and
    /// only then the parent lookups. Fails with `NotFound` if a node does
    /// not exist at all; soft-deleted nodes yield `Unknown`.
    pub async fn get_node_relation(
        &self,
        a: impl Into<NodeRef>,
        b: impl Into<NodeRef>,
    ) -> CanopyResult<NodeRelation> {
        let (a, b) = (a.into(), b.into());
        if !same_partition(self.partition_of(&a), self.partition_of(&b)) {
            return Ok(NodeRelation::DifferentTree);
        }

        let a = self.require_row(&a).await?;
        let b = self.require_row(&b).await?;
        if let Some(relation) = classify_by_bounds(&a, &b) {
            return Ok(relation);
        }

        let parent_a = self.parent_of(&a).await?;
        let parent_b = self.parent_of(&b).await?;
        let relation = match (parent_a, parent_b) {
            (Some(pa), Some(pb)) if pa.id.sql_eq(&pb.id) => NodeRelation::Siblings,
            _ if a.level == b.level => NodeRelation::SameLevel,
            _ => NodeRelation::SameTree,
        };
        Ok(relation)
    }

    /// Reads a node whether live or soft-deleted.
    async fn require_row(&self, node: &NodeRef) -> CanopyResult<TreeNode> {
        self.check_partition(node)?;
        let fields = self.planner().fields();
        self.fetch_node(
            self.planner()
                .select_any()
                .filter(col(&fields.id).eq(node.id.clone())),
        )
        .await?
        .ok_or_else(|| CanopyError::not_found(node.to_string()))
    }
}
