//! Node records.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use canopy_client::Row;
use canopy_common::constants::{ROOT_LEFT, ROOT_LEVEL};
use canopy_common::{CanopyError, CanopyResult, FieldNames, Value};

use crate::bounds::Bounds;

/// A node as stored in the tree table.
///
/// A `TreeNode` is a snapshot: every later mutation elsewhere in the tree
/// may move its bounds, so operations taking a node only use its id (and
/// partition) and re-read the row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Node identifier.
    pub id: Value,
    /// Partition key, in multi-tree mode.
    pub tree_id: Option<Value>,
    /// Display name.
    pub name: Value,
    /// Depth; the root is at level 0.
    pub level: i64,
    /// Left bound. Negative once the node is soft-deleted.
    pub left: i64,
    /// Right bound. Negative once the node is soft-deleted.
    pub right: i64,
    /// Remaining payload columns.
    pub fields: BTreeMap<String, Value>,
}

impl TreeNode {
    /// Builds a node from a table row.
    pub fn from_row(mut row: Row, names: &FieldNames, multi_tree: bool) -> CanopyResult<Self> {
        let level = row.try_get::<i64>(&names.level)?;
        let left = row.try_get::<i64>(&names.left)?;
        let right = row.try_get::<i64>(&names.right)?;

        let id = row
            .take(&names.id)
            .ok_or_else(|| CanopyError::ColumnNotFound {
                column: names.id.clone(),
            })?;
        let tree_id = if multi_tree {
            row.take(&names.tree_id)
        } else {
            None
        };
        let name = row.take(&names.name).unwrap_or(Value::Null);

        row.take(&names.level);
        row.take(&names.left);
        row.take(&names.right);

        Ok(Self {
            id,
            tree_id,
            name,
            level,
            left,
            right,
            fields: row.into_iter().collect(),
        })
    }

    /// Returns the bounds triple.
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.left, self.right, self.level)
    }

    /// Returns true for the root of a partition.
    pub fn is_root(&self) -> bool {
        self.left == ROOT_LEFT && self.level == ROOT_LEVEL
    }

    /// Returns true if the node has no descendants.
    pub fn is_leaf(&self) -> bool {
        (self.right - self.left).abs() == 1
    }

    /// Returns true if the node was soft-deleted.
    pub fn is_marked(&self) -> bool {
        self.left < 0
    }

    /// Number of descendants, derived from the bounds.
    pub fn descendant_count(&self) -> i64 {
        ((self.right - self.left).abs() - 1) / 2
    }

    /// Returns true if `other` is a descendant of this node.
    pub fn contains(&self, other: &TreeNode) -> bool {
        self.bounds().contains(&other.bounds())
    }

    /// Returns a payload field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

impl fmt::Display for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}, {}] @{}",
            self.id, self.left, self.right, self.level
        )
    }
}

/// A node to be inserted.
///
/// # Example
///
/// ```rust
/// use canopy_tree::NewNode;
///
/// let node = NewNode::new(7).with_name("Books").with_field("slug", "books");
/// assert_eq!(node.fields.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NewNode {
    /// Node identifier; must be unique within the partition.
    pub id: Value,
    /// Display name.
    pub name: Value,
    /// Payload columns.
    pub fields: BTreeMap<String, Value>,
}

impl NewNode {
    /// Creates a node with the given id.
    pub fn new(id: impl Into<Value>) -> Self {
        Self {
            id: id.into(),
            name: Value::Null,
            fields: BTreeMap::new(),
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<Value>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets a payload column.
    #[must_use]
    pub fn with_field(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(column.into(), value.into());
        self
    }
}

/// A reference to an existing node: its id and, in multi-tree mode, its
/// partition.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRef {
    /// Node identifier.
    pub id: Value,
    /// Partition of the node, when known.
    pub tree_id: Option<Value>,
}

impl NodeRef {
    /// References a node by id in the manager's own partition.
    pub fn id(id: impl Into<Value>) -> Self {
        Self {
            id: id.into(),
            tree_id: None,
        }
    }

    /// References a node in an explicit partition.
    pub fn in_tree(id: impl Into<Value>, tree_id: impl Into<Value>) -> Self {
        Self {
            id: id.into(),
            tree_id: Some(tree_id.into()),
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tree_id {
            Some(tree_id) => write!(f, "node {} in tree {}", self.id, tree_id),
            None => write!(f, "node {}", self.id),
        }
    }
}

impl From<&TreeNode> for NodeRef {
    fn from(node: &TreeNode) -> Self {
        Self {
            id: node.id.clone(),
            tree_id: node.tree_id.clone(),
        }
    }
}

impl From<&NodeRef> for NodeRef {
    fn from(node: &NodeRef) -> Self {
        node.clone()
    }
}

impl From<Value> for NodeRef {
    fn from(id: Value) -> Self {
        Self::id(id)
    }
}

impl From<i64> for NodeRef {
    fn from(id: i64) -> Self {
        Self::id(id)
    }
}

impl From<i32> for NodeRef {
    fn from(id: i32) -> Self {
        Self::id(id)
    }
}

impl From<&str> for NodeRef {
    fn from(id: &str) -> Self {
        Self::id(id)
    }
}

impl From<String> for NodeRef {
    fn from(id: String) -> Self {
        Self::id(id)
    }
}
