//! Placement of new or moved nodes relative to a reference node.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a node goes relative to its reference node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NodePosition {
    /// After the reference's existing children.
    #[default]
    LastChild,
    /// Before the reference's existing children.
    FirstChild,
    /// Directly after the reference, at the same level.
    NextSibling,
    /// Directly before the reference, at the same level.
    PreviousSibling,
}

impl NodePosition {
    /// Returns true for the child positions.
    pub fn is_child(&self) -> bool {
        matches!(self, NodePosition::LastChild | NodePosition::FirstChild)
    }

    /// Returns true for the sibling positions, which a root cannot take.
    pub fn is_sibling(&self) -> bool {
        !self.is_child()
    }
}

impl fmt::Display for NodePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodePosition::LastChild => write!(f, "last child"),
            NodePosition::FirstChild => write!(f, "first child"),
            NodePosition::NextSibling => write!(f, "next sibling"),
            NodePosition::PreviousSibling => write!(f, "previous sibling"),
        }
    }
}
