//! Bound arithmetic.
//!
//! Pure functions computing where bounds move when room is opened for new
//! nodes, when a subtree is removed, and when a detached subtree is put
//! back. Nothing here touches storage; the statement planner turns the
//! results into range updates.

use crate::position::NodePosition;

/// The `(left, right, level)` triple of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    /// Left bound.
    pub left: i64,
    /// Right bound.
    pub right: i64,
    /// Depth.
    pub level: i64,
}

impl Bounds {
    /// Creates a bounds triple.
    pub fn new(left: i64, right: i64, level: i64) -> Self {
        Self { left, right, level }
    }

    /// Number of bound values the subtree occupies: `right - left + 1`.
    pub fn width(&self) -> i64 {
        self.right - self.left + 1
    }

    /// Returns true if `other` lies strictly inside these bounds.
    pub fn contains(&self, other: &Bounds) -> bool {
        self.left < other.left && other.right < self.right
    }
}

/// Lower edge of a range shift for one bound column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Threshold {
    /// Shift values equal to `value` as well.
    pub inclusive: bool,
    /// Edge value.
    pub value: i64,
}

impl Threshold {
    /// `column >= value`
    pub fn at(value: i64) -> Self {
        Self {
            inclusive: true,
            value,
        }
    }

    /// `column > value`
    pub fn after(value: i64) -> Self {
        Self {
            inclusive: false,
            value,
        }
    }

    /// Returns true if a bound at `v` is shifted.
    pub fn applies(&self, v: i64) -> bool {
        if self.inclusive {
            v >= self.value
        } else {
            v > self.value
        }
    }
}

/// A pair of range updates moving every bound past a threshold by `by`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shift {
    /// Which left bounds move.
    pub left: Threshold,
    /// Which right bounds move.
    pub right: Threshold,
    /// Signed distance.
    pub by: i64,
}

impl Shift {
    /// Applies the shift to one node's bounds.
    pub fn apply(&self, bounds: Bounds) -> Bounds {
        Bounds {
            left: bounds.left + if self.left.applies(bounds.left) { self.by } else { 0 },
            right: bounds.right + if self.right.applies(bounds.right) { self.by } else { 0 },
            level: bounds.level,
        }
    }
}

/// Room opened next to a reference node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gap {
    /// Range shift that opens the room. Must run before anything is
    /// written into the gap.
    pub shift: Shift,
    /// First bound value inside the gap.
    pub start: i64,
    /// Level of nodes placed at the top of the gap.
    pub level: i64,
}

impl Gap {
    /// Bounds of the `index`-th 2-wide leaf placed into the gap.
    pub fn leaf(&self, index: usize) -> Bounds {
        let left = self.start + 2 * index as i64;
        Bounds::new(left, left + 1, self.level)
    }
}

/// Computes the gap for `width` bound values at `position` relative to
/// `reference`, using the reference's current (pre-shift) bounds.
pub fn open_gap(reference: Bounds, position: NodePosition, width: i64) -> Gap {
    let Bounds { left, right, level } = reference;

    let (left_edge, right_edge, start, level) = match position {
        NodePosition::LastChild => (Threshold::at(right), Threshold::at(right), right, level + 1),
        NodePosition::FirstChild => (
            Threshold::after(left),
            Threshold::at(left + 1),
            left + 1,
            level + 1,
        ),
        NodePosition::NextSibling => {
            (Threshold::after(right), Threshold::after(right), right + 1, level)
        }
        NodePosition::PreviousSibling => (Threshold::at(left), Threshold::at(left), left, level),
    };

    Gap {
        shift: Shift {
            left: left_edge,
            right: right_edge,
            by: width,
        },
        start,
        level,
    }
}

/// Computes the compaction shift after the subtree at `removed` is taken
/// out of the positive bound space.
pub fn close_gap(removed: Bounds) -> Shift {
    Shift {
        left: Threshold::after(removed.right),
        right: Threshold::after(removed.right),
        by: -removed.width(),
    }
}

/// Translation applied to a detached (negated) subtree to land it in a gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    /// New bound is `delta - negated_bound`.
    pub delta: i64,
    /// Added to every level of the subtree.
    pub level_delta: i64,
}

/// Computes how the detached subtree originally at `source` maps into `gap`.
pub fn relocate(source: Bounds, gap: &Gap) -> Relocation {
    Relocation {
        delta: gap.start - source.left,
        level_delta: gap.level - source.level,
    }
}
