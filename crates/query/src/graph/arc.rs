//! Directed edges between nodes.

use crate::graph::Node;
use core::fmt;

/// A directed edge `(from, to)`.
///
/// Arcs are plain value identifiers; the behavior along an edge lives in the
/// operations a query attaches to it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Arc {
    from: Node,
    to: Node,
}

impl Arc {
    /// Creates an arc.
    pub fn new(from: &Node, to: &Node) -> Self {
        Self {
            from: from.clone(),
            to: to.clone(),
        }
    }

    /// Returns the source node.
    #[inline]
    pub fn from(&self) -> &Node {
        &self.from
    }

    /// Returns the target node.
    #[inline]
    pub fn to(&self) -> &Node {
        &self.to
    }

    /// Returns true if the arc starts and ends at the same node.
    #[inline]
    pub fn is_loop(&self) -> bool {
        self.from == self.to
    }

    /// Returns true if `node` is either endpoint.
    #[inline]
    pub fn touches(&self, node: &Node) -> bool {
        &self.from == node || &self.to == node
    }
}

impl fmt::Display for Arc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}
