//! Typed positions in a query graph.

use core::fmt;
use core::hash::{Hash, Hasher};
use core::sync::atomic::{AtomicU64, Ordering};
use std::rc::Rc;
use trellis_core::Type;

/// Unique identifier for a node.
pub type NodeId = u64;

/// Global node ID counter for generating unique node IDs.
static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(0);

fn next_node_id() -> NodeId {
    NEXT_NODE_ID.fetch_add(1, Ordering::SeqCst)
}

#[derive(Debug)]
struct NodeInner {
    id: NodeId,
    label: String,
    input_type: Type,
    output_type: Type,
    is_result: bool,
}

/// A named, typed position in a query graph.
///
/// Nodes compare by identity: two nodes created separately are different even
/// if they share a label and types. Clones refer to the same node and can be
/// shared between queries.
#[derive(Clone)]
pub struct Node(Rc<NodeInner>);

impl Node {
    /// Creates a node whose input and output types are the same.
    pub fn new(label: impl Into<String>, item_type: Type) -> Self {
        Self::with_types(label, item_type.clone(), item_type)
    }

    /// Creates a node with distinct input and output types.
    pub fn with_types(label: impl Into<String>, input_type: Type, output_type: Type) -> Self {
        Self::build(label.into(), input_type, output_type, false)
    }

    /// Creates a result node, one of the output positions of a query.
    pub fn result(label: impl Into<String>, item_type: Type) -> Self {
        Self::build(label.into(), item_type.clone(), item_type, true)
    }

    fn build(label: String, input_type: Type, output_type: Type, is_result: bool) -> Self {
        Node(Rc::new(NodeInner {
            id: next_node_id(),
            label,
            input_type,
            output_type,
            is_result,
        }))
    }

    /// Returns the node ID.
    #[inline]
    pub fn id(&self) -> NodeId {
        self.0.id
    }

    /// Returns the diagnostic label.
    #[inline]
    pub fn label(&self) -> &str {
        &self.0.label
    }

    /// Returns the type of items that may arrive at this node.
    #[inline]
    pub fn input_type(&self) -> &Type {
        &self.0.input_type
    }

    /// Returns the type of items that leave this node.
    #[inline]
    pub fn output_type(&self) -> &Type {
        &self.0.output_type
    }

    /// Returns true if this is a result node.
    #[inline]
    pub fn is_result(&self) -> bool {
        self.0.is_result
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({}#{})", self.0.label, self.0.id)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.label)
    }
}
