//! Immutable query graphs.

use crate::graph::{Arc, Node};
use crate::operation::Operation;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::sync::atomic::{AtomicU64, Ordering};
use hashbrown::{HashMap, HashSet};
use std::rc::Rc;

/// Unique identifier for a built query.
pub type QueryId = u64;

static NEXT_QUERY_ID: AtomicU64 = AtomicU64::new(0);

fn next_query_id() -> QueryId {
    NEXT_QUERY_ID.fetch_add(1, Ordering::SeqCst)
}

/// Node set, operation map and the derived arc indices.
///
/// `arcs_from`/`arcs_to` are only ever updated together with `operations`, so
/// every indexed arc has at least one operation and both endpoints in `nodes`.
/// Vectors keep insertion order so evaluation order is deterministic.
#[derive(Clone, Debug, Default)]
pub(crate) struct Graph {
    nodes: Vec<Node>,
    node_index: HashSet<Node>,
    arcs: Vec<Arc>,
    operations: HashMap<Arc, Vec<Operation>>,
    arcs_from: HashMap<Node, Vec<Arc>>,
    arcs_to: HashMap<Node, Vec<Arc>>,
}

impl Graph {
    pub(crate) fn add_node(&mut self, node: &Node) -> bool {
        if !self.node_index.insert(node.clone()) {
            return false;
        }
        self.nodes.push(node.clone());
        true
    }

    /// Adds an operation to an arc. Returns false if it was already there.
    pub(crate) fn add_operation(&mut self, arc: &Arc, operation: Operation) -> bool {
        self.add_node(arc.from());
        self.add_node(arc.to());

        match self.operations.get_mut(arc) {
            Some(ops) => {
                if ops.contains(&operation) {
                    return false;
                }
                ops.push(operation);
            }
            None => {
                self.operations.insert(arc.clone(), vec![operation]);
                self.arcs.push(arc.clone());
                self.arcs_from
                    .entry(arc.from().clone())
                    .or_default()
                    .push(arc.clone());
                self.arcs_to
                    .entry(arc.to().clone())
                    .or_default()
                    .push(arc.clone());
            }
        }
        true
    }

    pub(crate) fn remove_arc(&mut self, arc: &Arc) -> bool {
        if self.operations.remove(arc).is_none() {
            return false;
        }
        self.arcs.retain(|a| a != arc);
        Self::unindex(&mut self.arcs_from, arc.from(), arc);
        Self::unindex(&mut self.arcs_to, arc.to(), arc);
        true
    }

    pub(crate) fn remove_operation(&mut self, arc: &Arc, operation: &Operation) -> bool {
        let Some(ops) = self.operations.get_mut(arc) else {
            return false;
        };
        let before = ops.len();
        ops.retain(|op| op != operation);
        if ops.len() == before {
            return false;
        }
        if ops.is_empty() {
            self.remove_arc(arc);
        }
        true
    }

    pub(crate) fn remove_node(&mut self, node: &Node) -> bool {
        if !self.node_index.remove(node) {
            return false;
        }
        let incident: Vec<Arc> = self
            .arcs_from(node)
            .iter()
            .chain(self.arcs_to(node).iter())
            .cloned()
            .collect();
        for arc in incident {
            self.remove_arc(&arc);
        }
        self.arcs_from.remove(node);
        self.arcs_to.remove(node);
        self.nodes.retain(|n| n != node);
        true
    }

    fn unindex(index: &mut HashMap<Node, Vec<Arc>>, key: &Node, arc: &Arc) {
        if let Some(arcs) = index.get_mut(key) {
            arcs.retain(|a| a != arc);
            if arcs.is_empty() {
                index.remove(key);
            }
        }
    }

    #[inline]
    pub(crate) fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[inline]
    pub(crate) fn contains_node(&self, node: &Node) -> bool {
        self.node_index.contains(node)
    }

    #[inline]
    pub(crate) fn arcs(&self) -> &[Arc] {
        &self.arcs
    }

    pub(crate) fn arcs_from(&self, node: &Node) -> &[Arc] {
        self.arcs_from.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn arcs_to(&self, node: &Node) -> &[Arc] {
        self.arcs_to.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn operations(&self, arc: &Arc) -> &[Operation] {
        self.operations.get(arc).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// An immutable directed graph of typed nodes and labeled arcs.
///
/// Operations labeling one arc are alternatives (OR); operations on arcs in
/// sequence compose (AND). Queries are built with a
/// [`QueryBuilder`](crate::graph::QueryBuilder) and are cheap to clone.
#[derive(Clone)]
pub struct Query {
    id: QueryId,
    graph: Rc<Graph>,
}

impl Query {
    pub(crate) fn from_graph(graph: Graph) -> Self {
        Self {
            id: next_query_id(),
            graph: Rc::new(graph),
        }
    }

    pub(crate) fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Returns the query ID.
    #[inline]
    pub fn id(&self) -> QueryId {
        self.id
    }

    /// Returns all nodes in insertion order.
    pub fn nodes(&self) -> &[Node] {
        self.graph.nodes()
    }

    /// Returns true if the node belongs to this query.
    pub fn contains_node(&self, node: &Node) -> bool {
        self.graph.contains_node(node)
    }

    /// Returns all arcs in insertion order.
    pub fn arcs(&self) -> &[Arc] {
        self.graph.arcs()
    }

    /// Returns the arcs leaving a node.
    pub fn arcs_from(&self, node: &Node) -> &[Arc] {
        self.graph.arcs_from(node)
    }

    /// Returns the arcs entering a node.
    pub fn arcs_to(&self, node: &Node) -> &[Arc] {
        self.graph.arcs_to(node)
    }

    /// Returns the operations labeling an arc.
    pub fn operations(&self, arc: &Arc) -> &[Operation] {
        self.graph.operations(arc)
    }

    /// Returns the result nodes.
    pub fn result_nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes().iter().filter(|n| n.is_result())
    }

    /// Returns the number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.nodes().len()
    }

    /// Returns the number of arcs.
    pub fn arc_count(&self) -> usize {
        self.graph.arcs().len()
    }
}

impl PartialEq for Query {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Query {}

impl Hash for Query {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Query#{} ({} nodes, {} arcs)",
            self.id,
            self.node_count(),
            self.arc_count()
        )
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Nodes: {}", self.node_count())?;
        for node in self.nodes() {
            for arc in self.arcs_from(node) {
                writeln!(f, "\t{}", arc)?;
                for op in self.operations(arc) {
                    writeln!(f, "\t\t-> {}", op)?;
                }
            }
        }
        Ok(())
    }
}
