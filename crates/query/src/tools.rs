//! Free-function entry points.
//!
//! Each call runs on a fresh [`Evaluator`]; own an evaluator to keep its
//! cache across calls.

use crate::executor::Evaluator;
use crate::graph::{Arc, Node, Query, QueryBuilder};
use crate::operation::Filter;
use crate::optimizer::Optimizer;
use trellis_core::{Item, Queryable, Result, Type};

pub use trellis_core::{create_queryable, create_singleton, intersection, subtraction, union};

/// Selects the items reachable at `end` when walking `query` from `start`.
///
/// Runs without a depth limit. See [`Evaluator::select`] for how cyclic
/// queries bound their work, and use an evaluator configured with
/// [`EvalConfig::with_max_depth`](crate::EvalConfig::with_max_depth) when the
/// operations are untrusted.
pub fn select(query: &Query, start: &Node, end: &Node, items: &Queryable) -> Result<Queryable> {
    Evaluator::new().select(query, start, end, items)
}

/// Selects from `start` to every result node of `query`.
pub fn select_results(query: &Query, start: &Node, items: &Queryable) -> Result<Queryable> {
    Evaluator::new().select_results(query, start, items)
}

/// Optimizes `query` for selections from `start` to `end` with the default
/// passes.
pub fn optimize(query: &Query, start: &Node, end: &Node) -> Result<Query> {
    Optimizer::new().optimize(query, start, end)
}

/// Finds the first node of `query` (in insertion order) with the given label.
///
/// Runs as a query over the query's own nodes.
pub fn find_node_by_label(query: &Query, label: &str) -> Result<Option<Node>> {
    let nodes = Node::new("nodes", Type::of::<Node>());
    let matches = Node::new("matches", Type::of::<Node>());
    let wanted = label.to_owned();
    let mut qb = QueryBuilder::new();
    qb.add_arc(
        Arc::new(&nodes, &matches),
        Filter::test::<Node>("has label", move |n| n.label() == wanted),
    )?;
    let meta = qb.build_query();

    let items = create_queryable(query.nodes().iter().cloned().map(Item::new), Type::of::<Node>());
    let found = select(&meta, &nodes, &matches, &items)?;
    Ok(query
        .nodes()
        .iter()
        .find(|n| found.contains(&Item::new((*n).clone())))
        .cloned())
}

/// A node of a particular query, usable as an item.
///
/// Positions let the engine run queries over query graphs, e.g. to compute
/// reachability while optimizing.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Position {
    query: Query,
    node: Node,
}

impl Position {
    pub fn new(query: &Query, node: &Node) -> Self {
        Self {
            query: query.clone(),
            node: node.clone(),
        }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Returns the positions one arc downstream.
    pub fn successors(&self) -> Vec<Position> {
        self.query
            .arcs_from(&self.node)
            .iter()
            .map(|arc| Position::new(&self.query, arc.to()))
            .collect()
    }

    /// Returns the positions one arc upstream.
    pub fn predecessors(&self) -> Vec<Position> {
        self.query
            .arcs_to(&self.node)
            .iter()
            .map(|arc| Position::new(&self.query, arc.from()))
            .collect()
    }
}
