//! Prune pass - removes nodes that lie on no walk from start to end.
//!
//! A node survives if it is reachable from `start` and `end` is reachable
//! from it. Both reachability sets are computed by running a small query
//! over `Position`s of the query being optimized:
//!
//! ```text
//!   +---------+  successors (or predecessors)
//!   | position| ----+
//!   +---------+ <---+
//! ```
//!
//! Everything else is removed together with its arcs.

use crate::executor::Evaluator;
use crate::graph::{Arc, Node, Query, QueryBuilder};
use crate::operation::Follow;
use crate::optimizer::OptimizerPass;
use crate::tools::Position;
use hashbrown::HashSet;
use tracing::debug;
use trellis_core::{intersection, Item, Queryable, Result, Type};

/// Pass that removes nodes not on any walk between start and end.
pub struct PruneUnreachable;

impl OptimizerPass for PruneUnreachable {
    fn optimize(&self, query: &Query, start: &Node, end: &Node) -> Result<Query> {
        let on_walk = nodes_between(query, start, end)?;
        let doomed: Vec<&Node> = query
            .nodes()
            .iter()
            .filter(|n| !on_walk.contains(*n))
            .collect();
        if doomed.is_empty() {
            return Ok(query.clone());
        }

        let mut qb = QueryBuilder::from_query(query);
        for node in &doomed {
            qb.remove_node(node);
        }
        debug!(query = query.id(), pruned = doomed.len(), "pruned unreachable nodes");
        Ok(qb.build_query())
    }

    fn name(&self) -> &'static str {
        "prune_unreachable"
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Forward,
    Backward,
}

/// Returns the nodes of `query` lying on some walk from `start` to `end`.
pub(crate) fn nodes_between(query: &Query, start: &Node, end: &Node) -> Result<HashSet<Node>> {
    let forward = reachable(query, start, Direction::Forward)?;
    let backward = reachable(query, end, Direction::Backward)?;
    Ok(intersection(&forward, &backward)
        .iter()
        .filter_map(|item| item.downcast_ref::<Position>())
        .map(|p| p.node().clone())
        .collect())
}

/// Selects every position reachable from `from`, including itself.
fn reachable(query: &Query, from: &Node, direction: Direction) -> Result<Queryable> {
    let position = Node::new("position", Type::of::<Position>());
    // Each step keeps the current position, so the frontier only grows and
    // the walk ends as soon as it stops changing.
    let step = match direction {
        Direction::Forward => Follow::map::<Position, Position, _, _>("successors", |p| {
            let mut next = p.successors();
            next.push(p.clone());
            next
        }),
        Direction::Backward => Follow::map::<Position, Position, _, _>("predecessors", |p| {
            let mut next = p.predecessors();
            next.push(p.clone());
            next
        }),
    };
    let mut qb = QueryBuilder::new();
    qb.add_arc(Arc::new(&position, &position), step)?;
    let meta = qb.build_query();

    let origin = Queryable::singleton(Item::new(Position::new(query, from)));
    Evaluator::new().select(&meta, &position, &position, &origin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::Filter;

    fn node(label: &str) -> Node {
        Node::new(label, Type::of::<i64>())
    }

    fn keep() -> Filter {
        Filter::accept_all(Type::of::<i64>())
    }

    #[test]
    fn test_nodes_between() {
        // s -> a -> e, s -> dead, orphan -> e, e -> after
        let (s, a, e) = (node("s"), node("a"), node("e"));
        let (dead, orphan, after) = (node("dead"), node("orphan"), node("after"));
        let mut qb = QueryBuilder::new();
        qb.add_arc(Arc::new(&s, &a), keep()).unwrap();
        qb.add_arc(Arc::new(&a, &e), keep()).unwrap();
        qb.add_arc(Arc::new(&s, &dead), keep()).unwrap();
        qb.add_arc(Arc::new(&orphan, &e), keep()).unwrap();
        qb.add_arc(Arc::new(&e, &after), keep()).unwrap();
        let query = qb.build_query();

        let on_walk = nodes_between(&query, &s, &e).unwrap();
        let expected: HashSet<Node> = [s.clone(), a.clone(), e.clone()].into_iter().collect();
        assert_eq!(on_walk, expected);

        let pruned = PruneUnreachable.optimize(&query, &s, &e).unwrap();
        assert_eq!(pruned.nodes(), &[s.clone(), a.clone(), e.clone()]);
        assert_eq!(pruned.arc_count(), 2);
    }

    #[test]
    fn test_cycles_are_kept_when_on_a_walk() {
        let (s, a, b, e) = (node("s"), node("a"), node("b"), node("e"));
        let mut qb = QueryBuilder::new();
        qb.add_arc(Arc::new(&s, &a), keep()).unwrap();
        qb.add_arc(Arc::new(&a, &b), keep()).unwrap();
        qb.add_arc(Arc::new(&b, &a), keep()).unwrap();
        qb.add_arc(Arc::new(&b, &e), keep()).unwrap();
        let query = qb.build_query();

        let pruned = PruneUnreachable.optimize(&query, &s, &e).unwrap();
        assert_eq!(pruned, query);
        assert_eq!(pruned.arc_count(), 4);
    }

    #[test]
    fn test_no_walk_prunes_everything() {
        let (s, e) = (node("s"), node("e"));
        let mut qb = QueryBuilder::new();
        qb.add_arc(Arc::new(&e, &s), keep()).unwrap();
        let query = qb.build_query();

        let pruned = PruneUnreachable.optimize(&query, &s, &e).unwrap();
        assert_eq!(pruned.node_count(), 0);
    }
}
