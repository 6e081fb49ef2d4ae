//! Query optimizer module.

mod merge_filters;
mod pass;
mod prune;

pub use merge_filters::MergeFilterChains;
pub use pass::OptimizerPass;
pub use prune::PruneUnreachable;

use crate::graph::{Node, Query};
use tracing::debug;
use trellis_core::Result;

/// Query optimizer that applies optimization passes.
pub struct Optimizer {
    passes: Vec<Box<dyn OptimizerPass>>,
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Optimizer {
    /// Creates a new optimizer with default passes.
    ///
    /// The default passes are applied in this order:
    /// 1. PruneUnreachable - Drop nodes on no walk from start to end
    /// 2. MergeFilterChains - Fuse chains of filter arcs into filter sets
    pub fn new() -> Self {
        Self {
            passes: vec![Box::new(PruneUnreachable), Box::new(MergeFilterChains)],
        }
    }

    /// Creates an optimizer with custom passes.
    pub fn with_passes(passes: Vec<Box<dyn OptimizerPass>>) -> Self {
        Self { passes }
    }

    /// Returns the pass names in application order.
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Rewrites `query` into an equivalent query for selections from `start`
    /// to `end`.
    pub fn optimize(&self, query: &Query, start: &Node, end: &Node) -> Result<Query> {
        let mut current = query.clone();
        for pass in &self.passes {
            let (nodes, arcs) = (current.node_count(), current.arc_count());
            current = pass.optimize(&current, start, end)?;
            debug!(
                pass = pass.name(),
                nodes_before = nodes,
                nodes_after = current.node_count(),
                arcs_before = arcs,
                arcs_after = current.arc_count(),
                "optimizer pass"
            );
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Evaluator;
    use crate::graph::{Arc, QueryBuilder};
    use crate::operation::{Filter, FilterSet, Follow, Operation};
    use trellis_core::{Item, Queryable, Type};

    fn node(label: &str) -> Node {
        Node::new(label, Type::of::<i64>())
    }

    fn ints(values: &[i64]) -> Queryable {
        Queryable::from_items(values.iter().map(|v| Item::new(*v)), Type::of::<i64>())
    }

    #[test]
    fn test_default_passes() {
        assert_eq!(
            Optimizer::new().pass_names(),
            vec!["prune_unreachable", "merge_filter_chains"]
        );
        assert!(Optimizer::with_passes(vec![]).pass_names().is_empty());
    }

    #[test]
    fn test_prune_then_merge() {
        // s -even-> m -positive-> e, plus a follow into a dead end hanging off m
        let (s, m, e, dead) = (node("s"), node("m"), node("e"), node("dead"));
        let even = Filter::test::<i64>("is even", |v| v % 2 == 0);
        let positive = Filter::test::<i64>("is positive", |v| *v > 0);
        let mut qb = QueryBuilder::new();
        qb.add_arc(Arc::new(&s, &m), even.clone()).unwrap();
        qb.add_arc(Arc::new(&m, &e), positive.clone()).unwrap();
        qb.add_arc(
            Arc::new(&m, &dead),
            Follow::map::<i64, i64, _, _>("noise", |v| Some(v * 10)),
        )
        .unwrap();
        let query = qb.build_query();

        let optimized = Optimizer::new().optimize(&query, &s, &e).unwrap();
        assert_eq!(optimized.nodes(), &[s.clone(), e.clone()]);
        assert_eq!(
            optimized.operations(&Arc::new(&s, &e)),
            &[Operation::from(FilterSet::new(
                [even, positive],
                Type::of::<i64>()
            ))]
        );

        let input = ints(&[-2, -1, 0, 1, 2, 3, 4]);
        let mut cx = Evaluator::new();
        assert_eq!(cx.select(&optimized, &s, &e, &input).unwrap(), ints(&[2, 4]));
        assert_eq!(cx.select(&query, &s, &e, &input).unwrap(), ints(&[2, 4]));
    }

    #[test]
    fn test_custom_passes_only() {
        let (s, m, e) = (node("s"), node("m"), node("e"));
        let mut qb = QueryBuilder::new();
        qb.add_arc(Arc::new(&s, &m), Filter::accept_all(Type::of::<i64>()))
            .unwrap();
        qb.add_arc(Arc::new(&m, &e), Filter::accept_all(Type::of::<i64>()))
            .unwrap();
        let query = qb.build_query();

        let prune_only = Optimizer::with_passes(vec![Box::new(PruneUnreachable)]);
        let optimized = prune_only.optimize(&query, &s, &e).unwrap();
        assert_eq!(optimized.node_count(), 3);
    }
}
