//! Recursive, memoized and cycle-safe selection.
//!
//! A frame is one `(query, start, end, items)` evaluation. Frames reaching
//! each other form strongly connected components, and every frame of a
//! component selects the same items: all walks from one member can be
//! continued from any other. Components are found with Tarjan's algorithm
//! over frames:
//!
//! - `in_progress`: frames on the call stack, with their visit index.
//!   Walking back into one contributes nothing for now, which is what makes
//!   cyclic graphs terminate.
//! - `pending`: finished frames whose component root is still open, with the
//!   partial result they collected.
//! - `cache`: final results of completed components.
//!
//! When a component root finishes, the union of its members' partial results
//! is the result of every member.

use crate::context::{EvalConfig, EvalStats};
use crate::graph::{Node, NodeId, Query, QueryId};
use hashbrown::HashMap;
use tracing::{debug, trace};
use trellis_core::{union, Error, Queryable, Result, Type};

/// Low link reported by expansions that never reached an open frame.
const UNCUT: usize = usize::MAX;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct Frame {
    query: QueryId,
    start: NodeId,
    end: NodeId,
    items: Queryable,
}

#[derive(Debug)]
struct Pending {
    index: usize,
    partial: Queryable,
}

/// Evaluates queries.
///
/// Operations receive `&mut Evaluator` so sub-query operations can select
/// through the same recursion guard and cache. Reusing one evaluator across
/// calls reuses its cache.
#[derive(Debug, Default)]
pub struct Evaluator {
    config: EvalConfig,
    stats: EvalStats,
    in_progress: HashMap<Frame, usize>,
    pending: HashMap<Frame, Pending>,
    component: Vec<Frame>,
    cache: HashMap<Frame, Queryable>,
    next_index: usize,
    depth: usize,
}

impl Evaluator {
    /// Creates an evaluator with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an evaluator with a custom configuration.
    pub fn with_config(config: EvalConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Returns the counters accumulated so far.
    pub fn stats(&self) -> EvalStats {
        self.stats
    }

    /// Returns the number of cached frames.
    pub fn cached_frames(&self) -> usize {
        self.cache.len()
    }

    /// Drops all cached results.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Returns every item reachable at `end` by walking `query` from `start`
    /// with `items`.
    ///
    /// The result is the union over all walks from `start` to `end`; when
    /// `start == end` it includes `items` themselves. It is typed by `end`'s
    /// input type.
    ///
    /// Every distinct item set reaching a node is its own frame. Recursion
    /// depth and frame count are therefore bounded only by the operations:
    /// follows around a cycle that keep producing new item sets can expand
    /// exponentially many frames, and each nested frame uses stack. Set
    /// [`EvalConfig::max_depth`] to fail with [`Error::DepthExceeded`]
    /// instead of overflowing the stack.
    pub fn select(
        &mut self,
        query: &Query,
        start: &Node,
        end: &Node,
        items: &Queryable,
    ) -> Result<Queryable> {
        let top_level = self.depth == 0;
        if top_level {
            debug!(
                query = query.id(),
                start = %start,
                end = %end,
                items = items.size(),
                "select"
            );
        }
        let before = self.stats;
        let (selected, _) = self.eval(query, start, end, items)?;
        if top_level {
            debug!(
                query = query.id(),
                results = selected.size(),
                frames = self.stats.frames_expanded - before.frames_expanded,
                cache_hits = self.stats.cache_hits - before.cache_hits,
                cycle_cuts = self.stats.cycle_cuts - before.cycle_cuts,
                "select done"
            );
        }
        Ok(selected)
    }

    /// Returns the union of `select` from `start` to every result node.
    pub fn select_results(
        &mut self,
        query: &Query,
        start: &Node,
        items: &Queryable,
    ) -> Result<Queryable> {
        let mut selected: Option<Queryable> = None;
        for result in query.result_nodes() {
            let found = self.select(query, start, result, items)?;
            selected = Some(match selected {
                Some(acc) => union(&acc, &found),
                None => found,
            });
        }
        Ok(selected.unwrap_or_else(|| Queryable::empty(Type::any())))
    }

    /// Evaluates one frame, returning its (possibly partial) result and the
    /// lowest visit index of an open frame it reached.
    fn eval(
        &mut self,
        query: &Query,
        start: &Node,
        end: &Node,
        items: &Queryable,
    ) -> Result<(Queryable, usize)> {
        if items.is_empty() {
            return Ok((Queryable::empty(end.input_type().clone()), UNCUT));
        }

        let frame = Frame {
            query: query.id(),
            start: start.id(),
            end: end.id(),
            items: items.clone(),
        };
        if let Some(hit) = self.cache.get(&frame) {
            self.stats.cache_hits += 1;
            return Ok((hit.clone(), UNCUT));
        }
        if let Some(&index) = self.in_progress.get(&frame) {
            self.stats.cycle_cuts += 1;
            trace!(start = %start, end = %end, index, "cycle cut");
            return Ok((Queryable::empty(end.input_type().clone()), index));
        }
        if let Some(pending) = self.pending.get(&frame) {
            self.stats.cycle_cuts += 1;
            trace!(start = %start, end = %end, index = pending.index, "joined open component");
            return Ok((pending.partial.clone(), pending.index));
        }
        if let Some(limit) = self.config.max_depth {
            if self.depth >= limit {
                return Err(Error::depth_exceeded(limit));
            }
        }

        let index = self.next_index;
        self.next_index += 1;
        let marker = self.component.len();
        self.component.push(frame.clone());
        self.in_progress.insert(frame.clone(), index);
        self.depth += 1;
        self.stats.frames_expanded += 1;
        trace!(
            start = %start,
            end = %end,
            items = items.size(),
            depth = self.depth,
            "expanding frame"
        );

        let outcome = self.expand(query, start, end, items);

        self.depth -= 1;
        self.in_progress.remove(&frame);
        let (partial, low) = match outcome {
            Ok(found) => found,
            Err(e) => {
                for member in self.component.drain(marker..) {
                    self.pending.remove(&member);
                }
                return Err(e);
            }
        };

        if low < index {
            // Some member of an enclosing component is still open.
            self.pending.insert(
                frame,
                Pending {
                    index,
                    partial: partial.clone(),
                },
            );
            return Ok((partial, low));
        }

        let mut selected = partial;
        let members: Vec<Frame> = self.component.drain(marker..).collect();
        for member in &members {
            if let Some(pending) = self.pending.remove(member) {
                selected = union(&selected, &pending.partial);
            }
        }
        if self.config.memoize {
            for member in members {
                self.cache.insert(member, selected.clone());
            }
        }
        Ok((selected, UNCUT))
    }

    fn expand(
        &mut self,
        query: &Query,
        start: &Node,
        end: &Node,
        items: &Queryable,
    ) -> Result<(Queryable, usize)> {
        let end_type = end.input_type();
        let mut selected = if start == end {
            items.clone()
        } else {
            Queryable::empty(end_type.clone())
        };
        let mut low = UNCUT;

        for arc in query.arcs_from(start) {
            for op in query.operations(arc) {
                let reached = op
                    .apply(items, self)
                    .map_err(|e| e.context(format!("applying {} on {}", op, arc)))?;
                if reached.is_empty() {
                    continue;
                }
                let (found, cut) = self
                    .eval(query, arc.to(), end, &reached)
                    .map_err(|e| e.context(format!("walking {}", arc)))?;
                low = low.min(cut);
                selected = union(&selected, &found);
            }
        }

        if selected.item_type() != end_type {
            selected = selected.with_type(end_type.clone());
        }
        Ok((selected, low))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Arc, QueryBuilder};
    use crate::operation::{Filter, Follow};
    use trellis_core::Item;

    fn ints(values: &[i64]) -> Queryable {
        Queryable::from_items(values.iter().map(|v| Item::new(*v)), Type::of::<i64>())
    }

    fn int_node(label: &str) -> Node {
        Node::new(label, Type::of::<i64>())
    }

    fn next_mod3() -> Follow {
        Follow::map::<i64, i64, _, _>("next", |v| Some((v + 1) % 3))
    }

    #[test]
    fn test_start_equals_end_includes_input() {
        let a = int_node("a");
        let query = QueryBuilder::new().add_node(&a).build_query();
        let mut cx = Evaluator::new();
        let out = cx.select(&query, &a, &a, &ints(&[1, 2])).unwrap();
        assert_eq!(out, ints(&[1, 2]));
    }

    #[test]
    fn test_dead_end_selects_nothing() {
        let a = int_node("a");
        let b = int_node("b");
        let c = int_node("c");
        let mut qb = QueryBuilder::new();
        qb.add_arc(Arc::new(&a, &b), next_mod3()).unwrap();
        qb.add_node(&c);
        let query = qb.build_query();

        let mut cx = Evaluator::new();
        assert!(cx.select(&query, &a, &c, &ints(&[1])).unwrap().is_empty());
        assert!(cx.select(&query, &b, &a, &ints(&[1])).unwrap().is_empty());
    }

    #[test]
    fn test_empty_input_is_typed_by_end() {
        let a = int_node("a");
        let b = Node::new("b", Type::any());
        let query = QueryBuilder::new().add_node(&a).add_node(&b).build_query();
        let mut cx = Evaluator::new();
        let out = cx
            .select(&query, &a, &b, &Queryable::empty(Type::of::<i64>()))
            .unwrap();
        assert_eq!(out, Queryable::empty(Type::any()));
        assert_eq!(cx.stats().frames_expanded, 0);
    }

    #[test]
    fn test_operations_on_one_arc_are_alternatives() {
        let a = int_node("a");
        let b = int_node("b");
        let mut qb = QueryBuilder::new();
        qb.add_arc(Arc::new(&a, &b), Filter::test::<i64>("small", |v| *v < 2))
            .unwrap();
        qb.add_arc(Arc::new(&a, &b), Filter::test::<i64>("big", |v| *v > 8))
            .unwrap();
        let query = qb.build_query();

        let mut cx = Evaluator::new();
        let out = cx.select(&query, &a, &b, &ints(&[0, 1, 5, 9])).unwrap();
        assert_eq!(out, ints(&[0, 1, 9]));
    }

    #[test]
    fn test_self_loop_terminates() {
        let a = int_node("a");
        let mut qb = QueryBuilder::new();
        qb.add_arc(Arc::new(&a, &a), next_mod3()).unwrap();
        let query = qb.build_query();

        let mut cx = Evaluator::new();
        let out = cx.select(&query, &a, &a, &ints(&[0])).unwrap();
        assert_eq!(out, ints(&[0, 1, 2]));
        assert_eq!(cx.stats().cycle_cuts, 1);
    }

    #[test]
    fn test_cyclic_components_share_one_result() {
        // a <-> b around the 3-cycle, every position also exits to e.
        let a = int_node("a");
        let b = int_node("b");
        let e = int_node("e");
        let mut qb = QueryBuilder::new();
        qb.add_arc(Arc::new(&a, &b), next_mod3()).unwrap();
        qb.add_arc(Arc::new(&b, &a), next_mod3()).unwrap();
        qb.add_arc(Arc::new(&a, &e), Filter::accept_all(Type::of::<i64>()))
            .unwrap();
        qb.add_arc(Arc::new(&b, &e), Filter::accept_all(Type::of::<i64>()))
            .unwrap();
        let query = qb.build_query();

        let mut memo = Evaluator::new();
        let mut plain = Evaluator::with_config(EvalConfig::new().with_memoize(false));
        for start in [&a, &b] {
            for value in 0..3 {
                let input = ints(&[value]);
                let expected = ints(&[0, 1, 2]);
                assert_eq!(memo.select(&query, start, &e, &input).unwrap(), expected);
                assert_eq!(plain.select(&query, start, &e, &input).unwrap(), expected);
            }
        }
        assert_eq!(plain.cached_frames(), 0);
        assert!(memo.stats().cache_hits > 0);
    }

    #[test]
    fn test_each_frame_of_a_component_expands_once() {
        // Two self loops stepping through 20 states, linked both ways.
        let a = int_node("a");
        let b = int_node("b");
        let succ = Follow::map::<i64, i64, _, _>("succ", |v| Some((v + 1) % 20));
        let mut qb = QueryBuilder::new();
        qb.add_arc(Arc::new(&a, &a), succ.clone()).unwrap();
        qb.add_arc(Arc::new(&b, &b), succ).unwrap();
        qb.add_arc(Arc::new(&a, &b), Filter::accept_all(Type::of::<i64>()))
            .unwrap();
        qb.add_arc(Arc::new(&b, &a), Filter::accept_all(Type::of::<i64>()))
            .unwrap();
        let query = qb.build_query();
        let all: Vec<i64> = (0..20).collect();

        for config in [EvalConfig::new(), EvalConfig::new().with_memoize(false)] {
            let mut cx = Evaluator::with_config(config);
            let out = cx.select(&query, &a, &b, &ints(&[0])).unwrap();
            assert_eq!(out, ints(&all));
            assert_eq!(cx.stats().frames_expanded, 40);
        }

        let mut cx = Evaluator::new();
        cx.select(&query, &a, &b, &ints(&[0])).unwrap();
        assert_eq!(cx.cached_frames(), 40);
        assert_eq!(cx.select(&query, &b, &b, &ints(&[7])).unwrap(), ints(&all));
        assert_eq!(cx.stats().frames_expanded, 40);
    }

    #[test]
    fn test_failed_select_leaves_no_open_frames() {
        let a = int_node("a");
        let b = int_node("b");
        let mut qb = QueryBuilder::new();
        qb.add_arc(Arc::new(&a, &a), next_mod3()).unwrap();
        qb.add_arc(
            Arc::new(&a, &b),
            Follow::new("fails on 2", Type::of::<i64>(), Type::of::<i64>(), |item| {
                match item.downcast_ref::<i64>() {
                    Some(2) => Err(Error::operation("two")),
                    _ => Ok(Queryable::singleton(item.clone())),
                }
            }),
        )
        .unwrap();
        let query = qb.build_query();

        let mut cx = Evaluator::new();
        assert!(cx.select(&query, &a, &b, &ints(&[0])).is_err());
        assert!(cx.in_progress.is_empty());
        assert!(cx.pending.is_empty());
        assert!(cx.component.is_empty());
        assert_eq!(cx.depth, 0);
    }

    #[test]
    fn test_repeated_select_hits_cache() {
        let a = int_node("a");
        let b = int_node("b");
        let mut qb = QueryBuilder::new();
        qb.add_arc(Arc::new(&a, &b), next_mod3()).unwrap();
        let query = qb.build_query();

        let mut cx = Evaluator::new();
        let first = cx.select(&query, &a, &b, &ints(&[0, 1])).unwrap();
        let expanded = cx.stats().frames_expanded;
        let second = cx.select(&query, &a, &b, &ints(&[1, 0])).unwrap();
        assert_eq!(first, second);
        assert_eq!(cx.stats().frames_expanded, expanded);
        assert_eq!(cx.stats().cache_hits, 1);

        cx.clear_cache();
        assert_eq!(cx.cached_frames(), 0);
    }

    #[test]
    fn test_errors_carry_the_walk() {
        let a = int_node("a");
        let b = int_node("b");
        let c = int_node("c");
        let mut qb = QueryBuilder::new();
        qb.add_arc(Arc::new(&a, &b), next_mod3()).unwrap();
        qb.add_arc(
            Arc::new(&b, &c),
            Follow::new("explode", Type::of::<i64>(), Type::of::<i64>(), |_| {
                Err(Error::operation("exploded"))
            }),
        )
        .unwrap();
        let query = qb.build_query();

        let err = Evaluator::new()
            .select(&query, &a, &c, &ints(&[0]))
            .unwrap_err();
        assert_eq!(err.trail(), vec!["walking a -> b", "applying explode on b -> c"]);
        assert_eq!(err.root_cause().to_string(), "Operation failed: exploded");
    }

    #[test]
    fn test_max_depth() {
        let a = int_node("a");
        let mut qb = QueryBuilder::new();
        qb.add_arc(
            Arc::new(&a, &a),
            Follow::map::<i64, i64, _, _>("succ", |v| Some(v + 1)),
        )
        .unwrap();
        let query = qb.build_query();

        let mut cx = Evaluator::with_config(EvalConfig::new().with_max_depth(16));
        let err = cx.select(&query, &a, &a, &ints(&[0])).unwrap_err();
        assert!(matches!(err.root_cause(), Error::DepthExceeded { limit: 16 }));
        assert_eq!(err.trail().len(), 16);
    }

    #[test]
    fn test_select_results_unions_result_nodes() {
        let a = int_node("a");
        let evens = Node::result("evens", Type::of::<i64>());
        let odds = Node::result("odds", Type::of::<i64>());
        let mut qb = QueryBuilder::new();
        qb.add_arc(Arc::new(&a, &evens), Filter::test::<i64>("even", |v| v % 2 == 0))
            .unwrap();
        qb.add_arc(Arc::new(&a, &odds), Filter::test::<i64>("odd", |v| v % 2 != 0))
            .unwrap();
        let query = qb.build_query();

        let mut cx = Evaluator::new();
        let out = cx.select_results(&query, &a, &ints(&[1, 2, 3])).unwrap();
        assert_eq!(out, ints(&[1, 2, 3]));

        let none = QueryBuilder::new().add_node(&a).build_query();
        assert!(cx.select_results(&none, &a, &ints(&[1])).unwrap().is_empty());
    }
}
