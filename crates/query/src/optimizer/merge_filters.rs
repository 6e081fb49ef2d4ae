//! Merge pass - fuses chains of single-filter arcs into one arc.
//!
//! An interior node with exactly one incoming and one outgoing arc, both
//! labeled by a single mergeable filter, can be bypassed. Maximal chains of
//! such nodes are replaced by one arc labeled with a `FilterSet`:
//!
//! ```text
//! entry --f1--> m1 --f2--> m2 --f3--> exit   =>   entry --{f1, f2, f3}--> exit
//! ```
//!
//! Start and end are never bypassed. Loops made only of such nodes have no
//! entry and are left alone.

use crate::graph::{Arc, Node, Query, QueryBuilder};
use crate::operation::{Filter, FilterSet};
use crate::optimizer::OptimizerPass;
use hashbrown::HashSet;
use tracing::debug;
use trellis_core::Result;

/// Pass that merges filter chains into filter sets.
pub struct MergeFilterChains;

impl OptimizerPass for MergeFilterChains {
    fn optimize(&self, query: &Query, start: &Node, end: &Node) -> Result<Query> {
        let mut current = query.clone();
        let mut stuck: HashSet<Node> = HashSet::new();

        while let Some(chain) = Chain::find(&current, start, end, &mut stuck) {
            match chain.merge(&current) {
                Ok(merged) => {
                    debug!(
                        entry = %chain.entry(),
                        exit = %chain.exit(),
                        filters = chain.filters.len(),
                        "merged filter chain"
                    );
                    current = merged;
                }
                // The fused filter cannot be typed between entry and exit.
                Err(e) if e.is_type_mismatch() => stuck.extend(chain.interior),
                Err(e) => return Err(e),
            }
        }
        Ok(current)
    }

    fn name(&self) -> &'static str {
        "merge_filter_chains"
    }
}

fn sole_in<'a>(query: &'a Query, node: &Node) -> Option<&'a Arc> {
    match query.arcs_to(node) {
        [arc] => Some(arc),
        _ => None,
    }
}

fn sole_out<'a>(query: &'a Query, node: &Node) -> Option<&'a Arc> {
    match query.arcs_from(node) {
        [arc] => Some(arc),
        _ => None,
    }
}

fn sole_filter<'a>(query: &'a Query, arc: &Arc) -> Option<&'a Filter> {
    match query.operations(arc) {
        [op] => op.as_filter().filter(|f| f.is_mergeable()),
        _ => None,
    }
}

/// Returns true if `node` can be bypassed.
fn is_link(query: &Query, node: &Node, start: &Node, end: &Node) -> bool {
    if node == start || node == end {
        return false;
    }
    let (Some(inbound), Some(outbound)) = (sole_in(query, node), sole_out(query, node)) else {
        return false;
    };
    !inbound.is_loop()
        && !outbound.is_loop()
        && sole_filter(query, inbound).is_some()
        && sole_filter(query, outbound).is_some()
}

struct Chain {
    arcs: Vec<Arc>,
    interior: Vec<Node>,
    filters: Vec<Filter>,
}

impl Chain {
    /// Finds a maximal chain not touching `stuck`. Closed loops found on the
    /// way are added to `stuck`.
    fn find(query: &Query, start: &Node, end: &Node, stuck: &mut HashSet<Node>) -> Option<Chain> {
        let link = |n: &Node| is_link(query, n, start, end);

        'seeds: for seed in query.nodes() {
            if stuck.contains(seed) || !link(seed) {
                continue;
            }

            let mut visited: HashSet<Node> = HashSet::new();
            visited.insert(seed.clone());
            let mut first = seed.clone();
            while let Some(prev) = sole_in(query, &first).map(|arc| arc.from()) {
                if !link(prev) {
                    break;
                }
                if !visited.insert(prev.clone()) {
                    stuck.extend(visited);
                    continue 'seeds;
                }
                first = prev.clone();
            }

            let mut arcs = Vec::new();
            let mut interior = Vec::new();
            arcs.extend(sole_in(query, &first).cloned());
            let mut current = first;
            loop {
                let Some(outbound) = sole_out(query, &current) else {
                    break;
                };
                arcs.push(outbound.clone());
                interior.push(current);
                let next = outbound.to();
                if !link(next) || interior.contains(next) {
                    break;
                }
                current = next.clone();
            }

            if interior.iter().any(|n| stuck.contains(n)) {
                continue;
            }
            let filters = arcs
                .iter()
                .filter_map(|arc| sole_filter(query, arc).cloned())
                .collect();
            return Some(Chain {
                arcs,
                interior,
                filters,
            });
        }
        None
    }

    fn entry(&self) -> &Node {
        self.arcs[0].from()
    }

    fn exit(&self) -> &Node {
        self.arcs[self.arcs.len() - 1].to()
    }

    /// Replaces the chain by a single arc from entry to exit.
    fn merge(&self, query: &Query) -> Result<Query> {
        let set = FilterSet::new(self.filters.iter().cloned(), self.entry().output_type().clone());
        let mut qb = QueryBuilder::from_query(query);
        for node in &self.interior {
            qb.remove_node(node);
        }
        qb.add_arc(Arc::new(self.entry(), self.exit()), set)?;
        Ok(qb.build_query())
    }
}
