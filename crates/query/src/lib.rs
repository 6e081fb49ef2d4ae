//! Trellis Query - typed graph queries over in-memory item sets.
//!
//! A query is a directed graph of typed nodes whose arcs carry operations.
//! Selecting from one node to another walks every path between them,
//! OR-ing the operations on each arc and composing them along the way.
//!
//! This crate provides:
//!
//! - `graph`: Nodes, arcs, immutable queries and the `QueryBuilder`
//! - `operation`: Filters, follows (including tuple and sub-query operations) and counting
//! - `executor`: The memoized, cycle-safe `Evaluator`
//! - `optimizer`: Reachability pruning and filter-chain merging
//! - `context`: Evaluation settings and counters
//! - `tools`: Free-function entry points
//!
//! ```
//! use trellis_core::{create_queryable, Item, Type};
//! use trellis_query::{optimize, select, Arc, Filter, Node, QueryBuilder};
//!
//! let start = Node::new("start", Type::of::<i64>());
//! let mid = Node::new("mid", Type::of::<i64>());
//! let end = Node::new("end", Type::of::<i64>());
//!
//! let mut qb = QueryBuilder::new();
//! qb.add_arc(Arc::new(&start, &mid), Filter::test::<i64>("is even", |v| v % 2 == 0))?;
//! qb.add_arc(Arc::new(&mid, &end), Filter::test::<i64>("is positive", |v| *v > 0))?;
//! let query = qb.build_query();
//!
//! let items = create_queryable((-2..5i64).map(Item::new), Type::of::<i64>());
//! let expected = create_queryable([2i64, 4].map(Item::new), Type::of::<i64>());
//! assert_eq!(select(&query, &start, &end, &items)?, expected);
//!
//! let optimized = optimize(&query, &start, &end)?;
//! assert_eq!(optimized.arc_count(), 1);
//! assert_eq!(select(&optimized, &start, &end, &items)?, expected);
//! # Ok::<(), trellis_core::Error>(())
//! ```

pub mod context;
pub mod executor;
pub mod graph;
pub mod operation;
pub mod optimizer;
pub mod tools;

pub use context::{EvalConfig, EvalStats};
pub use executor::Evaluator;
pub use graph::{Arc, Node, NodeId, Query, QueryBuilder, QueryId};
pub use operation::{
    Compare, Count, Filter, FilterByIndex, FilterByQuery, FilterSet, Follow, FollowFunction,
    FollowObject, FollowQuery, FollowToTuple, FollowTupleTo, Operation, Permutate,
};
pub use optimizer::{MergeFilterChains, Optimizer, OptimizerPass, PruneUnreachable};
pub use tools::{find_node_by_label, optimize, select, select_results, Position};
