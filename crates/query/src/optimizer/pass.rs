//! Optimizer pass trait.

use crate::graph::{Node, Query};
use trellis_core::Result;

/// A rewrite that turns a query into an equivalent one for a fixed
/// start/end pair.
pub trait OptimizerPass {
    /// Optimizes the given query.
    fn optimize(&self, query: &Query, start: &Node, end: &Node) -> Result<Query>;

    /// Returns the name of this pass.
    fn name(&self) -> &'static str {
        "unnamed"
    }
}
