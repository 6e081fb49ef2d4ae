//! Query graphs: nodes, arcs, immutable queries and their builder.

mod arc;
mod builder;
mod node;
mod query;

pub use arc::Arc;
pub use builder::QueryBuilder;
pub use node::{Node, NodeId};
pub use query::{Query, QueryId};
