//! Mutable staging area for queries.

use crate::graph::query::Graph;
use crate::graph::{Arc, Node, Query};
use crate::operation::Operation;
use trellis_core::{Error, Result};

/// Builds [`Query`] graphs, validating types as arcs are added.
///
/// A built query is a snapshot: changing the builder afterwards never affects
/// queries it has already produced.
#[derive(Clone, Debug, Default)]
pub struct QueryBuilder {
    graph: Graph,
}

impl QueryBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder holding a copy of an existing query.
    pub fn from_query(query: &Query) -> Self {
        Self {
            graph: query.graph().clone(),
        }
    }

    /// Adds an isolated node. Adding a node twice has no effect.
    pub fn add_node(&mut self, node: &Node) -> &mut Self {
        self.graph.add_node(node);
        self
    }

    /// Labels an arc with an operation, adding its endpoints as needed.
    ///
    /// Fails with a type mismatch if the operation cannot accept the items
    /// leaving `arc.from()` or produces items `arc.to()` cannot accept.
    pub fn add_arc(&mut self, arc: Arc, operation: impl Into<Operation>) -> Result<&mut Self> {
        let operation = operation.into();
        Self::validate(&arc, &operation)?;
        self.graph.add_operation(&arc, operation);
        Ok(self)
    }

    /// Copies every node, arc and operation of another query into this one.
    pub fn add_query(&mut self, query: &Query) -> &mut Self {
        for node in query.nodes() {
            self.graph.add_node(node);
        }
        for arc in query.arcs() {
            for op in query.operations(arc) {
                self.graph.add_operation(arc, op.clone());
            }
        }
        self
    }

    /// Removes an arc and all of its operations.
    pub fn remove_arc(&mut self, arc: &Arc) -> bool {
        self.graph.remove_arc(arc)
    }

    /// Removes one operation from an arc, dropping the arc once it has none.
    pub fn remove_operation(&mut self, arc: &Arc, operation: &Operation) -> bool {
        self.graph.remove_operation(arc, operation)
    }

    /// Removes a node together with every arc into or out of it.
    pub fn remove_node(&mut self, node: &Node) -> bool {
        self.graph.remove_node(node)
    }

    /// Returns the nodes staged so far.
    pub fn nodes(&self) -> &[Node] {
        self.graph.nodes()
    }

    /// Returns the arcs staged so far.
    pub fn arcs(&self) -> &[Arc] {
        self.graph.arcs()
    }

    /// Returns the arcs leaving a staged node.
    pub fn arcs_from(&self, node: &Node) -> &[Arc] {
        self.graph.arcs_from(node)
    }

    /// Returns the arcs entering a staged node.
    pub fn arcs_to(&self, node: &Node) -> &[Arc] {
        self.graph.arcs_to(node)
    }

    /// Returns the operations staged on an arc.
    pub fn operations(&self, arc: &Arc) -> &[Operation] {
        self.graph.operations(arc)
    }

    /// Freezes the current state into an immutable query.
    pub fn build_query(&self) -> Query {
        Query::from_graph(self.graph.clone())
    }

    fn validate(arc: &Arc, operation: &Operation) -> Result<()> {
        let from_type = arc.from().output_type();
        if !operation.input_type().is_assignable_from(from_type) {
            return Err(Error::type_mismatch(
                format!("input of {} on arc {}", operation, arc),
                operation.input_type().clone(),
                from_type.clone(),
            ));
        }
        let to_type = arc.to().input_type();
        if !to_type.is_assignable_from(operation.output_type()) {
            return Err(Error::type_mismatch(
                format!("output of {} on arc {}", operation, arc),
                to_type.clone(),
                operation.output_type().clone(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{Filter, Follow};
    use trellis_core::Type;

    fn even() -> Filter {
        Filter::test::<i64>("is even", |v| v % 2 == 0)
    }

    #[test]
    fn test_add_arc_registers_nodes_and_indices() {
        let a = Node::new("a", Type::of::<i64>());
        let b = Node::new("b", Type::of::<i64>());
        let mut qb = QueryBuilder::new();
        qb.add_arc(Arc::new(&a, &b), even()).unwrap();

        let q = qb.build_query();
        assert_eq!(q.nodes(), &[a.clone(), b.clone()]);
        assert_eq!(q.arcs_from(&a), &[Arc::new(&a, &b)]);
        assert_eq!(q.arcs_to(&b), &[Arc::new(&a, &b)]);
        assert!(q.arcs_from(&b).is_empty());
        assert_eq!(q.operations(&Arc::new(&a, &b)).len(), 1);
    }

    #[test]
    fn test_same_operation_added_once() {
        let a = Node::new("a", Type::of::<i64>());
        let b = Node::new("b", Type::of::<i64>());
        let f = even();
        let mut qb = QueryBuilder::new();
        qb.add_arc(Arc::new(&a, &b), f.clone()).unwrap();
        qb.add_arc(Arc::new(&a, &b), f).unwrap();
        qb.add_arc(Arc::new(&a, &b), Filter::accept_all(Type::of::<i64>()))
            .unwrap();

        let q = qb.build_query();
        assert_eq!(q.arc_count(), 1);
        assert_eq!(q.operations(&Arc::new(&a, &b)).len(), 2);
    }

    #[test]
    fn test_type_mismatch_on_input() {
        let a = Node::new("a", Type::of::<String>());
        let b = Node::new("b", Type::any());
        let mut qb = QueryBuilder::new();
        let err = qb.add_arc(Arc::new(&a, &b), even()).unwrap_err();
        assert!(err.is_type_mismatch());
        assert!(err.to_string().contains("a -> b"));
        assert!(qb.nodes().is_empty());
    }

    #[test]
    fn test_type_mismatch_on_output() {
        let a = Node::new("a", Type::of::<i64>());
        let b = Node::new("b", Type::of::<String>());
        let mut qb = QueryBuilder::new();
        let err = qb.add_arc(Arc::new(&a, &b), even()).unwrap_err();
        assert!(err.is_type_mismatch());

        let widen = Follow::map::<i64, i64, _, _>("same", |v| Some(*v));
        let any = Node::new("any", Type::any());
        assert!(qb.add_arc(Arc::new(&a, &any), widen).is_ok());
    }

    #[test]
    fn test_remove_node_cascades() {
        let a = Node::new("a", Type::of::<i64>());
        let b = Node::new("b", Type::of::<i64>());
        let c = Node::new("c", Type::of::<i64>());
        let mut qb = QueryBuilder::new();
        qb.add_arc(Arc::new(&a, &b), even()).unwrap();
        qb.add_arc(Arc::new(&b, &c), even()).unwrap();
        qb.add_arc(Arc::new(&b, &b), even()).unwrap();
        qb.add_arc(Arc::new(&a, &c), even()).unwrap();

        assert!(qb.remove_node(&b));
        assert!(!qb.remove_node(&b));
        let q = qb.build_query();
        assert_eq!(q.nodes(), &[a.clone(), c.clone()]);
        assert_eq!(q.arcs(), &[Arc::new(&a, &c)]);
        assert_eq!(q.arcs_from(&a), &[Arc::new(&a, &c)]);
        assert_eq!(q.arcs_to(&c), &[Arc::new(&a, &c)]);
    }

    #[test]
    fn test_remove_operation_collapses_arc() {
        let a = Node::new("a", Type::of::<i64>());
        let b = Node::new("b", Type::of::<i64>());
        let arc = Arc::new(&a, &b);
        let f = even();
        let all: Operation = Filter::accept_all(Type::of::<i64>()).into();
        let mut qb = QueryBuilder::new();
        qb.add_arc(arc.clone(), f.clone()).unwrap();
        qb.add_arc(arc.clone(), all.clone()).unwrap();

        assert!(qb.remove_operation(&arc, &f.clone().into()));
        assert_eq!(qb.operations(&arc), &[all.clone()]);
        assert_eq!(qb.arcs_from(&a).len(), 1);

        assert!(qb.remove_operation(&arc, &all));
        assert!(qb.arcs().is_empty());
        assert!(qb.arcs_from(&a).is_empty());
        assert!(qb.arcs_to(&b).is_empty());
        assert_eq!(qb.nodes().len(), 2);
        assert!(!qb.remove_arc(&arc));
    }

    #[test]
    fn test_built_query_is_a_snapshot() {
        let a = Node::new("a", Type::of::<i64>());
        let b = Node::new("b", Type::of::<i64>());
        let mut qb = QueryBuilder::new();
        qb.add_arc(Arc::new(&a, &b), even()).unwrap();
        let before = qb.build_query();

        qb.remove_node(&b);
        let after = qb.build_query();

        assert_eq!(before.arc_count(), 1);
        assert_eq!(before.node_count(), 2);
        assert_eq!(after.arc_count(), 0);
        assert_ne!(before, after);
    }

    #[test]
    fn test_add_query_and_from_query() {
        let a = Node::new("a", Type::of::<i64>());
        let b = Node::new("b", Type::of::<i64>());
        let c = Node::new("c", Type::of::<i64>());

        let mut first = QueryBuilder::new();
        first.add_arc(Arc::new(&a, &b), even()).unwrap();
        let q1 = first.build_query();

        let mut second = QueryBuilder::new();
        second.add_arc(Arc::new(&b, &c), even()).unwrap();
        second.add_query(&q1);
        let merged = second.build_query();
        assert_eq!(merged.node_count(), 3);
        assert_eq!(merged.arc_count(), 2);

        let mut copy = QueryBuilder::from_query(&merged);
        copy.remove_node(&a);
        assert_eq!(copy.build_query().arc_count(), 1);
        assert_eq!(merged.arc_count(), 2);
    }
}
