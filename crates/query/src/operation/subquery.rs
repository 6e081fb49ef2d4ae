//! Operations that re-enter the evaluator with a nested query.

use crate::executor::Evaluator;
use crate::graph::{Node, Query};
use crate::operation::{Filter, Follow};
use core::fmt;
use trellis_core::{Error, Item, Queryable, Result, Type};

/// How a nested result size is compared against a threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Compare {
    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,
}

impl Compare {
    /// Evaluates `lhs <op> rhs`.
    pub fn test(self, lhs: usize, rhs: usize) -> bool {
        match self {
            Compare::Lt => lhs < rhs,
            Compare::Le => lhs <= rhs,
            Compare::Eq => lhs == rhs,
            Compare::Ne => lhs != rhs,
            Compare::Ge => lhs >= rhs,
            Compare::Gt => lhs > rhs,
        }
    }
}

impl fmt::Display for Compare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Compare::Lt => "<",
            Compare::Le => "<=",
            Compare::Eq => "==",
            Compare::Ne => "!=",
            Compare::Ge => ">=",
            Compare::Gt => ">",
        })
    }
}

/// A nested query together with the positions to select between.
///
/// Without an end node the selection ends at every result node of the
/// nested query.
#[derive(Clone, Debug, PartialEq)]
pub struct SubQuery {
    query: Query,
    start: Node,
    end: Option<Node>,
    output_type: Type,
}

impl SubQuery {
    /// Creates a sub-query, checking that both nodes belong to `query`.
    pub fn new(query: Query, start: Node, end: Option<Node>) -> Result<Self> {
        for node in core::iter::once(&start).chain(end.iter()) {
            if !query.contains_node(node) {
                return Err(Error::invalid_argument(format!(
                    "node {} is not part of query #{}",
                    node,
                    query.id()
                )));
            }
        }
        let output_type = match &end {
            Some(end) => end.input_type().clone(),
            None => query
                .result_nodes()
                .map(|n| n.input_type().clone())
                .reduce(|a, b| Type::common(&a, &b))
                .unwrap_or_else(Type::any),
        };
        Ok(Self {
            query,
            start,
            end,
            output_type,
        })
    }

    /// Returns the nested query.
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Returns the node the nested selection starts from.
    pub fn start(&self) -> &Node {
        &self.start
    }

    /// Returns the node the nested selection ends at, if fixed.
    pub fn end(&self) -> Option<&Node> {
        self.end.as_ref()
    }

    /// Returns the type of items fed into the nested query.
    pub fn input_type(&self) -> &Type {
        self.start.input_type()
    }

    /// Returns the type of items the nested query yields.
    pub fn output_type(&self) -> &Type {
        &self.output_type
    }

    /// Selects over `{item}` with the shared evaluator.
    pub fn run(&self, item: &Item, cx: &mut Evaluator) -> Result<Queryable> {
        let items = Queryable::singleton_of(item.clone(), self.input_type().clone());
        let result = match &self.end {
            Some(end) => cx.select(&self.query, &self.start, end, &items),
            None => cx.select_results(&self.query, &self.start, &items),
        };
        result.map_err(|e| e.context(format!("in {} for item {}", self, item)))
    }
}

impl fmt::Display for SubQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.end {
            Some(end) => write!(f, "sub-query #{} {} -> {}", self.query.id(), self.start, end),
            None => write!(f, "sub-query #{} {} -> results", self.query.id(), self.start),
        }
    }
}

/// Accepts an item when the size of its nested selection satisfies a
/// comparison.
///
/// `Compare::Gt` with threshold 0 keeps items that reach anything at all.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterByQuery {
    sub: SubQuery,
    compare: Compare,
    threshold: usize,
}

impl FilterByQuery {
    /// Creates a filter over a nested selection.
    pub fn new(
        query: Query,
        start: Node,
        end: Option<Node>,
        compare: Compare,
        threshold: usize,
    ) -> Result<Self> {
        Ok(Self {
            sub: SubQuery::new(query, start, end)?,
            compare,
            threshold,
        })
    }

    /// Returns the nested selection.
    pub fn sub_query(&self) -> &SubQuery {
        &self.sub
    }

    /// Returns the type of items this filter accepts.
    pub fn item_type(&self) -> &Type {
        self.sub.input_type()
    }

    /// Runs the nested selection for the item and compares its size.
    pub fn accept(&self, item: &Item, cx: &mut Evaluator) -> Result<bool> {
        let size = self.sub.run(item, cx)?.size();
        Ok(self.compare.test(size, self.threshold))
    }
}

impl fmt::Display for FilterByQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "|{}| {} {}", self.sub, self.compare, self.threshold)
    }
}

impl From<FilterByQuery> for Filter {
    fn from(filter: FilterByQuery) -> Self {
        Filter::ByQuery(filter)
    }
}

/// Maps an item to its nested selection.
#[derive(Clone, Debug, PartialEq)]
pub struct FollowQuery {
    sub: SubQuery,
}

impl FollowQuery {
    /// Creates a follow over a nested selection.
    pub fn new(query: Query, start: Node, end: Option<Node>) -> Result<Self> {
        Ok(Self {
            sub: SubQuery::new(query, start, end)?,
        })
    }

    /// Returns the nested selection.
    pub fn sub_query(&self) -> &SubQuery {
        &self.sub
    }

    pub fn input_type(&self) -> &Type {
        self.sub.input_type()
    }

    pub fn output_type(&self) -> &Type {
        self.sub.output_type()
    }

    pub fn follow(&self, item: &Item, cx: &mut Evaluator) -> Result<Queryable> {
        self.sub.run(item, cx)
    }
}

impl fmt::Display for FollowQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.sub, f)
    }
}

impl From<FollowQuery> for Follow {
    fn from(follow: FollowQuery) -> Self {
        Follow::Query(follow)
    }
}
