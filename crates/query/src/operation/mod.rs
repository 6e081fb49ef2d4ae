//! Operations attached to arcs.
//!
//! Every operation is a pure function of its input set and its own
//! configuration, which is what makes memoizing frames sound.
//!
//! - `Filter`: keeps a subset of the input.
//! - `Follow`: maps each item to a set and unions the results.
//! - `Count`: replaces the input by its size.

mod filter;
mod follow;
mod subquery;
mod tuple;

pub use filter::{Filter, FilterSet, Predicate};
pub use follow::{Follow, FollowMap};
pub use subquery::{Compare, FilterByQuery, FollowQuery, SubQuery};
pub use tuple::{FilterByIndex, FollowFunction, FollowObject, FollowToTuple, FollowTupleTo, Permutate};

use crate::executor::Evaluator;
use core::fmt;
use trellis_core::{Item, Queryable, Result, Type};

/// Replaces a set of items by a singleton holding its size as `usize`.
#[derive(Clone, Debug, PartialEq)]
pub struct Count {
    input_type: Type,
    output_type: Type,
}

impl Count {
    pub fn new(input_type: Type) -> Self {
        Self {
            input_type,
            output_type: Type::of::<usize>(),
        }
    }

    pub fn apply(&self, items: &Queryable) -> Queryable {
        Queryable::singleton_of(Item::new(items.size()), self.output_type.clone())
    }
}

/// A transformation labeling an arc.
#[derive(Clone, Debug, PartialEq)]
pub enum Operation {
    Filter(Filter),
    Follow(Follow),
    Count(Count),
}

impl Operation {
    /// Returns the type of items this operation accepts.
    pub fn input_type(&self) -> &Type {
        match self {
            Operation::Filter(f) => f.item_type(),
            Operation::Follow(f) => f.input_type(),
            Operation::Count(c) => &c.input_type,
        }
    }

    /// Returns the type of items this operation produces.
    pub fn output_type(&self) -> &Type {
        match self {
            Operation::Filter(f) => f.item_type(),
            Operation::Follow(f) => f.output_type(),
            Operation::Count(c) => &c.output_type,
        }
    }

    /// Transforms a set of items.
    pub fn apply(&self, items: &Queryable, cx: &mut Evaluator) -> Result<Queryable> {
        match self {
            Operation::Filter(f) => f.apply(items, cx),
            Operation::Follow(f) => f.apply(items, cx),
            Operation::Count(c) => Ok(c.apply(items)),
        }
    }

    /// Returns the filter if this operation is one.
    pub fn as_filter(&self) -> Option<&Filter> {
        match self {
            Operation::Filter(f) => Some(f),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Filter(filter) => fmt::Display::fmt(filter, f),
            Operation::Follow(follow) => fmt::Display::fmt(follow, f),
            Operation::Count(_) => f.write_str("count"),
        }
    }
}

impl From<Filter> for Operation {
    fn from(filter: Filter) -> Self {
        Operation::Filter(filter)
    }
}

impl From<Follow> for Operation {
    fn from(follow: Follow) -> Self {
        Operation::Follow(follow)
    }
}

impl From<Count> for Operation {
    fn from(count: Count) -> Self {
        Operation::Count(count)
    }
}

macro_rules! impl_into_operation {
    ($($ty:ty => $via:ident),* $(,)?) => {
        $(
            impl From<$ty> for Operation {
                fn from(op: $ty) -> Self {
                    Operation::from($via::from(op))
                }
            }
        )*
    };
}

impl_into_operation! {
    FilterSet => Filter,
    FilterByQuery => Filter,
    FilterByIndex => Filter,
    FollowQuery => Follow,
    FollowObject => Follow,
    Permutate => Follow,
    FollowToTuple => Follow,
    FollowTupleTo => Follow,
    FollowFunction => Follow,
}
