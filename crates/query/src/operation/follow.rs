//! Follows: operations that map each item to a set of items.

use crate::executor::Evaluator;
use crate::operation::subquery::FollowQuery;
use crate::operation::tuple::{FollowFunction, FollowObject, FollowToTuple, FollowTupleTo, Permutate};
use crate::operation::Filter;
use core::any::Any;
use core::fmt;
use hashbrown::HashSet;
use std::rc::Rc;
use trellis_core::{Error, Item, Object, Queryable, Result, Type};

type MapFn = dyn Fn(&Item) -> Result<Queryable>;

/// A named user mapping from one item to a set of items.
#[derive(Clone)]
pub struct FollowMap {
    name: Rc<str>,
    input_type: Type,
    output_type: Type,
    map: Rc<MapFn>,
}

impl FollowMap {
    /// Returns the diagnostic name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for FollowMap {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.map, &other.map)
    }
}

impl fmt::Debug for FollowMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FollowMap").field(&self.name).finish()
    }
}

/// An operation that expands each item independently.
///
/// Applying a follow to a set yields the union of the results for every
/// item in it.
#[derive(Clone, Debug, PartialEq)]
pub enum Follow {
    /// A user mapping.
    Map(FollowMap),
    /// A filter used as a follow.
    Filter(Filter),
    /// Items selected by a nested query.
    Query(FollowQuery),
    /// One slot of a tuple.
    Object(FollowObject),
    /// A reordering of tuple slots.
    Permutate(Permutate),
    /// Pairs of the item and each result of an inner follow.
    ToTuple(FollowToTuple),
    /// An inner follow applied to one tuple slot.
    TupleTo(FollowTupleTo),
    /// A bound function over the trailing slots of a tuple.
    Function(FollowFunction),
}

impl Follow {
    /// Creates a follow from a fallible mapping closure.
    pub fn new<F>(name: impl Into<String>, input_type: Type, output_type: Type, map: F) -> Self
    where
        F: Fn(&Item) -> Result<Queryable> + 'static,
    {
        Follow::Map(FollowMap {
            name: name.into().into(),
            input_type,
            output_type,
            map: Rc::new(map),
        })
    }

    /// Creates a follow from a typed mapping that yields any number of `U`s.
    ///
    /// Applying it to an item that is not a `T` fails with an operation error.
    pub fn map<T, U, I, F>(name: impl Into<String>, map: F) -> Self
    where
        T: Any,
        U: Object,
        I: IntoIterator<Item = U>,
        F: Fn(&T) -> I + 'static,
    {
        let name: String = name.into();
        let label = name.clone();
        let output_type = Type::of::<U>();
        let result_type = output_type.clone();
        Self::new(name, Type::of::<T>(), output_type, move |item| {
            let value = item.downcast_ref::<T>().ok_or_else(|| {
                Error::operation(format!(
                    "'{}' expects {}, got {}",
                    label,
                    core::any::type_name::<T>(),
                    item.type_name()
                ))
            })?;
            Ok(Queryable::from_items(
                map(value).into_iter().map(Item::new),
                result_type.clone(),
            ))
        })
    }

    /// Returns the type of items this follow accepts.
    pub fn input_type(&self) -> &Type {
        match self {
            Follow::Map(m) => &m.input_type,
            Follow::Filter(f) => f.item_type(),
            Follow::Query(q) => q.input_type(),
            Follow::Object(o) => o.input_type(),
            Follow::Permutate(p) => p.input_type(),
            Follow::ToTuple(t) => t.input_type(),
            Follow::TupleTo(t) => t.input_type(),
            Follow::Function(f) => f.input_type(),
        }
    }

    /// Returns the type of items this follow produces.
    pub fn output_type(&self) -> &Type {
        match self {
            Follow::Map(m) => &m.output_type,
            Follow::Filter(f) => f.item_type(),
            Follow::Query(q) => q.output_type(),
            Follow::Object(o) => o.output_type(),
            Follow::Permutate(p) => p.output_type(),
            Follow::ToTuple(t) => t.output_type(),
            Follow::TupleTo(t) => t.output_type(),
            Follow::Function(f) => f.output_type(),
        }
    }

    /// Returns the items reached from one item.
    pub fn follow(&self, item: &Item, cx: &mut Evaluator) -> Result<Queryable> {
        match self {
            Follow::Map(m) => (m.map)(item),
            Follow::Filter(f) => f.follow(item, cx),
            Follow::Query(q) => q.follow(item, cx),
            Follow::Object(o) => o.follow(item),
            Follow::Permutate(p) => p.follow(item),
            Follow::ToTuple(t) => t.follow(item, cx),
            Follow::TupleTo(t) => t.follow(item, cx),
            Follow::Function(f) => f.follow(item),
        }
    }

    /// Returns the union of `follow` over every item.
    pub fn apply(&self, items: &Queryable, cx: &mut Evaluator) -> Result<Queryable> {
        if let Follow::Filter(f) = self {
            return f.apply(items, cx);
        }
        let output_type = self.output_type().clone();
        if let Some(item) = items.as_singleton() {
            let result = self.follow(item, cx)?;
            return Ok(if result.item_type() == &output_type {
                result
            } else {
                result.with_type(output_type)
            });
        }
        let mut reached = HashSet::new();
        for item in items {
            let result = self.follow(item, cx)?;
            if result.is_empty() {
                continue;
            }
            reached.extend(result.iter().cloned());
        }
        Ok(Queryable::from_set(reached, output_type))
    }
}

impl fmt::Display for Follow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Follow::Map(m) => f.write_str(&m.name),
            Follow::Filter(inner) => fmt::Display::fmt(inner, f),
            Follow::Query(q) => fmt::Display::fmt(q, f),
            Follow::Object(o) => fmt::Display::fmt(o, f),
            Follow::Permutate(p) => fmt::Display::fmt(p, f),
            Follow::ToTuple(t) => fmt::Display::fmt(t, f),
            Follow::TupleTo(t) => fmt::Display::fmt(t, f),
            Follow::Function(func) => fmt::Display::fmt(func, f),
        }
    }
}

impl From<Filter> for Follow {
    fn from(filter: Filter) -> Self {
        Follow::Filter(filter)
    }
}
