//! Filters: operations that keep or drop each item.

use crate::executor::Evaluator;
use crate::operation::subquery::FilterByQuery;
use crate::operation::tuple::FilterByIndex;
use core::any::Any;
use core::fmt;
use std::rc::Rc;
use trellis_core::{Error, Item, Queryable, Result, Type};

type PredicateFn = dyn Fn(&Item) -> Result<bool>;

/// A named user predicate.
///
/// Two predicates are equal only if they share the same closure, i.e. one is
/// a clone of the other.
#[derive(Clone)]
pub struct Predicate {
    name: Rc<str>,
    item_type: Type,
    test: Rc<PredicateFn>,
}

impl Predicate {
    /// Returns the diagnostic name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for Predicate {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.test, &other.test)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Predicate").field(&self.name).finish()
    }
}

/// An operation that selects a subset of its input.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    /// A user predicate.
    Predicate(Predicate),
    /// Accepts every item of the given type.
    AcceptAll(Type),
    /// Accepts items equal to a fixed value.
    Equals { value: Item, item_type: Type },
    /// Conjunction of filters.
    All(FilterSet),
    /// Compares the size of a nested selection against a threshold.
    ByQuery(FilterByQuery),
    /// Applies a filter to one slot of a tuple.
    ByIndex(FilterByIndex),
}

impl Filter {
    /// Creates a filter from a fallible predicate over items of `item_type`.
    pub fn predicate<F>(name: impl Into<String>, item_type: Type, test: F) -> Self
    where
        F: Fn(&Item) -> Result<bool> + 'static,
    {
        Filter::Predicate(Predicate {
            name: name.into().into(),
            item_type,
            test: Rc::new(test),
        })
    }

    /// Creates a filter from a typed predicate.
    ///
    /// Applying it to an item that is not a `T` fails with an operation error.
    pub fn test<T: Any>(name: impl Into<String>, test: impl Fn(&T) -> bool + 'static) -> Self {
        let name: String = name.into();
        let label = name.clone();
        Self::predicate(name, Type::of::<T>(), move |item| {
            item.downcast_ref::<T>().map(&test).ok_or_else(|| {
                Error::operation(format!(
                    "'{}' expects {}, got {}",
                    label,
                    core::any::type_name::<T>(),
                    item.type_name()
                ))
            })
        })
    }

    /// Creates a filter that accepts everything.
    pub fn accept_all(item_type: Type) -> Self {
        Filter::AcceptAll(item_type)
    }

    /// Creates a filter that accepts only items equal to `value`.
    pub fn equals(value: Item) -> Self {
        let item_type = Type::of_item(&value);
        Filter::Equals { value, item_type }
    }

    /// Creates the conjunction of `filters`.
    pub fn all(filters: impl IntoIterator<Item = Filter>, item_type: Type) -> Self {
        Filter::All(FilterSet::new(filters, item_type))
    }

    /// Returns the type of items this filter accepts.
    pub fn item_type(&self) -> &Type {
        match self {
            Filter::Predicate(p) => &p.item_type,
            Filter::AcceptAll(ty) => ty,
            Filter::Equals { item_type, .. } => item_type,
            Filter::All(set) => set.item_type(),
            Filter::ByQuery(f) => f.item_type(),
            Filter::ByIndex(f) => f.item_type(),
        }
    }

    /// Decides whether an item passes.
    pub fn accept(&self, item: &Item, cx: &mut Evaluator) -> Result<bool> {
        match self {
            Filter::Predicate(p) => (p.test)(item),
            Filter::AcceptAll(_) => Ok(true),
            Filter::Equals { value, .. } => Ok(item == value),
            Filter::All(set) => set.accept(item, cx),
            Filter::ByQuery(f) => f.accept(item, cx),
            Filter::ByIndex(f) => f.accept(item, cx),
        }
    }

    /// Returns the accepted subset of `items`.
    pub fn apply(&self, items: &Queryable, cx: &mut Evaluator) -> Result<Queryable> {
        if let Filter::AcceptAll(_) = self {
            return Ok(items.clone());
        }
        items.try_filter(|item| self.accept(item, cx))
    }

    /// Returns `{item}` if it passes, otherwise the empty set.
    pub fn follow(&self, item: &Item, cx: &mut Evaluator) -> Result<Queryable> {
        let item_type = self.item_type().clone();
        Ok(if self.accept(item, cx)? {
            Queryable::singleton_of(item.clone(), item_type)
        } else {
            Queryable::empty(item_type)
        })
    }

    /// Returns true if this filter can be fused with its neighbors.
    ///
    /// Filters that re-enter the evaluator are never merged.
    pub fn is_mergeable(&self) -> bool {
        match self {
            Filter::Predicate(_) | Filter::AcceptAll(_) | Filter::Equals { .. } => true,
            Filter::All(set) => set.filters().iter().all(Filter::is_mergeable),
            Filter::ByQuery(_) => false,
            Filter::ByIndex(f) => f.filter().is_mergeable(),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Predicate(p) => f.write_str(&p.name),
            Filter::AcceptAll(_) => f.write_str("accept all"),
            Filter::Equals { value, .. } => write!(f, "equals {}", value),
            Filter::All(set) => fmt::Display::fmt(set, f),
            Filter::ByQuery(q) => fmt::Display::fmt(q, f),
            Filter::ByIndex(i) => fmt::Display::fmt(i, f),
        }
    }
}

/// A conjunction of filters, tested in order with short-circuiting.
///
/// An empty set accepts everything. Nested sets are flattened on
/// construction.
#[derive(Clone, Debug)]
pub struct FilterSet {
    filters: Vec<Filter>,
    item_type: Type,
}

impl FilterSet {
    /// Creates a filter set.
    pub fn new(filters: impl IntoIterator<Item = Filter>, item_type: Type) -> Self {
        let mut flat = Vec::new();
        for filter in filters {
            match filter {
                Filter::All(inner) => flat.extend(inner.filters),
                other => flat.push(other),
            }
        }
        Self {
            filters: flat,
            item_type,
        }
    }

    /// Returns the member filters in test order.
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Returns the number of member filters.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns true if there are no member filters.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Returns the type of items this set accepts.
    pub fn item_type(&self) -> &Type {
        &self.item_type
    }

    /// Returns true if every member accepts the item.
    pub fn accept(&self, item: &Item, cx: &mut Evaluator) -> Result<bool> {
        for filter in &self.filters {
            if !filter.accept(item, cx)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Sets are equal when they hold the same filters the same number of times,
/// in any order.
impl PartialEq for FilterSet {
    fn eq(&self, other: &Self) -> bool {
        let count = |filters: &[Filter], f: &Filter| filters.iter().filter(|g| *g == f).count();
        self.item_type == other.item_type
            && self.filters.len() == other.filters.len()
            && self
                .filters
                .iter()
                .all(|f| count(&self.filters[..], f) == count(&other.filters[..], f))
    }
}

impl fmt::Display for FilterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FilterSet{")?;
        for (i, filter) in self.filters.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", filter)?;
        }
        f.write_str("}")
    }
}

impl From<FilterSet> for Filter {
    fn from(set: FilterSet) -> Self {
        Filter::All(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Queryable {
        Queryable::from_items(values.iter().map(|v| Item::new(*v)), Type::of::<i64>())
    }

    fn even() -> Filter {
        Filter::test::<i64>("is even", |v| v % 2 == 0)
    }

    fn positive() -> Filter {
        Filter::test::<i64>("is positive", |v| *v > 0)
    }

    #[test]
    fn test_predicate_apply() {
        let mut cx = Evaluator::new();
        let out = even().apply(&ints(&[-2, -1, 0, 1, 2]), &mut cx).unwrap();
        assert_eq!(out, ints(&[-2, 0, 2]));
    }

    #[test]
    fn test_typed_predicate_rejects_wrong_type() {
        let mut cx = Evaluator::new();
        let err = even()
            .accept(&Item::new(String::from("two")), &mut cx)
            .unwrap_err();
        assert!(matches!(err, Error::Operation { .. }));
        assert!(err.to_string().contains("is even"));
    }

    #[test]
    fn test_follow_is_singleton_or_empty() {
        let mut cx = Evaluator::new();
        let f = even();
        assert_eq!(f.follow(&Item::new(4i64), &mut cx).unwrap(), ints(&[4]));
        assert!(f.follow(&Item::new(3i64), &mut cx).unwrap().is_empty());
    }

    #[test]
    fn test_accept_all_and_equals() {
        let mut cx = Evaluator::new();
        let input = ints(&[1, 2, 3]);
        assert_eq!(
            Filter::accept_all(Type::of::<i64>())
                .apply(&input, &mut cx)
                .unwrap(),
            input
        );
        assert_eq!(
            Filter::equals(Item::new(2i64)).apply(&input, &mut cx).unwrap(),
            ints(&[2])
        );
    }

    #[test]
    fn test_filter_set_is_conjunction() {
        let mut cx = Evaluator::new();
        let set = Filter::all([even(), positive()], Type::of::<i64>());
        let out = set.apply(&ints(&[-2, -1, 0, 1, 2, 3, 4]), &mut cx).unwrap();
        assert_eq!(out, ints(&[2, 4]));
        assert_eq!(set.to_string(), "FilterSet{is even, is positive}");
    }

    #[test]
    fn test_empty_filter_set_accepts_everything() {
        let mut cx = Evaluator::new();
        let set = FilterSet::new([], Type::any());
        assert!(set.is_empty());
        assert!(set.accept(&Item::new("anything"), &mut cx).unwrap());
    }

    #[test]
    fn test_filter_set_short_circuits() {
        let mut cx = Evaluator::new();
        let boom = Filter::predicate("boom", Type::of::<i64>(), |_| {
            Err(Error::operation("should not run"))
        });
        let set = FilterSet::new([even(), boom], Type::of::<i64>());
        assert!(!set.accept(&Item::new(3i64), &mut cx).unwrap());
        assert!(set.accept(&Item::new(2i64), &mut cx).is_err());
    }

    #[test]
    fn test_nested_sets_flatten() {
        let inner = Filter::all([even(), positive()], Type::of::<i64>());
        let outer = FilterSet::new([inner, Filter::equals(Item::new(4i64))], Type::of::<i64>());
        assert_eq!(outer.len(), 3);
    }

    #[test]
    fn test_equality() {
        let e = even();
        let p = positive();
        assert_eq!(e, e.clone());
        assert_ne!(e, even());
        assert_eq!(
            FilterSet::new([e.clone(), p.clone()], Type::of::<i64>()),
            FilterSet::new([p, e], Type::of::<i64>())
        );
        assert_eq!(
            Filter::equals(Item::new(1i64)),
            Filter::equals(Item::new(1i64))
        );
    }

    #[test]
    fn test_filter_set_equality_counts_repeats() {
        let e = even();
        let p = positive();
        let twice_even = FilterSet::new([e.clone(), e.clone(), p.clone()], Type::of::<i64>());
        let twice_positive = FilterSet::new([e.clone(), p.clone(), p.clone()], Type::of::<i64>());
        assert_ne!(twice_even, twice_positive);
        assert_ne!(twice_positive, twice_even);
        assert_eq!(
            twice_even,
            FilterSet::new([p, e.clone(), e], Type::of::<i64>())
        );
    }

    #[test]
    fn test_mergeable() {
        assert!(even().is_mergeable());
        assert!(Filter::all([even(), positive()], Type::of::<i64>()).is_mergeable());
    }
}
