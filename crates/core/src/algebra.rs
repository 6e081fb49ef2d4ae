//! Set algebra over `Queryable`s.
//!
//! These are free functions so they apply to any representation. Empty and
//! singleton operands are special-cased; everything else goes through
//! `size`, `iter` and `contains`.

use crate::queryable::Queryable;
use crate::types::Type;
use hashbrown::HashSet;

/// Returns every item in `a` or `b`.
pub fn union(a: &Queryable, b: &Queryable) -> Queryable {
    if a.is_empty() && b.is_empty() {
        return Queryable::empty(Type::common(a.item_type(), b.item_type()));
    }
    if a.is_empty() {
        return b.clone();
    }
    if b.is_empty() {
        return a.clone();
    }
    let item_type = Type::common(a.item_type(), b.item_type());

    let (big, small) = if a.size() >= b.size() { (a, b) } else { (b, a) };
    if small.iter().all(|item| big.contains(item)) {
        return if big.item_type() == &item_type {
            big.clone()
        } else {
            big.with_type(item_type)
        };
    }

    let mut items: HashSet<_> = HashSet::with_capacity(a.size() + b.size());
    items.extend(big.iter().cloned());
    items.extend(small.iter().cloned());
    Queryable::from_set(items, item_type)
}

/// Returns the items present in both `a` and `b`.
pub fn intersection(a: &Queryable, b: &Queryable) -> Queryable {
    let item_type = meet(a.item_type(), b.item_type());
    if a.is_empty() && b.is_empty() {
        return Queryable::empty(item_type);
    }
    if a.is_empty() {
        return a.clone();
    }
    if b.is_empty() {
        return b.clone();
    }

    if let Some(item) = a.as_singleton() {
        return if b.contains(item) {
            Queryable::singleton_of(item.clone(), item_type)
        } else {
            Queryable::empty(item_type)
        };
    }
    if let Some(item) = b.as_singleton() {
        return if a.contains(item) {
            Queryable::singleton_of(item.clone(), item_type)
        } else {
            Queryable::empty(item_type)
        };
    }

    let (small, big) = if a.size() <= b.size() { (a, b) } else { (b, a) };
    Queryable::from_items(
        small.iter().filter(|item| big.contains(item)).cloned(),
        item_type,
    )
}

/// The narrower of two types. Unrelated types fall back to their common type
/// so the choice never depends on argument order.
fn meet(a: &Type, b: &Type) -> Type {
    if a.is_assignable_from(b) {
        b.clone()
    } else if b.is_assignable_from(a) {
        a.clone()
    } else {
        Type::common(a, b)
    }
}

/// Returns the items of `a` that are not in `b`.
pub fn subtraction(a: &Queryable, b: &Queryable) -> Queryable {
    if a.is_empty() || b.is_empty() {
        return a.clone();
    }
    if let Some(item) = a.as_singleton() {
        return if b.contains(item) {
            Queryable::empty(a.item_type().clone())
        } else {
            a.clone()
        };
    }
    Queryable::from_items(
        a.iter().filter(|item| !b.contains(item)).cloned(),
        a.item_type().clone(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Item;

    fn ints(values: &[i64]) -> Queryable {
        Queryable::from_items(values.iter().map(|v| Item::new(*v)), Type::of::<i64>())
    }

    fn empty() -> Queryable {
        Queryable::empty(Type::of::<i64>())
    }

    #[test]
    fn test_union() {
        assert_eq!(union(&ints(&[1, 2]), &ints(&[2, 3])), ints(&[1, 2, 3]));
        assert_eq!(union(&empty(), &ints(&[1])), ints(&[1]));
        assert_eq!(union(&ints(&[1]), &empty()), ints(&[1]));
        assert_eq!(union(&ints(&[1, 2]), &ints(&[1])), ints(&[1, 2]));
    }

    #[test]
    fn test_union_widens_type() {
        let texts = Queryable::from_items([Item::new(String::from("a"))], Type::of::<String>());
        let mixed = union(&ints(&[1]), &texts);
        assert_eq!(mixed.size(), 2);
        assert_eq!(mixed.item_type(), &Type::Any);
        assert_eq!(mixed, union(&texts, &ints(&[1])));

        let no_texts = Queryable::empty(Type::of::<String>());
        let widened = union(&empty(), &no_texts);
        assert!(widened.is_empty());
        assert_eq!(widened.item_type(), &Type::Any);
        assert_eq!(widened, union(&no_texts, &empty()));

        assert_eq!(union(&no_texts, &ints(&[1])), ints(&[1]));
        assert_eq!(union(&ints(&[1]), &no_texts), ints(&[1]));
    }

    #[test]
    fn test_intersection_of_empties_is_order_free() {
        let no_texts = Queryable::empty(Type::of::<String>());
        let anything = Queryable::empty(Type::Any);
        assert_eq!(intersection(&empty(), &no_texts), intersection(&no_texts, &empty()));
        assert_eq!(intersection(&empty(), &anything), empty());
        assert_eq!(intersection(&anything, &empty()), empty());
    }

    #[test]
    fn test_intersection_unrelated_types_is_order_free() {
        let texts = Queryable::from_items([Item::new(String::from("a"))], Type::of::<String>());
        let left = intersection(&ints(&[1, 2]), &texts);
        assert!(left.is_empty());
        assert_eq!(left, intersection(&texts, &ints(&[1, 2])));
    }

    #[test]
    fn test_intersection() {
        assert_eq!(intersection(&ints(&[1, 2, 3]), &ints(&[2, 3, 4])), ints(&[2, 3]));
        assert_eq!(intersection(&ints(&[1, 2]), &empty()), empty());
        assert_eq!(intersection(&ints(&[2]), &ints(&[1, 2, 3])), ints(&[2]));
        assert_eq!(intersection(&ints(&[1, 2, 3]), &ints(&[4])), empty());
    }

    #[test]
    fn test_subtraction() {
        assert_eq!(subtraction(&ints(&[1, 2, 3]), &ints(&[2])), ints(&[1, 3]));
        assert_eq!(subtraction(&ints(&[1, 2]), &empty()), ints(&[1, 2]));
        assert_eq!(subtraction(&ints(&[2]), &ints(&[2, 5])), empty());
        assert_eq!(subtraction(&ints(&[1, 2]), &ints(&[1, 2])), empty());
    }
}
