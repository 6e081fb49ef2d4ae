//! Type-erased domain objects.
//!
//! An `Item` wraps any `'static` value that is `Debug + Eq + Hash` behind a
//! reference count, keeping value equality and hashing so items can live in
//! sets and memo keys without knowing their concrete type.

use core::any::{Any, TypeId};
use core::fmt;
use core::hash::{Hash, Hasher};
use std::rc::Rc;

/// Object-safe view of a value that can be stored in an item set.
pub trait Object: Any + fmt::Debug {
    /// Returns the value as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Compares with another object; values of different types are never equal.
    fn dyn_eq(&self, other: &dyn Object) -> bool;

    /// Feeds the value (and its type) into a hasher.
    fn dyn_hash(&self, state: &mut dyn Hasher);

    /// Returns the Rust name of the concrete type.
    fn type_name(&self) -> &'static str;
}

impl<T: Any + fmt::Debug + Eq + Hash> Object for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn Object) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .map_or(false, |other| self == other)
    }

    fn dyn_hash(&self, mut state: &mut dyn Hasher) {
        TypeId::of::<T>().hash(&mut state);
        Hash::hash(self, &mut state);
    }

    fn type_name(&self) -> &'static str {
        core::any::type_name::<T>()
    }
}

/// A shared, immutable, type-erased domain object.
#[derive(Clone)]
pub struct Item(Rc<dyn Object>);

impl Item {
    /// Wraps a value. Wrapping an `Item` returns that item unchanged.
    pub fn new<T: Object>(value: T) -> Self {
        if let Some(item) = (&value as &dyn Any).downcast_ref::<Item>() {
            return item.clone();
        }
        Item(Rc::new(value))
    }

    /// Returns a reference to the wrapped value if it is a `T`.
    #[inline]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.object().as_any().downcast_ref::<T>()
    }

    /// Returns true if the wrapped value is a `T`.
    #[inline]
    pub fn is<T: Any>(&self) -> bool {
        self.type_id() == TypeId::of::<T>()
    }

    /// Returns the `TypeId` of the wrapped value.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        Any::type_id(self.object().as_any())
    }

    /// Returns the Rust name of the wrapped value's type.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.object().type_name()
    }

    /// Returns true if both handles point at the same allocation.
    #[inline]
    pub fn ptr_eq(a: &Item, b: &Item) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    #[inline]
    fn object(&self) -> &dyn Object {
        &*self.0
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        Item::ptr_eq(self, other) || self.object().dyn_eq(other.object())
    }
}

impl Eq for Item {}

impl Hash for Item {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.object().dyn_hash(state);
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.object(), f)
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.object(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashbrown::HashSet;

    #[derive(Debug, PartialEq, Eq, Hash)]
    struct Person {
        name: &'static str,
        age: u32,
    }

    #[test]
    fn test_value_equality() {
        assert_eq!(Item::new(3i64), Item::new(3i64));
        assert_ne!(Item::new(3i64), Item::new(4i64));
        assert_ne!(Item::new(3i64), Item::new(3i32));
    }

    #[test]
    fn test_downcast() {
        let item = Item::new(Person { name: "ted", age: 32 });
        assert!(item.is::<Person>());
        assert_eq!(item.downcast_ref::<Person>().map(|p| p.age), Some(32));
        assert!(item.downcast_ref::<i64>().is_none());
    }

    #[test]
    fn test_rewrapping_is_identity() {
        let item = Item::new(String::from("x"));
        let again = Item::new(item.clone());
        assert!(Item::ptr_eq(&item, &again));
        assert!(again.is::<String>());
    }

    #[test]
    fn test_items_in_sets() {
        let mut set = HashSet::new();
        set.insert(Item::new(1u8));
        set.insert(Item::new(1u8));
        set.insert(Item::new(1u16));
        set.insert(Item::new(Person { name: "matt", age: 25 }));
        set.insert(Item::new(Person { name: "matt", age: 25 }));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_debug_delegates() {
        let item = Item::new(42i64);
        assert_eq!(format!("{:?}", item), "42");
        assert_eq!(item.to_string(), "42");
    }
}
