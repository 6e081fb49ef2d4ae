//! Runtime type descriptors for Trellis.
//!
//! Items flowing through a query graph are type-erased, so every position and
//! operation carries a `Type` describing the category of values it expects.
//! Descriptors for the same Rust type always compare equal because identity is
//! keyed by `TypeId`.

use crate::item::Item;
use crate::tuple::Tuple;
use core::any::{Any, TypeId};
use core::fmt;
use core::hash::{Hash, Hasher};
use std::rc::Rc;

/// Descriptor for a single Rust value type.
#[derive(Clone, Copy, Debug)]
pub struct ValueType {
    id: TypeId,
    name: &'static str,
}

impl ValueType {
    /// Creates the descriptor for `T`.
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: core::any::type_name::<T>(),
        }
    }

    pub(crate) fn from_parts(id: TypeId, name: &'static str) -> Self {
        Self { id, name }
    }

    /// Returns the `TypeId` of the described type.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Returns the Rust name of the described type.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ValueType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ValueType {}

impl Hash for ValueType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// The category of values accepted or produced at a point in a query graph.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    /// Any value at all.
    Any,
    /// Values of exactly one Rust type.
    Value(ValueType),
    /// Tuples whose slots match a type list.
    Tuple(TypeList),
}

impl Type {
    /// Returns the catch-all type.
    #[inline]
    pub fn any() -> Self {
        Type::Any
    }

    /// Returns the type describing values of `T`.
    pub fn of<T: Any>() -> Self {
        Type::Value(ValueType::of::<T>())
    }

    /// Returns a tuple type with the given slot types.
    pub fn tuple(slots: impl Into<TypeList>) -> Self {
        Type::Tuple(slots.into())
    }

    /// Returns the most specific type describing a concrete item.
    pub fn of_item(item: &Item) -> Self {
        match item.downcast_ref::<Tuple>() {
            Some(tuple) => Type::Tuple(tuple.type_list().clone()),
            None => Type::Value(ValueType::from_parts(item.type_id(), item.type_name())),
        }
    }

    /// Returns true if every value of `other` is also a value of `self`.
    pub fn is_assignable_from(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Any, _) => true,
            (Type::Value(a), Type::Value(b)) => a == b,
            (Type::Tuple(a), Type::Tuple(b)) => a.is_assignable_from(b),
            _ => false,
        }
    }

    /// Returns true if the item is a value of this type.
    pub fn is_instance(&self, item: &Item) -> bool {
        match self {
            Type::Any => true,
            Type::Value(v) => item.type_id() == v.type_id(),
            Type::Tuple(list) => item
                .downcast_ref::<Tuple>()
                .map_or(false, |tuple| list.is_assignable_from(tuple.type_list())),
        }
    }

    /// Returns the narrowest type that both `a` and `b` are assignable to.
    pub fn common(a: &Type, b: &Type) -> Type {
        if a.is_assignable_from(b) {
            a.clone()
        } else if b.is_assignable_from(a) {
            b.clone()
        } else {
            match (a, b) {
                (Type::Tuple(x), Type::Tuple(y)) if x.len() == y.len() => Type::Tuple(
                    x.iter()
                        .zip(y.iter())
                        .map(|(s, t)| Type::common(s, t))
                        .collect(),
                ),
                _ => Type::Any,
            }
        }
    }

    /// Returns the slot types if this is a tuple type.
    pub fn as_tuple(&self) -> Option<&TypeList> {
        match self {
            Type::Tuple(list) => Some(list),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Any => f.write_str("any"),
            Type::Value(v) => f.write_str(v.name()),
            Type::Tuple(list) => fmt::Display::fmt(list, f),
        }
    }
}

/// The slot types of an n-tuple.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeList(Rc<[Type]>);

impl TypeList {
    /// Creates a type list from slot types.
    pub fn new(types: impl IntoIterator<Item = Type>) -> Self {
        Self(types.into_iter().collect())
    }

    /// Returns the type of a slot.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Type> {
        self.0.get(index)
    }

    /// Returns the number of slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no slots.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the slot types.
    pub fn iter(&self) -> core::slice::Iter<'_, Type> {
        self.0.iter()
    }

    /// Returns the slot types as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[Type] {
        &self.0
    }

    /// Returns true if tuples typed by `other` fit every slot of `self`.
    pub fn is_assignable_from(&self, other: &TypeList) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other.iter())
                .all(|(mine, theirs)| mine.is_assignable_from(theirs))
    }
}

impl FromIterator<Type> for TypeList {
    fn from_iter<I: IntoIterator<Item = Type>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl From<Vec<Type>> for TypeList {
    fn from(types: Vec<Type>) -> Self {
        Self(types.into())
    }
}

impl<const N: usize> From<[Type; N]> for TypeList {
    fn from(types: [Type; N]) -> Self {
        Self::new(types)
    }
}

impl fmt::Display for TypeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, ty) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", ty)?;
        }
        f.write_str(")")
    }
}
