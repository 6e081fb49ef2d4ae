//! Immutable item sets.
//!
//! A `Queryable` is the unit of data flowing along arcs. It has three
//! representations so that the very common empty and one-item cases never
//! allocate a hash set:
//!
//! - `Empty`: no items.
//! - `Singleton`: exactly one item.
//! - `General`: a deduplicated hash set (normally of two or more items).
//!
//! Equality is set equality plus equality of the declared item type; the
//! concrete representation never matters.

use crate::fingerprint::{fingerprint, unordered_fingerprint};
use crate::item::Item;
use crate::types::Type;
use core::fmt;
use core::hash::{Hash, Hasher};
use hashbrown::HashSet;
use std::rc::Rc;

/// Backing store of a general item set.
#[derive(Debug)]
pub struct ItemSet {
    items: HashSet<Item>,
    item_type: Type,
    fingerprint: u64,
}

impl ItemSet {
    fn new(items: HashSet<Item>, item_type: Type) -> Self {
        let fingerprint = unordered_fingerprint(&items);
        Self {
            items,
            item_type,
            fingerprint,
        }
    }
}

/// An immutable set of items with an advisory item type.
#[derive(Clone, Debug)]
pub enum Queryable {
    Empty(Type),
    Singleton(Item, Type),
    General(Rc<ItemSet>),
}

impl Queryable {
    /// Creates an empty set.
    #[inline]
    pub fn empty(item_type: Type) -> Self {
        Queryable::Empty(item_type)
    }

    /// Creates a one-item set typed by the item's concrete type.
    pub fn singleton(item: Item) -> Self {
        let item_type = Type::of_item(&item);
        Queryable::Singleton(item, item_type)
    }

    /// Creates a one-item set with an explicit item type.
    #[inline]
    pub fn singleton_of(item: Item, item_type: Type) -> Self {
        Queryable::Singleton(item, item_type)
    }

    /// Creates a set from items, dropping duplicates and picking the
    /// cheapest representation.
    pub fn from_items(items: impl IntoIterator<Item = Item>, item_type: Type) -> Self {
        Self::from_set(items.into_iter().collect(), item_type)
    }

    /// Creates a set from an already deduplicated hash set.
    pub fn from_set(items: HashSet<Item>, item_type: Type) -> Self {
        match items.len() {
            0 => Queryable::Empty(item_type),
            1 => match items.into_iter().next() {
                Some(item) => Queryable::Singleton(item, item_type),
                None => Queryable::Empty(item_type),
            },
            _ => Queryable::General(Rc::new(ItemSet::new(items, item_type))),
        }
    }

    /// Returns the number of items.
    pub fn size(&self) -> usize {
        match self {
            Queryable::Empty(_) => 0,
            Queryable::Singleton(..) => 1,
            Queryable::General(set) => set.items.len(),
        }
    }

    /// Returns true if there are no items.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Returns the declared item type.
    pub fn item_type(&self) -> &Type {
        match self {
            Queryable::Empty(ty) | Queryable::Singleton(_, ty) => ty,
            Queryable::General(set) => &set.item_type,
        }
    }

    /// Returns true if the item is in the set.
    pub fn contains(&self, item: &Item) -> bool {
        match self {
            Queryable::Empty(_) => false,
            Queryable::Singleton(only, _) => only == item,
            Queryable::General(set) => set.items.contains(item),
        }
    }

    /// Iterates over the items in unspecified order.
    pub fn iter(&self) -> Iter<'_> {
        match self {
            Queryable::Empty(_) => Iter::Empty,
            Queryable::Singleton(item, _) => Iter::Once(Some(item)),
            Queryable::General(set) => Iter::Set(set.items.iter()),
        }
    }

    /// Returns the only item of a singleton set.
    pub fn as_singleton(&self) -> Option<&Item> {
        match self {
            Queryable::Singleton(item, _) => Some(item),
            _ => None,
        }
    }

    /// Returns the same items under a different declared type.
    pub fn with_type(&self, item_type: Type) -> Self {
        match self {
            Queryable::Empty(_) => Queryable::Empty(item_type),
            Queryable::Singleton(item, _) => Queryable::Singleton(item.clone(), item_type),
            Queryable::General(set) => Queryable::General(Rc::new(ItemSet {
                items: set.items.clone(),
                item_type,
                fingerprint: set.fingerprint,
            })),
        }
    }

    /// Copies the items into a hash set.
    pub fn to_set(&self) -> HashSet<Item> {
        self.iter().cloned().collect()
    }

    /// Returns the subset of items for which `accept` returns true.
    pub fn try_filter<E>(
        &self,
        mut accept: impl FnMut(&Item) -> Result<bool, E>,
    ) -> Result<Queryable, E> {
        match self {
            Queryable::Empty(_) => Ok(self.clone()),
            Queryable::Singleton(item, ty) => Ok(if accept(item)? {
                self.clone()
            } else {
                Queryable::Empty(ty.clone())
            }),
            Queryable::General(set) => {
                let mut kept = HashSet::with_capacity(set.items.len());
                for item in set.items.iter() {
                    if accept(item)? {
                        kept.insert(item.clone());
                    }
                }
                if kept.len() == set.items.len() {
                    return Ok(self.clone());
                }
                Ok(Queryable::from_set(kept, set.item_type.clone()))
            }
        }
    }

    fn items_fingerprint(&self) -> u64 {
        match self {
            Queryable::Empty(_) => 0,
            Queryable::Singleton(item, _) => fingerprint(item),
            Queryable::General(set) => set.fingerprint,
        }
    }
}

impl PartialEq for Queryable {
    fn eq(&self, other: &Self) -> bool {
        if self.item_type() != other.item_type() || self.size() != other.size() {
            return false;
        }
        match (self, other) {
            (Queryable::General(a), Queryable::General(b)) if Rc::ptr_eq(a, b) => true,
            (Queryable::General(a), Queryable::General(b)) if a.fingerprint != b.fingerprint => {
                false
            }
            _ => self.iter().all(|item| other.contains(item)),
        }
    }
}

impl Eq for Queryable {}

impl Hash for Queryable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.item_type().hash(state);
        self.size().hash(state);
        self.items_fingerprint().hash(state);
    }
}

impl fmt::Display for Queryable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, item) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", item)?;
        }
        f.write_str("}")
    }
}

impl<'a> IntoIterator for &'a Queryable {
    type Item = &'a Item;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

/// Iterator over the items of a `Queryable`.
pub enum Iter<'a> {
    Empty,
    Once(Option<&'a Item>),
    Set(hashbrown::hash_set::Iter<'a, Item>),
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Item;

    fn next(&mut self) -> Option<&'a Item> {
        match self {
            Iter::Empty => None,
            Iter::Once(item) => item.take(),
            Iter::Set(iter) => iter.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Iter::Empty => (0, Some(0)),
            Iter::Once(item) => {
                let n = usize::from(item.is_some());
                (n, Some(n))
            }
            Iter::Set(iter) => iter.size_hint(),
        }
    }
}

/// Creates a set of items with a declared item type.
pub fn create_queryable(items: impl IntoIterator<Item = Item>, item_type: Type) -> Queryable {
    Queryable::from_items(items, item_type)
}

/// Creates a one-item set.
pub fn create_singleton(item: Item) -> Queryable {
    Queryable::singleton(item)
}
