//! Fixed-arity heterogeneous records.
//!
//! Tuples let a walk carry more than one live value, e.g. an original item
//! together with the result of a nested selection. A permuted tuple is a view
//! over another tuple that reorders (or repeats, or drops) its slots without
//! copying any values.

use crate::error::{Error, Result};
use crate::item::Item;
use crate::types::{Type, TypeList};
use core::fmt;
use core::hash::{Hash, Hasher};
use std::rc::Rc;

#[derive(Clone)]
enum Slots {
    Owned(Rc<[Item]>),
    Permuted { source: Rc<Tuple>, order: Rc<[usize]> },
}

/// An n-tuple of items, typed by a `TypeList`.
#[derive(Clone)]
pub struct Tuple {
    slots: Slots,
    type_list: TypeList,
}

impl Tuple {
    /// Creates a tuple, checking every value against its slot type.
    pub fn new(values: Vec<Item>, type_list: TypeList) -> Result<Self> {
        if values.len() != type_list.len() {
            return Err(Error::invalid_argument(format!(
                "tuple of {} values does not fit type list {}",
                values.len(),
                type_list
            )));
        }
        for (index, (value, ty)) in values.iter().zip(type_list.iter()).enumerate() {
            if !ty.is_instance(value) {
                return Err(Error::type_mismatch(
                    format!("tuple slot {}", index),
                    ty.clone(),
                    Type::of_item(value),
                ));
            }
        }
        Ok(Self {
            slots: Slots::Owned(values.into()),
            type_list,
        })
    }

    /// Creates a tuple typed by the concrete types of its values.
    pub fn from_values(values: Vec<Item>) -> Self {
        let type_list = values.iter().map(Type::of_item).collect();
        Self {
            slots: Slots::Owned(values.into()),
            type_list,
        }
    }

    /// Creates a view of `source` whose slot `i` is `source[order[i]]`.
    pub fn permuted(source: &Tuple, order: &[usize]) -> Result<Self> {
        if let Some(bad) = order.iter().find(|&&i| i >= source.len()) {
            return Err(Error::invalid_argument(format!(
                "permutation index {} out of range for tuple of arity {}",
                bad,
                source.len()
            )));
        }
        let type_list = order
            .iter()
            .map(|&i| source.type_list.as_slice()[i].clone())
            .collect();
        Ok(Self {
            slots: Slots::Permuted {
                source: Rc::new(source.clone()),
                order: order.into(),
            },
            type_list,
        })
    }

    /// Returns the item in a slot.
    pub fn get(&self, index: usize) -> Option<&Item> {
        match &self.slots {
            Slots::Owned(values) => values.get(index),
            Slots::Permuted { source, order } => {
                order.get(index).and_then(|&i| source.get(i))
            }
        }
    }

    /// Returns the number of slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.type_list.len()
    }

    /// Returns true for the 0-tuple.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the slot types.
    #[inline]
    pub fn type_list(&self) -> &TypeList {
        &self.type_list
    }

    /// Returns true if this tuple is a view over another tuple.
    #[inline]
    pub fn is_permuted(&self) -> bool {
        matches!(self.slots, Slots::Permuted { .. })
    }

    /// Iterates over the slot values in order.
    pub fn iter(&self) -> impl Iterator<Item = &Item> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// Copies the slot values into a vector.
    pub fn to_vec(&self) -> Vec<Item> {
        self.iter().cloned().collect()
    }
}

impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl Eq for Tuple {}

impl Hash for Tuple {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        for item in self.iter() {
            item.hash(state);
        }
    }
}

impl fmt::Debug for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut t = f.debug_tuple("");
        for item in self.iter() {
            t.field(item);
        }
        t.finish()
    }
}
