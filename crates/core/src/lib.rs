//! Trellis Core - Type descriptors and item sets for the Trellis graph query engine.
//!
//! This crate provides the data layer every query operates on:
//!
//! - `Type` / `TypeList`: runtime descriptors for the values at a graph position
//! - `Item`: a shared, type-erased domain object with value equality
//! - `Tuple`: a fixed-arity heterogeneous record of items
//! - `Queryable`: an immutable item set (empty, singleton or general)
//! - `union` / `intersection` / `subtraction`: set algebra over queryables
//! - `Error`: error types for query construction and evaluation
//!
//! # Example
//!
//! ```rust
//! use trellis_core::{create_queryable, intersection, union, Item, Type};
//!
//! let evens = create_queryable([2i64, 4, 6].map(Item::new), Type::of::<i64>());
//! let small = create_queryable([1i64, 2, 3, 4].map(Item::new), Type::of::<i64>());
//!
//! assert_eq!(intersection(&evens, &small).size(), 2);
//! assert_eq!(union(&evens, &small).size(), 5);
//! assert!(union(&evens, &small).contains(&Item::new(6i64)));
//! ```

mod algebra;
mod error;
pub mod fingerprint;
mod item;
mod queryable;
mod tuple;
mod types;

pub use algebra::{intersection, subtraction, union};
pub use error::{Error, Result};
pub use item::{Item, Object};
pub use queryable::{create_queryable, create_singleton, ItemSet, Iter, Queryable};
pub use tuple::Tuple;
pub use types::{Type, TypeList, ValueType};
