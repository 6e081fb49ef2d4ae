//! Operations over tuple items.
//!
//! Slot indices and slot types are checked when an operation is constructed;
//! at evaluation time the only failures are items that are not tuples of the
//! expected shape.

use crate::executor::Evaluator;
use crate::operation::{Filter, Follow};
use core::any::Any;
use core::fmt;
use std::rc::Rc;
use trellis_core::{Error, Item, Object, Queryable, Result, Tuple, Type, TypeList};

fn expect_tuple<'a>(item: &'a Item, expected: &TypeList, op: &dyn fmt::Display) -> Result<&'a Tuple> {
    let tuple = item.downcast_ref::<Tuple>().ok_or_else(|| {
        Error::operation(format!("{} expects a tuple, got {}", op, item.type_name()))
    })?;
    if !expected.is_assignable_from(tuple.type_list()) {
        return Err(Error::operation(format!(
            "{} expects tuples of {}, got {}",
            op,
            expected,
            tuple.type_list()
        )));
    }
    Ok(tuple)
}

fn slot<'a>(tuple: &'a Tuple, index: usize) -> Result<&'a Item> {
    tuple.get(index).ok_or_else(|| {
        Error::operation(format!(
            "tuple of arity {} has no slot {}",
            tuple.len(),
            index
        ))
    })
}

fn check_index(type_list: &TypeList, index: usize) -> Result<&Type> {
    type_list.get(index).ok_or_else(|| {
        Error::invalid_argument(format!(
            "slot {} out of range for tuple type {}",
            index, type_list
        ))
    })
}

fn replace_slot(type_list: &TypeList, index: usize, ty: &Type) -> TypeList {
    type_list
        .iter()
        .enumerate()
        .map(|(i, t)| if i == index { ty.clone() } else { t.clone() })
        .collect()
}

/// Extracts one slot of a tuple.
#[derive(Clone, Debug, PartialEq)]
pub struct FollowObject {
    index: usize,
    type_list: TypeList,
    input_type: Type,
    output_type: Type,
}

impl FollowObject {
    pub fn new(type_list: impl Into<TypeList>, index: usize) -> Result<Self> {
        let type_list = type_list.into();
        let output_type = check_index(&type_list, index)?.clone();
        Ok(Self {
            index,
            input_type: Type::Tuple(type_list.clone()),
            type_list,
            output_type,
        })
    }

    pub fn input_type(&self) -> &Type {
        &self.input_type
    }

    pub fn output_type(&self) -> &Type {
        &self.output_type
    }

    pub fn follow(&self, item: &Item) -> Result<Queryable> {
        let tuple = expect_tuple(item, &self.type_list, self)?;
        let value = slot(tuple, self.index)?;
        Ok(Queryable::singleton_of(value.clone(), self.output_type.clone()))
    }
}

impl fmt::Display for FollowObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot {}", self.index)
    }
}

/// Reorders tuple slots without copying values.
///
/// Slot `i` of the output is slot `order[i]` of the input; indices may repeat
/// or be left out.
#[derive(Clone, Debug, PartialEq)]
pub struct Permutate {
    order: Rc<[usize]>,
    type_list: TypeList,
    input_type: Type,
    output_type: Type,
}

impl Permutate {
    pub fn new(type_list: impl Into<TypeList>, order: impl Into<Vec<usize>>) -> Result<Self> {
        let type_list = type_list.into();
        let order: Vec<usize> = order.into();
        let permuted = order
            .iter()
            .map(|&i| check_index(&type_list, i).cloned())
            .collect::<Result<TypeList>>()?;
        Ok(Self {
            order: order.into(),
            input_type: Type::Tuple(type_list.clone()),
            type_list,
            output_type: Type::Tuple(permuted),
        })
    }

    /// Returns the slot order.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn input_type(&self) -> &Type {
        &self.input_type
    }

    pub fn output_type(&self) -> &Type {
        &self.output_type
    }

    pub fn follow(&self, item: &Item) -> Result<Queryable> {
        let tuple = expect_tuple(item, &self.type_list, self)?;
        let permuted = Tuple::permuted(tuple, &self.order)?;
        Ok(Queryable::singleton_of(
            Item::new(permuted),
            self.output_type.clone(),
        ))
    }
}

impl fmt::Display for Permutate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "permutate {:?}", self.order)
    }
}

/// Pairs an item with each result of an inner follow.
///
/// The output tuples have type `(inner input, inner output)`.
#[derive(Clone, Debug, PartialEq)]
pub struct FollowToTuple {
    inner: Box<Follow>,
    pair_types: TypeList,
    output_type: Type,
}

impl FollowToTuple {
    pub fn new(inner: impl Into<Follow>) -> Self {
        let inner = inner.into();
        let pair_types = TypeList::from([inner.input_type().clone(), inner.output_type().clone()]);
        Self {
            inner: Box::new(inner),
            output_type: Type::Tuple(pair_types.clone()),
            pair_types,
        }
    }

    /// Returns the wrapped follow.
    pub fn inner(&self) -> &Follow {
        &self.inner
    }

    pub fn input_type(&self) -> &Type {
        self.inner.input_type()
    }

    pub fn output_type(&self) -> &Type {
        &self.output_type
    }

    pub fn follow(&self, item: &Item, cx: &mut Evaluator) -> Result<Queryable> {
        let reached = self.inner.follow(item, cx)?;
        let mut pairs = Vec::with_capacity(reached.size());
        for value in &reached {
            let pair = Tuple::new(vec![item.clone(), value.clone()], self.pair_types.clone())?;
            pairs.push(Item::new(pair));
        }
        Ok(Queryable::from_items(pairs, self.output_type.clone()))
    }
}

impl fmt::Display for FollowToTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "to tuple ({})", self.inner)
    }
}

/// Applies an inner follow to one slot, producing one tuple per result with
/// that slot replaced.
#[derive(Clone, Debug, PartialEq)]
pub struct FollowTupleTo {
    index: usize,
    inner: Box<Follow>,
    type_list: TypeList,
    output_list: TypeList,
    input_type: Type,
    output_type: Type,
}

impl FollowTupleTo {
    pub fn new(type_list: impl Into<TypeList>, index: usize, inner: impl Into<Follow>) -> Result<Self> {
        let type_list = type_list.into();
        let inner = inner.into();
        let slot_type = check_index(&type_list, index)?;
        if !inner.input_type().is_assignable_from(slot_type) {
            return Err(Error::type_mismatch(
                format!("slot {} of {} for {}", index, type_list, inner),
                inner.input_type().clone(),
                slot_type.clone(),
            ));
        }
        let output_list = replace_slot(&type_list, index, inner.output_type());
        Ok(Self {
            index,
            input_type: Type::Tuple(type_list.clone()),
            output_type: Type::Tuple(output_list.clone()),
            inner: Box::new(inner),
            type_list,
            output_list,
        })
    }

    pub fn input_type(&self) -> &Type {
        &self.input_type
    }

    pub fn output_type(&self) -> &Type {
        &self.output_type
    }

    pub fn follow(&self, item: &Item, cx: &mut Evaluator) -> Result<Queryable> {
        let tuple = expect_tuple(item, &self.type_list, self)?;
        let reached = self.inner.follow(slot(tuple, self.index)?, cx)?;
        let mut rebuilt = Vec::with_capacity(reached.size());
        for value in &reached {
            let mut values = tuple.to_vec();
            values[self.index] = value.clone();
            rebuilt.push(Item::new(Tuple::new(values, self.output_list.clone())?));
        }
        Ok(Queryable::from_items(rebuilt, self.output_type.clone()))
    }
}

impl fmt::Display for FollowTupleTo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot {} to ({})", self.index, self.inner)
    }
}

/// Applies a filter to one slot of a tuple.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterByIndex {
    index: usize,
    filter: Box<Filter>,
    type_list: TypeList,
    item_type: Type,
}

impl FilterByIndex {
    pub fn new(type_list: impl Into<TypeList>, index: usize, filter: Filter) -> Result<Self> {
        let type_list = type_list.into();
        let slot_type = check_index(&type_list, index)?;
        if !filter.item_type().is_assignable_from(slot_type) {
            return Err(Error::type_mismatch(
                format!("slot {} of {} for {}", index, type_list, filter),
                filter.item_type().clone(),
                slot_type.clone(),
            ));
        }
        Ok(Self {
            index,
            filter: Box::new(filter),
            item_type: Type::Tuple(type_list.clone()),
            type_list,
        })
    }

    /// Returns the slot filter.
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn item_type(&self) -> &Type {
        &self.item_type
    }

    pub fn accept(&self, item: &Item, cx: &mut Evaluator) -> Result<bool> {
        let tuple = expect_tuple(item, &self.type_list, self)?;
        self.filter.accept(slot(tuple, self.index)?, cx)
    }
}

impl fmt::Display for FilterByIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot {} {}", self.index, self.filter)
    }
}

type Function = dyn Fn(&[Item]) -> Result<Item>;

/// A function bound to the trailing slots of a tuple.
///
/// The last `arity` slots are the arguments, receiver first. They are
/// replaced by the function result; when the function consumes the whole
/// tuple the bare result is produced instead of a 1-tuple.
#[derive(Clone)]
pub struct FollowFunction {
    name: Rc<str>,
    function: Rc<Function>,
    type_list: TypeList,
    kept: usize,
    returns: Type,
    output_list: Option<TypeList>,
    input_type: Type,
    output_type: Type,
}

impl FollowFunction {
    /// Binds `function` over the trailing `params.len()` slots of `input`.
    ///
    /// Fails with a type mismatch if the tuple is too short or a slot cannot
    /// be passed as the matching parameter.
    pub fn new<F>(
        name: impl Into<String>,
        input: impl Into<TypeList>,
        params: impl Into<TypeList>,
        returns: Type,
        function: F,
    ) -> Result<Self>
    where
        F: Fn(&[Item]) -> Result<Item> + 'static,
    {
        let name: String = name.into();
        let type_list = input.into();
        let params = params.into();
        if params.is_empty() {
            return Err(Error::invalid_argument(format!(
                "function '{}' needs at least a receiver",
                name
            )));
        }
        if type_list.len() < params.len() {
            return Err(Error::type_mismatch(
                format!("arguments of '{}'", name),
                Type::Tuple(params),
                Type::Tuple(type_list),
            ));
        }
        let kept = type_list.len() - params.len();
        for (i, param) in params.iter().enumerate() {
            let slot_type = &type_list.as_slice()[kept + i];
            if !param.is_assignable_from(slot_type) {
                return Err(Error::type_mismatch(
                    format!("argument {} of '{}'", i, name),
                    param.clone(),
                    slot_type.clone(),
                ));
            }
        }
        let output_list = (kept > 0).then(|| {
            type_list.as_slice()[..kept]
                .iter()
                .cloned()
                .chain(core::iter::once(returns.clone()))
                .collect::<TypeList>()
        });
        let output_type = match &output_list {
            Some(list) => Type::Tuple(list.clone()),
            None => returns.clone(),
        };
        Ok(Self {
            name: name.into(),
            function: Rc::new(function),
            input_type: Type::Tuple(type_list.clone()),
            type_list,
            kept,
            returns,
            output_list,
            output_type,
        })
    }

    /// Binds a typed one-argument function to the last slot.
    pub fn unary<A, R>(
        name: impl Into<String>,
        input: impl Into<TypeList>,
        function: impl Fn(&A) -> R + 'static,
    ) -> Result<Self>
    where
        A: Any,
        R: Object,
    {
        let name: String = name.into();
        let label = name.clone();
        Self::new(name, input, [Type::of::<A>()], Type::of::<R>(), move |args| {
            let a = downcast_arg::<A>(&label, args, 0)?;
            Ok(Item::new(function(a)))
        })
    }

    /// Binds a typed two-argument function to the last two slots.
    pub fn binary<A, B, R>(
        name: impl Into<String>,
        input: impl Into<TypeList>,
        function: impl Fn(&A, &B) -> R + 'static,
    ) -> Result<Self>
    where
        A: Any,
        B: Any,
        R: Object,
    {
        let name: String = name.into();
        let label = name.clone();
        Self::new(
            name,
            input,
            [Type::of::<A>(), Type::of::<B>()],
            Type::of::<R>(),
            move |args| {
                let a = downcast_arg::<A>(&label, args, 0)?;
                let b = downcast_arg::<B>(&label, args, 1)?;
                Ok(Item::new(function(a, b)))
            },
        )
    }

    /// Returns the number of slots the function consumes.
    pub fn arity(&self) -> usize {
        self.type_list.len() - self.kept
    }

    pub fn input_type(&self) -> &Type {
        &self.input_type
    }

    pub fn output_type(&self) -> &Type {
        &self.output_type
    }

    pub fn follow(&self, item: &Item) -> Result<Queryable> {
        let tuple = expect_tuple(item, &self.type_list, self)?;
        let values = tuple.to_vec();
        let result = (self.function)(&values[self.kept..])?;
        if !self.returns.is_instance(&result) {
            return Err(Error::operation(format!(
                "'{}' returned {}, expected {}",
                self.name,
                result.type_name(),
                self.returns
            )));
        }
        let out = match &self.output_list {
            None => result,
            Some(list) => {
                let mut values = values;
                values.truncate(self.kept);
                values.push(result);
                Item::new(Tuple::new(values, list.clone())?)
            }
        };
        Ok(Queryable::singleton_of(out, self.output_type.clone()))
    }
}

fn downcast_arg<'a, T: Any>(name: &str, args: &'a [Item], index: usize) -> Result<&'a T> {
    args.get(index)
        .and_then(|arg| arg.downcast_ref::<T>())
        .ok_or_else(|| {
            Error::operation(format!(
                "argument {} of '{}' is not a {}",
                index,
                name,
                core::any::type_name::<T>()
            ))
        })
}

impl PartialEq for FollowFunction {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.function, &other.function) && self.type_list == other.type_list
    }
}

impl fmt::Debug for FollowFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FollowFunction")
            .field("name", &self.name)
            .field("input", &self.type_list)
            .field("arity", &self.arity())
            .finish()
    }
}

impl fmt::Display for FollowFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<FilterByIndex> for Filter {
    fn from(filter: FilterByIndex) -> Self {
        Filter::ByIndex(filter)
    }
}

impl From<FollowObject> for Follow {
    fn from(follow: FollowObject) -> Self {
        Follow::Object(follow)
    }
}

impl From<Permutate> for Follow {
    fn from(follow: Permutate) -> Self {
        Follow::Permutate(follow)
    }
}

impl From<FollowToTuple> for Follow {
    fn from(follow: FollowToTuple) -> Self {
        Follow::ToTuple(follow)
    }
}

impl From<FollowTupleTo> for Follow {
    fn from(follow: FollowTupleTo) -> Self {
        Follow::TupleTo(follow)
    }
}

impl From<FollowFunction> for Follow {
    fn from(follow: FollowFunction) -> Self {
        Follow::Function(follow)
    }
}
