// Copyright 2026 the Adapter Forms Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Runtime values.
//!
//! A [`Value`] is one erased slot: `I`, `J`, `F`, `D` carry their primitive bits and `L` is
//! either `Null` or a shared [`Object`]. Sub-int primitives travel as `Int` and are narrowed by
//! the conversion routines that consume them.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::adapter::Adapter;
use crate::basic_type::BasicType;
use crate::error::{ErrorKind, Thrown};
use crate::types::{ElemType, Primitive, RefType, ValueType};

/// One erased runtime slot.
#[derive(Clone, Debug)]
pub enum Value {
    /// `I` slot.
    Int(i32),
    /// `J` slot.
    Long(i64),
    /// `F` slot.
    Float(f32),
    /// `D` slot.
    Double(f64),
    /// The null reference. Also the result of a `void` invocation.
    Null,
    /// A non-null reference.
    Obj(Arc<Object>),
}

impl Value {
    /// Returns the basic type of this slot.
    #[must_use]
    pub const fn basic_type(&self) -> BasicType {
        match self {
            Self::Int(_) => BasicType::I,
            Self::Long(_) => BasicType::J,
            Self::Float(_) => BasicType::F,
            Self::Double(_) => BasicType::D,
            Self::Null | Self::Obj(_) => BasicType::L,
        }
    }

    /// Wraps an object.
    #[must_use]
    pub fn object(object: Object) -> Self {
        Self::Obj(Arc::new(object))
    }

    /// A boxed primitive.
    #[must_use]
    pub fn boxed(b: Boxed) -> Self {
        Self::object(Object::Boxed(b))
    }

    /// A string.
    #[must_use]
    pub fn string(s: &str) -> Self {
        Self::object(Object::Str(s.into()))
    }

    /// A type token for casts.
    #[must_use]
    pub fn type_token(ty: ValueType) -> Self {
        Self::object(Object::Type(TypeToken::Value(ty)))
    }

    /// A type token naming an error kind.
    #[must_use]
    pub fn error_kind(kind: ErrorKind) -> Self {
        Self::object(Object::Type(TypeToken::Error(kind)))
    }

    /// Returns the `I` payload.
    #[must_use]
    pub const fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the `J` payload.
    #[must_use]
    pub const fn as_long(&self) -> Option<i64> {
        match self {
            Self::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the `F` payload.
    #[must_use]
    pub const fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the `D` payload.
    #[must_use]
    pub const fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns `true` for the null reference.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the referenced object.
    #[must_use]
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Obj(o) => Some(o),
            _ => None,
        }
    }

    /// Returns the boxed primitive if this references one.
    #[must_use]
    pub fn as_boxed(&self) -> Option<Boxed> {
        match self.as_object()? {
            Object::Boxed(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the referenced adapter.
    #[must_use]
    pub fn as_adapter(&self) -> Option<&Adapter> {
        match self.as_object()? {
            Object::Adapter(a) => Some(a),
            _ => None,
        }
    }

    /// Returns the referenced array.
    #[must_use]
    pub fn as_array(&self) -> Option<&Array> {
        match self.as_object()? {
            Object::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Returns the referenced thrown error.
    #[must_use]
    pub fn as_thrown(&self) -> Option<&Thrown> {
        match self.as_object()? {
            Object::Error(t) => Some(t),
            _ => None,
        }
    }

    /// Returns the referenced string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self.as_object()? {
            Object::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the referenced cursor.
    #[must_use]
    pub fn as_cursor(&self) -> Option<&Cursor> {
        match self.as_object()? {
            Object::Cursor(c) => Some(c),
            _ => None,
        }
    }

    /// Returns the referenced type token.
    #[must_use]
    pub fn as_type_token(&self) -> Option<TypeToken> {
        match self.as_object()? {
            Object::Type(t) => Some(*t),
            _ => None,
        }
    }

    /// The dynamic type of a reference; `None` for null and primitive slots.
    #[must_use]
    pub fn runtime_type(&self) -> Option<ValueType> {
        self.as_object().map(Object::runtime_type)
    }

    /// Boxes a primitive slot with its natural wrapper; references pass through.
    #[must_use]
    pub fn into_reference(self) -> Self {
        match self {
            Self::Int(v) => Self::boxed(Boxed::Int(v)),
            Self::Long(v) => Self::boxed(Boxed::Long(v)),
            Self::Float(v) => Self::boxed(Boxed::Float(v)),
            Self::Double(v) => Self::boxed(Boxed::Double(v)),
            r @ (Self::Null | Self::Obj(_)) => r,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Long(a), Self::Long(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Double(a), Self::Double(b)) => a.to_bits() == b.to_bits(),
            (Self::Null, Self::Null) => true,
            (Self::Obj(a), Self::Obj(b)) => Arc::ptr_eq(a, b) || **a == **b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}L"),
            Self::Float(v) => write!(f, "{v}f"),
            Self::Double(v) => write!(f, "{v}d"),
            Self::Null => f.write_str("null"),
            Self::Obj(o) => write!(f, "{o}"),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Int(i32::from(v))
    }
}

impl From<Adapter> for Value {
    fn from(a: Adapter) -> Self {
        Self::object(Object::Adapter(a))
    }
}

impl From<Thrown> for Value {
    fn from(t: Thrown) -> Self {
        Self::object(Object::Error(t))
    }
}

impl From<Array> for Value {
    fn from(a: Array) -> Self {
        Self::object(Object::Array(a))
    }
}

impl From<Cursor> for Value {
    fn from(c: Cursor) -> Self {
        Self::object(Object::Cursor(c))
    }
}

/// A heap object.
#[derive(Debug)]
pub enum Object {
    /// A boxed primitive.
    Boxed(Boxed),
    /// An immutable string.
    Str(Box<str>),
    /// A fixed-length, mutable array.
    Array(Array),
    /// A thrown error captured as a value.
    Error(Thrown),
    /// An adapter.
    Adapter(Adapter),
    /// A type token.
    Type(TypeToken),
    /// A cursor over an array.
    Cursor(Cursor),
}

impl Object {
    /// The dynamic type of this object.
    #[must_use]
    pub fn runtime_type(&self) -> ValueType {
        match self {
            Self::Boxed(b) => ValueType::boxed(b.primitive()),
            Self::Str(_) => ValueType::Ref(RefType::Str),
            Self::Array(a) => ValueType::Array(a.elem()),
            Self::Error(_) => ValueType::Ref(RefType::Error),
            Self::Adapter(_) => ValueType::Ref(RefType::Adapter),
            Self::Type(_) => ValueType::Ref(RefType::Type),
            Self::Cursor(_) => ValueType::Ref(RefType::Iterator),
        }
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Boxed(a), Self::Boxed(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a.elem() == b.elem() && a.to_vec() == b.to_vec(),
            (Self::Error(a), Self::Error(b)) => a == b,
            (Self::Adapter(a), Self::Adapter(b)) => a == b,
            (Self::Type(a), Self::Type(b)) => a == b,
            // Cursors carry a position, so only a cursor equals itself.
            (Self::Cursor(a), Self::Cursor(b)) => core::ptr::eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boxed(b) => write!(f, "{b}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Array(a) => {
                write!(f, "{}{{", ValueType::Array(a.elem()))?;
                for (i, v) in a.to_vec().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("}")
            }
            Self::Error(t) => write!(f, "{t}"),
            Self::Adapter(a) => write!(f, "Adapter{}", a.ty()),
            Self::Type(t) => write!(f, "{t}"),
            Self::Cursor(c) => write!(f, "Iterator@{} over {}", c.position(), c.source),
        }
    }
}

/// A boxed primitive, exact in its wrapper type.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Boxed {
    /// `Boolean`
    Boolean(bool),
    /// `Byte`
    Byte(i8),
    /// `Short`
    Short(i16),
    /// `Character`
    Char(u16),
    /// `Integer`
    Int(i32),
    /// `Long`
    Long(i64),
    /// `Float`
    Float(f32),
    /// `Double`
    Double(f64),
}

impl Boxed {
    /// The wrapped primitive type.
    #[must_use]
    pub const fn primitive(self) -> Primitive {
        match self {
            Self::Boolean(_) => Primitive::Boolean,
            Self::Byte(_) => Primitive::Byte,
            Self::Short(_) => Primitive::Short,
            Self::Char(_) => Primitive::Char,
            Self::Int(_) => Primitive::Int,
            Self::Long(_) => Primitive::Long,
            Self::Float(_) => Primitive::Float,
            Self::Double(_) => Primitive::Double,
        }
    }

    /// Boxes an erased slot as primitive `p`, narrowing sub-int slots.
    ///
    /// Returns `None` if the slot kind does not match `p`'s basic type.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "sub-int primitives travel widened in an I slot"
    )]
    pub fn from_slot(p: Primitive, v: &Value) -> Option<Self> {
        Some(match (p, v) {
            (Primitive::Boolean, Value::Int(x)) => Self::Boolean(x & 1 != 0),
            (Primitive::Byte, Value::Int(x)) => Self::Byte(*x as i8),
            (Primitive::Short, Value::Int(x)) => Self::Short(*x as i16),
            (Primitive::Char, Value::Int(x)) => Self::Char(*x as u16),
            (Primitive::Int, Value::Int(x)) => Self::Int(*x),
            (Primitive::Long, Value::Long(x)) => Self::Long(*x),
            (Primitive::Float, Value::Float(x)) => Self::Float(*x),
            (Primitive::Double, Value::Double(x)) => Self::Double(*x),
            _ => return None,
        })
    }

    /// Unboxes into an erased slot.
    #[must_use]
    pub fn to_slot(self) -> Value {
        match self {
            Self::Boolean(b) => Value::Int(i32::from(b)),
            Self::Byte(x) => Value::Int(i32::from(x)),
            Self::Short(x) => Value::Int(i32::from(x)),
            Self::Char(x) => Value::Int(i32::from(x)),
            Self::Int(x) => Value::Int(x),
            Self::Long(x) => Value::Long(x),
            Self::Float(x) => Value::Float(x),
            Self::Double(x) => Value::Double(x),
        }
    }
}

impl fmt::Display for Boxed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.primitive().wrapper_name())?;
        match self {
            Self::Boolean(b) => write!(f, "{b}")?,
            Self::Byte(x) => write!(f, "{x}")?,
            Self::Short(x) => write!(f, "{x}")?,
            Self::Char(x) => write!(f, "{x}")?,
            Self::Int(x) => write!(f, "{x}")?,
            Self::Long(x) => write!(f, "{x}")?,
            Self::Float(x) => write!(f, "{x}")?,
            Self::Double(x) => write!(f, "{x}")?,
        }
        f.write_str(")")
    }
}

/// A runtime type token.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeToken {
    /// A value type, used by casts and array factories.
    Value(ValueType),
    /// An error kind, used by guarded catch.
    Error(ErrorKind),
}

impl fmt::Display for TypeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(ty) => write!(f, "type {ty}"),
            Self::Error(kind) => write!(f, "kind {kind}"),
        }
    }
}

/// A fixed-length array of erased slots.
///
/// Stores narrow sub-int elements and check reference elements against the element type.
#[derive(Debug)]
pub struct Array {
    elem: ElemType,
    slots: RwLock<Vec<Value>>,
}

impl Array {
    /// Creates a zero-filled array.
    #[must_use]
    pub fn new(elem: ElemType, len: usize) -> Self {
        let zero = match elem {
            ElemType::Prim(p) => p.basic_type().zero(),
            ElemType::Ref(_) => Value::Null,
        };
        Self {
            elem,
            slots: RwLock::new(alloc::vec![zero; len]),
        }
    }

    /// Creates an array holding `values`, storing each one as [`Array::set`] would.
    pub fn from_values(elem: ElemType, values: Vec<Value>) -> Result<Self, Thrown> {
        let array = Self::new(elem, values.len());
        for (i, v) in values.into_iter().enumerate() {
            array.set(i, v)?;
        }
        Ok(array)
    }

    /// The element type.
    #[must_use]
    #[inline]
    pub fn elem(&self) -> ElemType {
        self.elem
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// Returns `true` if the array has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Loads element `index`.
    pub fn get(&self, index: usize) -> Result<Value, Thrown> {
        self.slots
            .read()
            .get(index)
            .cloned()
            .ok_or_else(|| out_of_bounds(index, self.len()))
    }

    /// Stores element `index`.
    pub fn set(&self, index: usize, value: Value) -> Result<(), Thrown> {
        let value = self.check_store(value)?;
        let mut slots = self.slots.write();
        let len = slots.len();
        let slot = slots.get_mut(index).ok_or_else(|| out_of_bounds(index, len))?;
        *slot = value;
        Ok(())
    }

    /// Copies the elements out.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Value> {
        self.slots.read().clone()
    }

    /// Runs `f` with exclusive access to the elements.
    pub(crate) fn with_slots_mut<R>(&self, f: impl FnOnce(&mut [Value]) -> R) -> R {
        f(&mut self.slots.write())
    }

    fn check_store(&self, value: Value) -> Result<Value, Thrown> {
        match self.elem {
            ElemType::Prim(p) => Boxed::from_slot(p, &value)
                .map(Boxed::to_slot)
                .ok_or_else(|| {
                    Thrown::new(
                        ErrorKind::ArrayStore,
                        format!("cannot store {} slot in {}[]", value.basic_type(), p.name()),
                    )
                }),
            ElemType::Ref(r) => match value.runtime_type() {
                None if value.is_null() => Ok(value),
                Some(ty) if ValueType::Ref(r).is_assignable_from(ty) => Ok(value),
                _ => Err(Thrown::new(
                    ErrorKind::ArrayStore,
                    format!("cannot store {value} in {r}[]"),
                )),
            },
        }
    }
}

/// A forward cursor over the elements of an array.
///
/// The cursor reads the array as it is when each element is taken, so stores ahead of the
/// cursor are observed.
#[derive(Debug)]
pub struct Cursor {
    source: Value,
    next: AtomicUsize,
}

impl Cursor {
    /// Starts a cursor at the first element of `array`.
    ///
    /// Fails with `NullPointer` for `null` and `ClassCast` for anything but an array.
    pub fn over(array: &Value) -> Result<Self, Thrown> {
        if array.is_null() {
            return Err(Thrown::null_pointer("cannot iterate null"));
        }
        if array.as_array().is_none() {
            return Err(Thrown::class_cast(format!("{array} is not iterable")));
        }
        Ok(Self {
            source: array.clone(),
            next: AtomicUsize::new(0),
        })
    }

    /// Index of the element the next call to [`Cursor::next`] returns.
    #[must_use]
    pub fn position(&self) -> usize {
        self.next.load(Ordering::Relaxed)
    }

    /// Returns `true` if elements remain.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.source
            .as_array()
            .is_some_and(|a| self.position() < a.len())
    }

    /// Takes the next element, boxed if primitive.
    ///
    /// Past the end this fails with `IndexOutOfBounds`.
    pub fn next(&self) -> Result<Value, Thrown> {
        let array = self
            .source
            .as_array()
            .ok_or_else(|| Thrown::internal("cursor lost its array"))?;
        let index = self.next.fetch_add(1, Ordering::Relaxed);
        let value = array.get(index).inspect_err(|_| {
            self.next.store(index, Ordering::Relaxed);
        })?;
        Ok(match array.elem() {
            ElemType::Prim(p) => Boxed::from_slot(p, &value).map_or(value, Value::boxed),
            ElemType::Ref(_) => value,
        })
    }
}

fn out_of_bounds(index: usize, len: usize) -> Thrown {
    Thrown::new(
        ErrorKind::IndexOutOfBounds,
        format!("index {index} out of bounds for length {len}"),
    )
}
