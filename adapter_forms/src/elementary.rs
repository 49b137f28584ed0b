// Copyright 2026 the Adapter Forms Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Elementary operations: the fixed routines a names graph may reference.
//!
//! This module also hosts the registry of value routines (primitive conversions, boxing,
//! unboxing) and array element access, each interned per key.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec;
use core::fmt;
use std::sync::LazyLock;

use crate::basic_type::BasicType;
use crate::cache::PublishOnceMap;
use crate::error::{ErrorKind, Thrown};
use crate::types::{ElemType, MethodType, Primitive, RefType, ValueType};
use crate::value::{Array, Boxed, Value};

/// Executable logic behind an elementary operation.
pub type Routine = dyn Fn(&[Value]) -> Result<Value, Thrown> + Send + Sync;

/// Tags recognised by compilers and by adapter introspection.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Intrinsic {
    /// No special meaning.
    None,
    /// Picks one of two adapters from a boolean.
    SelectAlternative,
    /// Invokes a target inside a catch scope.
    GuardWithCatch,
    /// Invokes a target with a cleanup on every exit path.
    TryFinally,
    /// Runs a clause loop.
    Loop,
    /// Allocates an array from its arguments.
    NewArray,
    /// Array element load.
    ArrayLoad,
    /// Array element store.
    ArrayStore,
    /// Array length.
    ArrayLength,
    /// Returns its array argument.
    IdentityArray,
    /// Records a branch outcome.
    ProfileBoolean,
}

struct ElementaryInner {
    name: Box<str>,
    ty: MethodType,
    intrinsic: Intrinsic,
    routine: Box<Routine>,
}

/// A named, typed routine.
///
/// Arguments arrive as erased slots matching the basic signature of [`Elementary::ty`].
#[derive(Clone)]
pub struct Elementary(Arc<ElementaryInner>);

impl Elementary {
    /// Creates an elementary operation.
    pub fn new(
        name: impl Into<Box<str>>,
        ty: MethodType,
        routine: impl Fn(&[Value]) -> Result<Value, Thrown> + Send + Sync + 'static,
    ) -> Self {
        Self(Arc::new(ElementaryInner {
            name: name.into(),
            ty,
            intrinsic: Intrinsic::None,
            routine: Box::new(routine),
        }))
    }

    /// Creates a tagged elementary operation.
    pub fn with_intrinsic(
        name: impl Into<Box<str>>,
        ty: MethodType,
        intrinsic: Intrinsic,
        routine: impl Fn(&[Value]) -> Result<Value, Thrown> + Send + Sync + 'static,
    ) -> Self {
        Self(Arc::new(ElementaryInner {
            name: name.into(),
            ty,
            intrinsic,
            routine: Box::new(routine),
        }))
    }

    /// The debug name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// The declared type.
    #[must_use]
    pub fn ty(&self) -> &MethodType {
        &self.0.ty
    }

    /// The intrinsic tag.
    #[must_use]
    pub fn intrinsic(&self) -> Intrinsic {
        self.0.intrinsic
    }

    /// Runs the routine.
    #[inline]
    pub fn call(&self, args: &[Value]) -> Result<Value, Thrown> {
        (self.0.routine)(args)
    }
}

impl PartialEq for Elementary {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Elementary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Elementary")
            .field("name", &self.0.name)
            .field("ty", &self.0.ty)
            .field("intrinsic", &self.0.intrinsic)
            .finish_non_exhaustive()
    }
}

/// A value routine key.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueOp {
    /// `(p)q` primitive conversion with cast semantics.
    Convert(Primitive, Primitive),
    /// `(p)Wrapper` exact boxing.
    Box(Primitive),
    /// `(Object)p` unboxing of exactly `p`'s wrapper; the flag makes `null` fail.
    UnboxExact(Primitive, bool),
    /// `(Object)p` unboxing of any wrapper that widens to `p`.
    UnboxWiden(Primitive),
    /// `(Object)p` unboxing of any wrapper with cast semantics; `null` becomes zero.
    UnboxCast(Primitive),
    /// `()T` returning the zero of a basic type.
    Zero(BasicType),
    /// `(T)void` discarding its argument.
    Ignore(BasicType),
    /// `(T)T`
    Identity(BasicType),
}

static VALUE_OPS: LazyLock<PublishOnceMap<ValueOp, Elementary>> =
    LazyLock::new(|| PublishOnceMap::new("value ops"));

/// Returns the interned routine for `op`.
pub fn value_op(op: ValueOp) -> Elementary {
    VALUE_OPS.get_or_create(op, |&op| make_value_op(op))
}

fn make_value_op(op: ValueOp) -> Elementary {
    let object = ValueType::OBJECT;
    match op {
        ValueOp::Convert(from, to) => Elementary::new(
            format!("convert{}To{}", from.wrapper_name(), to.wrapper_name()),
            MethodType::new(ValueType::Prim(to), vec![ValueType::Prim(from)]),
            move |args| convert_primitive(from, to, &args[0]),
        ),
        ValueOp::Box(p) => Elementary::new(
            format!("box{}", p.wrapper_name()),
            MethodType::new(ValueType::boxed(p), vec![ValueType::Prim(p)]),
            move |args| {
                Boxed::from_slot(p, &args[0])
                    .map(Value::boxed)
                    .ok_or_else(|| slot_mismatch(p, &args[0]))
            },
        ),
        ValueOp::UnboxExact(p, strict) => Elementary::new(
            format!("unbox{}", p.wrapper_name()),
            MethodType::new(ValueType::Prim(p), vec![object]),
            move |args| unbox_exact(p, strict, &args[0]),
        ),
        ValueOp::UnboxWiden(p) => Elementary::new(
            format!("unboxWiden{}", p.wrapper_name()),
            MethodType::new(ValueType::Prim(p), vec![object]),
            move |args| unbox_widen(p, &args[0]),
        ),
        ValueOp::UnboxCast(p) => Elementary::new(
            format!("unboxCast{}", p.wrapper_name()),
            MethodType::new(ValueType::Prim(p), vec![object]),
            move |args| unbox_cast(p, &args[0]),
        ),
        ValueOp::Zero(bt) => Elementary::new(
            format!("zero{bt}"),
            MethodType::new(bt.value_type(), vec![]),
            move |_| Ok(bt.zero()),
        ),
        ValueOp::Ignore(bt) => Elementary::new(
            format!("ignore{bt}"),
            MethodType::new(ValueType::Void, vec![bt.value_type()]),
            |_| Ok(Value::Null),
        ),
        ValueOp::Identity(bt) => Elementary::new(
            format!("identity{bt}"),
            MethodType::new(bt.value_type(), vec![bt.value_type()]),
            |args| Ok(args[0].clone()),
        ),
    }
}

/// Converts an erased `from` slot to `to` with explicit-cast semantics.
///
/// Integral narrowing truncates, float to `int` or `long` saturates (NaN becomes 0) and float to a
/// sub-int type saturates to `int` before truncating. `boolean` converts
/// to and from 0/1, and a numeric value converts to `boolean` through its low bit.
pub fn convert_primitive(from: Primitive, to: Primitive, v: &Value) -> Result<Value, Thrown> {
    let b = Boxed::from_slot(from, v).ok_or_else(|| slot_mismatch(from, v))?;
    Ok(cast_boxed(b, to))
}

#[derive(Copy, Clone)]
enum Num {
    Int(i64),
    Float(f32),
    Double(f64),
}

impl Num {
    fn of(b: Boxed) -> Self {
        match b {
            Boxed::Boolean(x) => Self::Int(i64::from(x)),
            Boxed::Byte(x) => Self::Int(i64::from(x)),
            Boxed::Short(x) => Self::Int(i64::from(x)),
            Boxed::Char(x) => Self::Int(i64::from(x)),
            Boxed::Int(x) => Self::Int(i64::from(x)),
            Boxed::Long(x) => Self::Int(x),
            Boxed::Float(x) => Self::Float(x),
            Boxed::Double(x) => Self::Double(x),
        }
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "narrowing is the conversion being implemented"
    )]
    fn to_i32(self) -> i32 {
        match self {
            Self::Int(x) => x as i32,
            Self::Float(x) => x as i32,
            Self::Double(x) => x as i32,
        }
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "narrowing is the conversion being implemented"
    )]
    fn to_i64(self) -> i64 {
        match self {
            Self::Int(x) => x,
            Self::Float(x) => x as i64,
            Self::Double(x) => x as i64,
        }
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "narrowing is the conversion being implemented"
    )]
    fn to_f32(self) -> f32 {
        match self {
            Self::Int(x) => x as f32,
            Self::Float(x) => x,
            Self::Double(x) => x as f32,
        }
    }

    fn to_f64(self) -> f64 {
        match self {
            Self::Int(x) => x as f64,
            Self::Float(x) => f64::from(x),
            Self::Double(x) => x,
        }
    }
}

/// Converts a boxed primitive to primitive `to` with explicit-cast semantics.
#[expect(
    clippy::cast_possible_truncation,
    reason = "narrowing is the conversion being implemented"
)]
pub(crate) fn cast_boxed(b: Boxed, to: Primitive) -> Value {
    let n = Num::of(b);
    match to {
        Primitive::Boolean => Value::Int(match n {
            Num::Int(x) => i32::from(x & 1 != 0),
            other => other.to_i32() & 1,
        }),
        // Sub-int targets narrow from the saturated int, not the long.
        Primitive::Byte => Value::Int(i32::from(n.to_i32() as i8)),
        Primitive::Short => Value::Int(i32::from(n.to_i32() as i16)),
        Primitive::Char => Value::Int(i32::from(n.to_i32() as u16)),
        Primitive::Int => Value::Int(n.to_i32()),
        Primitive::Long => Value::Long(n.to_i64()),
        Primitive::Float => Value::Float(n.to_f32()),
        Primitive::Double => Value::Double(n.to_f64()),
    }
}

fn unbox_exact(p: Primitive, strict: bool, v: &Value) -> Result<Value, Thrown> {
    if v.is_null() {
        return if strict {
            Err(Thrown::null_pointer(format!("cannot unbox null as {}", p.name())))
        } else {
            Ok(p.basic_type().zero())
        };
    }
    match v.as_boxed() {
        Some(b) if b.primitive() == p => Ok(b.to_slot()),
        _ => Err(cannot_unbox(v, p)),
    }
}

fn unbox_widen(p: Primitive, v: &Value) -> Result<Value, Thrown> {
    if v.is_null() {
        return Err(Thrown::null_pointer(format!("cannot unbox null as {}", p.name())));
    }
    match v.as_boxed() {
        Some(b) if b.primitive().widens_to(p) => Ok(cast_boxed(b, p)),
        _ => Err(cannot_unbox(v, p)),
    }
}

fn unbox_cast(p: Primitive, v: &Value) -> Result<Value, Thrown> {
    if v.is_null() {
        return Ok(p.basic_type().zero());
    }
    match v.as_boxed() {
        Some(b) => Ok(cast_boxed(b, p)),
        None => Err(cannot_unbox(v, p)),
    }
}

fn cannot_unbox(v: &Value, p: Primitive) -> Thrown {
    Thrown::class_cast(format!("cannot unbox {v} as {}", p.name()))
}

fn slot_mismatch(p: Primitive, v: &Value) -> Thrown {
    Thrown::internal(format!(
        "expected {} slot for {}, found {}",
        p.basic_type(),
        p.name(),
        v.basic_type()
    ))
}

/// An array element access kind.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ArrayAccess {
    /// `(A, int)E`
    Get,
    /// `(A, int, E)void`
    Set,
    /// `(A)int`
    Length,
}

impl ArrayAccess {
    /// The intrinsic tag of adapters performing this access.
    #[must_use]
    pub const fn intrinsic(self) -> Intrinsic {
        match self {
            Self::Get => Intrinsic::ArrayLoad,
            Self::Set => Intrinsic::ArrayStore,
            Self::Length => Intrinsic::ArrayLength,
        }
    }

    /// The access type for arrays of type `array_type` with element `elem`.
    #[must_use]
    pub fn method_type(self, array_type: ValueType, elem: ValueType) -> MethodType {
        match self {
            Self::Get => MethodType::new(elem, vec![array_type, ValueType::INT]),
            Self::Set => MethodType::new(ValueType::Void, vec![array_type, ValueType::INT, elem]),
            Self::Length => MethodType::new(ValueType::INT, vec![array_type]),
        }
    }
}

/// Reference-element arrays share one routine typed over `Object[]`.
fn erase_elem(elem: ElemType) -> ElemType {
    match elem {
        ElemType::Prim(_) => elem,
        ElemType::Ref(_) => ElemType::Ref(RefType::Object),
    }
}

static ARRAY_OPS: LazyLock<PublishOnceMap<(ArrayAccess, ElemType), Elementary>> =
    LazyLock::new(|| PublishOnceMap::new("array ops"));

/// Returns the interned element access routine for arrays of `elem`, typed over the erased
/// array type (`Object[]` for reference elements).
pub fn array_op(access: ArrayAccess, elem: ElemType) -> Elementary {
    let elem = erase_elem(elem);
    ARRAY_OPS.get_or_create((access, elem), |&(access, elem)| {
        let ty = access.method_type(ValueType::Array(elem), elem.value_type());
        let name = match access {
            ArrayAccess::Get => "arrayGet",
            ArrayAccess::Set => "arraySet",
            ArrayAccess::Length => "arrayLength",
        };
        Elementary::with_intrinsic(name, ty, access.intrinsic(), move |args| {
            let array = array_arg(&args[0], elem)?;
            match access {
                ArrayAccess::Get => array.get(index_arg(&args[1])?),
                ArrayAccess::Set => {
                    array.set(index_arg(&args[1])?, args[2].clone())?;
                    Ok(Value::Null)
                }
                ArrayAccess::Length => Ok(Value::Int(length_value(array.len()))),
            }
        })
    })
}

pub(crate) fn array_arg(v: &Value, elem: ElemType) -> Result<&Array, Thrown> {
    if v.is_null() {
        return Err(Thrown::null_pointer("array is null"));
    }
    match v.as_array() {
        Some(a) if erase_elem(a.elem()) == elem => Ok(a),
        _ => Err(Thrown::class_cast(format!(
            "{v} is not a {}",
            ValueType::Array(elem)
        ))),
    }
}

fn index_arg(v: &Value) -> Result<usize, Thrown> {
    let i = v
        .as_int()
        .ok_or_else(|| Thrown::internal("array index is not an int slot"))?;
    usize::try_from(i).map_err(|_| {
        Thrown::new(
            ErrorKind::IndexOutOfBounds,
            format!("index {i} out of bounds"),
        )
    })
}

pub(crate) fn length_value(len: usize) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_casts_truncate_and_saturate() {
        let c = |from, to, v: Value| convert_primitive(from, to, &v).unwrap();
        assert_eq!(c(Primitive::Int, Primitive::Byte, Value::Int(300)), Value::Int(44));
        assert_eq!(c(Primitive::Int, Primitive::Char, Value::Int(-1)), Value::Int(65535));
        assert_eq!(
            c(Primitive::Double, Primitive::Int, Value::Double(1e20)),
            Value::Int(i32::MAX)
        );
        assert_eq!(
            c(Primitive::Float, Primitive::Long, Value::Float(f32::NAN)),
            Value::Long(0)
        );
        assert_eq!(
            c(Primitive::Long, Primitive::Int, Value::Long(0x1_0000_0002)),
            Value::Int(2)
        );
        assert_eq!(c(Primitive::Int, Primitive::Boolean, Value::Int(6)), Value::Int(0));
        assert_eq!(c(Primitive::Int, Primitive::Boolean, Value::Int(7)), Value::Int(1));
        assert_eq!(c(Primitive::Boolean, Primitive::Double, Value::Int(1)), Value::Double(1.0));
        assert_eq!(c(Primitive::Char, Primitive::Float, Value::Int(65)), Value::Float(65.0));
    }

    #[test]
    fn out_of_range_floats_narrow_through_int() {
        let cases: [(Value, Primitive, [i32; 3]); 7] = [
            (Value::Float(1e10), Primitive::Float, [-1, -1, 65535]),
            (Value::Float(-1e10), Primitive::Float, [0, 0, 0]),
            (Value::Double(-1e12), Primitive::Double, [0, 0, 0]),
            (Value::Double(3e9), Primitive::Double, [-1, -1, 65535]),
            (Value::Double(f64::INFINITY), Primitive::Double, [-1, -1, 65535]),
            (Value::Float(f32::NEG_INFINITY), Primitive::Float, [0, 0, 0]),
            (Value::Double(f64::NAN), Primitive::Double, [0, 0, 0]),
        ];
        let targets = [Primitive::Byte, Primitive::Short, Primitive::Char];
        for (v, from, expected) in cases {
            for (to, want) in targets.into_iter().zip(expected) {
                assert_eq!(
                    convert_primitive(from, to, &v).unwrap(),
                    Value::Int(want),
                    "{v} as {}",
                    to.name()
                );
            }
        }
        assert_eq!(
            convert_primitive(Primitive::Float, Primitive::Byte, &Value::Float(300.7)).unwrap(),
            Value::Int(44)
        );
    }

    #[test]
    fn unboxing_modes_differ_on_null_and_narrowing() {
        let int_box = Value::boxed(Boxed::Int(300));
        let byte_box = Value::boxed(Boxed::Byte(7));
        let exact = value_op(ValueOp::UnboxExact(Primitive::Int, true));
        assert_eq!(exact.call(&[int_box.clone()]).unwrap(), Value::Int(300));
        assert_eq!(
            exact.call(&[Value::Null]).unwrap_err().kind(),
            ErrorKind::NullPointer
        );
        assert_eq!(
            exact.call(&[byte_box.clone()]).unwrap_err().kind(),
            ErrorKind::ClassCast
        );

        let widen = value_op(ValueOp::UnboxWiden(Primitive::Long));
        assert_eq!(widen.call(&[byte_box]).unwrap(), Value::Long(7));
        let narrow = value_op(ValueOp::UnboxWiden(Primitive::Byte));
        assert_eq!(
            narrow.call(&[int_box.clone()]).unwrap_err().kind(),
            ErrorKind::ClassCast
        );

        let cast = value_op(ValueOp::UnboxCast(Primitive::Byte));
        assert_eq!(cast.call(&[int_box]).unwrap(), Value::Int(44));
        assert_eq!(cast.call(&[Value::Null]).unwrap(), Value::Int(0));
        assert_eq!(
            cast.call(&[Value::string("x")]).unwrap_err().kind(),
            ErrorKind::ClassCast
        );
    }

    #[test]
    fn value_ops_are_interned() {
        let a = value_op(ValueOp::Box(Primitive::Short));
        let b = value_op(ValueOp::Box(Primitive::Short));
        assert_eq!(a, b);
        assert_eq!(
            a.call(&[Value::Int(70_000)]).unwrap(),
            Value::boxed(Boxed::Short(4464))
        );
    }

    #[test]
    fn array_ops_share_reference_routines() {
        let strings = ElemType::Ref(RefType::Str);
        let get = array_op(ArrayAccess::Get, strings);
        assert_eq!(get, array_op(ArrayAccess::Get, ElemType::Ref(RefType::Object)));
        let array = Value::from(
            Array::from_values(strings, vec![Value::string("a"), Value::string("b")]).unwrap(),
        );
        assert_eq!(get.call(&[array.clone(), Value::Int(1)]).unwrap(), Value::string("b"));
        assert_eq!(
            get.call(&[array.clone(), Value::Int(-1)]).unwrap_err().kind(),
            ErrorKind::IndexOutOfBounds
        );
        let len = array_op(ArrayAccess::Length, strings);
        assert_eq!(len.call(&[array]).unwrap(), Value::Int(2));
        assert_eq!(
            len.call(&[Value::Null]).unwrap_err().kind(),
            ErrorKind::NullPointer
        );
        let ints = Value::from(Array::new(ElemType::Prim(Primitive::Int), 1));
        assert_eq!(
            get.call(&[ints, Value::Int(0)]).unwrap_err().kind(),
            ErrorKind::ClassCast
        );
    }
}
