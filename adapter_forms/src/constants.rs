// Copyright 2026 the Adapter Forms Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Constant handles: shared adapters the factories compose with.

use alloc::vec;
use alloc::vec::Vec;
use std::sync::LazyLock;

use crate::adapter::Adapter;
use crate::cache::PublishOnceMap;
use crate::conversion::check_cast;
use crate::elementary::{Elementary, Intrinsic, ValueOp, array_arg, value_op};
use crate::error::{ErrorKind, Thrown};
use crate::types::{ElemType, MethodType, RefType, ValueType};
use crate::value::{Array, Cursor, TypeToken, Value};

/// Identifies a constant handle.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConstantHandle {
    /// `(Type, Object)Object`: checked reference cast.
    Cast,
    /// `(boolean, Adapter, Adapter)Adapter`: picks the second or third argument.
    SelectAlternative,
    /// `(Type, Object[])Object`: unboxes into a new primitive array.
    CopyAsPrimitiveArray,
    /// `(Object[], int, Object[])Object[]`: new array shaped like the first, prefilled from the last.
    FillNewTypedArray,
    /// `(int, Object[])Object[]`: new `Object[]` prefilled from the argument.
    FillNewArray,
    /// `(Object[])Object[]`
    ArrayIdentity,
    /// `(int, int)boolean`: `counter <= limit`.
    CountedLoopPredicate,
    /// `(int, int)int`: `counter + 1`.
    CountedLoopStep,
    /// `(int)int`: `counter - 1`.
    DecrementCounter,
    /// `(Type, int)Object`: new zero-filled array of the element type.
    ArrayNewInstance,
    /// `(Object)Iterator`: starts a cursor over an array.
    InitIterator,
    /// `(Iterator)boolean`: whether the cursor has elements left.
    IteratePredicate,
    /// `(Iterator)Object`: takes the cursor's next element.
    IterateNext,
}

static CONSTANT_HANDLES: LazyLock<PublishOnceMap<ConstantHandle, Adapter>> =
    LazyLock::new(|| PublishOnceMap::new("constant handles"));

/// Returns the shared adapter for `handle`.
pub fn constant_handle(handle: ConstantHandle) -> Adapter {
    CONSTANT_HANDLES.get_or_create(handle, |&handle| Adapter::direct(make(handle)))
}

static SELECT_ALTERNATIVE: LazyLock<Elementary> = LazyLock::new(|| {
    Elementary::with_intrinsic(
        "selectAlternative",
        MethodType::new(
            ValueType::ADAPTER,
            vec![ValueType::BOOLEAN, ValueType::ADAPTER, ValueType::ADAPTER],
        ),
        Intrinsic::SelectAlternative,
        |args| {
            let take_true = args[0].as_int().is_some_and(|t| t != 0);
            Ok(if take_true { args[1].clone() } else { args[2].clone() })
        },
    )
});

/// The select-alternative routine, as referenced from guard forms.
pub(crate) fn select_alternative() -> Elementary {
    SELECT_ALTERNATIVE.clone()
}

fn int_arg(v: &Value) -> Result<i32, Thrown> {
    v.as_int()
        .ok_or_else(|| Thrown::internal(format!("expected int slot, found {v}")))
}

fn value_token(v: &Value) -> Result<ValueType, Thrown> {
    match v.as_type_token() {
        Some(TypeToken::Value(ty)) => Ok(ty),
        _ => Err(Thrown::class_cast(format!("{v} is not a value type token"))),
    }
}

fn cursor_arg(v: &Value) -> Result<&Cursor, Thrown> {
    v.as_cursor()
        .ok_or_else(|| Thrown::class_cast(format!("{v} is not an iterator")))
}

fn new_length(len: i32) -> Result<usize, Thrown> {
    usize::try_from(len)
        .map_err(|_| Thrown::new(ErrorKind::NegativeArraySize, format!("{len}")))
}

/// Copies `source` into the front of a new array of `elem` and length `len`.
fn fill_new(elem: ElemType, len: i32, source: &Value) -> Result<Value, Thrown> {
    let source = array_arg(source, ElemType::Ref(RefType::Object))?.to_vec();
    let array = Array::new(elem, new_length(len)?);
    for (i, v) in source.into_iter().enumerate() {
        array.set(i, v)?;
    }
    Ok(Value::from(array))
}

fn make(handle: ConstantHandle) -> Elementary {
    let object = ValueType::OBJECT;
    let objects = ValueType::OBJECT_ARRAY;
    match handle {
        ConstantHandle::Cast => Elementary::new(
            "cast",
            MethodType::new(object, vec![ValueType::TYPE, object]),
            |args| check_cast(value_token(&args[0])?, args[1].clone()),
        ),
        ConstantHandle::SelectAlternative => select_alternative(),
        ConstantHandle::CopyAsPrimitiveArray => Elementary::new(
            "copyAsPrimitiveArray",
            MethodType::new(object, vec![ValueType::TYPE, objects]),
            |args| {
                let ValueType::Prim(p) = value_token(&args[0])? else {
                    return Err(Thrown::illegal_argument("not a primitive type"));
                };
                let boxes = array_arg(&args[1], ElemType::Ref(RefType::Object))?.to_vec();
                let unbox = value_op(ValueOp::UnboxCast(p));
                let values = boxes
                    .into_iter()
                    .map(|b| unbox.call(&[b]))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::from(Array::from_values(ElemType::Prim(p), values)?))
            },
        ),
        ConstantHandle::FillNewTypedArray => Elementary::new(
            "fillNewTypedArray",
            MethodType::new(objects, vec![objects, ValueType::INT, objects]),
            |args| {
                let example = array_arg(&args[0], ElemType::Ref(RefType::Object))?;
                fill_new(example.elem(), int_arg(&args[1])?, &args[2])
            },
        ),
        ConstantHandle::FillNewArray => Elementary::new(
            "fillNewArray",
            MethodType::new(objects, vec![ValueType::INT, objects]),
            |args| fill_new(ElemType::Ref(RefType::Object), int_arg(&args[0])?, &args[1]),
        ),
        ConstantHandle::ArrayIdentity => Elementary::with_intrinsic(
            "identity",
            MethodType::new(objects, vec![objects]),
            Intrinsic::IdentityArray,
            |args| Ok(args[0].clone()),
        ),
        ConstantHandle::CountedLoopPredicate => Elementary::new(
            "countedLoopPredicate",
            MethodType::new(ValueType::BOOLEAN, vec![ValueType::INT, ValueType::INT]),
            |args| Ok(Value::from(int_arg(&args[0])? <= int_arg(&args[1])?)),
        ),
        ConstantHandle::CountedLoopStep => Elementary::new(
            "countedLoopStep",
            MethodType::new(ValueType::INT, vec![ValueType::INT, ValueType::INT]),
            |args| Ok(Value::Int(int_arg(&args[0])?.wrapping_add(1))),
        ),
        ConstantHandle::DecrementCounter => Elementary::new(
            "decrementCounter",
            MethodType::new(ValueType::INT, vec![ValueType::INT]),
            |args| Ok(Value::Int(int_arg(&args[0])?.wrapping_sub(1))),
        ),
        ConstantHandle::ArrayNewInstance => Elementary::new(
            "newInstance",
            MethodType::new(object, vec![ValueType::TYPE, ValueType::INT]),
            |args| {
                let elem = match value_token(&args[0])? {
                    ValueType::Prim(p) => ElemType::Prim(p),
                    ValueType::Ref(r) => ElemType::Ref(r),
                    other => {
                        return Err(Thrown::illegal_argument(format!(
                            "no arrays of {other}"
                        )));
                    }
                };
                Ok(Value::from(Array::new(elem, new_length(int_arg(&args[1])?)?)))
            },
        ),
        ConstantHandle::InitIterator => Elementary::new(
            "initIterator",
            MethodType::new(ValueType::ITERATOR, vec![object]),
            |args| Cursor::over(&args[0]).map(Value::from),
        ),
        ConstantHandle::IteratePredicate => Elementary::new(
            "iteratePredicate",
            MethodType::new(ValueType::BOOLEAN, vec![ValueType::ITERATOR]),
            |args| Ok(Value::from(cursor_arg(&args[0])?.has_next())),
        ),
        ConstantHandle::IterateNext => Elementary::new(
            "iterateNext",
            MethodType::new(object, vec![ValueType::ITERATOR]),
            |args| cursor_arg(&args[0])?.next(),
        ),
    }
}
