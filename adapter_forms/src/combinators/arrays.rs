// Copyright 2026 the Adapter Forms Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Array builders and accessors.
//!
//! `varargs_array(n)` for small `n` is a single elementary routine. Larger arities cascade:
//! the first [`LEFT_ARGS`] arguments build a prefix array, which is copied into an array of the
//! full length, and the remaining arguments are stored by fill routines taking at most
//! [`FILL_CHUNK`] values each. Only `LEFT_ARGS + FILL_CHUNK` distinct routine shapes ever exist.

use alloc::vec;
use alloc::vec::Vec;
use std::sync::LazyLock;

use crate::adapter::Adapter;
use crate::cache::PublishOnceMap;
use crate::combinators::{collect, constant, make_intrinsic};
use crate::constants::{ConstantHandle, constant_handle};
use crate::elementary::{ArrayAccess, Elementary, Intrinsic, array_arg, array_op};
use crate::error::{BuildError, Thrown};
use crate::form::{Form, FormKind, lookup_or_build};
use crate::names::{Function, NamesBuilder, Operand};
use crate::types::{ElemType, MethodType, RefType, ValueType};
use crate::value::{Array, Value};

/// Arities built by a single routine.
const LEFT_ARGS: usize = 10;
/// Values stored by one fill routine.
const FILL_CHUNK: usize = 10;

const OBJECTS: ElemType = ElemType::Ref(RefType::Object);

static ARRAYS: LazyLock<PublishOnceMap<usize, Adapter>> =
    LazyLock::new(|| PublishOnceMap::new("varargs arrays"));
static FILL_ARRAYS: LazyLock<PublishOnceMap<usize, Elementary>> =
    LazyLock::new(|| PublishOnceMap::new("fill arrays"));
static TYPED_COLLECTORS: LazyLock<PublishOnceMap<(ValueType, usize), Adapter>> =
    LazyLock::new(|| PublishOnceMap::new("typed array collectors"));
static TYPED_ACCESSORS: LazyLock<PublishOnceMap<(ArrayAccess, ValueType), Adapter>> =
    LazyLock::new(|| PublishOnceMap::new("array accessors"));

fn position(v: &Value) -> Result<usize, Thrown> {
    v.as_int()
        .and_then(|i| usize::try_from(i).ok())
        .ok_or_else(|| Thrown::internal(format!("bad fill position {v}")))
}

/// `(int pos, Object[] a, Object × k)Object[]`: stores the values at `a[pos..]`.
fn fill_array(k: usize) -> Elementary {
    FILL_ARRAYS.get_or_create(k, |&k| {
        let mut params = vec![ValueType::INT, ValueType::OBJECT_ARRAY];
        params.resize(k + 2, ValueType::OBJECT);
        Elementary::new(
            "fillArray",
            MethodType::new(ValueType::OBJECT_ARRAY, params),
            |args| {
                let pos = position(&args[0])?;
                let array = array_arg(&args[1], OBJECTS)?;
                for (i, v) in args[2..].iter().enumerate() {
                    array.set(pos + i, v.clone())?;
                }
                Ok(args[1].clone())
            },
        )
    })
}

fn make_array(n: usize) -> Adapter {
    Adapter::direct(Elementary::with_intrinsic(
        "array",
        MethodType::new(ValueType::OBJECT_ARRAY, vec![ValueType::OBJECT; n]),
        Intrinsic::NewArray,
        |args| Ok(Value::from(Array::from_values(OBJECTS, args.to_vec())?)),
    ))
}

fn cascade(n: usize, ty: MethodType) -> Result<Adapter, BuildError> {
    let too_many = |_: core::num::TryFromIntError| BuildError::TooManyArguments { slots: n };
    let length = i32::try_from(n).map_err(too_many)?;
    let prefix_array = varargs_array(LEFT_ARGS)?;
    let fills = (LEFT_ARGS..n)
        .step_by(FILL_CHUNK)
        .map(|pos| {
            let start = i32::try_from(pos).map_err(too_many)?;
            Ok((start, pos, FILL_CHUNK.min(n - pos)))
        })
        .collect::<Result<Vec<_>, BuildError>>()?;
    let signature = ty.basic_signature();
    let form = lookup_or_build(FormKind::VarargsArray, &signature, || {
        let invoker = signature.invoker();
        let arity = invoker.params().len();
        let mut b = NamesBuilder::arguments(2 + fills.len(), &invoker);
        let prefix_args: Vec<Operand> = (1..=LEFT_ARGS).map(|i| b.operand(i)).collect();
        let prefix = b.set(arity, Function::Invoke(prefix_array), prefix_args);
        let mut array = b.set(
            arity + 1,
            Function::Invoke(constant_handle(ConstantHandle::FillNewArray)),
            vec![Operand::Const(Value::Int(length)), prefix],
        );
        for (j, &(start, pos, k)) in fills.iter().enumerate() {
            let mut fill_args = vec![Operand::Const(Value::Int(start)), array];
            fill_args.extend((pos + 1..=pos + k).map(|i| b.operand(i)));
            array = b.set(arity + 2 + j, Function::Elementary(fill_array(k)), fill_args);
        }
        Form::new("varargsArray", arity, b.finish())
    });
    Ok(Adapter::with_form(ty, form))
}

/// `(Object × n)Object[]` collecting its arguments into a new array.
pub fn varargs_array(n: usize) -> Result<Adapter, BuildError> {
    if let Some(a) = ARRAYS.get(&n) {
        return Ok(a);
    }
    let ty = MethodType::new(ValueType::OBJECT_ARRAY, vec![ValueType::OBJECT; n]);
    ty.check_slot_limit()?;
    let built = if n <= LEFT_ARGS {
        make_array(n)
    } else {
        make_intrinsic(&cascade(n, ty)?, Intrinsic::NewArray)
    };
    Ok(ARRAYS.publish(n, built))
}

fn element_of(array_type: ValueType) -> Result<ElemType, BuildError> {
    array_type
        .element()
        .ok_or_else(|| BuildError::illegal_argument(format!("{array_type} is not an array type")))
}

/// `(E × n)E[]` collecting its arguments into a new array of `array_type`.
pub fn varargs_array_of(array_type: ValueType, n: usize) -> Result<Adapter, BuildError> {
    let elem = element_of(array_type)?;
    if elem == OBJECTS {
        return varargs_array(n);
    }
    TYPED_COLLECTORS.try_get_or_create((array_type, n), |&(array_type, n)| {
        let elem_type = elem.value_type();
        let ty = MethodType::new(array_type, vec![elem_type; n]);
        ty.check_slot_limit()?;
        if n == 0 {
            let empty = constant(array_type, Value::from(Array::new(elem, 0)))?;
            return Ok(make_intrinsic(&empty, Intrinsic::NewArray));
        }
        let finish = match elem {
            ElemType::Prim(_) => constant_handle(ConstantHandle::CopyAsPrimitiveArray)
                .bind_to(Value::type_token(elem_type))?,
            ElemType::Ref(_) => constant_handle(ConstantHandle::FillNewTypedArray)
                .bind_to(Value::from(Array::new(elem, 0)))?
                .bind_to(Value::Int(i32::try_from(n).map_err(|_| {
                    BuildError::TooManyArguments { slots: n }
                })?))?,
        };
        let boxed = collect(&finish, &varargs_array(n)?, 0, false)?;
        Ok(make_intrinsic(&boxed.as_type(&ty)?, Intrinsic::NewArray))
    })
}

fn accessor(access: ArrayAccess, array_type: ValueType) -> Result<Adapter, BuildError> {
    let elem = element_of(array_type)?;
    TYPED_ACCESSORS.try_get_or_create((access, array_type), |&(access, array_type)| {
        let ty = access.method_type(array_type, elem.value_type());
        Ok(Adapter::direct(array_op(access, elem)).view_as_type(&ty))
    })
}

/// `(E[], int)E`
pub fn array_element_getter(array_type: ValueType) -> Result<Adapter, BuildError> {
    accessor(ArrayAccess::Get, array_type)
}

/// `(E[], int, E)void`
pub fn array_element_setter(array_type: ValueType) -> Result<Adapter, BuildError> {
    accessor(ArrayAccess::Set, array_type)
}

/// `(E[])int`
pub fn array_length(array_type: ValueType) -> Result<Adapter, BuildError> {
    accessor(ArrayAccess::Length, array_type)
}

/// `(int)E[]` allocating a zero-filled array; negative lengths throw `NegativeArraySize`.
pub fn array_constructor(array_type: ValueType) -> Result<Adapter, BuildError> {
    let elem = element_of(array_type)?;
    let make = constant_handle(ConstantHandle::ArrayNewInstance)
        .bind_to(Value::type_token(elem.value_type()))?;
    Ok(make.view_as_type(&MethodType::new(array_type, vec![ValueType::INT])))
}
