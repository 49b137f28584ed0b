// Copyright 2026 the Adapter Forms Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Conversion rules between value types.
//!
//! ## Semantics
//!
//! A position whose source and destination types differ is converted by one of:
//! - a run-time checked reference cast,
//! - discarding (or, from `void`, producing a zero),
//! - an elementary routine: primitive conversion, boxing, unboxing, or a composition of them.
//!
//! Positions where the erased representation already fits (identical types, reference upcasts,
//! sub-int widening into `int`) are *null conversions* and need no operation at all.

use alloc::vec;
use core::fmt;
use std::sync::LazyLock;

use crate::adapter::Adapter;
use crate::basic_type::BasicType;
use crate::cache::PublishOnceMap;
use crate::combinators;
use crate::elementary::{ValueOp, value_op};
use crate::error::{BuildError, Thrown};
use crate::types::{MethodType, ValueType};
use crate::value::Value;

/// How one position of a signature is converted.
#[derive(Clone)]
pub enum ConversionSpec {
    /// Reference cast to the given type, checked at run time.
    Cast(ValueType),
    /// Discard the value; produce a zero when converting from `void`.
    Void,
    /// Apply a unary adapter (or a nullary one producing a constant).
    Function(Adapter),
}

impl fmt::Debug for ConversionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cast(ty) => write!(f, "Cast({ty})"),
            Self::Void => f.write_str("Void"),
            Self::Function(a) => write!(f, "Function({})", a.ty()),
        }
    }
}

/// Returns `true` if a `src` value may be used as a `dst` value without any operation.
#[must_use]
pub fn is_null_conversion(src: ValueType, dst: ValueType) -> bool {
    if src == dst {
        return true;
    }
    match (src, dst) {
        (s, d) if s.is_reference() => d.is_assignable_from(s),
        (ValueType::Prim(s), ValueType::Prim(d)) => {
            if d == crate::types::Primitive::Int {
                return s.is_subword_or_int();
            }
            if !s.is_subword_or_int() || !d.is_subword_or_int() {
                return false;
            }
            if !d.is_signed() && s.is_signed() {
                return false;
            }
            d.bit_width() > s.bit_width()
        }
        _ => false,
    }
}

/// Returns `true` if a `src` value may be converted to `dst`.
///
/// Strict mode allows identity, primitive widening, boxing to an assignable reference,
/// unboxing followed by widening, unboxing from a supertype of a wrapper and reference casts.
/// Non-strict mode allows every combination.
#[must_use]
pub fn can_convert(src: ValueType, dst: ValueType, strict: bool) -> bool {
    if !strict || src == dst || src == ValueType::OBJECT || dst == ValueType::OBJECT {
        return true;
    }
    match (src, dst) {
        (ValueType::Void, _) | (_, ValueType::Void) => true,
        (ValueType::Prim(s), ValueType::Prim(d)) => s.widens_to(d),
        (ValueType::Prim(s), d) => d.is_assignable_from(ValueType::boxed(s)),
        (s, ValueType::Prim(d)) => {
            s.is_assignable_from(ValueType::boxed(d))
                || s.unwrapped().is_some_and(|w| w.widens_to(d))
        }
        _ => true,
    }
}

/// Computes the conversion of a `src` value to `dst`.
///
/// `src` and `dst` must not be a null conversion. `monobox` forces exact unboxing.
pub fn value_conversion(
    src: ValueType,
    dst: ValueType,
    strict: bool,
    monobox: bool,
) -> Result<ConversionSpec, BuildError> {
    debug_assert!(
        !is_null_conversion(src, dst),
        "null conversion {src} -> {dst} has no spec"
    );
    if dst == ValueType::Void {
        return Ok(ConversionSpec::Void);
    }
    match src {
        ValueType::Void => Ok(ConversionSpec::Void),
        ValueType::Prim(p) => match dst {
            ValueType::Prim(q) => Ok(ConversionSpec::Function(value_op_adapter(
                ValueOp::Convert(p, q),
            ))),
            _ => {
                let boxer = value_op_adapter(ValueOp::Box(p));
                if is_null_conversion(ValueType::boxed(p), dst) {
                    return Ok(ConversionSpec::Function(boxer));
                }
                let mt = MethodType::new(dst, vec![src]);
                let f = if strict {
                    boxer.as_type(&mt)?
                } else {
                    combinators::convert(&boxer, &mt, false, false)?
                };
                Ok(ConversionSpec::Function(f))
            }
        },
        _ => match dst {
            ValueType::Prim(q) => {
                let op = if monobox || src == ValueType::boxed(q) {
                    ValueOp::UnboxExact(q, strict)
                } else if strict {
                    ValueOp::UnboxWiden(q)
                } else {
                    ValueOp::UnboxCast(q)
                };
                Ok(ConversionSpec::Function(value_op_adapter(op)))
            }
            _ => Ok(ConversionSpec::Cast(dst)),
        },
    }
}

static VALUE_OP_ADAPTERS: LazyLock<PublishOnceMap<ValueOp, Adapter>> =
    LazyLock::new(|| PublishOnceMap::new("value op adapters"));

/// Returns the interned direct adapter for a value routine.
pub fn value_op_adapter(op: ValueOp) -> Adapter {
    VALUE_OP_ADAPTERS.get_or_create(op, |&op| Adapter::direct(value_op(op)))
}

/// Casts a reference to `ty`, failing with `ClassCast` if its dynamic type does not fit.
pub fn check_cast(ty: ValueType, v: Value) -> Result<Value, Thrown> {
    if v.basic_type() != BasicType::L {
        return Err(Thrown::internal(format!("cast of non-reference slot {v}")));
    }
    match v.runtime_type() {
        Some(rt) if !ty.is_assignable_from(rt) => {
            Err(Thrown::class_cast(format!("cannot cast {rt} to {ty}")))
        }
        _ => Ok(v),
    }
}

/// Converts a generic (`Object`) argument to `dst` the way a strict conversion would.
pub(crate) fn from_generic(v: Value, dst: ValueType) -> Result<Value, Thrown> {
    let v = v.into_reference();
    match dst {
        ValueType::Void => Err(Thrown::internal("void parameter")),
        ValueType::Prim(q) => value_op(ValueOp::UnboxWiden(q)).call(&[v]),
        dst if dst == ValueType::OBJECT => Ok(v),
        dst => check_cast(dst, v),
    }
}

/// Converts a result of type `src` to a generic (`Object`) result.
pub(crate) fn to_generic(v: Value, src: ValueType) -> Result<Value, Thrown> {
    match src {
        ValueType::Void => Ok(Value::Null),
        ValueType::Prim(p) => value_op(ValueOp::Box(p)).call(&[v]),
        _ => Ok(v),
    }
}
