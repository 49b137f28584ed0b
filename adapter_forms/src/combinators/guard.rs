// Copyright 2026 the Adapter Forms Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Guarded dispatch.

use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use std::sync::LazyLock;

use crate::adapter::Adapter;
use crate::combinators::counting::profile;
use crate::combinators::{check_prefix, pad_to};
use crate::config;
use crate::constants::select_alternative;
use crate::elementary::{Elementary, Intrinsic, array_arg};
use crate::error::{BuildError, Thrown};
use crate::form::{Form, FormKind, lookup_or_build};
use crate::names::{Function, NamesBuilder, Operand};
use crate::species::species_for;
use crate::types::{ElemType, MethodType, Primitive, ValueType};
use crate::value::{Array, Value};

const GUARD_NAME: &str = "guardWithTest";
const PROFILED_GUARD_NAME: &str = "guardWithTestProfiled";

/// `(boolean, int[])boolean`: counts the outcome, halving both buckets before one overflows.
static PROFILE_BOOLEAN: LazyLock<Elementary> = LazyLock::new(|| {
    Elementary::with_intrinsic(
        "profileBoolean",
        MethodType::new(ValueType::BOOLEAN, vec![ValueType::BOOLEAN, ValueType::INT_ARRAY]),
        Intrinsic::ProfileBoolean,
        |args| {
            let taken = args[0].as_int().is_some_and(|t| t != 0);
            let counters = array_arg(&args[1], ElemType::Prim(Primitive::Int))?;
            counters.with_slots_mut(|slots| {
                let [Value::Int(not_taken), Value::Int(taken_count)] = slots else {
                    return Err(Thrown::internal("branch profile is not an int[2]"));
                };
                let (bucket, other) = if taken {
                    (taken_count, not_taken)
                } else {
                    (not_taken, taken_count)
                };
                if *bucket == i32::MAX {
                    *bucket /= 2;
                    *other /= 2;
                }
                *bucket += 1;
                Ok(())
            })?;
            Ok(Value::from(taken))
        },
    )
});

/// Dispatches to `if_true` or `if_false` according to `test`.
///
/// `test` receives the leading arguments it declares; both branches must have `if_true`'s
/// type. Branch profiling follows [`EngineConfig::profile_guards`](crate::config::EngineConfig).
pub fn guard(test: &Adapter, if_true: &Adapter, if_false: &Adapter) -> Result<Adapter, BuildError> {
    guard_with_profile(test, if_true, if_false, config::get().profile_guards)
}

/// Like [`guard`], choosing explicitly whether to record a branch profile.
pub fn guard_with_profile(
    test: &Adapter,
    if_true: &Adapter,
    if_false: &Adapter,
    profiled: bool,
) -> Result<Adapter, BuildError> {
    let ty = if_true.ty();
    if if_false.ty() != ty {
        return Err(BuildError::WrongMethodType {
            expected: ty.clone(),
            actual: if_false.ty().clone(),
        });
    }
    if test.ty().ret() != ValueType::BOOLEAN {
        return Err(BuildError::illegal_argument(format!(
            "guard test {} does not return boolean",
            test.ty()
        )));
    }
    check_prefix("guard test", test.ty().params(), ty.params())?;
    let test = pad_to(test, ty.params())?;
    let signature = ty.basic_signature();
    let test_signature = test.ty().basic_signature();
    let (kind, key, name) = if profiled {
        (FormKind::GuardProfiled, "LLLL", PROFILED_GUARD_NAME)
    } else {
        (FormKind::Guard, "LLL", GUARD_NAME)
    };
    let species = species_for(key);
    let form = lookup_or_build(kind, &signature, || {
        let invoker = signature.invoker();
        let arity = invoker.params().len();
        let slots = species.slot_count();
        let mut b = NamesBuilder::arguments(slots + 3 + usize::from(profiled), &invoker);
        b.constrain(0, Arc::clone(&species));
        let this = b.operand(0);
        let getters: Vec<Operand> = (0..slots)
            .map(|slot| b.set(arity + slot, species.getter(slot), vec![this.clone()]))
            .collect();
        let mut next = arity + slots;
        let mut test_args = vec![getters[0].clone()];
        test_args.extend((1..arity).map(|i| b.operand(i)));
        let mut outcome = b.set(next, Function::InvokeBasic(test_signature), test_args);
        next += 1;
        if profiled {
            outcome = b.set(
                next,
                Function::Elementary(PROFILE_BOOLEAN.clone()),
                vec![outcome, getters[3].clone()],
            );
            next += 1;
        }
        let chosen = b.set(
            next,
            Function::Elementary(select_alternative()),
            vec![outcome, getters[1].clone(), getters[2].clone()],
        );
        let mut call_args = vec![chosen];
        call_args.extend((1..arity).map(|i| b.operand(i)));
        b.set(next + 1, Function::InvokeBasic(signature.clone()), call_args);
        Form::new(name, arity, b.finish())
    });
    let mut values = vec![
        Value::from(test),
        Value::from(profile(if_true)),
        Value::from(profile(if_false)),
    ];
    if profiled {
        values.push(Value::from(Array::new(ElemType::Prim(Primitive::Int), 2)));
    }
    let carrier = species.construct(values);
    Ok(Adapter::bound(ty.clone(), form, carrier))
}

/// Reads the `(false, true)` outcome counts of a profiled guard.
#[must_use]
pub fn branch_profile(guard: &Adapter) -> Option<(i32, i32)> {
    if guard.form()?.debug_name() != PROFILED_GUARD_NAME {
        return None;
    }
    let counters = guard.carrier()?.get(3).as_array()?.to_vec();
    match counters[..] {
        [Value::Int(not_taken), Value::Int(taken)] => Some((not_taken, taken)),
        _ => None,
    }
}
