// Copyright 2026 the Adapter Forms Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Binding a leading argument into a carrier.

use alloc::vec;
use alloc::vec::Vec;

use crate::adapter::Adapter;
use crate::basic_type::BasicType;
use crate::error::BuildError;
use crate::form::{Form, FormKind, lookup_or_build};
use crate::names::{Function, NamesBuilder, Operand};
use crate::species::species_for;
use crate::types::ValueType;
use crate::value::{Boxed, Value};

/// Returns an adapter that calls `target` with `value` as its first argument.
///
/// The target and the value are captured in a carrier of species `L` + the value's basic type;
/// the form is shared by every binding with the same erased shape.
pub fn bind_to(target: &Adapter, value: Value) -> Result<Adapter, BuildError> {
    let ty = target.ty();
    let Some(&first) = ty.params().first() else {
        return Err(BuildError::illegal_argument(format!(
            "{ty} has no leading parameter"
        )));
    };
    let value = match first {
        ValueType::Prim(p) => Boxed::from_slot(p, &value)
            .map(Boxed::to_slot)
            .ok_or_else(|| {
                BuildError::illegal_argument(format!("cannot bind {value} as {first}"))
            })?,
        _ => {
            let fits = value.basic_type() == BasicType::L
                && value.runtime_type().is_none_or(|rt| first.is_assignable_from(rt));
            if !fits {
                return Err(BuildError::illegal_argument(format!(
                    "cannot bind {value} as {first}"
                )));
            }
            value
        }
    };
    let bt = first.basic_type();
    let species = species_for("L").extend_with(bt);
    let new_type = ty.drop_params(0, 1);
    let signature = new_type.basic_signature();
    let target_signature = ty.basic_signature();
    let form = lookup_or_build(FormKind::Bind(bt), &signature, || {
        let invoker = signature.invoker();
        let arity = invoker.params().len();
        let mut b = NamesBuilder::arguments(3, &invoker);
        b.constrain(0, species.clone());
        let this = b.operand(0);
        let bound_target = b.set(arity, species.getter(0), vec![this.clone()]);
        let bound_value = b.set(arity + 1, species.getter(1), vec![this]);
        let mut args: Vec<Operand> = vec![bound_target, bound_value];
        args.extend((1..arity).map(|i| b.operand(i)));
        b.set(arity + 2, Function::InvokeBasic(target_signature), args);
        Form::new("bind", arity, b.finish())
    });
    let carrier = species.construct(vec![Value::from(target.clone()), value]);
    Ok(Adapter::bound(new_type, form, carrier))
}
