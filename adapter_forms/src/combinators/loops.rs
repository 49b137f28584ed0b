// Copyright 2026 the Adapter Forms Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Clause loops.
//!
//! A loop is described by parallel clause lists. Each clause may introduce one loop variable,
//! the non-`void` result of its `init`. Every clause function sees the loop state
//! `(args..., vars...)` and may declare any prefix of it.
//!
//! Each pass runs the clauses left to right: `step[i]` updates variable `i`, then `pred[i]` is
//! tested. The first false predicate ends the loop and `fini[i]` produces the result, so an
//! earlier clause can end a pass before later steps run.

use alloc::vec;
use alloc::vec::Vec;
use std::sync::LazyLock;

use crate::adapter::Adapter;
use crate::combinators::{
    argument_collector, boxed_routine_form, check_prefix, collect, constant, drop_arguments,
    filter_argument, identity, pad_to, result_unboxer, zero,
};
use crate::constants::{ConstantHandle, constant_handle};
use crate::elementary::{Elementary, Intrinsic, array_arg};
use crate::error::{BuildError, Thrown};
use crate::form::{FormKind, lookup_or_build};
use crate::species::species_for;
use crate::types::{ElemType, MethodType, RefType, ValueType};
use crate::value::{Array, Boxed, Value};

const CLAUSES: ElemType = ElemType::Ref(RefType::Object);

fn clause_list(v: &Value) -> Result<Vec<Adapter>, Thrown> {
    array_arg(v, CLAUSES)?
        .to_vec()
        .iter()
        .map(|c| {
            c.as_adapter()
                .cloned()
                .ok_or_else(|| Thrown::internal(format!("loop clause {c} is not an adapter")))
        })
        .collect()
}

/// `(Adapter[] init, Adapter[] step, Adapter[] pred, Adapter[] fini, Object[] args)Object`
static LOOP: LazyLock<Elementary> = LazyLock::new(|| {
    let clauses = ValueType::Array(ElemType::Ref(RefType::Adapter));
    Elementary::with_intrinsic(
        "loop",
        MethodType::new(
            ValueType::OBJECT,
            vec![clauses, clauses, clauses, clauses, ValueType::OBJECT_ARRAY],
        ),
        Intrinsic::Loop,
        |args| {
            let init = clause_list(&args[0])?;
            let step = clause_list(&args[1])?;
            let pred = clause_list(&args[2])?;
            let fini = clause_list(&args[3])?;
            let mut state = array_arg(&args[4], CLAUSES)?.to_vec();
            let arg_count = state.len();

            let mut slots = Vec::with_capacity(init.len());
            for clause in &init {
                let v = clause.invoke_with_arguments(&state[..arg_count])?;
                if clause.ty().ret() == ValueType::Void {
                    slots.push(None);
                } else {
                    slots.push(Some(state.len()));
                    state.push(v);
                }
            }
            loop {
                for (i, slot) in slots.iter().enumerate() {
                    let v = step[i].invoke_with_arguments(&state)?;
                    if let Some(slot) = *slot {
                        state[slot] = v;
                    }
                    let more = pred[i].invoke_with_arguments(&state)?;
                    if more.as_boxed() != Some(Boxed::Boolean(true)) {
                        return fini[i].invoke_with_arguments(&state);
                    }
                }
            }
        },
    )
});

fn clause_array(clauses: Vec<Adapter>) -> Result<Value, BuildError> {
    let values = clauses.into_iter().map(Value::from).collect();
    Array::from_values(ElemType::Ref(RefType::Adapter), values)
        .map(Value::from)
        .map_err(|err| BuildError::illegal_argument(err.message()))
}

fn pad_all(
    what: &str,
    clauses: &[Adapter],
    full: &[ValueType],
) -> Result<Vec<Adapter>, BuildError> {
    clauses
        .iter()
        .map(|c| {
            check_prefix(what, c.ty().params(), full)?;
            pad_to(c, full)
        })
        .collect()
}

/// Builds a clause loop over arguments of `args` returning `result`.
///
/// The four clause lists must have the same, nonzero length. `init[i]` takes a prefix of
/// `args`; `step[i]` must return what `init[i]` returns; predicates return `boolean` and every
/// `fini` returns `result`.
pub fn make_loop(
    result: ValueType,
    args: &[ValueType],
    init: &[Adapter],
    step: &[Adapter],
    pred: &[Adapter],
    fini: &[Adapter],
) -> Result<Adapter, BuildError> {
    let n = init.len();
    if n == 0 || step.len() != n || pred.len() != n || fini.len() != n {
        return Err(BuildError::illegal_argument(format!(
            "loop clause lists have lengths {n}, {}, {}, {}",
            step.len(),
            pred.len(),
            fini.len()
        )));
    }
    let mut state: Vec<ValueType> = args.to_vec();
    for (i, (init, step)) in init.iter().zip(step).enumerate() {
        let var = init.ty().ret();
        if step.ty().ret() != var {
            return Err(BuildError::illegal_argument(format!(
                "step {} of clause {i} does not return {var}",
                step.ty()
            )));
        }
        if var != ValueType::Void {
            state.push(var);
        }
    }
    if let Some(p) = pred.iter().find(|p| p.ty().ret() != ValueType::BOOLEAN) {
        return Err(BuildError::illegal_argument(format!(
            "loop predicate {} does not return boolean",
            p.ty()
        )));
    }
    if let Some(f) = fini.iter().find(|f| f.ty().ret() != result) {
        return Err(BuildError::illegal_argument(format!(
            "loop finalizer {} does not return {result}",
            f.ty()
        )));
    }
    let ty = MethodType::new(result, args);
    ty.check_slot_limit()?;
    MethodType::new(result, state.clone()).check_slot_limit()?;

    let init = pad_all("loop init", init, args)?;
    let step = pad_all("loop step", step, &state)?;
    let pred = pad_all("loop predicate", pred, &state)?;
    let fini = pad_all("loop finalizer", fini, &state)?;

    let signature = ty.basic_signature();
    let species = species_for("LLLLLL");
    let form = lookup_or_build(FormKind::Loop, &signature, || {
        boxed_routine_form("loop", &species, &signature, &LOOP)
    });
    let carrier = species.construct(vec![
        clause_array(init)?,
        clause_array(step)?,
        clause_array(pred)?,
        clause_array(fini)?,
        Value::from(argument_collector(&ty)?),
        Value::from(result_unboxer(result)),
    ]);
    Ok(Adapter::bound(ty, form, carrier))
}

/// Runs `body` `iterations(args...)` times, threading a value through it.
///
/// `body` has type `(A..., int i, V v)V`, or `(A..., int i)void` when `V` is `void`; it sees
/// the counter running from zero. `init` has type `(A'...)V` for a prefix `A'` of `A` and
/// provides the starting value, which defaults to the zero of `V`. `iterations` likewise takes
/// a prefix of `A` and returns `int`.
pub fn counted_loop(
    iterations: &Adapter,
    init: Option<&Adapter>,
    body: &Adapter,
) -> Result<Adapter, BuildError> {
    let body_type = body.ty();
    let var = body_type.ret();
    let tail = if var == ValueType::Void { 1 } else { 2 };
    let params = body_type.params();
    let well_formed = params.len() >= tail
        && params[params.len() - tail] == ValueType::INT
        && (var == ValueType::Void || params[params.len() - 1] == var);
    if !well_formed {
        return Err(BuildError::illegal_argument(format!(
            "counted loop body {body_type} does not take a trailing counter and {var}"
        )));
    }
    let outer = &params[..params.len() - tail];
    if iterations.ty().ret() != ValueType::INT {
        return Err(BuildError::illegal_argument(format!(
            "loop count {} does not return int",
            iterations.ty()
        )));
    }
    check_prefix("loop count", iterations.ty().params(), outer)?;
    let start = loop_start(init, var)?;

    let counters = [ValueType::INT, ValueType::INT];
    let mut ahead: Vec<ValueType> = outer.to_vec();
    ahead.extend_from_slice(&counters);

    let always = constant(ValueType::BOOLEAN, Value::from(true))?;
    let result = if var == ValueType::Void {
        zero(ValueType::Void)
    } else {
        drop_arguments(&identity(var)?, 0, &ahead)?
    };

    let counter_step = drop_arguments(&constant_handle(ConstantHandle::CountedLoopStep), 0, outer)?;
    let counter_pred =
        drop_arguments(&constant_handle(ConstantHandle::CountedLoopPredicate), 0, outer)?;
    let limit_step = drop_arguments(&identity(ValueType::INT)?, 0, &ahead[..ahead.len() - 1])?;
    let value_step = filter_argument(
        body,
        outer.len(),
        &constant_handle(ConstantHandle::DecrementCounter),
    )?;
    let value_step = drop_arguments(&value_step, outer.len() + 1, &[ValueType::INT])?;

    make_loop(
        var,
        outer,
        &[constant(ValueType::INT, Value::Int(0))?, iterations.clone(), start],
        &[counter_step, limit_step, value_step],
        &[counter_pred, always.clone(), always],
        &[result.clone(), result.clone(), result],
    )
}

fn loop_start(init: Option<&Adapter>, var: ValueType) -> Result<Adapter, BuildError> {
    match init {
        Some(init) if init.ty().ret() != var => Err(BuildError::illegal_argument(format!(
            "loop init {} does not return {var}",
            init.ty()
        ))),
        Some(init) => Ok(init.clone()),
        None => Ok(zero(var)),
    }
}

/// Runs `body` once per element of an array, threading a value through it.
///
/// `body` has type `(A..., T t, V v)V`, or `(A..., T t)void` when `V` is `void`, and sees each
/// element cast or unboxed to `T`. `iterator` takes a prefix of `A` and returns the array to
/// walk or an `Iterator` over it; without one, the first loop argument is the array. `init`
/// provides the starting value as for [`counted_loop`].
pub fn iterated_loop(
    iterator: Option<&Adapter>,
    init: Option<&Adapter>,
    body: &Adapter,
) -> Result<Adapter, BuildError> {
    let body_type = body.ty();
    let var = body_type.ret();
    let tail = if var == ValueType::Void { 1 } else { 2 };
    let params = body_type.params();
    if params.len() < tail || (var != ValueType::Void && params[params.len() - 1] != var) {
        return Err(BuildError::illegal_argument(format!(
            "iterated loop body {body_type} does not take a trailing element and {var}"
        )));
    }
    let elem = params[params.len() - tail];
    let outer = &params[..params.len() - tail];
    let begin = constant_handle(ConstantHandle::InitIterator);
    let walk = match iterator {
        Some(it) if it.ty().ret() == ValueType::ITERATOR => {
            check_prefix("loop iterator", it.ty().params(), outer)?;
            it.clone()
        }
        Some(it) if it.ty().ret().is_reference() => {
            check_prefix("loop iterator", it.ty().params(), outer)?;
            let begin = begin.as_type(&MethodType::new(ValueType::ITERATOR, vec![it.ty().ret()]))?;
            collect(&begin, it, 0, false)?
        }
        Some(it) => {
            return Err(BuildError::illegal_argument(format!(
                "loop iterator {} does not return an array",
                it.ty()
            )));
        }
        None => match outer.first() {
            Some(&first) if first.is_reference() => {
                begin.as_type(&MethodType::new(ValueType::ITERATOR, vec![first]))?
            }
            _ => {
                return Err(BuildError::illegal_argument(format!(
                    "iterated loop body {body_type} has no leading array to walk"
                )));
            }
        },
    };
    let start = loop_start(init, var)?;

    let mut with_cursor: Vec<ValueType> = outer.to_vec();
    with_cursor.push(ValueType::ITERATOR);
    let result = if var == ValueType::Void {
        zero(ValueType::Void)
    } else {
        drop_arguments(&identity(var)?, 0, &with_cursor)?
    };
    let keep_cursor = drop_arguments(&identity(ValueType::ITERATOR)?, 0, outer)?;
    let has_next = drop_arguments(&constant_handle(ConstantHandle::IteratePredicate), 0, outer)?;
    let next = constant_handle(ConstantHandle::IterateNext)
        .as_type(&MethodType::new(elem, vec![ValueType::ITERATOR]))?;
    let value_step = filter_argument(body, outer.len(), &next)?;
    let always = constant(ValueType::BOOLEAN, Value::from(true))?;

    make_loop(
        var,
        outer,
        &[walk, start],
        &[keep_cursor, value_step],
        &[has_next, always],
        &[result.clone(), result],
    )
}
