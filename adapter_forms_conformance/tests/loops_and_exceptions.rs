// Copyright 2026 the Adapter Forms Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Loops, guarded catch and try/finally.

use adapter_forms::combinators::{
    constant, counted_loop, guarded_catch, identity, iterated_loop, make_loop, try_finally,
};
use adapter_forms::{Array, ElemType, ErrorKind, MethodType, Primitive, Thrown, Value, ValueType};
use adapter_forms_conformance::{Recorder, int_adapter};

#[test]
fn one_clause_loop_returns_four_after_four_passes() {
    let steps = Recorder::new();
    let preds = Recorder::new();
    let init = constant(ValueType::INT, Value::Int(0)).unwrap();
    let step = steps.adapter(
        "step",
        MethodType::new(ValueType::INT, vec![ValueType::INT]),
        |args| Ok(Value::Int(args[0].as_int().unwrap_or(0) + 1)),
    );
    let pred = preds.adapter(
        "pred",
        MethodType::new(ValueType::BOOLEAN, vec![ValueType::INT]),
        |args| Ok(Value::from(args[0].as_int().is_some_and(|v| v <= 3))),
    );
    let fini = identity(ValueType::INT).unwrap();
    let l = make_loop(ValueType::INT, &[], &[init], &[step], &[pred], &[fini]).unwrap();
    assert_eq!(l.invoke(&[]).unwrap(), Value::Int(4));
    assert_eq!(steps.count(), 4);
    let seen: Vec<Value> = preds.calls().into_iter().map(|c| c[0].clone()).collect();
    assert_eq!(seen, [1, 2, 3, 4].map(Value::Int));
}

#[test]
fn counted_loops_sum_their_counter() {
    let iterations = identity(ValueType::INT).unwrap();
    let body = int_adapter("acc", 3, |v| v[2] + v[1]);
    let sum = counted_loop(&iterations, None, &body).unwrap();
    assert_eq!(sum.invoke(&[Value::Int(5)]).unwrap(), Value::Int(10));
}

#[test]
fn iterated_loops_visit_each_element_once_in_order() {
    let bodies = Recorder::new();
    let body = bodies.adapter(
        "acc",
        MethodType::new(
            ValueType::LONG,
            vec![ValueType::INT_ARRAY, ValueType::INT, ValueType::LONG],
        ),
        |args| {
            let x = args[1].as_int().unwrap_or(0);
            Ok(Value::Long(args[2].as_long().unwrap_or(0) * 2 + i64::from(x)))
        },
    );
    let walk = iterated_loop(None, None, &body).unwrap();
    let values = [3, 1, 4].map(Value::Int).to_vec();
    let array = Value::from(Array::from_values(ElemType::Prim(Primitive::Int), values).unwrap());
    assert_eq!(walk.invoke(&[array.clone()]).unwrap(), Value::Long(((3 * 2) + 1) * 2 + 4));
    let elements: Vec<Value> = bodies.calls().into_iter().map(|c| c[1].clone()).collect();
    assert_eq!(elements, [3, 1, 4].map(Value::Int));

    // A counted loop indexing the same array agrees.
    let length = adapter_forms::Adapter::from_fn(
        "length",
        MethodType::new(ValueType::INT, vec![ValueType::INT_ARRAY]),
        |args| Ok(Value::Int(args[0].as_array().map_or(0, |a| i32::try_from(a.len()).unwrap()))),
    );
    let indexed = adapter_forms::Adapter::from_fn(
        "indexed",
        MethodType::new(
            ValueType::LONG,
            vec![ValueType::INT_ARRAY, ValueType::INT, ValueType::LONG],
        ),
        |args| {
            let i = usize::try_from(args[1].as_int().unwrap_or(0)).unwrap_or(0);
            let x = args[0].as_array().and_then(|a| a.get(i).ok()).and_then(|v| v.as_int());
            Ok(Value::Long(args[2].as_long().unwrap_or(0) * 2 + i64::from(x.unwrap_or(0))))
        },
    );
    let counted = counted_loop(&length, None, &indexed).unwrap();
    assert_eq!(counted.invoke(&[array.clone()]).unwrap(), walk.invoke(&[array]).unwrap());
}

fn thrower(kind: ErrorKind) -> adapter_forms::Adapter {
    adapter_forms::Adapter::from_fn(
        "fail",
        MethodType::new(ValueType::INT, vec![ValueType::INT]),
        move |_| Err(Thrown::new(kind, "target failed")),
    )
}

#[test]
fn try_finally_rethrows_after_one_cleanup() {
    let cleanups = Recorder::new();
    let cleanup = cleanups.adapter(
        "cleanup",
        MethodType::new(
            ValueType::INT,
            vec![ValueType::ERROR, ValueType::INT, ValueType::INT],
        ),
        |_| Ok(Value::Int(42)),
    );
    let guarded = try_finally(&thrower(ErrorKind::Arithmetic), &cleanup).unwrap();
    let err = guarded.invoke(&[Value::Int(3)]).unwrap_err();
    assert_eq!(err, Thrown::new(ErrorKind::Arithmetic, "target failed"));
    let calls = cleanups.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0][0], Value::from(err));
    assert_eq!(calls[0][1], Value::Int(3));
}

#[test]
fn guarded_catch_leaves_other_kinds_alone() {
    let catches = Recorder::new();
    let catcher = catches.adapter(
        "catcher",
        MethodType::new(ValueType::INT, vec![ValueType::ERROR]),
        |_| Ok(Value::Int(-1)),
    );
    let safe = guarded_catch(&thrower(ErrorKind::Io), ErrorKind::Arithmetic, &catcher).unwrap();
    let err = safe.invoke(&[Value::Int(0)]).unwrap_err();
    assert_eq!(err, Thrown::new(ErrorKind::Io, "target failed"));
    assert_eq!(catches.count(), 0);

    let safe =
        guarded_catch(&thrower(ErrorKind::Arithmetic), ErrorKind::Arithmetic, &catcher).unwrap();
    assert_eq!(safe.invoke(&[Value::Int(0)]).unwrap(), Value::Int(-1));
    assert_eq!(catches.count(), 1);
}
