// Copyright 2026 the Adapter Forms Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Spreading and collecting trailing arguments.

use adapter_forms::combinators::{spread, varargs_array};
use adapter_forms::{Array, ElemType, ErrorKind, MethodType, Primitive, RefType, Value, ValueType};
use adapter_forms_conformance::int_adapter;

fn int_array(values: &[i32]) -> Value {
    let values = values.iter().map(|&v| Value::Int(v)).collect();
    Value::from(Array::from_values(ElemType::Prim(Primitive::Int), values).unwrap())
}

#[test]
fn spread_round_trips_for_every_split() {
    let weigh = int_adapter("weigh", 4, |v| v[0] * 1000 + v[1] * 100 + v[2] * 10 + v[3]);
    let args = [1, 2, 3, 4];
    let direct = weigh.invoke(&args.map(Value::Int)).unwrap();
    for pos in 0..=4 {
        for count in 0..=4 - pos {
            let s = spread(&weigh, ValueType::INT_ARRAY, pos, count).unwrap();
            let mut call: Vec<Value> = args[..pos].iter().map(|&v| Value::Int(v)).collect();
            call.push(int_array(&args[pos..pos + count]));
            call.extend(args[pos + count..].iter().map(|&v| Value::Int(v)));
            assert_eq!(s.invoke(&call).unwrap(), direct, "spread at {pos} of {count}");

            let mut long = call.clone();
            long[pos] = int_array(&vec![0; count + 1]);
            let err = s.invoke(&long).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::IllegalArgument);
        }
    }
}

#[test]
fn spread_of_a_collector_is_the_identity_on_arrays() {
    let strings = ValueType::Array(ElemType::Ref(RefType::Str));
    let collect3 = adapter_forms::combinators::varargs_array_of(strings, 3).unwrap();
    let again = spread(&collect3, strings, 0, 3).unwrap();
    assert_eq!(again.ty(), &MethodType::new(strings, vec![strings]));
    let input = Array::from_values(
        ElemType::Ref(RefType::Str),
        vec![Value::string("a"), Value::Null, Value::string("c")],
    )
    .unwrap();
    let out = again.invoke(&[Value::from(input)]).unwrap();
    assert_eq!(
        out.as_array().unwrap().to_vec(),
        vec![Value::string("a"), Value::Null, Value::string("c")]
    );
}

#[test]
fn large_varargs_arrays_keep_argument_order() {
    let n = 57;
    let make = varargs_array(n).unwrap();
    let args: Vec<Value> = (0..n).map(|i| Value::string(&format!("#{i}"))).collect();
    let made = make.invoke(&args).unwrap();
    assert_eq!(made.as_array().unwrap().to_vec(), args);
}

#[test]
fn too_many_arguments_are_rejected_at_construction() {
    assert!(matches!(
        varargs_array(adapter_forms::MAX_ADAPTER_ARITY + 1),
        Err(adapter_forms::BuildError::TooManyArguments { .. })
    ));
    assert!(varargs_array(adapter_forms::MAX_ADAPTER_ARITY).is_ok());
}
