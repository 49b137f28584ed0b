// Copyright 2026 the Adapter Forms Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Spreading an array argument over consecutive parameters.

use alloc::sync::Arc;
use alloc::vec;
use std::sync::LazyLock;

use crate::adapter::Adapter;
use crate::elementary::{ArrayAccess, Elementary, array_op};
use crate::error::{BuildError, Thrown};
use crate::form::{Form, FormKind, lookup_or_build};
use crate::names::{Function, NamesBuilder, Operand};
use crate::species::species_for;
use crate::types::{ElemType, MethodType, RefType, ValueType};
use crate::value::Value;

/// `(Object, int)void`: fails unless the array has exactly the given length.
static CHECK_SPREAD_ARGUMENT: LazyLock<Elementary> = LazyLock::new(|| {
    Elementary::new(
        "checkSpreadArgument",
        MethodType::new(ValueType::Void, vec![ValueType::OBJECT, ValueType::INT]),
        |args| {
            let n = args[1]
                .as_int()
                .ok_or_else(|| Thrown::internal("spread count is not an int slot"))?;
            let len = if args[0].is_null() {
                Some(0)
            } else {
                args[0].as_array().map(|a| a.len())
            };
            match len {
                Some(len) if usize::try_from(n).is_ok_and(|n| n == len) => Ok(Value::Null),
                _ => Err(Thrown::illegal_argument(format!("array is not of length {n}"))),
            }
        },
    )
});

/// Replaces parameters `pos..pos + count` of `target` with one parameter of `array_type`.
///
/// Invocation fails with `IllegalArgument` unless the array has exactly `count` elements
/// (`null` counts as empty).
pub fn spread(
    target: &Adapter,
    array_type: ValueType,
    pos: usize,
    count: usize,
) -> Result<Adapter, BuildError> {
    let Some(elem) = array_type.element() else {
        return Err(BuildError::illegal_argument(format!(
            "{array_type} is not an array type"
        )));
    };
    let old_type = target.ty();
    if pos + count > old_type.parameter_count() {
        return Err(BuildError::illegal_argument(format!(
            "cannot spread {count} arguments at {pos} of {old_type}"
        )));
    }
    let new_type = old_type.replace_params(pos, pos + count, &[array_type]);
    new_type.check_slot_limit()?;
    let count_i32 = i32::try_from(count)
        .map_err(|_| BuildError::TooManyArguments { slots: count })?;
    let elements = vec![elem.value_type(); count];
    let target = target.as_type(&old_type.replace_params(pos, pos + count, &elements))?;

    // Reference elements share one load routine.
    let elem = match elem {
        ElemType::Ref(_) => ElemType::Ref(RefType::Object),
        prim => prim,
    };
    let signature = new_type.basic_signature();
    let target_signature = target.ty().basic_signature();
    let species = species_for("L");
    let form = lookup_or_build(FormKind::Spread { pos, count, elem }, &signature, || {
        let invoker = signature.invoker();
        let arity = invoker.params().len();
        let mut b = NamesBuilder::arguments(count + 3, &invoker);
        b.constrain(0, Arc::clone(&species));
        let this = b.operand(0);
        let array = b.operand(pos + 1);
        let target = b.set(arity, species.getter(0), vec![this]);
        b.set(
            arity + 1,
            Function::Elementary(CHECK_SPREAD_ARGUMENT.clone()),
            vec![array.clone(), Operand::Const(Value::Int(count_i32))],
        );
        let load = Function::Elementary(array_op(ArrayAccess::Get, elem));
        let mut call_args = vec![target];
        call_args.extend((1..=pos).map(|i| b.operand(i)));
        for (j, index) in (0..count_i32).enumerate() {
            call_args.push(b.set(
                arity + 2 + j,
                load.clone(),
                vec![array.clone(), Operand::Const(Value::Int(index))],
            ));
        }
        call_args.extend((pos + 2..arity).map(|i| b.operand(i)));
        b.set(arity + 2 + count, Function::InvokeBasic(target_signature), call_args);
        Form::new("spread", arity, b.finish())
    });
    let carrier = species.construct(vec![Value::from(target)]);
    Ok(Adapter::bound(new_type, form, carrier))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::Primitive;
    use crate::value::Array;

    fn sum3() -> Adapter {
        Adapter::from_fn(
            "sum3",
            MethodType::new(
                ValueType::LONG,
                vec![ValueType::LONG, ValueType::INT, ValueType::INT],
            ),
            |args| match args {
                [Value::Long(a), Value::Int(b), Value::Int(c)] => {
                    Ok(Value::Long(a * 100 + i64::from(*b) * 10 + i64::from(*c)))
                }
                _ => Err(Thrown::internal("sum3")),
            },
        )
    }

    fn ints(values: &[i32]) -> Value {
        let values = values.iter().map(|&v| Value::Int(v)).collect();
        Value::from(Array::from_values(ElemType::Prim(Primitive::Int), values).unwrap())
    }

    #[test]
    fn spread_matches_direct_invocation() {
        let target = sum3();
        let spread = spread(&target, ValueType::INT_ARRAY, 1, 2).unwrap();
        assert_eq!(
            spread.ty(),
            &MethodType::new(ValueType::LONG, vec![ValueType::LONG, ValueType::INT_ARRAY])
        );
        let direct = target
            .invoke(&[Value::Long(1), Value::Int(2), Value::Int(3)])
            .unwrap();
        assert_eq!(
            spread.invoke(&[Value::Long(1), ints(&[2, 3])]).unwrap(),
            direct
        );
    }

    #[test]
    fn wrong_lengths_are_illegal_arguments() {
        let spread = spread(&sum3(), ValueType::INT_ARRAY, 1, 2).unwrap();
        for bad in [ints(&[1]), ints(&[1, 2, 3]), Value::Null] {
            let err = spread.invoke(&[Value::Long(1), bad]).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::IllegalArgument);
            assert_eq!(err.message(), "array is not of length 2");
        }
    }

    #[test]
    fn empty_spread_accepts_null() {
        let spread = spread(&sum3(), ValueType::OBJECT_ARRAY, 3, 0).unwrap();
        let r = spread
            .invoke(&[Value::Long(1), Value::Int(2), Value::Int(3), Value::Null])
            .unwrap();
        assert_eq!(r, Value::Long(123));
    }

    #[test]
    fn reference_arrays_are_unboxed_into_primitives() {
        let spread = spread(&sum3(), ValueType::OBJECT_ARRAY, 0, 3).unwrap();
        let args = Array::from_values(
            ElemType::Ref(RefType::Object),
            vec![
                Value::boxed(crate::value::Boxed::Long(4)),
                Value::boxed(crate::value::Boxed::Int(5)),
                Value::boxed(crate::value::Boxed::Short(6)),
            ],
        )
        .unwrap();
        assert_eq!(spread.invoke(&[Value::from(args)]).unwrap(), Value::Long(456));
    }

    #[test]
    fn same_shaped_spreads_share_a_form() {
        let product = Adapter::from_fn(
            "product",
            MethodType::new(
                ValueType::LONG,
                vec![ValueType::LONG, ValueType::INT, ValueType::INT],
            ),
            |args| match args {
                [Value::Long(a), Value::Int(b), Value::Int(c)] => {
                    Ok(Value::Long(a * i64::from(*b) * i64::from(*c)))
                }
                _ => Err(Thrown::internal("product")),
            },
        );
        let summed = spread(&sum3(), ValueType::INT_ARRAY, 1, 2).unwrap();
        let multiplied = spread(&product, ValueType::INT_ARRAY, 1, 2).unwrap();
        assert!(Arc::ptr_eq(&summed.form().unwrap(), &multiplied.form().unwrap()));
        assert_eq!(multiplied.invoke(&[Value::Long(2), ints(&[3, 4])]).unwrap(), Value::Long(24));

        let elsewhere = spread(&sum3(), ValueType::INT_ARRAY, 0, 1).unwrap();
        assert!(!Arc::ptr_eq(&summed.form().unwrap(), &elsewhere.form().unwrap()));
    }

    #[test]
    fn spread_shape_is_validated() {
        assert!(spread(&sum3(), ValueType::INT, 0, 1).is_err());
        assert!(spread(&sum3(), ValueType::INT_ARRAY, 2, 2).is_err());
    }
}
