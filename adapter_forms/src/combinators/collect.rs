// Copyright 2026 the Adapter Forms Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Argument list surgery: collecting, filtering and dropping arguments.

use alloc::sync::Arc;
use alloc::vec;

use crate::adapter::Adapter;
use crate::combinators::varargs_array_of;
use crate::error::BuildError;
use crate::form::{Form, FormKind, lookup_or_build};
use crate::names::{Function, NamesBuilder};
use crate::species::species_for;
use crate::types::{MethodType, ValueType};
use crate::value::Value;

/// Runs `collector` on the arguments starting at `pos` and passes its result to `target` at
/// `pos`.
///
/// Without `retain`, the collector's arguments are consumed:
/// `target(A..., V, B...)` with `collector(C...)V` yields `(A..., C..., B...)`.
/// With `retain`, they are also passed on after the collected value, so `B` must start with
/// `C` and the result has type `(A..., B...)`. A `void` collector contributes no argument.
pub fn collect(
    target: &Adapter,
    collector: &Adapter,
    pos: usize,
    retain: bool,
) -> Result<Adapter, BuildError> {
    let target_type = target.ty();
    let collector_type = collector.ty();
    let collected = collector_type.ret();
    let value_slots = usize::from(collected != ValueType::Void);
    if pos + value_slots > target_type.parameter_count() {
        return Err(BuildError::illegal_argument(format!(
            "no parameter {pos} in {target_type}"
        )));
    }
    if value_slots == 1 && target_type.param(pos) != collected {
        return Err(BuildError::illegal_argument(format!(
            "target parameter {pos} of {target_type} does not match collector {collector_type}"
        )));
    }
    let kept = target_type.drop_params(pos, pos + value_slots);
    let new_type = if retain {
        let after = &kept.params()[pos..];
        if !after.starts_with(collector_type.params()) {
            return Err(BuildError::illegal_argument(format!(
                "retained arguments of {target_type} do not match collector {collector_type}"
            )));
        }
        kept
    } else {
        kept.insert_params(pos, collector_type.params())
    };
    new_type.check_slot_limit()?;

    let signature = new_type.basic_signature();
    let collector_signature = collector_type.basic_signature();
    let target_signature = target_type.basic_signature();
    let collector_arity = collector_type.parameter_count();
    let species = species_for("LL");
    let kind = FormKind::Collect {
        pos,
        retain,
        collector: collector_signature.clone(),
    };
    let form = lookup_or_build(kind, &signature, || {
        let invoker = signature.invoker();
        let arity = invoker.params().len();
        let mut b = NamesBuilder::arguments(4, &invoker);
        b.constrain(0, Arc::clone(&species));
        let this = b.operand(0);
        let target = b.set(arity, species.getter(0), vec![this.clone()]);
        let collector = b.set(arity + 1, species.getter(1), vec![this]);
        let mut collector_args = vec![collector];
        collector_args.extend((pos + 1..pos + 1 + collector_arity).map(|i| b.operand(i)));
        let value = b.set(
            arity + 2,
            Function::InvokeBasic(collector_signature),
            collector_args,
        );

        let mut call_args = vec![target];
        call_args.extend((1..=pos).map(|i| b.operand(i)));
        if value_slots == 1 {
            call_args.push(value);
        }
        let rest = if retain { pos + 1 } else { pos + 1 + collector_arity };
        call_args.extend((rest..arity).map(|i| b.operand(i)));
        b.set(arity + 3, Function::InvokeBasic(target_signature), call_args);
        Form::new("collect", arity, b.finish())
    });
    let carrier = species.construct(vec![
        Value::from(target.clone()),
        Value::from(collector.clone()),
    ]);
    Ok(Adapter::bound(new_type, form, carrier))
}

/// Pre-processes argument `pos` of `target` with the unary `filter`.
pub fn filter_argument(
    target: &Adapter,
    pos: usize,
    filter: &Adapter,
) -> Result<Adapter, BuildError> {
    if filter.ty().parameter_count() != 1 || filter.ty().ret() == ValueType::Void {
        return Err(BuildError::illegal_argument(format!(
            "filter {} is not unary",
            filter.ty()
        )));
    }
    collect(target, filter, pos, false)
}

/// Inserts ignored parameters of `types` before parameter `pos` of `target`.
pub fn drop_arguments(
    target: &Adapter,
    pos: usize,
    types: &[ValueType],
) -> Result<Adapter, BuildError> {
    let old_type = target.ty();
    if pos > old_type.parameter_count() {
        return Err(BuildError::illegal_argument(format!(
            "no parameter {pos} in {old_type}"
        )));
    }
    if types.is_empty() {
        return Ok(target.clone());
    }
    if types.contains(&ValueType::Void) {
        return Err(BuildError::illegal_argument("void parameter"));
    }
    let new_type = old_type.insert_params(pos, types);
    new_type.check_slot_limit()?;

    let signature = new_type.basic_signature();
    let target_signature = old_type.basic_signature();
    let count = types.len();
    let species = species_for("L");
    let form = lookup_or_build(FormKind::Drop { pos, count }, &signature, || {
        let invoker = signature.invoker();
        let arity = invoker.params().len();
        let mut b = NamesBuilder::arguments(2, &invoker);
        b.constrain(0, Arc::clone(&species));
        let this = b.operand(0);
        let mut call_args = vec![b.set(arity, species.getter(0), vec![this])];
        call_args.extend((1..=pos).chain(pos + 1 + count..arity).map(|i| b.operand(i)));
        b.set(arity + 1, Function::InvokeBasic(target_signature), call_args);
        Form::new("drop", arity, b.finish())
    });
    let carrier = species.construct(vec![Value::from(target.clone())]);
    Ok(Adapter::bound(new_type, form, carrier))
}

/// Collects the trailing `count` arguments into a new array of `array_type` passed as the last
/// parameter of `target`.
pub fn as_collector(
    target: &Adapter,
    array_type: ValueType,
    count: usize,
) -> Result<Adapter, BuildError> {
    let ty = target.ty();
    let Some(last) = ty.last_param() else {
        return Err(BuildError::illegal_argument(format!(
            "{ty} has no trailing array parameter"
        )));
    };
    if last.element().is_none() || !last.is_assignable_from(array_type) {
        return Err(BuildError::illegal_argument(format!(
            "{array_type} cannot be passed as {last}"
        )));
    }
    let collector = varargs_array_of(array_type, count)?;
    let collector =
        collector.as_type(&MethodType::new(last, collector.ty().params()))?;
    collect(target, &collector, ty.parameter_count() - 1, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Thrown;
    use crate::types::{ElemType, RefType};

    fn concat() -> Adapter {
        Adapter::from_fn(
            "concat",
            MethodType::new(ValueType::STRING, vec![ValueType::STRING, ValueType::STRING]),
            |args| {
                let a = args[0].as_str().unwrap_or("null");
                let b = args[1].as_str().unwrap_or("null");
                Ok(Value::string(&format!("{a}{b}")))
            },
        )
    }

    fn describe_int() -> Adapter {
        Adapter::from_fn(
            "describe",
            MethodType::new(ValueType::STRING, vec![ValueType::INT]),
            |args| Ok(Value::string(&format!("<{}>", args[0]))),
        )
    }

    #[test]
    fn collector_result_replaces_its_arguments() {
        let c = collect(&concat(), &describe_int(), 1, false).unwrap();
        assert_eq!(
            c.ty(),
            &MethodType::new(ValueType::STRING, vec![ValueType::STRING, ValueType::INT])
        );
        assert_eq!(
            c.invoke(&[Value::string("a"), Value::Int(1)]).unwrap(),
            Value::string("a<1>")
        );
    }

    #[test]
    fn retained_arguments_follow_the_collected_value() {
        let tag = Adapter::from_fn(
            "tag",
            MethodType::new(ValueType::STRING, vec![ValueType::STRING, ValueType::INT]),
            |args| {
                let s = args[0].as_str().unwrap_or("null");
                Ok(Value::string(&format!("{s}|{}", args[1])))
            },
        );
        let c = collect(&tag, &describe_int(), 0, true).unwrap();
        assert_eq!(c.ty(), &MethodType::new(ValueType::STRING, vec![ValueType::INT]));
        assert_eq!(c.invoke(&[Value::Int(7)]).unwrap(), Value::string("<7>|7"));
    }

    #[test]
    fn void_collectors_contribute_nothing() {
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let record = Adapter::from_fn(
            "record",
            MethodType::new(ValueType::Void, vec![ValueType::INT]),
            move |args| {
                log.lock().push(args[0].clone());
                Ok(Value::Null)
            },
        );
        let c = collect(&concat(), &record, 0, false).unwrap();
        assert_eq!(
            c.ty(),
            &MethodType::new(
                ValueType::STRING,
                vec![ValueType::INT, ValueType::STRING, ValueType::STRING]
            )
        );
        let r = c
            .invoke(&[Value::Int(5), Value::string("x"), Value::string("y")])
            .unwrap();
        assert_eq!(r, Value::string("xy"));
        assert_eq!(*seen.lock(), vec![Value::Int(5)]);
    }

    #[test]
    fn mismatched_collectors_are_rejected() {
        let err = collect(&describe_int(), &describe_int(), 0, false).unwrap_err();
        assert!(matches!(err, BuildError::IllegalArgument(_)));
        let tag = Adapter::from_fn(
            "tag",
            MethodType::new(ValueType::STRING, vec![ValueType::STRING, ValueType::LONG]),
            |_| Ok(Value::Null),
        );
        let err = collect(&tag, &describe_int(), 0, true).unwrap_err();
        assert!(matches!(err, BuildError::IllegalArgument(_)));
    }

    #[test]
    fn dropped_arguments_are_ignored() {
        let concat = concat();
        let d = drop_arguments(&concat, 1, &[ValueType::LONG, ValueType::OBJECT]).unwrap();
        let r = d
            .invoke(&[
                Value::string("a"),
                Value::Long(9),
                Value::Null,
                Value::string("b"),
            ])
            .unwrap();
        assert_eq!(r, Value::string("ab"));
        assert!(drop_arguments(&concat, 3, &[ValueType::INT]).is_err());
        assert_eq!(drop_arguments(&concat, 0, &[]).unwrap(), concat);
    }

    #[test]
    fn same_shaped_surgery_shares_forms() {
        let swapped = Adapter::from_fn(
            "swapped",
            MethodType::new(ValueType::STRING, vec![ValueType::STRING, ValueType::STRING]),
            |args| {
                let a = args[0].as_str().unwrap_or("null");
                let b = args[1].as_str().unwrap_or("null");
                Ok(Value::string(&format!("{b}{a}")))
            },
        );
        let hex = Adapter::from_fn(
            "hex",
            MethodType::new(ValueType::STRING, vec![ValueType::INT]),
            |args| Ok(Value::string(&format!("{:x}", args[0].as_int().unwrap_or(0)))),
        );
        let first = collect(&concat(), &describe_int(), 1, false).unwrap();
        let second = collect(&swapped, &hex, 1, false).unwrap();
        assert!(Arc::ptr_eq(&first.form().unwrap(), &second.form().unwrap()));
        assert_eq!(
            second.invoke(&[Value::string("a"), Value::Int(255)]).unwrap(),
            Value::string("ffa")
        );
        let retained = collect(&swapped, &hex, 1, true);
        assert!(retained.is_err());

        let dropped = drop_arguments(&concat(), 1, &[ValueType::LONG]).unwrap();
        let other = drop_arguments(&swapped, 1, &[ValueType::LONG]).unwrap();
        assert!(Arc::ptr_eq(&dropped.form().unwrap(), &other.form().unwrap()));
        let wider = drop_arguments(&swapped, 1, &[ValueType::LONG, ValueType::LONG]).unwrap();
        assert!(!Arc::ptr_eq(&dropped.form().unwrap(), &wider.form().unwrap()));
        assert_eq!(
            other
                .invoke(&[Value::string("a"), Value::Long(1), Value::string("b")])
                .unwrap(),
            Value::string("ba")
        );
    }

    #[test]
    fn filters_transform_one_argument() {
        let f = filter_argument(&concat(), 1, &describe_int()).unwrap();
        assert_eq!(
            f.invoke(&[Value::string("n"), Value::Int(3)]).unwrap(),
            Value::string("n<3>")
        );
        assert!(filter_argument(&concat(), 0, &concat()).is_err());
    }

    #[test]
    fn collectors_gather_trailing_arguments() {
        let count = Adapter::from_fn(
            "count",
            MethodType::new(ValueType::INT, vec![ValueType::OBJECT_ARRAY]),
            |args| match args[0].as_array() {
                Some(a) => Ok(Value::Int(i32::try_from(a.len()).unwrap_or(i32::MAX))),
                None => Err(Thrown::null_pointer("no array")),
            },
        );
        let strings = ValueType::Array(ElemType::Ref(RefType::Str));
        let c = as_collector(&count, strings, 3).unwrap();
        assert_eq!(c.ty(), &MethodType::new(ValueType::INT, vec![ValueType::STRING; 3]));
        let r = c
            .invoke(&[Value::string("a"), Value::string("b"), Value::Null])
            .unwrap();
        assert_eq!(r, Value::Int(3));
        assert!(matches!(
            as_collector(&count, ValueType::INT_ARRAY, 1),
            Err(BuildError::IllegalArgument(_))
        ));
        assert!(matches!(
            as_collector(&concat(), strings, 1),
            Err(BuildError::IllegalArgument(_))
        ));
    }
}
