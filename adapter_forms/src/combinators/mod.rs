// Copyright 2026 the Adapter Forms Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Combinator factories.
//!
//! Every factory is a pure function of its inputs: it validates the requested shape, fetches
//! or builds the combinator form for the erased signature, and returns a new adapter. Input
//! adapters are never modified. Construction errors are reported as [`BuildError`] before any
//! adapter exists; invocation errors surface as [`Thrown`](crate::error::Thrown) values.

mod arrays;
mod bind;
mod catch;
mod collect;
mod convert;
pub(crate) mod counting;
mod guard;
mod loops;
mod spread;
pub(crate) mod varargs;

pub use arrays::{
    array_constructor, array_element_getter, array_element_setter, array_length, varargs_array,
    varargs_array_of,
};
pub use bind::bind_to;
pub use catch::{guarded_catch, throw_exception, try_finally};
pub use collect::{as_collector, collect, drop_arguments, filter_argument};
pub use convert::convert;
pub use counting::{counting_wrapper, profile};
pub use guard::{branch_profile, guard, guard_with_profile};
pub use loops::{counted_loop, iterated_loop, make_loop};
pub use spread::spread;
pub use varargs::make_varargs_collector;

use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use crate::adapter::{Adapter, Delegate};
use crate::basic_type::{BasicSignature, BasicType};
use crate::conversion::value_op_adapter;
use crate::elementary::{Elementary, Intrinsic, ValueOp};
use crate::error::BuildError;
use crate::form::Form;
use crate::names::{Function, NamesBuilder, Operand};
use crate::species::Species;
use crate::types::{MethodType, ValueType};
use crate::value::{Boxed, Value};

/// An adapter of type `()ty` returning `value`.
pub fn constant(ty: ValueType, value: Value) -> Result<Adapter, BuildError> {
    let value = match ty {
        ValueType::Void => return Err(BuildError::illegal_argument("void constant")),
        ValueType::Prim(p) => Boxed::from_slot(p, &value)
            .map(Boxed::to_slot)
            .ok_or_else(|| BuildError::illegal_argument(format!("{value} is not a {}", p.name())))?,
        _ => {
            let fits = value.basic_type() == BasicType::L
                && value.runtime_type().is_none_or(|rt| ty.is_assignable_from(rt));
            if !fits {
                return Err(BuildError::illegal_argument(format!("{value} is not a {ty}")));
            }
            value
        }
    };
    Ok(Adapter::from_fn("constant", MethodType::new(ty, vec![]), move |_| {
        Ok(value.clone())
    }))
}

/// The adapter `(ty)ty` returning its argument.
pub fn identity(ty: ValueType) -> Result<Adapter, BuildError> {
    if ty == ValueType::Void {
        return Err(BuildError::illegal_argument("void identity"));
    }
    let op = value_op_adapter(ValueOp::Identity(ty.basic_type()));
    Ok(op.view_as_type(&MethodType::new(ty, vec![ty])))
}

/// The adapter `()ty` returning the zero of `ty` (nothing for `void`).
#[must_use]
pub fn zero(ty: ValueType) -> Adapter {
    let op = value_op_adapter(ValueOp::Zero(ty.basic_type()));
    op.view_as_type(&MethodType::new(ty, vec![]))
}

/// Tags `target` with `intrinsic` without changing its behaviour.
#[must_use]
pub fn make_intrinsic(target: &Adapter, intrinsic: Intrinsic) -> Adapter {
    if target.intrinsic() == intrinsic {
        return target.clone();
    }
    Adapter::delegating(
        target.ty().clone(),
        Delegate::Intrinsic {
            target: target.clone(),
            intrinsic,
        },
    )
}

/// `(args...)Object[]` boxing every argument of `ty` into a fresh array.
fn argument_collector(ty: &MethodType) -> Result<Adapter, BuildError> {
    let n = ty.parameter_count();
    varargs_array(n)?.as_type(&MethodType::new(ValueType::OBJECT_ARRAY, ty.params()))
}

/// `(Object)ret` turning a generic result back into `ret`.
fn result_unboxer(ret: ValueType) -> Adapter {
    match ret {
        ValueType::Void => value_op_adapter(ValueOp::Ignore(BasicType::L)),
        ValueType::Prim(p) => value_op_adapter(ValueOp::UnboxExact(p, false)),
        _ => value_op_adapter(ValueOp::Identity(BasicType::L)),
    }
}

/// Builds a form running `routine` over boxed arguments.
///
/// The carrier of `species` holds the routine's leading inputs followed by an argument
/// collector and a result unboxer:
///
/// ```text
/// (this, args...) => unbox(routine(slot0, .., slotk, collect(args...)))
/// ```
fn boxed_routine_form(
    debug_name: &str,
    species: &Arc<Species>,
    signature: &BasicSignature,
    routine: &Elementary,
) -> Form {
    let invoker = signature.invoker();
    let arity = invoker.params().len();
    let slots = species.slot_count();
    let inputs = slots - 2;
    let mut b = NamesBuilder::arguments(slots + 3, &invoker);
    b.constrain(0, Arc::clone(species));
    let this = b.operand(0);
    let getters: Vec<Operand> = (0..slots)
        .map(|slot| b.set(arity + slot, species.getter(slot), vec![this.clone()]))
        .collect();

    let mut collect_args = vec![getters[inputs].clone()];
    collect_args.extend((1..arity).map(|i| b.operand(i)));
    let collect_sig = signature.change_return(BasicType::L);
    let boxed = b.set(
        arity + slots,
        Function::InvokeBasic(collect_sig),
        collect_args,
    );

    let mut routine_args = getters[..inputs].to_vec();
    routine_args.push(boxed);
    let result = b.set(
        arity + slots + 1,
        Function::Elementary(routine.clone()),
        routine_args,
    );
    let unbox_sig = BasicSignature::new(signature.ret(), vec![BasicType::L]);
    b.set(
        arity + slots + 2,
        Function::InvokeBasic(unbox_sig),
        vec![getters[inputs + 1].clone(), result],
    );
    Form::new(debug_name, arity, b.finish())
}

/// Returns `Ok` if `prefix` is a prefix of `full`.
fn check_prefix(what: &str, prefix: &[ValueType], full: &[ValueType]) -> Result<(), BuildError> {
    if prefix.len() <= full.len() && full[..prefix.len()] == *prefix {
        Ok(())
    } else {
        Err(BuildError::illegal_argument(format!(
            "{what} parameters {prefix:?} are not a prefix of {full:?}"
        )))
    }
}

/// Extends `adapter` with ignored trailing parameters up to `full`.
fn pad_to(adapter: &Adapter, full: &[ValueType]) -> Result<Adapter, BuildError> {
    let have = adapter.ty().parameter_count();
    drop_arguments(adapter, have, &full[have..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::Primitive;
    use crate::value::Boxed;

    #[test]
    fn constants_narrow_and_check() {
        let c = constant(ValueType::Prim(Primitive::Byte), Value::Int(300)).unwrap();
        assert_eq!(c.invoke(&[]).unwrap(), Value::Int(44));
        assert!(constant(ValueType::STRING, Value::boxed(Boxed::Int(1))).is_err());
        assert!(constant(ValueType::LONG, Value::Int(1)).is_err());
        assert!(constant(ValueType::Void, Value::Null).is_err());
    }

    #[test]
    fn identity_and_zero() {
        let id = identity(ValueType::STRING).unwrap();
        assert_eq!(id.invoke(&[Value::string("x")]).unwrap(), Value::string("x"));
        assert_eq!(zero(ValueType::DOUBLE).invoke(&[]).unwrap(), Value::Double(0.0));
        assert_eq!(zero(ValueType::Void).invoke(&[]).unwrap(), Value::Null);
        assert!(identity(ValueType::Void).is_err());
    }

    #[test]
    fn intrinsic_tags_delegate() {
        let id = identity(ValueType::INT).unwrap();
        let tagged = make_intrinsic(&id, Intrinsic::ArrayLength);
        assert_eq!(tagged.intrinsic(), Intrinsic::ArrayLength);
        assert_eq!(tagged.effective_target(), &id);
        assert_eq!(tagged.invoke(&[Value::Int(7)]).unwrap(), Value::Int(7));
        assert_eq!(make_intrinsic(&tagged, Intrinsic::ArrayLength), tagged);
    }

    #[test]
    fn result_unboxers_restore_primitives() {
        let unbox = result_unboxer(ValueType::LONG);
        assert_eq!(
            unbox.invoke(&[Value::boxed(Boxed::Long(3))]).unwrap(),
            Value::Long(3)
        );
        let err = unbox.invoke(&[Value::string("no")]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ClassCast);
    }
}
