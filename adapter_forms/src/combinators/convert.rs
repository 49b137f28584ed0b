// Copyright 2026 the Adapter Forms Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pairwise argument and return conversion.

use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use crate::adapter::Adapter;
use crate::basic_type::{BasicSignature, BasicType};
use crate::constants::{ConstantHandle, constant_handle};
use crate::conversion::{ConversionSpec, can_convert, is_null_conversion, value_conversion};
use crate::elementary::{ValueOp, value_op};
use crate::error::BuildError;
use crate::form::{ConvertStep, Form, FormKind, lookup_or_build};
use crate::names::{Function, NamesBuilder, Operand};
use crate::species::{Species, species_for};
use crate::types::{MethodType, ValueType};
use crate::value::Value;

/// Adapts `target` to `new_type`, converting each argument and the result independently.
///
/// With `strict`, only the conversions permitted by
/// [`can_convert`](crate::conversion::can_convert) in strict mode are accepted; otherwise every
/// pairing is allowed and unboxing follows cast semantics. `monobox` forces exact unboxing.
pub fn convert(
    target: &Adapter,
    new_type: &MethodType,
    strict: bool,
    monobox: bool,
) -> Result<Adapter, BuildError> {
    let old_type = target.ty();
    if old_type == new_type {
        return Ok(target.clone());
    }
    let incompatible = || BuildError::IncompatibleTypes {
        from: old_type.clone(),
        to: new_type.clone(),
    };
    if old_type.parameter_count() != new_type.parameter_count() {
        return Err(incompatible());
    }
    let params_ok = new_type
        .params()
        .iter()
        .zip(old_type.params())
        .all(|(&src, &dst)| can_convert(src, dst, strict));
    if !params_ok || !can_convert(old_type.ret(), new_type.ret(), strict) {
        return Err(incompatible());
    }
    new_type.check_slot_limit()?;

    let spec_for = |src: ValueType, dst: ValueType| -> Result<Option<ConversionSpec>, BuildError> {
        if is_null_conversion(src, dst) {
            Ok(None)
        } else {
            value_conversion(src, dst, strict, monobox).map(Some)
        }
    };
    let param_specs = new_type
        .params()
        .iter()
        .zip(old_type.params())
        .map(|(&src, &dst)| spec_for(src, dst))
        .collect::<Result<Vec<_>, _>>()?;
    let ret_spec = spec_for(old_type.ret(), new_type.ret())?;
    if ret_spec.is_none() && param_specs.iter().all(Option::is_none) {
        return Ok(target.view_as_type(new_type));
    }

    // The carrier holds the target, then one token or adapter per capturing step.
    let mut captured = vec![Value::from(target.clone())];
    let mut steps = Vec::with_capacity(param_specs.len() + 1);
    let mut step_for = |spec: Option<ConversionSpec>, void_ret: bool| match spec {
        None => ConvertStep::Pass,
        Some(ConversionSpec::Cast(ty)) => {
            captured.push(Value::type_token(ty));
            ConvertStep::Cast
        }
        Some(ConversionSpec::Function(f)) => {
            let shape = f.ty().basic_signature();
            captured.push(Value::from(f));
            ConvertStep::Apply(shape)
        }
        Some(ConversionSpec::Void) if void_ret => ConvertStep::Discard,
        Some(ConversionSpec::Void) => ConvertStep::Zero,
    };
    for spec in param_specs {
        steps.push(step_for(spec, false));
    }
    let ret_step = step_for(ret_spec, new_type.ret() == ValueType::Void);

    let signature = new_type.basic_signature();
    let target_signature = old_type.basic_signature();
    let species = species_for(&"L".repeat(captured.len()));
    let kind = FormKind::Convert {
        target: target_signature.clone(),
        steps: steps.iter().chain([&ret_step]).cloned().collect(),
    };
    let form = lookup_or_build(kind, &signature, || {
        convert_form(&signature, target_signature, &steps, &ret_step, &species)
    });
    Ok(Adapter::bound(new_type.clone(), form, species.construct(captured)))
}

fn convert_form(
    signature: &BasicSignature,
    target_signature: BasicSignature,
    param_steps: &[ConvertStep],
    ret_step: &ConvertStep,
    species: &Arc<Species>,
) -> Form {
    let invoker = signature.invoker();
    let arity = invoker.params().len();
    let slots = species.slot_count();
    let converting = param_steps.iter().filter(|s| **s != ConvertStep::Pass).count();
    let ret_names = match ret_step {
        ConvertStep::Pass | ConvertStep::Discard => 0,
        _ => 1,
    };
    let mut b = NamesBuilder::arguments(slots + converting + 1 + ret_names, &invoker);
    b.constrain(0, Arc::clone(species));
    let this = b.operand(0);
    let getters: Vec<Operand> = (0..slots)
        .map(|slot| b.set(arity + slot, species.getter(slot), vec![this.clone()]))
        .collect();
    let mut captures = getters[1..].iter().cloned();
    let mut next = arity + slots;
    let mut convert_step = |b: &mut NamesBuilder,
                            next: &mut usize,
                            step: &ConvertStep,
                            arg: Operand| {
        let function = match step {
            ConvertStep::Cast => Function::Invoke(constant_handle(ConstantHandle::Cast)),
            ConvertStep::Apply(shape) => Function::InvokeBasic(shape.clone()),
            _ => return arg,
        };
        let Some(captured) = captures.next() else {
            return arg;
        };
        let op = b.set(*next, function, vec![captured, arg]);
        *next += 1;
        op
    };

    let mut call_args = Vec::with_capacity(arity);
    call_args.push(getters[0].clone());
    for (i, step) in param_steps.iter().enumerate() {
        let arg = b.operand(i + 1);
        call_args.push(convert_step(&mut b, &mut next, step, arg));
    }
    let call = b.set(next, Function::InvokeBasic(target_signature), call_args);
    let call_index = next;
    next += 1;

    let result = match ret_step {
        ConvertStep::Pass => (signature.ret() != BasicType::V).then_some(call_index),
        ConvertStep::Discard => None,
        ConvertStep::Zero => {
            let zero = value_op(ValueOp::Zero(signature.ret()));
            b.set(next, Function::Elementary(zero), vec![]);
            Some(next)
        }
        step => {
            convert_step(&mut b, &mut next, step, call);
            Some(call_index + 1)
        }
    };
    Form::with_result("convert", arity, b.finish(), result)
}
