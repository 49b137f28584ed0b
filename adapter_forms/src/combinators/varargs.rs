// Copyright 2026 the Adapter Forms Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Varargs collectors.

use parking_lot::Mutex;

use crate::adapter::{Adapter, Delegate};
use crate::combinators::as_collector;
use crate::error::BuildError;
use crate::types::{MethodType, ValueType};
use crate::value::Value;

/// A fixed-arity adapter whose trailing array may be passed as loose arguments.
#[derive(Debug)]
pub(crate) struct VarargsCollector {
    target: Adapter,
    array_type: ValueType,
    /// The last collector built by [`VarargsCollector::as_type`].
    last_collector: Mutex<Option<Adapter>>,
}

impl VarargsCollector {
    pub(crate) fn target(&self) -> &Adapter {
        &self.target
    }

    /// Returns `true` if `args` already end in a value of the trailing array parameter.
    pub(crate) fn takes_array_as_is(&self, ty: &MethodType, args: &[Value]) -> bool {
        if args.len() != ty.parameter_count() {
            return false;
        }
        match (args.last(), ty.last_param()) {
            (Some(last), Some(param)) => {
                last.is_null()
                    || last
                        .runtime_type()
                        .is_some_and(|rt| param.is_assignable_from(rt))
            }
            _ => false,
        }
    }

    /// Adapts to `new_type`, collecting the arguments past the fixed ones unless `new_type`
    /// passes the array itself.
    pub(crate) fn as_type(
        &self,
        this: &Adapter,
        new_type: &MethodType,
    ) -> Result<Adapter, BuildError> {
        let ty = this.ty();
        let arity = ty.parameter_count();
        let passes_array = new_type.parameter_count() == arity
            && new_type
                .last_param()
                .is_some_and(|last| self.array_type.is_assignable_from(last));
        if passes_array {
            return self.target.as_type(new_type);
        }
        let fixed = arity - 1;
        let Some(count) = new_type.parameter_count().checked_sub(fixed) else {
            return Err(BuildError::IncompatibleTypes {
                from: ty.clone(),
                to: new_type.clone(),
            });
        };
        let cached = self
            .last_collector
            .lock()
            .clone()
            .filter(|c| c.ty().parameter_count() == new_type.parameter_count());
        let collector = match cached {
            Some(c) => c,
            None => {
                let c = as_collector(&self.target, self.array_type, count)?;
                *self.last_collector.lock() = Some(c.clone());
                c
            }
        };
        collector.as_type(new_type)
    }
}

/// Wraps `target`, whose last parameter is an array assignable from `array_type`, as a
/// varargs collector.
///
/// Exact invocation behaves like `target`. Generic invocation and [`Adapter::as_type`] accept
/// any number of trailing arguments and box them into a new array of `array_type`.
pub fn make_varargs_collector(
    target: &Adapter,
    array_type: ValueType,
) -> Result<Adapter, BuildError> {
    let ty = target.ty();
    let fits = array_type.element().is_some()
        && ty.last_param().is_some_and(|last| last.is_assignable_from(array_type));
    if !fits {
        return Err(BuildError::illegal_argument(format!(
            "{ty} does not end in a parameter taking {array_type}"
        )));
    }
    Ok(Adapter::delegating(
        ty.clone(),
        Delegate::Varargs(VarargsCollector {
            target: target.as_fixed_arity(),
            array_type,
            last_collector: Mutex::new(None),
        }),
    ))
}
