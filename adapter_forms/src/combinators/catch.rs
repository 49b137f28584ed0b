// Copyright 2026 the Adapter Forms Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Exception handling combinators: guarded catch, try/finally and throwing.
//!
//! Both combinators run their target generically: arguments are boxed into an `Object[]`,
//! the target and handler are invoked through
//! [`Adapter::invoke_with_arguments`], and the boxed result is converted back by a per-type
//! unboxer held in the carrier.

use alloc::vec;
use alloc::vec::Vec;
use std::sync::LazyLock;

use crate::adapter::Adapter;
use crate::combinators::{argument_collector, boxed_routine_form, check_prefix, result_unboxer};
use crate::conversion::to_generic;
use crate::elementary::{Elementary, Intrinsic, array_arg};
use crate::error::{BuildError, ErrorKind, Thrown};
use crate::form::{FormKind, lookup_or_build};
use crate::species::species_for;
use crate::types::{ElemType, MethodType, RefType, ValueType};
use crate::value::{TypeToken, Value};

fn adapter_arg(v: &Value) -> Result<&Adapter, Thrown> {
    v.as_adapter()
        .ok_or_else(|| Thrown::internal(format!("{v} is not an adapter")))
}

fn boxed_arguments(v: &Value) -> Result<Vec<Value>, Thrown> {
    Ok(array_arg(v, ElemType::Ref(RefType::Object))?.to_vec())
}

/// `(Adapter target, Type kind, Adapter catcher, Object[] args)Object`
static GUARD_WITH_CATCH: LazyLock<Elementary> = LazyLock::new(|| {
    Elementary::with_intrinsic(
        "guardWithCatch",
        MethodType::new(
            ValueType::OBJECT,
            vec![
                ValueType::ADAPTER,
                ValueType::TYPE,
                ValueType::ADAPTER,
                ValueType::OBJECT_ARRAY,
            ],
        ),
        Intrinsic::GuardWithCatch,
        |args| {
            let target = adapter_arg(&args[0])?;
            let Some(TypeToken::Error(kind)) = args[1].as_type_token() else {
                return Err(Thrown::internal("guardWithCatch without an error kind"));
            };
            let catcher = adapter_arg(&args[2])?;
            let av = boxed_arguments(&args[3])?;
            match target.invoke_with_arguments(&av) {
                Err(thrown) if thrown.kind().is_subkind_of(kind) => {
                    let taken = catcher.ty().parameter_count() - 1;
                    let mut handler_args = Vec::with_capacity(taken + 1);
                    handler_args.push(Value::from(thrown));
                    handler_args.extend_from_slice(&av[..taken]);
                    catcher.invoke_with_arguments(&handler_args)
                }
                other => other,
            }
        },
    )
});

/// `(Adapter target, Adapter cleanup, Object[] args)Object`
static TRY_FINALLY: LazyLock<Elementary> = LazyLock::new(|| {
    Elementary::with_intrinsic(
        "tryFinally",
        MethodType::new(
            ValueType::OBJECT,
            vec![ValueType::ADAPTER, ValueType::ADAPTER, ValueType::OBJECT_ARRAY],
        ),
        Intrinsic::TryFinally,
        |args| {
            let target = adapter_arg(&args[0])?;
            let cleanup = adapter_arg(&args[1])?;
            let av = boxed_arguments(&args[2])?;
            let ret = target.ty().ret();
            let outcome = target.invoke_with_arguments(&av);
            let (error, result) = match &outcome {
                Ok(v) => (Value::Null, v.clone()),
                Err(thrown) => (
                    Value::from(thrown.clone()),
                    to_generic(ret.basic_type().zero(), ret)?,
                ),
            };
            let mut cleanup_args = Vec::with_capacity(av.len() + 2);
            cleanup_args.push(error);
            cleanup_args.extend(av);
            if ret != ValueType::Void {
                cleanup_args.push(result);
            }
            let cleaned = cleanup.invoke_with_arguments(&cleanup_args);
            match outcome {
                Ok(_) => cleaned,
                Err(thrown) => {
                    cleaned?;
                    Err(thrown)
                }
            }
        },
    )
});

fn check_handler_error_param(what: &str, handler: &MethodType) -> Result<(), BuildError> {
    match handler.params().first() {
        Some(&first) if first.is_assignable_from(ValueType::ERROR) => Ok(()),
        _ => Err(BuildError::illegal_argument(format!(
            "{what} {handler} does not take a leading error"
        ))),
    }
}

/// Runs `target`; if it fails with an error of `kind` (or a subkind), runs `catcher` with the
/// error followed by the leading arguments `catcher` declares.
///
/// Errors of other kinds propagate unchanged and `catcher` is not invoked.
pub fn guarded_catch(
    target: &Adapter,
    kind: ErrorKind,
    catcher: &Adapter,
) -> Result<Adapter, BuildError> {
    let ty = target.ty();
    let handler = catcher.ty();
    check_handler_error_param("catcher", handler)?;
    if handler.ret() != ty.ret() {
        return Err(BuildError::illegal_argument(format!(
            "catcher {handler} does not return {}",
            ty.ret()
        )));
    }
    check_prefix("catcher", &handler.params()[1..], ty.params())?;

    let signature = ty.basic_signature();
    let species = species_for("LLLLL");
    let form = lookup_or_build(FormKind::GuardWithCatch, &signature, || {
        boxed_routine_form("guardWithCatch", &species, &signature, &GUARD_WITH_CATCH)
    });
    let carrier = species.construct(vec![
        Value::from(target.as_fixed_arity()),
        Value::error_kind(kind),
        Value::from(catcher.as_fixed_arity()),
        Value::from(argument_collector(ty)?),
        Value::from(result_unboxer(ty.ret())),
    ]);
    Ok(Adapter::bound(ty.clone(), form, carrier))
}

/// Runs `target`, then `cleanup` on every exit path.
///
/// `cleanup` takes `(error, args..., result)`: the error is `null` on normal return, and the
/// result slot is absent for `void` targets and holds a zero when `target` failed. After a
/// failure the original error is rethrown once `cleanup` returns; otherwise the value returned
/// by `cleanup` is the result. An error raised by `cleanup` itself replaces any other outcome.
pub fn try_finally(target: &Adapter, cleanup: &Adapter) -> Result<Adapter, BuildError> {
    let ty = target.ty();
    let handler = cleanup.ty();
    check_handler_error_param("cleanup", handler)?;
    let mut expected: Vec<ValueType> = ty.params().to_vec();
    if ty.ret() != ValueType::Void {
        expected.push(ty.ret());
    }
    if handler.ret() != ty.ret() || handler.params()[1..] != *expected {
        return Err(BuildError::illegal_argument(format!(
            "cleanup {handler} does not fit target {ty}"
        )));
    }

    let signature = ty.basic_signature();
    let species = species_for("LLLL");
    let form = lookup_or_build(FormKind::TryFinally, &signature, || {
        boxed_routine_form("tryFinally", &species, &signature, &TRY_FINALLY)
    });
    let carrier = species.construct(vec![
        Value::from(target.as_fixed_arity()),
        Value::from(cleanup.as_fixed_arity()),
        Value::from(argument_collector(ty)?),
        Value::from(result_unboxer(ty.ret())),
    ]);
    Ok(Adapter::bound(ty.clone(), form, carrier))
}

/// `(error_type)ret`: throws its argument; `null` raises `NullPointer` instead.
pub fn throw_exception(ret: ValueType, error_type: ValueType) -> Result<Adapter, BuildError> {
    if !error_type.is_reference() || !error_type.is_assignable_from(ValueType::ERROR) {
        return Err(BuildError::illegal_argument(format!(
            "{error_type} cannot hold an error"
        )));
    }
    Ok(Adapter::from_fn(
        "throwException",
        MethodType::new(ret, vec![error_type]),
        |args| match args[0].as_thrown() {
            Some(thrown) => Err(thrown.clone()),
            None if args[0].is_null() => Err(Thrown::null_pointer("thrown error is null")),
            None => Err(Thrown::class_cast(format!("{} is not an error", args[0]))),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Primitive;
    use alloc::sync::Arc;
    use core::sync::atomic::{AtomicUsize, Ordering};
    use parking_lot::Mutex;

    fn divide() -> Adapter {
        Adapter::from_fn(
            "divide",
            MethodType::new(ValueType::INT, vec![ValueType::INT, ValueType::INT]),
            |args| match args {
                [Value::Int(_), Value::Int(0)] => {
                    Err(Thrown::new(ErrorKind::Arithmetic, "/ by zero"))
                }
                [Value::Int(-1), Value::Int(_)] => Err(Thrown::new(ErrorKind::Io, "disk")),
                [Value::Int(a), Value::Int(b)] => Ok(Value::Int(a / b)),
                _ => Err(Thrown::internal("divide")),
            },
        )
    }

    fn counting_catcher(calls: &Arc<AtomicUsize>) -> Adapter {
        let calls = Arc::clone(calls);
        Adapter::from_fn(
            "onError",
            MethodType::new(ValueType::INT, vec![ValueType::ERROR, ValueType::INT]),
            move |args| {
                calls.fetch_add(1, Ordering::Relaxed);
                assert_eq!(args[0].as_thrown().map(Thrown::kind), Some(ErrorKind::Arithmetic));
                Ok(Value::Int(-args[1].as_int().unwrap_or(0)))
            },
        )
    }

    #[test]
    fn matching_errors_reach_the_catcher() {
        let calls = Arc::new(AtomicUsize::new(0));
        let safe =
            guarded_catch(&divide(), ErrorKind::Arithmetic, &counting_catcher(&calls)).unwrap();
        assert_eq!(safe.invoke(&[Value::Int(9), Value::Int(3)]).unwrap(), Value::Int(3));
        assert_eq!(safe.invoke(&[Value::Int(9), Value::Int(0)]).unwrap(), Value::Int(-9));
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn superkinds_catch_subkinds() {
        let calls = Arc::new(AtomicUsize::new(0));
        let safe = guarded_catch(
            &divide(),
            ErrorKind::RuntimeException,
            &counting_catcher(&calls),
        )
        .unwrap();
        assert_eq!(safe.invoke(&[Value::Int(4), Value::Int(0)]).unwrap(), Value::Int(-4));
    }

    #[test]
    fn other_errors_propagate_unchanged() {
        let calls = Arc::new(AtomicUsize::new(0));
        let safe =
            guarded_catch(&divide(), ErrorKind::Arithmetic, &counting_catcher(&calls)).unwrap();
        let err = safe.invoke(&[Value::Int(-1), Value::Int(1)]).unwrap_err();
        assert_eq!(err, Thrown::new(ErrorKind::Io, "disk"));
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn catcher_shapes_are_validated() {
        let no_error = Adapter::from_fn(
            "bad",
            MethodType::new(ValueType::INT, vec![ValueType::INT]),
            |_| Ok(Value::Int(0)),
        );
        assert!(guarded_catch(&divide(), ErrorKind::Arithmetic, &no_error).is_err());
        let wrong_ret = Adapter::from_fn(
            "bad",
            MethodType::new(ValueType::LONG, vec![ValueType::ERROR]),
            |_| Ok(Value::Long(0)),
        );
        assert!(guarded_catch(&divide(), ErrorKind::Arithmetic, &wrong_ret).is_err());
    }

    fn recording_cleanup(seen: &Arc<Mutex<Vec<Vec<Value>>>>, ret: i32) -> Adapter {
        let seen = Arc::clone(seen);
        Adapter::from_fn(
            "cleanup",
            MethodType::new(
                ValueType::INT,
                vec![ValueType::ERROR, ValueType::INT, ValueType::INT, ValueType::INT],
            ),
            move |args| {
                seen.lock().push(args.to_vec());
                Ok(Value::Int(ret))
            },
        )
    }

    #[test]
    fn cleanup_result_replaces_a_normal_result() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let guarded = try_finally(&divide(), &recording_cleanup(&seen, 77)).unwrap();
        assert_eq!(guarded.invoke(&[Value::Int(8), Value::Int(2)]).unwrap(), Value::Int(77));
        assert_eq!(
            *seen.lock(),
            vec![vec![Value::Null, Value::Int(8), Value::Int(2), Value::Int(4)]]
        );
    }

    #[test]
    fn errors_are_rethrown_after_cleanup() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let guarded = try_finally(&divide(), &recording_cleanup(&seen, 77)).unwrap();
        let err = guarded.invoke(&[Value::Int(8), Value::Int(0)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Arithmetic);
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0][0], Value::from(err));
        assert_eq!(seen[0][3], Value::Int(0));
    }

    #[test]
    fn cleanup_errors_win() {
        let failing = Adapter::from_fn(
            "cleanup",
            MethodType::new(ValueType::Void, vec![ValueType::OBJECT]),
            |_| Err(Thrown::new(ErrorKind::User(7), "cleanup failed")),
        );
        let boom = throw_exception(ValueType::Void, ValueType::ERROR).unwrap();
        let target = crate::combinators::bind_to(
            &boom,
            Value::from(Thrown::new(ErrorKind::Arithmetic, "boom")),
        )
        .unwrap();
        let guarded = try_finally(&target, &failing).unwrap();
        let err = guarded.invoke(&[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::User(7));
    }

    #[test]
    fn throw_exception_raises_its_argument() {
        let thrower = throw_exception(ValueType::Prim(Primitive::Short), ValueType::ERROR).unwrap();
        let err = thrower
            .invoke(&[Value::from(Thrown::new(ErrorKind::IllegalArgument, "no"))])
            .unwrap_err();
        assert_eq!(err, Thrown::new(ErrorKind::IllegalArgument, "no"));
        let err = thrower.invoke(&[Value::Null]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NullPointer);
        assert!(throw_exception(ValueType::INT, ValueType::STRING).is_err());
    }
}
