// Copyright 2026 the Adapter Forms Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Counting wrappers.
//!
//! A counting wrapper runs its target through a *block-inlining* form that counts down on
//! every call. When the count is exhausted the wrapper switches, once and for good, to a plain
//! reinvoking form. Lost decrements under contention only delay the switch; a redundant switch
//! is impossible because the counting flag is cleared with a single swap.

use alloc::sync::Arc;
use alloc::vec;
use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::LazyLock;

use parking_lot::RwLock;

use crate::adapter::{Adapter, Delegate};
use crate::basic_type::BasicSignature;
use crate::config;
use crate::elementary::Elementary;
use crate::error::{BuildError, Thrown};
use crate::form::{Form, FormKind, lookup_or_build};
use crate::names::{Function, NamesBuilder};
use crate::types::{MethodType, ValueType};
use crate::value::Value;

static MAYBE_STOP_COUNTING: LazyLock<Elementary> = LazyLock::new(|| {
    Elementary::new(
        "maybeStopCounting",
        MethodType::new(ValueType::Void, vec![ValueType::OBJECT]),
        |args| match args[0].as_adapter().and_then(Adapter::delegate) {
            Some(Delegate::Counting(state)) => {
                state.count_down();
                Ok(Value::Null)
            }
            _ => Err(Thrown::internal("maybeStopCounting on a non-counting adapter")),
        },
    )
});

static GET_TARGET: LazyLock<Elementary> = LazyLock::new(|| {
    Elementary::new(
        "getTarget",
        MethodType::new(ValueType::ADAPTER, vec![ValueType::OBJECT]),
        |args| {
            args[0]
                .as_adapter()
                .and_then(Adapter::delegate_target)
                .map(|t| Value::from(t.clone()))
                .ok_or_else(|| Thrown::internal("getTarget on a non-delegating adapter"))
        },
    )
});

/// `(this, args...) => [maybeStopCounting(this);] getTarget(this).invokeBasic(args...)`
fn delegating_form(kind: FormKind, signature: &BasicSignature) -> Arc<Form> {
    let counting = kind == FormKind::BlockInlining;
    lookup_or_build(kind, signature, || {
        let invoker = signature.invoker();
        let arity = invoker.params().len();
        let mut b = NamesBuilder::arguments(2 + usize::from(counting), &invoker);
        let this = b.operand(0);
        let mut next = arity;
        if counting {
            b.set(
                next,
                Function::Elementary(MAYBE_STOP_COUNTING.clone()),
                vec![this.clone()],
            );
            next += 1;
        }
        let target = b.set(next, Function::Elementary(GET_TARGET.clone()), vec![this]);
        let mut args = vec![target];
        args.extend((1..arity).map(|i| b.operand(i)));
        b.set(next + 1, Function::InvokeBasic(signature.clone()), args);
        let name = if counting { "blockInlining" } else { "reinvoker" };
        Form::new(name, arity, b.finish())
    })
}

/// State of a counting wrapper.
pub(crate) struct CountingState {
    target: Adapter,
    count: AtomicI32,
    counting: AtomicBool,
    form: RwLock<Arc<Form>>,
}

impl CountingState {
    pub(crate) fn target(&self) -> &Adapter {
        &self.target
    }

    pub(crate) fn current_form(&self) -> Arc<Form> {
        Arc::clone(&self.form.read())
    }

    pub(crate) fn is_counting(&self) -> bool {
        self.counting.load(Ordering::Acquire)
    }

    /// Converts the target. A wrapper that is still counting yields a fresh wrapper whose count
    /// restarts at the configured don't-inline threshold.
    pub(crate) fn as_type(&self, new_type: &MethodType) -> Result<Adapter, BuildError> {
        let new_target = self.target.as_type(new_type)?;
        if self.is_counting() {
            Ok(counting_wrapper(&new_target, config::get().dont_inline_threshold))
        } else {
            Ok(new_target)
        }
    }

    fn count_down(&self) {
        let count = self.count.load(Ordering::Relaxed);
        if count > 1 {
            self.count.store(count - 1, Ordering::Relaxed);
        } else if self.counting.swap(false, Ordering::AcqRel) {
            let signature = self.target.ty().basic_signature();
            let form = delegating_form(FormKind::Reinvoker, &signature);
            if let Err(err) = form.compile() {
                log::debug!("reinvoker for {signature} stays interpreted: {err}");
            }
            *self.form.write() = form;
            log::debug!("counting wrapper for {} stopped counting", self.target.ty());
        }
    }
}

impl fmt::Debug for CountingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountingState")
            .field("target", &self.target)
            .field("count", &self.count.load(Ordering::Relaxed))
            .field("counting", &self.is_counting())
            .finish_non_exhaustive()
    }
}

/// Wraps `target` so that its first `count` invocations run a block-inlining form.
///
/// A `count` of zero or less starts out on the reinvoking form.
#[must_use]
pub fn counting_wrapper(target: &Adapter, count: i32) -> Adapter {
    let counting = count > 0;
    let kind = if counting {
        FormKind::BlockInlining
    } else {
        FormKind::Reinvoker
    };
    let form = delegating_form(kind, &target.ty().basic_signature());
    let state = CountingState {
        target: target.clone(),
        count: AtomicI32::new(count),
        counting: AtomicBool::new(counting),
        form: RwLock::new(form),
    };
    Adapter::delegating(target.ty().clone(), Delegate::Counting(state))
}

/// Wraps `target` in a counting wrapper using the configured don't-inline threshold.
///
/// Returns `target` itself when the threshold is negative or `target` already counts.
#[must_use]
pub fn profile(target: &Adapter) -> Adapter {
    let threshold = config::get().dont_inline_threshold;
    if threshold < 0 || target.is_counting().is_some() {
        return target.clone();
    }
    counting_wrapper(target, threshold)
}
