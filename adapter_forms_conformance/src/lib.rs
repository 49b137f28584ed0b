// Copyright 2026 the Adapter Forms Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared fixtures for the `adapter_forms` conformance tests.

use std::sync::Arc;

use adapter_forms::compile::ClosureCompiler;
use adapter_forms::{Adapter, MethodType, Thrown, Value, ValueType};
use parking_lot::Mutex;

/// An adapter of type `(int × arity)int` computing `f` over its arguments.
pub fn int_adapter(
    name: &str,
    arity: usize,
    f: impl Fn(&[i32]) -> i32 + Send + Sync + 'static,
) -> Adapter {
    Adapter::from_fn(
        name,
        MethodType::new(ValueType::INT, vec![ValueType::INT; arity]),
        move |args| {
            let ints: Vec<i32> = args.iter().filter_map(Value::as_int).collect();
            Ok(Value::Int(f(&ints)))
        },
    )
}

type Calls = Arc<Mutex<Vec<Vec<Value>>>>;

/// Records the arguments of every call made to the adapters it creates.
#[derive(Clone, Debug, Default)]
pub struct Recorder {
    calls: Calls,
}

impl Recorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An adapter of type `ty` that records its arguments, then runs `f`.
    pub fn adapter(
        &self,
        name: &str,
        ty: MethodType,
        f: impl Fn(&[Value]) -> Result<Value, Thrown> + Send + Sync + 'static,
    ) -> Adapter {
        let calls = Arc::clone(&self.calls);
        Adapter::from_fn(name, ty, move |args| {
            calls.lock().push(args.to_vec());
            f(args)
        })
    }

    /// Arguments of every recorded call, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<Vec<Value>> {
        self.calls.lock().clone()
    }

    /// Number of recorded calls.
    #[must_use]
    pub fn count(&self) -> usize {
        self.calls.lock().len()
    }
}

/// Runs the form behind `adapter` both interpreted and compiled on `args`.
///
/// Returns `None` for adapters that do not run a form.
#[must_use]
pub fn interpret_and_compile(
    adapter: &Adapter,
    args: &[Value],
) -> Option<(Result<Value, Thrown>, Result<Value, Thrown>)> {
    let form = adapter.form()?;
    let mut full = Vec::with_capacity(args.len() + 1);
    full.push(Value::from(adapter.clone()));
    full.extend_from_slice(args);
    let interpreted = form.interpret(&full);
    let compiled = match form.compile_with(&ClosureCompiler::default()) {
        Ok(code) => code.call(&full),
        Err(err) => panic!("{} did not compile: {err}", form.debug_name()),
    };
    Some((interpreted, compiled))
}
