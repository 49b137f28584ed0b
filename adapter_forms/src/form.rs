// Copyright 2026 the Adapter Forms Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Combinator forms: shareable symbolic programs over a names graph.
//!
//! ## Semantics
//!
//! - A form is immutable after construction apart from its compiled-code cell.
//! - The cell goes from empty to populated at most once. Racing compilations are tolerated and
//!   all but one result are dropped without being run.
//! - [`Form::interpret`] and compiled code are interchangeable for every input.
//! - [`Form::invoke`] interprets until the configured threshold, then compiles. A failed
//!   compilation is logged and the form keeps interpreting.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{LazyLock, OnceLock};

use crate::basic_type::{BasicSignature, BasicType};
use crate::cache::PublishOnceMap;
use crate::compile::{self, CompileError, CompiledForm, FormCompiler};
use crate::config;
use crate::error::Thrown;
use crate::names::{Name, Operand};
use crate::types::ElemType;
use crate::value::Value;

/// How a converting form treats one argument or its result.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConvertStep {
    /// Passed through unchanged.
    Pass,
    /// Cast to the type token held in the next carrier slot.
    Cast,
    /// Run through the conversion adapter in the next carrier slot, of this basic shape.
    Apply(BasicSignature),
    /// A non-void result dropped for a void return.
    Discard,
    /// A void result replaced by the zero of the return type.
    Zero,
}

/// Shapes of cached forms.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FormKind {
    /// Guarded dispatch.
    Guard,
    /// Guarded dispatch recording a branch profile.
    GuardProfiled,
    /// Guarded catch.
    GuardWithCatch,
    /// Try/finally.
    TryFinally,
    /// Clause loop.
    Loop,
    /// Reinvokes a delegate's target.
    Reinvoker,
    /// Reinvokes a delegate's target while counting down.
    BlockInlining,
    /// Leading argument bound from a carrier slot of the given type.
    Bind(BasicType),
    /// Pairwise conversion into a target.
    Convert {
        /// Basic shape of the target.
        target: BasicSignature,
        /// One step per parameter, then one for the result.
        steps: Box<[ConvertStep]>,
    },
    /// Array elements spread into trailing arguments.
    Spread {
        /// Position of the spread array.
        pos: usize,
        /// Number of elements spread.
        count: usize,
        /// Element type read, with references erased to `Object`.
        elem: ElemType,
    },
    /// Collector output inserted into the argument list.
    Collect {
        /// Position of the collected value.
        pos: usize,
        /// Whether the collected arguments are passed on as well.
        retain: bool,
        /// Basic shape of the collector.
        collector: BasicSignature,
    },
    /// Ignored arguments.
    Drop {
        /// Position of the first ignored argument.
        pos: usize,
        /// Number of ignored arguments.
        count: usize,
    },
    /// Packs every argument into a fresh array.
    VarargsArray,
}

/// A combinator form.
pub struct Form {
    debug_name: Box<str>,
    arity: usize,
    names: Box<[Name]>,
    result: Option<usize>,
    compiled: OnceLock<CompiledForm>,
    invocations: AtomicU32,
    gave_up: AtomicBool,
}

impl Form {
    /// Creates a form returning its last name, or `void` if that name is void.
    #[must_use]
    pub fn new(debug_name: impl Into<Box<str>>, arity: usize, names: Box<[Name]>) -> Self {
        let result = match names.last() {
            Some(last) if last.ty() != BasicType::V => Some(names.len() - 1),
            _ => None,
        };
        Self::with_result(debug_name, arity, names, result)
    }

    /// Creates a form returning name `result` (`None` for `void`).
    #[must_use]
    pub fn with_result(
        debug_name: impl Into<Box<str>>,
        arity: usize,
        names: Box<[Name]>,
        result: Option<usize>,
    ) -> Self {
        assert!(arity <= names.len(), "form has fewer names than parameters");
        assert!(
            names[..arity].iter().all(Name::is_param),
            "leading names must be parameters"
        );
        assert!(
            names[arity..].iter().all(|n| !n.is_param()),
            "parameters must lead the names"
        );
        if let Some(r) = result {
            assert!(r < names.len(), "result index {r} out of range");
            assert_ne!(names[r].ty(), BasicType::V, "result index names a void value");
        }
        Self {
            debug_name: debug_name.into(),
            arity,
            names,
            result,
            compiled: OnceLock::new(),
            invocations: AtomicU32::new(0),
            gave_up: AtomicBool::new(false),
        }
    }

    /// Debug tag.
    #[must_use]
    pub fn debug_name(&self) -> &str {
        &self.debug_name
    }

    /// Number of parameters (including the receiver).
    #[must_use]
    #[inline]
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// The names graph.
    #[must_use]
    #[inline]
    pub fn names(&self) -> &[Name] {
        &self.names
    }

    /// Index of the result name; `None` for `void`.
    #[must_use]
    #[inline]
    pub fn result_index(&self) -> Option<usize> {
        self.result
    }

    /// Result basic type.
    #[must_use]
    pub fn return_type(&self) -> BasicType {
        self.result.map_or(BasicType::V, |r| self.names[r].ty())
    }

    /// Basic signature of the form's parameters and result.
    #[must_use]
    pub fn signature(&self) -> BasicSignature {
        BasicSignature::new(
            self.return_type(),
            self.names[..self.arity].iter().map(Name::ty).collect(),
        )
    }

    /// Evaluates the names graph in order.
    pub fn interpret(&self, args: &[Value]) -> Result<Value, Thrown> {
        if args.len() != self.arity {
            return Err(Thrown::internal(format!(
                "{}: expected {} arguments, got {}",
                self.debug_name,
                self.arity,
                args.len()
            )));
        }
        let mut values: Vec<Value> = Vec::with_capacity(self.names.len());
        values.extend_from_slice(args);
        for name in &self.names[self.arity..] {
            let v = name.evaluate(&values)?;
            values.push(v);
        }
        Ok(match self.result {
            Some(r) => values.swap_remove(r),
            None => Value::Null,
        })
    }

    /// Returns the compiled code, if any.
    #[must_use]
    pub fn compiled(&self) -> Option<&CompiledForm> {
        self.compiled.get()
    }

    /// Returns `true` once compiled code is installed.
    #[must_use]
    pub fn is_compiled(&self) -> bool {
        self.compiled.get().is_some()
    }

    /// Compiles with the process compiler.
    pub fn compile(&self) -> Result<&CompiledForm, CompileError> {
        self.compile_with(compile::compiler().as_ref())
    }

    /// Compiles with `compiler`, keeping the first installed result.
    pub fn compile_with(&self, compiler: &dyn FormCompiler) -> Result<&CompiledForm, CompileError> {
        if let Some(code) = self.compiled.get() {
            return Ok(code);
        }
        match compiler.emit_and_load(self) {
            Ok(code) => {
                log::debug!("compiled {} with {}", self.debug_name, compiler.name());
                Ok(self.compiled.get_or_init(|| code))
            }
            Err(err) => {
                log::debug!("compiling {} failed: {err}", self.debug_name);
                Err(err)
            }
        }
    }

    /// Runs the form, compiling it once it has been interpreted often enough.
    pub fn invoke(&self, args: &[Value]) -> Result<Value, Thrown> {
        if let Some(code) = self.compiled.get() {
            return code.call(args);
        }
        if !self.gave_up.load(Ordering::Relaxed) {
            let seen = self.invocations.fetch_add(1, Ordering::Relaxed);
            if seen >= config::get().compile_threshold {
                log::trace!("{} reached compile threshold", self.debug_name);
                match self.compile() {
                    Ok(code) => return code.call(args),
                    Err(_) => self.gave_up.store(true, Ordering::Relaxed),
                }
            }
        }
        self.interpret(args)
    }
}

impl fmt::Debug for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Form")
            .field("debug_name", &self.debug_name)
            .field("signature", &self.signature())
            .field("names", &self.names.len())
            .field("compiled", &self.is_compiled())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = |i: usize| {
            if i < self.arity {
                format!("a{i}:{}", self.names[i].ty())
            } else {
                format!("t{i}:{}", self.names[i].ty())
            }
        };
        write!(f, "{}=Lambda(", self.debug_name)?;
        for i in 0..self.arity {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(&label(i))?;
            if let Some(s) = self.names[i].constraint() {
                write!(f, "/{s:?}")?;
            }
        }
        f.write_str(")=>{")?;
        for (i, name) in self.names.iter().enumerate().skip(self.arity) {
            write!(f, "\n    {}=", label(i))?;
            if let Some(function) = name.function() {
                write!(f, "{function}(")?;
            }
            for (k, op) in name.operands().iter().enumerate() {
                if k > 0 {
                    f.write_str(",")?;
                }
                match op {
                    Operand::Name(j) => f.write_str(&label(*j))?,
                    Operand::Const(v) => write!(f, "{v}")?,
                }
            }
            f.write_str(");")?;
        }
        match self.result {
            Some(r) => write!(f, "{}}}", label(r)),
            None => f.write_str("void}"),
        }
    }
}

static FORMS: LazyLock<PublishOnceMap<(FormKind, BasicSignature), Arc<Form>>> =
    LazyLock::new(|| PublishOnceMap::new("forms"));

/// Returns the cached form for `(kind, signature)`, building it on a miss.
pub fn lookup_or_build(
    kind: FormKind,
    signature: &BasicSignature,
    build: impl FnOnce() -> Form,
) -> Arc<Form> {
    FORMS.get_or_create((kind, signature.clone()), |key| {
        let form = build();
        log::debug!("built {:?} form for {}: {}", key.0, key.1, form.debug_name());
        Arc::new(form)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::ClosureCompiler;
    use crate::elementary::{ValueOp, value_op};
    use crate::names::{Function, NamesBuilder};
    use crate::types::Primitive;
    use alloc::vec;

    #[derive(Debug)]
    struct Refusing;

    impl FormCompiler for Refusing {
        fn name(&self) -> &'static str {
            "refusing"
        }

        fn emit_and_load(&self, _form: &Form) -> Result<CompiledForm, CompileError> {
            Err(CompileError::Unsupported("refusing compiler".into()))
        }
    }

    // (I)J: widen then add one.
    fn widen_form() -> Form {
        let sig = BasicSignature::new(BasicType::J, vec![BasicType::I]);
        let mut b = NamesBuilder::arguments(1, &sig);
        let a0 = b.operand(0);
        b.set(
            1,
            Function::Elementary(value_op(ValueOp::Convert(Primitive::Int, Primitive::Long))),
            vec![a0],
        );
        Form::new("widen", 1, b.finish())
    }

    #[test]
    fn interpret_and_compiled_agree() {
        let form = widen_form();
        assert_eq!(form.signature(), BasicSignature::new(BasicType::J, vec![BasicType::I]));
        let interpreted = form.interpret(&[Value::Int(-4)]).unwrap();
        let compiled = form.compile_with(&ClosureCompiler::default()).unwrap();
        assert_eq!(compiled.call(&[Value::Int(-4)]).unwrap(), interpreted);
        assert!(form.is_compiled());
    }

    #[test]
    fn failed_compilation_keeps_interpreting() {
        let form = widen_form();
        assert!(form.compile_with(&Refusing).is_err());
        assert!(!form.is_compiled());
        assert_eq!(form.interpret(&[Value::Int(2)]).unwrap(), Value::Long(2));
    }

    #[test]
    fn wrong_arity_is_an_internal_error() {
        let err = widen_form().interpret(&[]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InternalError);
    }

    #[test]
    fn display_lists_names() {
        let text = format!("{}", widen_form());
        assert_eq!(text, "widen=Lambda(a0:I)=>{\n    t1:J=convertIntegerToLong(a0:I);t1:J}");
    }

    #[test]
    fn lookups_return_the_published_form() {
        let sig = BasicSignature::new(BasicType::V, vec![BasicType::D, BasicType::D]);
        // No binding captures a void slot, so this key is private to the test.
        let a = lookup_or_build(FormKind::Bind(BasicType::V), &sig, widen_form);
        let b = lookup_or_build(FormKind::Bind(BasicType::V), &sig, || panic!("cache miss"));
        assert!(Arc::ptr_eq(&a, &b));
    }
}
