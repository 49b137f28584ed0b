// Copyright 2026 the Adapter Forms Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lowering forms to directly invocable code.
//!
//! The engine treats compilation as an opaque service behind [`FormCompiler`]. The default
//! [`ClosureCompiler`] resolves every name once into a specialized closure so that invocation
//! no longer walks the names graph or matches on functions.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use std::sync::OnceLock;

use crate::elementary::Intrinsic;
use crate::error::Thrown;
use crate::form::Form;
use crate::names::{Function, Name, Operand, invoke_receiver, read_carrier};
use crate::value::Value;

/// Signature of compiled code: the same arguments [`Form::interpret`] takes.
pub type CompiledCode = dyn Fn(&[Value]) -> Result<Value, Thrown> + Send + Sync;

/// Loaded code for one form.
#[derive(Clone)]
pub struct CompiledForm {
    compiler: &'static str,
    code: Arc<CompiledCode>,
}

impl CompiledForm {
    /// Wraps loaded code.
    pub fn new(
        compiler: &'static str,
        code: impl Fn(&[Value]) -> Result<Value, Thrown> + Send + Sync + 'static,
    ) -> Self {
        Self {
            compiler,
            code: Arc::new(code),
        }
    }

    /// Name of the compiler that produced this code.
    #[must_use]
    pub fn compiler(&self) -> &'static str {
        self.compiler
    }

    /// Runs the code.
    #[inline]
    pub fn call(&self, args: &[Value]) -> Result<Value, Thrown> {
        (self.code)(args)
    }
}

impl fmt::Debug for CompiledForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledForm")
            .field("compiler", &self.compiler)
            .finish_non_exhaustive()
    }
}

/// Compilation failures. The form keeps interpreting after any of them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompileError {
    /// The form exceeds the compiler's size limit.
    TooLarge {
        /// Number of names in the form.
        names: usize,
        /// The compiler's limit.
        limit: usize,
    },
    /// The compiler cannot handle some construct.
    Unsupported(Box<str>),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLarge { names, limit } => {
                write!(f, "form too large: {names} names, limit {limit}")
            }
            Self::Unsupported(what) => write!(f, "unsupported: {what}"),
        }
    }
}

impl core::error::Error for CompileError {}

/// The compile/link service.
///
/// Returned code must behave exactly like [`Form::interpret`] on every input.
pub trait FormCompiler: Send + Sync + fmt::Debug {
    /// A short name for logs.
    fn name(&self) -> &'static str;

    /// Lowers `form` and returns loaded code.
    fn emit_and_load(&self, form: &Form) -> Result<CompiledForm, CompileError>;
}

static COMPILER: OnceLock<Arc<dyn FormCompiler>> = OnceLock::new();

/// Installs the process compiler. The first installation wins, including the implicit
/// default installed by [`compiler`].
pub fn install_compiler(compiler: Arc<dyn FormCompiler>) -> Result<(), Arc<dyn FormCompiler>> {
    COMPILER.set(compiler)
}

/// Returns the process compiler, installing a [`ClosureCompiler`] on first use.
pub fn compiler() -> &'static Arc<dyn FormCompiler> {
    COMPILER.get_or_init(|| Arc::new(ClosureCompiler::default()))
}

type Step = Box<dyn Fn(&mut Vec<Value>) -> Result<(), Thrown> + Send + Sync>;

/// Lowers forms into chains of pre-resolved closures.
#[derive(Clone, Debug)]
pub struct ClosureCompiler {
    max_names: usize,
}

impl ClosureCompiler {
    /// Creates a compiler rejecting forms with more than `max_names` names.
    #[must_use]
    pub fn with_limit(max_names: usize) -> Self {
        Self { max_names }
    }
}

impl Default for ClosureCompiler {
    fn default() -> Self {
        Self::with_limit(4096)
    }
}

impl FormCompiler for ClosureCompiler {
    fn name(&self) -> &'static str {
        "closure"
    }

    fn emit_and_load(&self, form: &Form) -> Result<CompiledForm, CompileError> {
        let names = form.names();
        if names.len() > self.max_names {
            return Err(CompileError::TooLarge {
                names: names.len(),
                limit: self.max_names,
            });
        }
        let arity = form.arity();
        let mut steps: Vec<Step> = Vec::with_capacity(names.len() - arity);
        let mut i = arity;
        while i < names.len() {
            if let Some(step) = fuse_select_invoke(names, i) {
                steps.push(step);
                i += 2;
            } else {
                steps.push(lower(&names[i])?);
                i += 1;
            }
        }
        let len = names.len();
        let result = form.result_index();
        let debug_name: Box<str> = form.debug_name().into();
        Ok(CompiledForm::new(self.name(), move |args| {
            if args.len() != arity {
                return Err(Thrown::internal(format!(
                    "{debug_name}: expected {arity} arguments, got {}",
                    args.len()
                )));
            }
            let mut values = Vec::with_capacity(len);
            values.extend_from_slice(args);
            for step in &steps {
                step(&mut values)?;
            }
            Ok(match result {
                Some(r) => values.swap_remove(r),
                None => Value::Null,
            })
        }))
    }
}

fn resolve_all(operands: &[Operand], values: &[Value]) -> Vec<Value> {
    operands.iter().map(|o| o.resolve(values)).collect()
}

fn lower(name: &Name) -> Result<Step, CompileError> {
    let function = name
        .function()
        .cloned()
        .ok_or_else(|| CompileError::Unsupported("parameter inside form body".into()))?;
    let operands: Box<[Operand]> = name.operands().into();
    let step: Step = match function {
        Function::Elementary(e) => Box::new(move |values| {
            let v = e.call(&resolve_all(&operands, values))?;
            values.push(v);
            Ok(())
        }),
        Function::Invoke(a) => Box::new(move |values| {
            let v = a.invoke_basic(&resolve_all(&operands, values))?;
            values.push(v);
            Ok(())
        }),
        Function::Getter { species, slot } => {
            let Some(Operand::Name(receiver)) = operands.first().cloned() else {
                return Err(CompileError::Unsupported("carrier read from a constant".into()));
            };
            Box::new(move |values| {
                let v = read_carrier(&values[receiver], &species, slot)?;
                values.push(v);
                Ok(())
            })
        }
        invoke @ Function::InvokeBasic(_) => Box::new(move |values| {
            let v = invoke.apply(&resolve_all(&operands, values))?;
            values.push(v);
            Ok(())
        }),
    };
    Ok(step)
}

/// Fuses `t_i = selectAlternative(test, a, b); t_i+1 = invokeBasic(t_i, args...)` into one
/// branch that invokes the chosen adapter directly.
fn fuse_select_invoke(names: &[Name], i: usize) -> Option<Step> {
    let select = &names[i];
    let invoke = names.get(i + 1)?;
    let Some(Function::Elementary(e)) = select.function() else {
        return None;
    };
    if e.intrinsic() != Intrinsic::SelectAlternative {
        return None;
    }
    let Some(Function::InvokeBasic(_)) = invoke.function() else {
        return None;
    };
    let [Operand::Name(receiver), rest @ ..] = invoke.operands() else {
        return None;
    };
    if *receiver != i || rest.iter().any(|o| matches!(o, Operand::Name(j) if *j == i)) {
        return None;
    }
    let [test, if_true, if_false] = select.operands() else {
        return None;
    };
    let (test, if_true, if_false) = (test.clone(), if_true.clone(), if_false.clone());
    let rest: Box<[Operand]> = rest.into();
    let step: Step = Box::new(move |values| {
        let take_true = test.resolve(values).as_int().is_some_and(|t| t != 0);
        let chosen = (if take_true { &if_true } else { &if_false }).resolve(values);
        let args = resolve_all(&rest, values);
        let result = invoke_receiver(&chosen)?.invoke_basic(&args);
        values.push(chosen);
        values.push(result?);
        Ok(())
    });
    Some(step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_type::{BasicSignature, BasicType};
    use crate::elementary::{ValueOp, value_op};
    use crate::names::NamesBuilder;
    use crate::types::Primitive;
    use alloc::vec;

    #[test]
    fn size_limit_is_reported() {
        let sig = BasicSignature::new(BasicType::J, vec![BasicType::I]);
        let mut b = NamesBuilder::arguments(1, &sig);
        let a0 = b.operand(0);
        b.set(
            1,
            Function::Elementary(value_op(ValueOp::Convert(Primitive::Int, Primitive::Long))),
            vec![a0],
        );
        let form = Form::new("tiny", 1, b.finish());
        let err = ClosureCompiler::with_limit(1).emit_and_load(&form).unwrap_err();
        assert_eq!(err, CompileError::TooLarge { names: 2, limit: 1 });
        assert!(ClosureCompiler::default().emit_and_load(&form).is_ok());
    }

    #[test]
    fn default_compiler_is_the_closure_compiler() {
        assert_eq!(compiler().name(), "closure");
    }

    #[test]
    fn non_adapter_receivers_fail_alike_when_compiled() {
        // (test, a, b) => selectAlternative(test, a, b).invokeBasic()
        let sig = BasicSignature::new(BasicType::L, vec![BasicType::I, BasicType::L, BasicType::L]);
        let mut b = NamesBuilder::arguments(2, &sig);
        let operands = vec![b.operand(0), b.operand(1), b.operand(2)];
        let chosen = b.set(
            3,
            Function::Elementary(crate::constants::select_alternative()),
            operands,
        );
        b.set(
            4,
            Function::InvokeBasic(BasicSignature::new(BasicType::L, vec![])),
            vec![chosen],
        );
        let form = Form::new("choose", 3, b.finish());
        let args = [Value::Int(1), Value::string("x"), Value::Null];
        let interpreted = form.interpret(&args).unwrap_err();
        let compiled = ClosureCompiler::default().emit_and_load(&form).unwrap();
        assert_eq!(compiled.call(&args).unwrap_err(), interpreted);
        assert_eq!(interpreted.message(), r#"invokeBasic receiver "x" is not an adapter"#);
    }
}
