// Copyright 2026 the Adapter Forms Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Adapters: invocable units with a fixed external signature.
//!
//! An adapter is one of three variants:
//! - *Direct*: an elementary routine.
//! - *Form*: a combinator form plus an optional carrier of captured values. The form receives
//!   the adapter itself as its leading argument so that getters can read the carrier.
//! - *Delegating*: a varargs collector, a counting wrapper, or an intrinsic tag, each wrapping
//!   exactly one target.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use crate::combinators;
use crate::combinators::counting::CountingState;
use crate::combinators::varargs::VarargsCollector;
use crate::conversion;
use crate::elementary::{Elementary, Intrinsic};
use crate::error::{BuildError, Thrown};
use crate::form::Form;
use crate::species::Carrier;
use crate::types::{MethodType, ValueType};
use crate::value::Value;

pub(crate) enum Delegate {
    Varargs(VarargsCollector),
    Counting(CountingState),
    Intrinsic {
        target: Adapter,
        intrinsic: Intrinsic,
    },
}

enum AdapterKind {
    Direct(Elementary),
    Form {
        form: Arc<Form>,
        carrier: Option<Carrier>,
    },
    Delegating(Delegate),
}

struct AdapterInner {
    ty: MethodType,
    kind: AdapterKind,
}

/// An invocable unit with a fixed external signature.
///
/// Cloning is cheap; equality is identity.
#[derive(Clone)]
pub struct Adapter(Arc<AdapterInner>);

impl Adapter {
    /// An adapter running an elementary routine.
    #[must_use]
    pub fn direct(e: Elementary) -> Self {
        let ty = e.ty().clone();
        Self::make(ty, AdapterKind::Direct(e))
    }

    /// An adapter running `f`.
    ///
    /// `f` receives erased slots: sub-int primitives as `Int`, `boolean` as 0/1.
    pub fn from_fn(
        name: &str,
        ty: MethodType,
        f: impl Fn(&[Value]) -> Result<Value, Thrown> + Send + Sync + 'static,
    ) -> Self {
        Self::direct(Elementary::new(name, ty, f))
    }

    pub(crate) fn with_form(ty: MethodType, form: Arc<Form>) -> Self {
        Self::check_form(&ty, &form);
        Self::make(ty, AdapterKind::Form {
            form,
            carrier: None,
        })
    }

    pub(crate) fn bound(ty: MethodType, form: Arc<Form>, carrier: Carrier) -> Self {
        Self::check_form(&ty, &form);
        Self::make(ty, AdapterKind::Form {
            form,
            carrier: Some(carrier),
        })
    }

    pub(crate) fn delegating(ty: MethodType, delegate: Delegate) -> Self {
        Self::make(ty, AdapterKind::Delegating(delegate))
    }

    fn make(ty: MethodType, kind: AdapterKind) -> Self {
        Self(Arc::new(AdapterInner { ty, kind }))
    }

    fn check_form(ty: &MethodType, form: &Form) {
        assert_eq!(
            form.signature(),
            ty.basic_signature().invoker(),
            "form {} does not fit adapter type {ty}",
            form.debug_name()
        );
    }

    /// The external signature.
    #[must_use]
    #[inline]
    pub fn ty(&self) -> &MethodType {
        &self.0.ty
    }

    /// The form currently driving this adapter, if it runs one.
    #[must_use]
    pub fn form(&self) -> Option<Arc<Form>> {
        match &self.0.kind {
            AdapterKind::Form { form, .. } => Some(Arc::clone(form)),
            AdapterKind::Delegating(Delegate::Counting(state)) => Some(state.current_form()),
            _ => None,
        }
    }

    /// Captured values of a bound adapter.
    #[must_use]
    pub fn carrier(&self) -> Option<&Carrier> {
        match &self.0.kind {
            AdapterKind::Form { carrier, .. } => carrier.as_ref(),
            _ => None,
        }
    }

    /// The intrinsic tag.
    #[must_use]
    pub fn intrinsic(&self) -> Intrinsic {
        match &self.0.kind {
            AdapterKind::Direct(e) => e.intrinsic(),
            AdapterKind::Delegating(Delegate::Intrinsic { intrinsic, .. }) => *intrinsic,
            _ => Intrinsic::None,
        }
    }

    pub(crate) fn delegate(&self) -> Option<&Delegate> {
        match &self.0.kind {
            AdapterKind::Delegating(d) => Some(d),
            _ => None,
        }
    }

    /// The adapter a delegating adapter wraps.
    #[must_use]
    pub fn delegate_target(&self) -> Option<&Self> {
        match self.delegate()? {
            Delegate::Varargs(v) => Some(v.target()),
            Delegate::Counting(state) => Some(state.target()),
            Delegate::Intrinsic { target, .. } => Some(target),
        }
    }

    /// Follows delegation to the innermost adapter.
    #[must_use]
    pub fn effective_target(&self) -> &Self {
        let mut cur = self;
        while let Some(next) = cur.delegate_target() {
            cur = next;
        }
        cur
    }

    /// Returns `true` for varargs collectors.
    #[must_use]
    pub fn is_varargs_collector(&self) -> bool {
        matches!(self.delegate(), Some(Delegate::Varargs(_)))
    }

    /// For counting wrappers, whether the wrapper is still counting.
    #[must_use]
    pub fn is_counting(&self) -> Option<bool> {
        match self.delegate()? {
            Delegate::Counting(state) => Some(state.is_counting()),
            _ => None,
        }
    }

    /// Invokes with arguments that match the signature exactly.
    ///
    /// Fails with `WrongMethodType` on an arity or representation mismatch, or if a reference
    /// argument is not an instance of its parameter type.
    pub fn invoke(&self, args: &[Value]) -> Result<Value, Thrown> {
        self.check_arguments(args)?;
        self.invoke_basic(args)
    }

    fn check_arguments(&self, args: &[Value]) -> Result<(), Thrown> {
        let ty = self.ty();
        if args.len() != ty.parameter_count() {
            return Err(Thrown::wrong_method_type(format!(
                "{ty} cannot take {} arguments",
                args.len()
            )));
        }
        for (i, (arg, &param)) in args.iter().zip(ty.params()).enumerate() {
            let fits = arg.basic_type() == param.basic_type()
                && arg.runtime_type().is_none_or(|rt| param.is_assignable_from(rt));
            if !fits {
                return Err(Thrown::wrong_method_type(format!(
                    "argument {i} of {ty} cannot be {arg}"
                )));
            }
        }
        Ok(())
    }

    /// Invokes with erased arguments, without checking them.
    pub(crate) fn invoke_basic(&self, args: &[Value]) -> Result<Value, Thrown> {
        match &self.0.kind {
            AdapterKind::Direct(e) => e.call(args),
            AdapterKind::Form { form, .. } => form.invoke(&self.with_receiver(args)),
            AdapterKind::Delegating(Delegate::Counting(state)) => {
                state.current_form().invoke(&self.with_receiver(args))
            }
            AdapterKind::Delegating(Delegate::Varargs(v)) => v.target().invoke_basic(args),
            AdapterKind::Delegating(Delegate::Intrinsic { target, .. }) => {
                target.invoke_basic(args)
            }
        }
    }

    fn with_receiver(&self, args: &[Value]) -> Vec<Value> {
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(Value::from(self.clone()));
        full.extend_from_slice(args);
        full
    }

    /// Invokes as if through `(Object...)Object`.
    ///
    /// Primitive arguments are boxed, each argument is converted strictly to its parameter
    /// type, and the result is boxed (`Null` for `void`). A varargs collector collects the
    /// trailing arguments unless they already form its array.
    pub fn invoke_with_arguments(&self, args: &[Value]) -> Result<Value, Thrown> {
        let target = match self.delegate() {
            Some(Delegate::Varargs(v)) if !v.takes_array_as_is(self.ty(), args) => {
                self.as_type(&MethodType::generic(args.len()))?
            }
            _ => self.clone(),
        };
        let ty = target.ty();
        if args.len() != ty.parameter_count() {
            return Err(Thrown::wrong_method_type(format!(
                "{ty} cannot take {} arguments",
                args.len()
            )));
        }
        let converted = args
            .iter()
            .zip(ty.params())
            .map(|(arg, &param)| conversion::from_generic(arg.clone(), param))
            .collect::<Result<Vec<_>, _>>()?;
        let result = target.invoke_basic(&converted)?;
        conversion::to_generic(result, ty.ret())
    }

    /// Adapts to `new_type` with strict conversions.
    pub fn as_type(&self, new_type: &MethodType) -> Result<Self, BuildError> {
        if self.ty() == new_type {
            return Ok(self.clone());
        }
        match self.delegate() {
            Some(Delegate::Varargs(v)) => v.as_type(self, new_type),
            Some(Delegate::Counting(state)) => state.as_type(new_type),
            _ => combinators::convert(self, new_type, true, false),
        }
    }

    /// Re-labels this adapter with an erasure-compatible type; no conversion is performed.
    ///
    /// Panics if the basic signatures differ.
    #[must_use]
    pub fn view_as_type(&self, new_type: &MethodType) -> Self {
        assert_eq!(
            self.ty().basic_signature(),
            new_type.basic_signature(),
            "cannot view {} as {new_type}",
            self.ty()
        );
        if self.ty() == new_type {
            return self.clone();
        }
        let kind = match &self.0.kind {
            AdapterKind::Direct(e) => AdapterKind::Direct(e.clone()),
            AdapterKind::Form { form, carrier } => AdapterKind::Form {
                form: Arc::clone(form),
                carrier: carrier.clone(),
            },
            AdapterKind::Delegating(_) => AdapterKind::Delegating(Delegate::Intrinsic {
                target: self.clone(),
                intrinsic: self.intrinsic(),
            }),
        };
        Self::make(new_type.clone(), kind)
    }

    /// Binds the leading argument to `value`.
    pub fn bind_to(&self, value: Value) -> Result<Self, BuildError> {
        combinators::bind_to(self, value)
    }

    /// Collects `count` trailing arguments into an array of `array_type`.
    pub fn as_collector(&self, array_type: ValueType, count: usize) -> Result<Self, BuildError> {
        combinators::as_collector(self, array_type, count)
    }

    /// Wraps this adapter so that callers may pass its trailing array as loose arguments.
    pub fn as_varargs_collector(&self, array_type: ValueType) -> Result<Self, BuildError> {
        combinators::varargs::make_varargs_collector(self, array_type)
    }

    /// The fixed-arity view of a varargs collector; other adapters return themselves.
    #[must_use]
    pub fn as_fixed_arity(&self) -> Self {
        match self.delegate() {
            Some(Delegate::Varargs(v)) => v.target().clone(),
            _ => self.clone(),
        }
    }
}

impl PartialEq for Adapter {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Adapter {}

impl fmt::Debug for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.0.kind {
            AdapterKind::Direct(e) => format!("direct {}", e.name()),
            AdapterKind::Form { form, carrier } => match carrier {
                Some(c) => format!("{} bound {:?}", form.debug_name(), c.species()),
                None => format!("{}", form.debug_name()),
            },
            AdapterKind::Delegating(Delegate::Varargs(_)) => "varargs collector".into(),
            AdapterKind::Delegating(Delegate::Counting(_)) => "counting wrapper".into(),
            AdapterKind::Delegating(Delegate::Intrinsic { intrinsic, .. }) => {
                format!("intrinsic {intrinsic:?}")
            }
        };
        write!(f, "Adapter{}[{kind}]", self.ty())
    }
}
