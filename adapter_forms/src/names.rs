// Copyright 2026 the Adapter Forms Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The named operation graph.
//!
//! A form body is a flat arena of [`Name`]s. The first `arity` entries are parameter
//! placeholders; every later entry applies a [`Function`] to operands that refer only to
//! earlier entries or to constants. Indices are plain `usize` handles into the arena.
//!
//! Graphs are built by factories through [`NamesBuilder`], which checks the DAG and typing
//! invariants as slots are filled. A violation is a bug in the factory, so it panics.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use crate::adapter::Adapter;
use crate::basic_type::{BasicSignature, BasicType};
use crate::elementary::Elementary;
use crate::error::Thrown;
use crate::species::Species;
use crate::value::Value;

/// An operand of a name: an earlier name's result or a literal.
#[derive(Clone, Debug)]
pub enum Operand {
    /// The result of name `i`.
    Name(usize),
    /// A constant.
    Const(Value),
}

impl Operand {
    #[inline]
    pub(crate) fn resolve(&self, values: &[Value]) -> Value {
        match self {
            Self::Name(i) => values[*i].clone(),
            Self::Const(v) => v.clone(),
        }
    }
}

/// The operation a name applies.
#[derive(Clone)]
pub enum Function {
    /// An elementary routine.
    Elementary(Elementary),
    /// Invoke a constant adapter with the operands.
    Invoke(Adapter),
    /// Invoke the adapter in operand 0 with the remaining operands, typed by the signature.
    InvokeBasic(BasicSignature),
    /// Read slot `slot` of the carrier of the adapter in operand 0.
    Getter {
        /// Carrier shape.
        species: Arc<Species>,
        /// Slot index.
        slot: usize,
    },
}

impl Function {
    /// Basic types of the operands this function takes.
    #[must_use]
    pub fn parameter_types(&self) -> Vec<BasicType> {
        match self {
            Self::Elementary(e) => e.ty().params().iter().map(|p| p.basic_type()).collect(),
            Self::Invoke(a) => a.ty().params().iter().map(|p| p.basic_type()).collect(),
            Self::InvokeBasic(sig) => {
                let mut types = Vec::with_capacity(sig.params().len() + 1);
                types.push(BasicType::L);
                types.extend_from_slice(sig.params());
                types
            }
            Self::Getter { .. } => alloc::vec![BasicType::L],
        }
    }

    /// Basic type of the result.
    #[must_use]
    pub fn return_type(&self) -> BasicType {
        match self {
            Self::Elementary(e) => e.ty().ret().basic_type(),
            Self::Invoke(a) => a.ty().ret().basic_type(),
            Self::InvokeBasic(sig) => sig.ret(),
            Self::Getter { species, slot } => species.slot_type(*slot),
        }
    }

    /// Applies the function to resolved operands.
    pub fn apply(&self, args: &[Value]) -> Result<Value, Thrown> {
        match self {
            Self::Elementary(e) => e.call(args),
            Self::Invoke(a) => a.invoke_basic(args),
            Self::InvokeBasic(_) => {
                let (receiver, rest) = args
                    .split_first()
                    .ok_or_else(|| Thrown::internal("invokeBasic without receiver"))?;
                invoke_receiver(receiver)?.invoke_basic(rest)
            }
            Self::Getter { species, slot } => {
                read_carrier(args.first().unwrap_or(&Value::Null), species, *slot)
            }
        }
    }
}

/// The adapter an `invokeBasic` call dispatches to; shared by the interpreter and compiled code.
pub(crate) fn invoke_receiver(receiver: &Value) -> Result<&Adapter, Thrown> {
    receiver.as_adapter().ok_or_else(|| {
        Thrown::internal(format!("invokeBasic receiver {receiver} is not an adapter"))
    })
}

/// Reads `slot` of the `species` carrier bound to `receiver`.
pub(crate) fn read_carrier(
    receiver: &Value,
    species: &Arc<Species>,
    slot: usize,
) -> Result<Value, Thrown> {
    let adapter = receiver
        .as_adapter()
        .ok_or_else(|| Thrown::internal(format!("carrier read from {receiver}")))?;
    let carrier = adapter
        .carrier()
        .filter(|c| Arc::ptr_eq(c.species(), species))
        .ok_or_else(|| Thrown::internal(format!("adapter has no {} carrier", species.key())))?;
    Ok(carrier.get(slot).clone())
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Elementary(e) => f.write_str(e.name()),
            Self::Invoke(a) => write!(f, "invoke{}", a.ty()),
            Self::InvokeBasic(sig) => write!(f, "invokeBasic{sig}"),
            Self::Getter { species, slot } => {
                write!(
                    f,
                    "Species_{}.arg{}{}",
                    species.key(),
                    species.slot_type(*slot),
                    slot
                )
            }
        }
    }
}

/// One entry of a names graph.
#[derive(Clone, Debug)]
pub struct Name {
    ty: BasicType,
    function: Option<Function>,
    operands: Box<[Operand]>,
    constraint: Option<Arc<Species>>,
}

impl Name {
    fn placeholder(ty: BasicType) -> Self {
        Self {
            ty,
            function: None,
            operands: Box::new([]),
            constraint: None,
        }
    }

    /// Result basic type.
    #[must_use]
    #[inline]
    pub fn ty(&self) -> BasicType {
        self.ty
    }

    /// The applied function; `None` for parameters.
    #[must_use]
    #[inline]
    pub fn function(&self) -> Option<&Function> {
        self.function.as_ref()
    }

    /// Operands.
    #[must_use]
    #[inline]
    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    /// The carrier shape a parameter is known to hold.
    #[must_use]
    pub fn constraint(&self) -> Option<&Arc<Species>> {
        self.constraint.as_ref()
    }

    /// Returns `true` for parameter placeholders.
    #[must_use]
    pub fn is_param(&self) -> bool {
        self.function.is_none()
    }

    /// Evaluates this name against already computed `values`.
    pub(crate) fn evaluate(&self, values: &[Value]) -> Result<Value, Thrown> {
        let Some(function) = &self.function else {
            return Err(Thrown::internal("evaluating a parameter placeholder"));
        };
        let args: Vec<Value> = self.operands.iter().map(|o| o.resolve(values)).collect();
        function.apply(&args)
    }
}

/// Builder for a names graph.
#[derive(Debug)]
pub struct NamesBuilder {
    arity: usize,
    slots: Vec<Option<Name>>,
}

impl NamesBuilder {
    /// Allocates one placeholder per parameter of `signature` followed by `extra` empty slots.
    #[must_use]
    pub fn arguments(extra: usize, signature: &BasicSignature) -> Self {
        let arity = signature.params().len();
        let mut slots = Vec::with_capacity(arity + extra);
        slots.extend(signature.params().iter().map(|&bt| Some(Name::placeholder(bt))));
        slots.resize_with(arity + extra, || None);
        Self { arity, slots }
    }

    /// Number of parameters.
    #[must_use]
    #[inline]
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Total number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if there are no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Operand referring to slot `i`.
    #[must_use]
    pub fn operand(&self, i: usize) -> Operand {
        assert!(i < self.slots.len(), "operand {i} out of range");
        Operand::Name(i)
    }

    /// Records that parameter `i` holds an adapter with a carrier of `species`.
    pub fn constrain(&mut self, i: usize, species: Arc<Species>) {
        assert!(i < self.arity, "only parameters take a species constraint");
        if let Some(name) = &mut self.slots[i] {
            assert_eq!(name.ty, BasicType::L, "species constraint on non-reference");
            name.constraint = Some(species);
        }
    }

    /// Fills slot `i` with `function` applied to `operands`.
    pub fn set(&mut self, i: usize, function: Function, operands: Vec<Operand>) -> Operand {
        assert!(
            i >= self.arity && i < self.slots.len(),
            "slot {i} is not a derived slot"
        );
        assert!(self.slots[i].is_none(), "slot {i} filled twice");
        let params = function.parameter_types();
        assert_eq!(
            params.len(),
            operands.len(),
            "{function}: expected {} operands, got {}",
            params.len(),
            operands.len()
        );
        for (k, (op, &want)) in operands.iter().zip(&params).enumerate() {
            let have = match op {
                Operand::Name(j) => {
                    assert!(*j < i, "{function}: operand {k} refers forward to {j}");
                    self.slots[*j]
                        .as_ref()
                        .unwrap_or_else(|| panic!("{function}: operand {k} refers to empty {j}"))
                        .ty
                }
                Operand::Const(v) => v.basic_type(),
            };
            assert_eq!(have, want, "{function}: operand {k} has type {have}");
        }
        if let Function::Getter { species, .. } = &function {
            let Operand::Name(j) = operands[0] else {
                panic!("carrier read from a constant");
            };
            let constraint = self.slots[j].as_ref().and_then(|n| n.constraint.as_ref());
            assert!(
                constraint.is_some_and(|c| Arc::ptr_eq(c, species)),
                "carrier read from slot {j} without a {} constraint",
                species.key()
            );
        }
        self.slots[i] = Some(Name {
            ty: function.return_type(),
            function: Some(function),
            operands: operands.into_boxed_slice(),
            constraint: None,
        });
        Operand::Name(i)
    }

    /// Returns the filled names; every slot must be filled.
    #[must_use]
    pub fn finish(self) -> Box<[Name]> {
        self.slots
            .into_iter()
            .enumerate()
            .map(|(i, n)| n.unwrap_or_else(|| panic!("slot {i} left empty")))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elementary::{ValueOp, value_op};
    use crate::types::Primitive;
    use alloc::vec;

    fn sig(ret: BasicType, params: &[BasicType]) -> BasicSignature {
        BasicSignature::new(ret, params.to_vec())
    }

    #[test]
    fn builder_lays_out_parameters_first() {
        let mut b = NamesBuilder::arguments(1, &sig(BasicType::J, &[BasicType::I]));
        let a0 = b.operand(0);
        let widen = Function::Elementary(value_op(ValueOp::Convert(Primitive::Int, Primitive::Long)));
        b.set(1, widen, vec![a0]);
        let names = b.finish();
        assert_eq!(names.len(), 2);
        assert!(names[0].is_param());
        assert_eq!(names[1].ty(), BasicType::J);
        let values = [Value::Int(5)];
        assert_eq!(names[1].evaluate(&values).unwrap(), Value::Long(5));
    }

    #[test]
    #[should_panic(expected = "refers forward")]
    fn forward_references_are_rejected() {
        let mut b = NamesBuilder::arguments(2, &sig(BasicType::L, &[BasicType::I]));
        let widen = Function::Elementary(value_op(ValueOp::Convert(Primitive::Int, Primitive::Int)));
        b.set(1, widen, vec![Operand::Name(2)]);
    }

    #[test]
    #[should_panic(expected = "has type")]
    fn operand_types_are_checked() {
        let mut b = NamesBuilder::arguments(1, &sig(BasicType::L, &[BasicType::J]));
        let widen = Function::Elementary(value_op(ValueOp::Convert(Primitive::Int, Primitive::Long)));
        let a0 = b.operand(0);
        b.set(1, widen, vec![a0]);
    }

    #[test]
    #[should_panic(expected = "left empty")]
    fn unfilled_slots_are_rejected() {
        let _ = NamesBuilder::arguments(1, &sig(BasicType::V, &[])).finish();
    }
}
