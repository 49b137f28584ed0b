// Copyright 2026 the Adapter Forms Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The rich value-type space and adapter signatures.
//!
//! v1 models a closed set of reference types: `Object`, `Number`, the eight wrappers, `String`,
//! thrown errors, adapters, type tokens and one-dimensional arrays.

use alloc::sync::Arc;
use core::fmt;

use crate::basic_type::{BasicSignature, BasicType};
use crate::error::BuildError;

/// Maximum number of parameter slots of any signature.
pub const MAX_ARITY: usize = 255;

/// Maximum number of parameter slots of an adapter (one slot is reserved for the receiver).
pub const MAX_ADAPTER_ARITY: usize = MAX_ARITY - 1;

/// A primitive value type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Primitive {
    /// `boolean`, a one-bit unsigned integral carried as `I`.
    Boolean,
    /// `byte`
    Byte,
    /// `short`
    Short,
    /// `char`, an unsigned 16-bit integral.
    Char,
    /// `int`
    Int,
    /// `long`
    Long,
    /// `float`
    Float,
    /// `double`
    Double,
}

impl Primitive {
    /// All primitives, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Boolean,
        Self::Byte,
        Self::Short,
        Self::Char,
        Self::Int,
        Self::Long,
        Self::Float,
        Self::Double,
    ];

    /// Returns the basic type this primitive erases to.
    #[must_use]
    pub const fn basic_type(self) -> BasicType {
        match self {
            Self::Boolean | Self::Byte | Self::Short | Self::Char | Self::Int => BasicType::I,
            Self::Long => BasicType::J,
            Self::Float => BasicType::F,
            Self::Double => BasicType::D,
        }
    }

    /// Returns the number of parameter slots a value of this type occupies.
    #[must_use]
    pub const fn slots(self) -> usize {
        match self {
            Self::Long | Self::Double => 2,
            _ => 1,
        }
    }

    /// Returns `true` for `boolean`, `byte`, `short`, `char` and `int`.
    #[must_use]
    pub const fn is_subword_or_int(self) -> bool {
        matches!(
            self,
            Self::Boolean | Self::Byte | Self::Short | Self::Char | Self::Int
        )
    }

    /// Returns `true` for the signed integral types.
    #[must_use]
    pub const fn is_signed(self) -> bool {
        matches!(self, Self::Byte | Self::Short | Self::Int | Self::Long)
    }

    /// Width in bits of the value domain (`boolean` is one bit wide).
    #[must_use]
    pub const fn bit_width(self) -> u32 {
        match self {
            Self::Boolean => 1,
            Self::Byte => 8,
            Self::Short | Self::Char => 16,
            Self::Int | Self::Float => 32,
            Self::Long | Self::Double => 64,
        }
    }

    /// Returns `true` if `self` converts to `to` by identity or primitive widening.
    ///
    /// `boolean` only converts to itself.
    #[must_use]
    pub fn widens_to(self, to: Self) -> bool {
        use Primitive::*;
        if self == to {
            return true;
        }
        match self {
            Boolean | Double => false,
            Byte => matches!(to, Short | Int | Long | Float | Double),
            Short | Char => matches!(to, Int | Long | Float | Double),
            Int => matches!(to, Long | Float | Double),
            Long => matches!(to, Float | Double),
            Float => to == Double,
        }
    }

    /// The source-level name, e.g. `int`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Char => "char",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
        }
    }

    /// The wrapper name, e.g. `Integer`.
    #[must_use]
    pub const fn wrapper_name(self) -> &'static str {
        match self {
            Self::Boolean => "Boolean",
            Self::Byte => "Byte",
            Self::Short => "Short",
            Self::Char => "Character",
            Self::Int => "Integer",
            Self::Long => "Long",
            Self::Float => "Float",
            Self::Double => "Double",
        }
    }
}

/// A non-array reference type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RefType {
    /// The root reference type.
    Object,
    /// Supertype of the numeric wrappers.
    Number,
    /// The wrapper of a primitive.
    Boxed(Primitive),
    /// Character strings.
    Str,
    /// Thrown error values.
    Error,
    /// Adapters.
    Adapter,
    /// Type tokens.
    Type,
    /// Cursors over arrays.
    Iterator,
}

impl RefType {
    /// Returns `true` if a value of `other` may be stored where `self` is expected.
    #[must_use]
    pub fn is_assignable_from(self, other: Self) -> bool {
        match (self, other) {
            (Self::Object, _) => true,
            (Self::Number, Self::Boxed(p)) => p != Primitive::Boolean && p != Primitive::Char,
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for RefType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object => f.write_str("Object"),
            Self::Number => f.write_str("Number"),
            Self::Boxed(p) => f.write_str(p.wrapper_name()),
            Self::Str => f.write_str("String"),
            Self::Error => f.write_str("Throwable"),
            Self::Adapter => f.write_str("Adapter"),
            Self::Type => f.write_str("Type"),
            Self::Iterator => f.write_str("Iterator"),
        }
    }
}

/// An array element type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ElemType {
    /// A primitive element.
    Prim(Primitive),
    /// A reference element.
    Ref(RefType),
}

impl ElemType {
    /// Returns the element as a value type.
    #[must_use]
    pub const fn value_type(self) -> ValueType {
        match self {
            Self::Prim(p) => ValueType::Prim(p),
            Self::Ref(r) => ValueType::Ref(r),
        }
    }
}

/// A value type: `void`, a primitive, a reference or an array.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// No value.
    Void,
    /// A primitive.
    Prim(Primitive),
    /// A non-array reference.
    Ref(RefType),
    /// A one-dimensional array.
    Array(ElemType),
}

impl ValueType {
    /// `boolean`
    pub const BOOLEAN: Self = Self::Prim(Primitive::Boolean);
    /// `int`
    pub const INT: Self = Self::Prim(Primitive::Int);
    /// `long`
    pub const LONG: Self = Self::Prim(Primitive::Long);
    /// `float`
    pub const FLOAT: Self = Self::Prim(Primitive::Float);
    /// `double`
    pub const DOUBLE: Self = Self::Prim(Primitive::Double);
    /// `Object`
    pub const OBJECT: Self = Self::Ref(RefType::Object);
    /// `String`
    pub const STRING: Self = Self::Ref(RefType::Str);
    /// Thrown error values.
    pub const ERROR: Self = Self::Ref(RefType::Error);
    /// Adapters.
    pub const ADAPTER: Self = Self::Ref(RefType::Adapter);
    /// Type tokens.
    pub const TYPE: Self = Self::Ref(RefType::Type);
    /// Cursors over arrays.
    pub const ITERATOR: Self = Self::Ref(RefType::Iterator);
    /// `Object[]`
    pub const OBJECT_ARRAY: Self = Self::Array(ElemType::Ref(RefType::Object));
    /// `int[]`
    pub const INT_ARRAY: Self = Self::Array(ElemType::Prim(Primitive::Int));

    /// Returns the wrapper type of `p`.
    #[must_use]
    pub const fn boxed(p: Primitive) -> Self {
        Self::Ref(RefType::Boxed(p))
    }

    /// Returns the array type with element `elem`.
    #[must_use]
    pub const fn array_of(elem: ElemType) -> Self {
        Self::Array(elem)
    }

    /// Returns the basic type this type erases to.
    #[must_use]
    pub const fn basic_type(self) -> BasicType {
        match self {
            Self::Void => BasicType::V,
            Self::Prim(p) => p.basic_type(),
            Self::Ref(_) | Self::Array(_) => BasicType::L,
        }
    }

    /// Returns `true` for reference and array types.
    #[must_use]
    pub const fn is_reference(self) -> bool {
        matches!(self, Self::Ref(_) | Self::Array(_))
    }

    /// Returns the primitive if this is a primitive type.
    #[must_use]
    pub const fn primitive(self) -> Option<Primitive> {
        match self {
            Self::Prim(p) => Some(p),
            _ => None,
        }
    }

    /// Returns the wrapped primitive if this is a wrapper type.
    #[must_use]
    pub const fn unwrapped(self) -> Option<Primitive> {
        match self {
            Self::Ref(RefType::Boxed(p)) => Some(p),
            _ => None,
        }
    }

    /// Returns the element type if this is an array type.
    #[must_use]
    pub const fn element(self) -> Option<ElemType> {
        match self {
            Self::Array(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the number of parameter slots a value of this type occupies.
    #[must_use]
    pub const fn slots(self) -> usize {
        match self {
            Self::Void => 0,
            Self::Prim(p) => p.slots(),
            _ => 1,
        }
    }

    /// Reference assignability; primitives are assignable only from themselves.
    #[must_use]
    pub fn is_assignable_from(self, other: Self) -> bool {
        if self == other {
            return true;
        }
        match (self, other) {
            (Self::Ref(RefType::Object), Self::Ref(_) | Self::Array(_)) => true,
            (Self::Ref(a), Self::Ref(b)) => a.is_assignable_from(b),
            (Self::Array(ElemType::Ref(a)), Self::Array(ElemType::Ref(b))) => {
                a.is_assignable_from(b)
            }
            _ => false,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("void"),
            Self::Prim(p) => f.write_str(p.name()),
            Self::Ref(r) => write!(f, "{r}"),
            Self::Array(ElemType::Prim(p)) => write!(f, "{}[]", p.name()),
            Self::Array(ElemType::Ref(r)) => write!(f, "{r}[]"),
        }
    }
}

/// The externally visible signature of an adapter.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MethodType {
    ret: ValueType,
    params: Arc<[ValueType]>,
}

impl MethodType {
    /// Creates a signature.
    ///
    /// Panics if a parameter is `void`.
    #[must_use]
    pub fn new(ret: ValueType, params: impl Into<Arc<[ValueType]>>) -> Self {
        let params = params.into();
        assert!(
            params.iter().all(|p| *p != ValueType::Void),
            "void parameter in signature"
        );
        Self { ret, params }
    }

    /// `(Object, ...)Object` with `arity` parameters.
    #[must_use]
    pub fn generic(arity: usize) -> Self {
        Self::new(ValueType::OBJECT, alloc::vec![ValueType::OBJECT; arity])
    }

    /// The return type.
    #[must_use]
    #[inline]
    pub fn ret(&self) -> ValueType {
        self.ret
    }

    /// The parameter types.
    #[must_use]
    #[inline]
    pub fn params(&self) -> &[ValueType] {
        &self.params
    }

    /// Parameter `i`.
    #[must_use]
    #[inline]
    pub fn param(&self, i: usize) -> ValueType {
        self.params[i]
    }

    /// Number of parameters.
    #[must_use]
    #[inline]
    pub fn parameter_count(&self) -> usize {
        self.params.len()
    }

    /// The last parameter, if any.
    #[must_use]
    pub fn last_param(&self) -> Option<ValueType> {
        self.params.last().copied()
    }

    /// Number of parameter slots (`long` and `double` count twice).
    #[must_use]
    pub fn parameter_slot_count(&self) -> usize {
        self.params.iter().map(|p| p.slots()).sum()
    }

    /// Fails with [`BuildError::TooManyArguments`] if this type cannot be an adapter type.
    pub fn check_slot_limit(&self) -> Result<(), BuildError> {
        let slots = self.parameter_slot_count();
        if slots > MAX_ADAPTER_ARITY {
            return Err(BuildError::TooManyArguments { slots });
        }
        Ok(())
    }

    /// The erased signature.
    #[must_use]
    pub fn basic_signature(&self) -> BasicSignature {
        BasicSignature::new(
            self.ret.basic_type(),
            self.params.iter().map(|p| p.basic_type()).collect(),
        )
    }

    /// Returns a copy with return type `ret`.
    #[must_use]
    pub fn change_return(&self, ret: ValueType) -> Self {
        Self {
            ret,
            params: self.params.clone(),
        }
    }

    /// Returns a copy with parameter `i` replaced by `ty`.
    #[must_use]
    pub fn change_param(&self, i: usize, ty: ValueType) -> Self {
        let mut params = self.params.to_vec();
        params[i] = ty;
        Self::new(self.ret, params)
    }

    /// Returns a copy with `types` inserted before parameter `pos`.
    #[must_use]
    pub fn insert_params(&self, pos: usize, types: &[ValueType]) -> Self {
        self.replace_params(pos, pos, types)
    }

    /// Returns a copy with `types` appended.
    #[must_use]
    pub fn append_params(&self, types: &[ValueType]) -> Self {
        self.insert_params(self.params.len(), types)
    }

    /// Returns a copy without parameters `start..end`.
    #[must_use]
    pub fn drop_params(&self, start: usize, end: usize) -> Self {
        self.replace_params(start, end, &[])
    }

    /// Returns a copy with parameters `start..end` replaced by `types`.
    #[must_use]
    pub fn replace_params(&self, start: usize, end: usize, types: &[ValueType]) -> Self {
        let mut params = self.params.to_vec();
        params.splice(start..end, types.iter().copied());
        Self::new(self.ret, params)
    }
}

impl fmt::Debug for MethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for MethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{p}")?;
        }
        write!(f, "){}", self.ret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn widening_follows_the_numeric_tower() {
        assert!(Primitive::Byte.widens_to(Primitive::Double));
        assert!(Primitive::Char.widens_to(Primitive::Int));
        assert!(!Primitive::Char.widens_to(Primitive::Short));
        assert!(!Primitive::Boolean.widens_to(Primitive::Int));
        assert!(!Primitive::Long.widens_to(Primitive::Int));
        assert!(Primitive::Long.widens_to(Primitive::Float));
    }

    #[test]
    fn assignability_is_covariant_for_reference_arrays() {
        let strings = ValueType::Array(ElemType::Ref(RefType::Str));
        assert!(ValueType::OBJECT_ARRAY.is_assignable_from(strings));
        assert!(!strings.is_assignable_from(ValueType::OBJECT_ARRAY));
        assert!(ValueType::OBJECT.is_assignable_from(ValueType::INT_ARRAY));
        assert!(!ValueType::OBJECT_ARRAY.is_assignable_from(ValueType::INT_ARRAY));
        assert!(
            ValueType::Ref(RefType::Number).is_assignable_from(ValueType::boxed(Primitive::Int))
        );
        assert!(
            !ValueType::Ref(RefType::Number)
                .is_assignable_from(ValueType::boxed(Primitive::Boolean))
        );
    }

    #[test]
    fn signature_editing_and_display() {
        let mt = MethodType::new(ValueType::LONG, vec![ValueType::INT, ValueType::OBJECT]);
        assert_eq!(format!("{mt}"), "(int,Object)long");
        assert_eq!(mt.parameter_slot_count(), 2);
        let edited = mt
            .insert_params(1, &[ValueType::DOUBLE])
            .drop_params(0, 1)
            .change_return(ValueType::Void);
        assert_eq!(format!("{edited}"), "(double,Object)void");
        assert_eq!(edited.parameter_slot_count(), 3);
        assert_eq!(format!("{}", edited.basic_signature()), "(DL)V");
    }

    #[test]
    fn slot_limit_counts_wide_parameters_twice() {
        let ok = MethodType::new(ValueType::Void, vec![ValueType::LONG; 127]);
        assert!(ok.check_slot_limit().is_ok());
        let wide = MethodType::new(ValueType::Void, vec![ValueType::LONG; 128]);
        assert_eq!(
            wide.check_slot_limit(),
            Err(BuildError::TooManyArguments { slots: 256 })
        );
    }
}
