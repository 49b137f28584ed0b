// Copyright 2026 the Adapter Forms Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Basic types: the erased machine kinds every value type reduces to.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use crate::types::{Primitive, RefType, ValueType};
use crate::value::Value;

/// An erased value kind.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BasicType {
    /// Reference.
    L,
    /// `int` and the sub-int primitives.
    I,
    /// `long`
    J,
    /// `float`
    F,
    /// `double`
    D,
    /// `void`
    V,
}

impl BasicType {
    /// The argument-capable basic types (everything but `V`).
    pub const ARG_TYPES: [Self; 5] = [Self::L, Self::I, Self::J, Self::F, Self::D];

    /// Returns the basic type of `ty`.
    #[must_use]
    #[inline]
    pub const fn of(ty: ValueType) -> Self {
        ty.basic_type()
    }

    /// The type character, e.g. `'L'`.
    #[must_use]
    pub const fn char(self) -> char {
        match self {
            Self::L => 'L',
            Self::I => 'I',
            Self::J => 'J',
            Self::F => 'F',
            Self::D => 'D',
            Self::V => 'V',
        }
    }

    /// Parses a type character.
    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            'L' => Some(Self::L),
            'I' => Some(Self::I),
            'J' => Some(Self::J),
            'F' => Some(Self::F),
            'D' => Some(Self::D),
            'V' => Some(Self::V),
            _ => None,
        }
    }

    /// The representative value type (`Object` for `L`, `int` for `I`, ...).
    #[must_use]
    pub const fn value_type(self) -> ValueType {
        match self {
            Self::L => ValueType::Ref(RefType::Object),
            Self::I => ValueType::Prim(Primitive::Int),
            Self::J => ValueType::Prim(Primitive::Long),
            Self::F => ValueType::Prim(Primitive::Float),
            Self::D => ValueType::Prim(Primitive::Double),
            Self::V => ValueType::Void,
        }
    }

    /// The zero value of this kind; `Null` for `L` and `V`.
    #[must_use]
    pub const fn zero(self) -> Value {
        match self {
            Self::L | Self::V => Value::Null,
            Self::I => Value::Int(0),
            Self::J => Value::Long(0),
            Self::F => Value::Float(0.0),
            Self::D => Value::Double(0.0),
        }
    }
}

impl fmt::Display for BasicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.char())
    }
}

/// An erased signature, used as a cache key for forms.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BasicSignature {
    ret: BasicType,
    params: Box<[BasicType]>,
}

impl BasicSignature {
    /// Creates a signature.
    #[must_use]
    pub fn new(ret: BasicType, params: Vec<BasicType>) -> Self {
        debug_assert!(
            !params.contains(&BasicType::V),
            "void parameter in basic signature"
        );
        Self {
            ret,
            params: params.into_boxed_slice(),
        }
    }

    /// The return kind.
    #[must_use]
    #[inline]
    pub fn ret(&self) -> BasicType {
        self.ret
    }

    /// The parameter kinds.
    #[must_use]
    #[inline]
    pub fn params(&self) -> &[BasicType] {
        &self.params
    }

    /// The signature of a form invoking an adapter of this signature: a leading `L` receiver.
    #[must_use]
    pub fn invoker(&self) -> Self {
        let mut params = Vec::with_capacity(self.params.len() + 1);
        params.push(BasicType::L);
        params.extend_from_slice(&self.params);
        Self::new(self.ret, params)
    }

    /// Returns a copy with return kind `ret`.
    #[must_use]
    pub fn change_return(&self, ret: BasicType) -> Self {
        Self {
            ret,
            params: self.params.clone(),
        }
    }
}

impl fmt::Debug for BasicSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for BasicSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for p in &self.params {
            write!(f, "{p}")?;
        }
        write!(f, "){}", self.ret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ElemType;

    #[test]
    fn erasure_is_total() {
        for p in Primitive::ALL {
            let bt = BasicType::of(ValueType::Prim(p));
            assert_ne!(bt, BasicType::L);
            assert_ne!(bt, BasicType::V);
        }
        assert_eq!(BasicType::of(ValueType::boxed(Primitive::Int)), BasicType::L);
        assert_eq!(
            BasicType::of(ValueType::Array(ElemType::Prim(Primitive::Byte))),
            BasicType::L
        );
        assert_eq!(BasicType::of(ValueType::Void), BasicType::V);
        assert_eq!(BasicType::of(ValueType::Prim(Primitive::Char)), BasicType::I);
    }

    #[test]
    fn chars_round_trip() {
        for bt in BasicType::ARG_TYPES {
            assert_eq!(BasicType::from_char(bt.char()), Some(bt));
        }
        assert_eq!(BasicType::from_char('Z'), None);
    }

    #[test]
    fn invoker_signature_prepends_receiver() {
        let sig = BasicSignature::new(BasicType::J, alloc::vec![BasicType::I, BasicType::D]);
        assert_eq!(format!("{}", sig.invoker()), "(LID)J");
    }
}
