// Copyright 2026 the Adapter Forms Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Species: interned carrier shapes for captured values.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use std::sync::LazyLock;

use crate::basic_type::BasicType;
use crate::cache::PublishOnceMap;
use crate::names::Function;
use crate::value::Value;

/// A carrier shape: an ordered list of slot basic types.
#[derive(PartialEq, Eq, Hash)]
pub struct Species {
    key: Box<str>,
    slots: Box<[BasicType]>,
}

impl Species {
    /// The type-character key, e.g. `"LLL"`.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Slot basic types.
    #[must_use]
    pub fn slot_types(&self) -> &[BasicType] {
        &self.slots
    }

    /// Number of slots.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Basic type of `slot`.
    #[must_use]
    pub fn slot_type(&self, slot: usize) -> BasicType {
        self.slots[slot]
    }

    /// Builds a carrier of this shape.
    ///
    /// Panics if `values` does not match the slot types.
    #[must_use]
    pub fn construct(self: &Arc<Self>, values: Vec<Value>) -> Carrier {
        assert_eq!(
            values.len(),
            self.slots.len(),
            "Species_{}: wrong number of values",
            self.key
        );
        for (i, (v, &bt)) in values.iter().zip(self.slots.iter()).enumerate() {
            assert_eq!(
                v.basic_type(),
                bt,
                "Species_{}: slot {i} holds a {} value",
                self.key,
                v.basic_type()
            );
        }
        Carrier {
            species: Arc::clone(self),
            values: values.into_boxed_slice(),
        }
    }

    /// The operation reading `slot` from a carrier of this shape.
    #[must_use]
    pub fn getter(self: &Arc<Self>, slot: usize) -> Function {
        assert!(slot < self.slots.len(), "Species_{}: no slot {slot}", self.key);
        Function::Getter {
            species: Arc::clone(self),
            slot,
        }
    }

    /// The shape with one more trailing slot of type `bt`.
    #[must_use]
    pub fn extend_with(&self, bt: BasicType) -> Arc<Self> {
        let mut key = String::from(&*self.key);
        key.push(bt.char());
        species_for(&key)
    }
}

impl fmt::Debug for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Species_{}", self.key)
    }
}

/// Captured values of a bound adapter.
#[derive(Clone, Debug)]
pub struct Carrier {
    species: Arc<Species>,
    values: Box<[Value]>,
}

impl Carrier {
    /// The shape.
    #[must_use]
    pub fn species(&self) -> &Arc<Species> {
        &self.species
    }

    /// Slot `slot`.
    #[must_use]
    pub fn get(&self, slot: usize) -> &Value {
        &self.values[slot]
    }

    /// All slots.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

static SPECIES: LazyLock<PublishOnceMap<Box<str>, Arc<Species>>> =
    LazyLock::new(|| PublishOnceMap::new("species"));

/// Returns the interned species for a key such as `"LLL"`.
///
/// Panics on characters other than `L`, `I`, `J`, `F`, `D`.
#[must_use]
pub fn species_for(key: &str) -> Arc<Species> {
    SPECIES.get_or_create(key.into(), |key| {
        let slots: Box<[BasicType]> = key
            .chars()
            .map(|c| match BasicType::from_char(c) {
                Some(bt) if bt != BasicType::V => bt,
                _ => panic!("bad species key {key:?}"),
            })
            .collect();
        log::debug!("new species Species_{key}");
        Arc::new(Species {
            key: key.clone(),
            slots,
        })
    })
}

/// Returns the interned species for `slots`.
#[must_use]
pub fn species_of(slots: &[BasicType]) -> Arc<Species> {
    let key: String = slots.iter().map(|bt| bt.char()).collect();
    species_for(&key)
}
