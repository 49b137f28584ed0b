// Copyright 2026 the Adapter Forms Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `adapter_forms`: an adapter combinator engine.
//!
//! An [`Adapter`] is an invocable unit with a fixed [`MethodType`]. Combinator factories in
//! [`combinators`] build new adapters out of existing ones: conversions, argument surgery,
//! guarded dispatch, exception handling, loops and varargs collection.
//!
//! Composite adapters run a [`Form`]: a small graph of typed operations over *basic types*,
//! the erasure of value types to `L`, `I`, `J`, `F`, `D` and `V`. Forms are shared by every
//! adapter of the same erased shape and captured values live in a per-adapter carrier whose
//! layout is described by a [`Species`](species::Species). A form is interpreted until it has
//! run [`EngineConfig::compile_threshold`] times and is then lowered by the installed
//! [`FormCompiler`](compile::FormCompiler).
//!
//! ## Errors
//! Factories report shape problems as [`BuildError`] before any adapter exists. Invocation
//! failures unwind as [`Thrown`] values carrying an [`ErrorKind`].
//!
//! ## Logging
//! Cache publication races, form construction and compilation are reported through the `log`
//! facade at `debug` level; install any logger to see them.
//!
//! ## Example
//! ```
//! use adapter_forms::combinators::{guard, identity};
//! use adapter_forms::{Adapter, MethodType, Value, ValueType};
//!
//! let negate = Adapter::from_fn(
//!     "negate",
//!     MethodType::new(ValueType::INT, vec![ValueType::INT]),
//!     |args| Ok(Value::Int(args[0].as_int().unwrap_or(0).wrapping_neg())),
//! );
//! let is_negative = Adapter::from_fn(
//!     "isNegative",
//!     MethodType::new(ValueType::BOOLEAN, vec![ValueType::INT]),
//!     |args| Ok(Value::from(args[0].as_int().is_some_and(|v| v < 0))),
//! );
//! let abs = guard(&is_negative, &negate, &identity(ValueType::INT)?)?;
//! assert_eq!(abs.invoke(&[Value::Int(-5)])?, Value::Int(5));
//! assert_eq!(abs.invoke(&[Value::Int(3)])?, Value::Int(3));
//! # Ok::<(), Box<dyn core::error::Error>>(())
//! ```

extern crate alloc;

pub mod adapter;
pub mod basic_type;
pub mod cache;
pub mod combinators;
pub mod compile;
pub mod config;
pub mod constants;
pub mod conversion;
pub mod elementary;
pub mod error;
pub mod form;
pub mod names;
pub mod species;
pub mod types;
pub mod value;

pub use adapter::Adapter;
pub use basic_type::{BasicSignature, BasicType};
pub use config::EngineConfig;
pub use error::{BuildError, ErrorKind, Thrown};
pub use form::Form;
pub use types::{ElemType, MAX_ADAPTER_ARITY, MAX_ARITY, MethodType, Primitive, RefType, ValueType};
pub use value::{Array, Boxed, Cursor, Value};
