// Copyright 2026 the Adapter Forms Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Construction and invocation errors.
//!
//! Two channels exist:
//! - [`BuildError`] is returned by factories before any adapter is observable.
//! - [`Thrown`] is the value an adapter invocation unwinds with. It carries an [`ErrorKind`]
//!   from a small fixed hierarchy so that guarded-catch adapters can match on subkinds.

use core::fmt;

use crate::types::MethodType;

/// The kind of a thrown error.
///
/// Kinds form a tree rooted at [`ErrorKind::Throwable`]; see [`ErrorKind::parent`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Root of the hierarchy.
    Throwable,
    /// Unrecoverable engine failures.
    Error,
    /// An internal consistency failure detected while running a form.
    InternalError,
    /// Recoverable failures.
    Exception,
    /// An I/O failure raised by user code.
    Io,
    /// An application-defined exception, distinguished by code.
    User(u16),
    /// Unchecked failures.
    RuntimeException,
    /// Integer arithmetic failure.
    Arithmetic,
    /// An argument was rejected.
    IllegalArgument,
    /// A reference cast failed.
    ClassCast,
    /// A null reference was dereferenced or unboxed.
    NullPointer,
    /// An array index was outside the array.
    IndexOutOfBounds,
    /// An adapter was invoked with arguments that do not fit its type.
    WrongMethodType,
    /// An array store of an incompatible reference.
    ArrayStore,
    /// An array was allocated with a negative length.
    NegativeArraySize,
}

impl ErrorKind {
    /// Returns the direct parent kind, or `None` for [`ErrorKind::Throwable`].
    #[must_use]
    pub const fn parent(self) -> Option<Self> {
        match self {
            Self::Throwable => None,
            Self::Error | Self::Exception => Some(Self::Throwable),
            Self::InternalError => Some(Self::Error),
            Self::Io | Self::User(_) | Self::RuntimeException => Some(Self::Exception),
            Self::Arithmetic
            | Self::IllegalArgument
            | Self::ClassCast
            | Self::NullPointer
            | Self::IndexOutOfBounds
            | Self::WrongMethodType
            | Self::ArrayStore
            | Self::NegativeArraySize => Some(Self::RuntimeException),
        }
    }

    /// Returns `true` if `self` is `other` or one of its descendants.
    #[must_use]
    pub fn is_subkind_of(self, other: Self) -> bool {
        let mut cur = Some(self);
        while let Some(kind) = cur {
            if kind == other {
                return true;
            }
            cur = kind.parent();
        }
        false
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(code) => write!(f, "User({code})"),
            other => fmt::Debug::fmt(other, f),
        }
    }
}

/// An error value raised while invoking an adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Thrown {
    kind: ErrorKind,
    message: Box<str>,
}

impl Thrown {
    /// Creates a thrown error of `kind`.
    pub fn new(kind: ErrorKind, message: impl Into<Box<str>>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Returns the error kind.
    #[must_use]
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the message.
    #[must_use]
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn illegal_argument(message: impl Into<Box<str>>) -> Self {
        Self::new(ErrorKind::IllegalArgument, message)
    }

    pub(crate) fn class_cast(message: impl Into<Box<str>>) -> Self {
        Self::new(ErrorKind::ClassCast, message)
    }

    pub(crate) fn null_pointer(message: impl Into<Box<str>>) -> Self {
        Self::new(ErrorKind::NullPointer, message)
    }

    pub(crate) fn wrong_method_type(message: impl Into<Box<str>>) -> Self {
        Self::new(ErrorKind::WrongMethodType, message)
    }

    pub(crate) fn internal(message: impl Into<Box<str>>) -> Self {
        Self::new(ErrorKind::InternalError, message)
    }
}

impl fmt::Display for Thrown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl core::error::Error for Thrown {}

/// Errors reported by adapter factories.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BuildError {
    /// No conversion exists between the two signatures (or their arities differ).
    IncompatibleTypes {
        /// The signature being adapted.
        from: MethodType,
        /// The requested signature.
        to: MethodType,
    },
    /// The requested shape exceeds the platform parameter ceiling.
    TooManyArguments {
        /// Number of parameter slots requested.
        slots: usize,
    },
    /// A shape parameter was rejected.
    IllegalArgument(Box<str>),
    /// An adapter of the wrong type was supplied to a factory.
    WrongMethodType {
        /// The type the factory required.
        expected: MethodType,
        /// The type it was given.
        actual: MethodType,
    },
}

impl BuildError {
    pub(crate) fn illegal_argument(message: impl Into<Box<str>>) -> Self {
        Self::IllegalArgument(message.into())
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IncompatibleTypes { from, to } => {
                write!(f, "cannot convert {from} to {to}")
            }
            Self::TooManyArguments { slots } => {
                write!(f, "too many arguments: {slots} parameter slots")
            }
            Self::IllegalArgument(message) => write!(f, "illegal argument: {message}"),
            Self::WrongMethodType { expected, actual } => {
                write!(f, "expected adapter of type {expected}, found {actual}")
            }
        }
    }
}

impl core::error::Error for BuildError {}

impl From<BuildError> for Thrown {
    fn from(err: BuildError) -> Self {
        let kind = match &err {
            BuildError::IncompatibleTypes { .. } | BuildError::WrongMethodType { .. } => {
                ErrorKind::WrongMethodType
            }
            BuildError::TooManyArguments { .. } | BuildError::IllegalArgument(_) => {
                ErrorKind::IllegalArgument
            }
        };
        Self::new(kind, format!("{err}"))
    }
}
