//! Errors raised while building and emitting expressions.
//!
//! Every check here runs at expression-construction time, before any
//! instruction is emitted, so a rejected program never leaves a partially
//! written method body behind.

use thiserror::Error;

use crate::String;
use crate::types::TypeDescriptor;
use crate::vm::{Label, VerifyError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodegenError {
    /// Mismatched or disallowed operand types or predicates.
    #[error("{0}")]
    InvalidArgument(String),

    /// An operand violates a single-type precondition.
    #[error("expected an expression of type {expected}, found {found}")]
    TypeMismatch {
        expected: TypeDescriptor,
        found: TypeDescriptor,
    },

    /// An object descriptor names a class the resolver cannot locate.
    #[error("Could not load {0}")]
    TypeResolution(String),

    /// A descriptor that is never valid where it was used (e.g. a method shape
    /// used as a value type).
    #[error("{0}")]
    InvalidType(String),

    #[error("malformed descriptor {descriptor:?}: {reason}")]
    InvalidDescriptor { descriptor: String, reason: String },

    /// A branch or table entry refers to a label that was never marked.
    #[error("label {0:?} is referenced but never marked")]
    UnmarkedLabel(Label),

    /// A method body needs more constant pool entries than an index can
    /// address.
    #[error("too many constants (limit: {limit})")]
    TooManyConstants { limit: usize },

    #[error("generated code failed verification: {0}")]
    Verify(#[from] VerifyError),
}
