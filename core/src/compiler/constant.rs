//! Literal expressions.
//!
//! Each builder returns a constant expression of its kind's type; emission
//! picks the narrowest push form for the value.

use alloc::sync::Arc;

use crate::compiler::{ExprKind, Expression, Literal};
use crate::errors::CodegenError;
use crate::types::TypeDescriptor;
use crate::{ToString, format};

fn literal(result_type: TypeDescriptor, value: Literal) -> Expression {
    Expression::new(result_type, true, ExprKind::Constant(value))
}

pub fn constant_bool(value: bool) -> Expression {
    literal(TypeDescriptor::BOOLEAN, Literal::Bool(value))
}

/// A `char` constant holding one UTF-16 code unit.
pub fn constant_char(value: u16) -> Expression {
    literal(TypeDescriptor::CHAR, Literal::Char(value))
}

pub fn constant_int(value: i32) -> Expression {
    literal(TypeDescriptor::INT, Literal::Int(value))
}

pub fn constant_long(value: i64) -> Expression {
    literal(TypeDescriptor::LONG, Literal::Long(value))
}

pub fn constant_float(value: f32) -> Expression {
    literal(TypeDescriptor::FLOAT, Literal::Float(value))
}

pub fn constant_double(value: f64) -> Expression {
    literal(TypeDescriptor::DOUBLE, Literal::Double(value))
}

/// A `java.lang.String` constant.
pub fn constant_str(value: &str) -> Expression {
    literal(TypeDescriptor::string_type(), Literal::Str(Arc::from(value)))
}

/// Like [`constant_str`], for callers holding a possibly-absent text.
///
/// There is no null text constant; use [`null_constant`] for a null
/// reference.
pub fn try_constant_str(value: Option<&str>) -> Result<Expression, CodegenError> {
    value.map(constant_str).ok_or_else(|| {
        CodegenError::InvalidArgument("text constants cannot be null".to_string())
    })
}

/// The null reference, typed as `ty`.
pub fn null_constant(ty: &TypeDescriptor) -> Result<Expression, CodegenError> {
    if !ty.is_reference() || !ty.is_well_formed() {
        return Err(CodegenError::InvalidArgument(format!(
            "null is not a value of type {}",
            ty.class_name()
        )));
    }
    Ok(Expression::new(ty.clone(), true, ExprKind::Null))
}
