//! Numeric conversion and stack utilities.

use crate::compiler::{CodeEmitter, ExprKind, Expression};
use crate::errors::CodegenError;
use crate::types::TypeDescriptor;
use crate::format;

/// Converts `expr` to the numeric type `target`.
///
/// Converting to the expression's own type returns `expr` itself. The result
/// of converting a constant is flagged constant but the literal is not
/// folded; the cast is emitted after the original push.
pub fn numeric_conversion(
    expr: &Expression,
    target: &TypeDescriptor,
) -> Result<Expression, CodegenError> {
    let source = expr.result_type();
    if source == target {
        return Ok(expr.clone());
    }
    if !source.is_numeric_primitive() || !target.is_numeric_primitive() {
        return Err(CodegenError::InvalidArgument(format!(
            "Cannot convert from {} to {}",
            source.class_name(),
            target.class_name()
        )));
    }
    Ok(Expression::new(
        target.clone(),
        expr.is_constant(),
        ExprKind::NumericConversion(expr.clone()),
    ))
}

/// Duplicates the value of type `ty` on top of the stack.
///
/// # Panics
///
/// Panics for `void` and method types, which never sit on the stack, and for
/// arrays of them.
pub fn dup_expr(ty: &TypeDescriptor) -> Expression {
    match ty.size() {
        1 | 2 if ty.is_well_formed() => Expression::new(ty.clone(), false, ExprKind::Dup),
        _ => panic!("cannot dup() {}", ty),
    }
}

/// Pushes the zero value of `ty`: `0` for integral kinds, positive zero for
/// floating point and null for references.
///
/// # Panics
///
/// Panics for `void` and method types, and for arrays of them.
pub fn load_default(mg: &mut CodeEmitter, ty: &TypeDescriptor) {
    use crate::types::PrimitiveKind as P;

    match ty {
        TypeDescriptor::Primitive(P::Long) => mg.push_long(0),
        TypeDescriptor::Primitive(P::Float) => mg.push_float(0.0),
        TypeDescriptor::Primitive(P::Double) => mg.push_double(0.0),
        TypeDescriptor::Primitive(_) => mg.push_int(0),
        TypeDescriptor::Object(_) | TypeDescriptor::Array(_) if ty.is_well_formed() => {
            mg.push_null()
        }
        _ => panic!("unexpected sort for type {}", ty),
    }
}
