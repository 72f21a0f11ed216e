//! Boolean-producing comparisons.
//!
//! The machine's comparisons are branches, so both builders produce their
//! boolean with two paths that push `false` and `true` and then reconverge.

use crate::compiler::{ExprKind, Expression};
use crate::errors::CodegenError;
use crate::types::TypeDescriptor;
use crate::vm::ComparisonOp;
use crate::format;

/// `left <op> right`. Both operands must have the same type; references and
/// arrays only support `Eq` and `Ne`. `left` is evaluated first.
pub fn compare(
    op: ComparisonOp,
    left: &Expression,
    right: &Expression,
) -> Result<Expression, CodegenError> {
    let ty = left.result_type();
    if ty != right.result_type() {
        return Err(CodegenError::InvalidArgument(format!(
            "left and right must have matching types, found {} and {}",
            ty.class_name(),
            right.result_type().class_name()
        )));
    }
    if !ty.is_value_type() || (ty.is_reference() && op.is_ordering()) {
        return Err(CodegenError::InvalidArgument(format!(
            "Type: {} cannot be compared via {}",
            ty.class_name(),
            op
        )));
    }
    Ok(Expression::new(
        TypeDescriptor::BOOLEAN,
        left.is_constant() && right.is_constant(),
        ExprKind::Compare {
            op,
            left: left.clone(),
            right: right.clone(),
        },
    ))
}

/// `!expr` for a boolean `expr`.
pub fn logical_not(expr: &Expression) -> Result<Expression, CodegenError> {
    expr.check_type(&TypeDescriptor::BOOLEAN)?;
    Ok(Expression::new(
        TypeDescriptor::BOOLEAN,
        expr.is_constant(),
        ExprKind::LogicalNot(expr.clone()),
    ))
}
