use crate::compiler::{ExprKind, Expression};
use crate::errors::CodegenError;
use crate::types::MethodRef;
use crate::{Vec, format};

/// A call to the static method `method` with `args`, evaluated left to
/// right.
///
/// The call must produce a value, so `void` methods are rejected.
pub fn invoke_static(method: &MethodRef, args: &[Expression]) -> Result<Expression, CodegenError> {
    let descriptor = method.method().descriptor();
    let return_type = descriptor.return_type();
    if !return_type.is_value_type() {
        return Err(CodegenError::InvalidArgument(format!(
            "{} does not produce a value",
            method
        )));
    }
    if args.len() != descriptor.params().len() {
        return Err(CodegenError::InvalidArgument(format!(
            "{} expects {} arguments, found {}",
            method,
            descriptor.params().len(),
            args.len()
        )));
    }
    for (arg, param) in args.iter().zip(descriptor.params()) {
        arg.check_type(param)?;
    }

    Ok(Expression::new(
        return_type.clone(),
        false,
        ExprKind::InvokeStatic {
            method: method.clone(),
            args: args.iter().cloned().collect::<Vec<_>>(),
        },
    ))
}
