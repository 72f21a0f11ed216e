//! Expression builders and code emission.
//!
//! A backend builds [`Expression`]s with the functions in this module, then
//! asks each to emit itself into a [`CodeEmitter`], one emitter per method
//! body.
//!
//! ## Design
//!
//! - Every type constraint is checked when an expression is built; emission
//!   cannot fail
//! - Comparisons produce booleans through two converging branches
//! - The emitter tracks the operand stack precisely for `max_stack`
//! - Finished methods are collected by a [`ClassWriter`] into a
//!   [`ClassDefinition`](crate::vm::ClassDefinition)

mod class_writer;
mod comparison;
mod constant;
mod constructor;
mod conversion;
mod emitter;
mod expression;
mod invoke;
mod local_variable;
mod type_info;

#[cfg(test)]
mod conversion_test;
#[cfg(test)]
mod emitter_test;
#[cfg(test)]
mod invoke_test;
#[cfg(test)]
mod test_support;

pub use class_writer::ClassWriter;
pub use comparison::{compare, logical_not};
pub use constant::{
    constant_bool, constant_char, constant_double, constant_float, constant_int, constant_long,
    constant_str, null_constant, try_constant_str,
};
pub use constructor::define_default_constructor;
pub use conversion::{dup_expr, load_default, numeric_conversion};
pub use emitter::CodeEmitter;
pub use expression::{Expression, Literal};
pub use invoke::invoke_static;
pub use local_variable::LocalVariable;
pub use type_info::TypeInfo;

pub(crate) use expression::ExprKind;
