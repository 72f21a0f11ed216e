//! The unit of emission.
//!
//! An [`Expression`] knows its result type, whether it is a known literal and
//! how to emit itself. Builders check every type constraint when the
//! expression is constructed, so emission itself cannot fail.

use alloc::rc::Rc;
use alloc::sync::Arc;
use core::fmt;

use crate::Vec;
use crate::compiler::CodeEmitter;
use crate::errors::CodegenError;
use crate::types::{MethodRef, TypeDescriptor};
use crate::vm::ComparisonOp;

/// A literal value held by a constant expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    /// A UTF-16 code unit.
    Char(u16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(Arc<str>),
}

#[derive(Debug)]
pub(crate) enum ExprKind {
    Constant(Literal),
    Null,
    LoadLocal(u16),
    NumericConversion(Expression),
    Dup,
    Compare {
        op: ComparisonOp,
        left: Expression,
        right: Expression,
    },
    LogicalNot(Expression),
    InvokeStatic {
        method: MethodRef,
        args: Vec<Expression>,
    },
}

struct ExprNode {
    result_type: TypeDescriptor,
    is_constant: bool,
    kind: ExprKind,
}

/// A typed, composable piece of code that leaves exactly one value of its
/// result type on the operand stack.
///
/// Cloning is cheap and yields the same expression (see [`Expression::same`]).
/// Expressions are confined to the thread that builds them.
#[derive(Clone)]
pub struct Expression(Rc<ExprNode>);

impl Expression {
    pub(crate) fn new(result_type: TypeDescriptor, is_constant: bool, kind: ExprKind) -> Self {
        Expression(Rc::new(ExprNode {
            result_type,
            is_constant,
            kind,
        }))
    }

    pub fn result_type(&self) -> &TypeDescriptor {
        &self.0.result_type
    }

    /// True when the builders know this evaluates to a fixed literal. This is
    /// a hint only; nothing is folded.
    pub fn is_constant(&self) -> bool {
        self.0.is_constant
    }

    /// The literal of a constant builder's expression.
    pub fn literal(&self) -> Option<&Literal> {
        match &self.0.kind {
            ExprKind::Constant(literal) => Some(literal),
            _ => None,
        }
    }

    /// Fails with [`CodegenError::TypeMismatch`] unless the result type is
    /// `expected`.
    pub fn check_type(&self, expected: &TypeDescriptor) -> Result<(), CodegenError> {
        if self.result_type() == expected {
            Ok(())
        } else {
            Err(CodegenError::TypeMismatch {
                expected: expected.clone(),
                found: self.result_type().clone(),
            })
        }
    }

    /// Whether `a` and `b` are the same expression (not merely equal ones).
    pub fn same(a: &Expression, b: &Expression) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    /// Emits the expression.
    pub fn gen_code(&self, mg: &mut CodeEmitter) {
        let before = mg.stack_depth();
        self.emit(mg);
        if let (Some(before), Some(after)) = (before, mg.stack_depth()) {
            debug_assert_eq!(
                after,
                before + self.result_type().size(),
                "{:?} must push exactly one {}",
                self,
                self.result_type()
            );
        }
    }

    fn emit(&self, mg: &mut CodeEmitter) {
        match &self.0.kind {
            ExprKind::Constant(literal) => match literal {
                Literal::Bool(v) => mg.push_bool(*v),
                Literal::Char(v) => mg.push_char(*v),
                Literal::Int(v) => mg.push_int(*v),
                Literal::Long(v) => mg.push_long(*v),
                Literal::Float(v) => mg.push_float(*v),
                Literal::Double(v) => mg.push_double(*v),
                Literal::Str(v) => mg.push_str(v),
            },
            ExprKind::Null => mg.push_null(),
            ExprKind::LoadLocal(index) => mg.load_local(*index, self.result_type()),
            ExprKind::NumericConversion(source) => {
                source.gen_code(mg);
                mg.cast(source.result_type(), self.result_type());
            }
            ExprKind::Dup => {
                if self.result_type().size() == 2 {
                    mg.dup2();
                } else {
                    mg.dup();
                }
            }
            ExprKind::Compare { op, left, right } => {
                left.gen_code(mg);
                right.gen_code(mg);
                let if_true = mg.new_label();
                let end = mg.new_label();
                mg.if_cmp(left.result_type(), *op, if_true);
                mg.push_bool(false);
                mg.goto(end);
                mg.mark(if_true);
                mg.push_bool(true);
                mg.mark(end);
            }
            ExprKind::LogicalNot(operand) => {
                operand.gen_code(mg);
                // Any nonzero int is true, so this cannot be a plain bit flip.
                let if_true = mg.new_label();
                let end = mg.new_label();
                mg.if_zcmp(ComparisonOp::Ne, if_true);
                mg.push_bool(true);
                mg.goto(end);
                mg.mark(if_true);
                mg.push_bool(false);
                mg.mark(end);
            }
            ExprKind::InvokeStatic { method, args } => {
                for arg in args {
                    arg.gen_code(mg);
                }
                mg.invoke_static(method);
            }
        }
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expression")
            .field("type", &format_args!("{}", self.result_type()))
            .field("constant", &self.is_constant())
            .field("kind", &self.0.kind)
            .finish()
    }
}
