use alloc::sync::Arc;

use crate::compiler::{CodeEmitter, ExprKind, Expression, TypeInfo};
use crate::types::TypeDescriptor;
use crate::vm::Label;

/// A named local slot, live between two labels.
#[derive(Debug, Clone)]
pub struct LocalVariable {
    name: Arc<str>,
    ty: TypeDescriptor,
    index: u16,
    start: Label,
    end: Label,
}

impl LocalVariable {
    pub fn new(name: &str, ty: TypeDescriptor, index: u16, start: Label, end: Label) -> Self {
        LocalVariable {
            name: Arc::from(name),
            ty,
            index,
            start,
            end,
        }
    }

    /// The implicit receiver of an instance method, in slot 0.
    pub fn this_var(owner: &TypeInfo, start: Label, end: Label) -> Self {
        Self::new("this", owner.type_descriptor().clone(), 0, start, end)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local_type(&self) -> &TypeDescriptor {
        &self.ty
    }

    pub fn index(&self) -> u16 {
        self.index
    }

    /// An expression loading the variable.
    pub fn expr(&self) -> Expression {
        Expression::new(self.ty.clone(), false, ExprKind::LoadLocal(self.index))
    }

    pub fn gen_code(&self, mg: &mut CodeEmitter) {
        self.expr().gen_code(mg);
    }

    /// Writes the variable's local-variable table entry.
    pub fn table_entry(&self, mg: &mut CodeEmitter) {
        mg.visit_local_variable(&self.name, &self.ty, self.start, self.end, self.index);
    }
}
