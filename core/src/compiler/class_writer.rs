use alloc::sync::Arc;

use crate::compiler::{CodeEmitter, TypeInfo};
use crate::errors::CodegenError;
use crate::options::EmitOptions;
use crate::types::Method;
use crate::vm::{Access, ClassDefinition, MethodDefinition};
use crate::{Vec, format};

/// A class under construction.
///
/// Methods are emitted with emitters from [`ClassWriter::begin_method`] and
/// handed back through [`ClassWriter::add_method`].
pub struct ClassWriter {
    access: Access,
    this_type: TypeInfo,
    super_type: TypeInfo,
    options: EmitOptions,
    methods: Vec<MethodDefinition>,
}

impl ClassWriter {
    pub fn new(
        access: Access,
        this_type: TypeInfo,
        super_type: TypeInfo,
        options: EmitOptions,
    ) -> Self {
        ClassWriter {
            access,
            this_type,
            super_type,
            options,
            methods: Vec::new(),
        }
    }

    pub fn this_type(&self) -> &TypeInfo {
        &self.this_type
    }

    pub fn super_type(&self) -> &TypeInfo {
        &self.super_type
    }

    pub fn begin_method(&self, access: Access, method: Method) -> CodeEmitter {
        CodeEmitter::new(access, method, self.options)
    }

    /// Finishes `mg`'s method and adds it to the class.
    pub fn add_method(&mut self, mg: CodeEmitter) -> Result<(), CodegenError> {
        if self.methods.iter().any(|def| &def.method == mg.method()) {
            return Err(CodegenError::InvalidArgument(format!(
                "method {} is already defined in {}",
                mg.method(),
                self.this_type.class_name()
            )));
        }
        let definition = mg.end_method()?;
        self.methods.push(definition);
        Ok(())
    }

    pub fn finish(self) -> ClassDefinition {
        ClassDefinition {
            access: self.access,
            name: Arc::from(self.this_type.internal_name()),
            super_name: Some(Arc::from(self.super_type.internal_name())),
            methods: self.methods,
        }
    }
}
