use alloc::sync::Arc;

use crate::errors::CodegenError;
use crate::format;
use crate::types::{OBJECT_INTERNAL_NAME, TypeDescriptor};

/// Identity of a class type: its source name, internal name and descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    class_name: Arc<str>,
    internal_name: Arc<str>,
    descriptor: TypeDescriptor,
}

impl TypeInfo {
    /// Builds the identity of the class `class_name` (e.g.
    /// `"com.example.Foo"`). Primitive, array and `void` names are rejected.
    pub fn create(class_name: &str) -> Result<TypeInfo, CodegenError> {
        let descriptor = TypeDescriptor::from_class_name(class_name)?;
        let TypeDescriptor::Object(internal_name) = &descriptor else {
            return Err(CodegenError::InvalidArgument(format!(
                "{} is not a class type",
                class_name
            )));
        };
        Ok(TypeInfo {
            class_name: Arc::from(descriptor.class_name()),
            internal_name: internal_name.clone(),
            descriptor,
        })
    }

    /// `java.lang.Object`.
    pub fn object() -> TypeInfo {
        TypeInfo {
            class_name: Arc::from("java.lang.Object"),
            internal_name: Arc::from(OBJECT_INTERNAL_NAME),
            descriptor: TypeDescriptor::object_type(),
        }
    }

    /// Dotted name, e.g. `"com.example.Foo"`.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Slash-separated name, e.g. `"com/example/Foo"`.
    pub fn internal_name(&self) -> &str {
        &self.internal_name
    }

    pub fn type_descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }
}
