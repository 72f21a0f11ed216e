//! Resolution of descriptors to runtime type handles.

use alloc::rc::Rc;
use core::fmt;

use crate::errors::CodegenError;
use crate::types::{PrimitiveKind, TypeDescriptor};
use crate::vm::LoadedClass;
use crate::{String, ToString, format};

/// A type as known to a running machine.
///
/// Class handles compare by identity: two classes with the same name defined
/// by different loaders are different runtime types.
#[derive(Clone)]
pub enum RuntimeType {
    Primitive(PrimitiveKind),
    Void,
    Class(Rc<LoadedClass>),
    Array(Rc<RuntimeType>),
}

impl RuntimeType {
    pub fn element_type(&self) -> Option<&RuntimeType> {
        match self {
            RuntimeType::Array(element) => Some(element),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, RuntimeType::Array(_))
    }

    pub fn as_class(&self) -> Option<&Rc<LoadedClass>> {
        match self {
            RuntimeType::Class(class) => Some(class),
            _ => None,
        }
    }

    /// Runtime name, in the style of `Class.getName()`: `"int"`,
    /// `"java.lang.String"`, `"[[I"`, `"[Ljava.lang.String;"`.
    pub fn name(&self) -> String {
        match self {
            RuntimeType::Primitive(kind) => kind.name().to_string(),
            RuntimeType::Void => "void".to_string(),
            RuntimeType::Class(class) => class.name().replace('/', "."),
            RuntimeType::Array(_) => self.descriptor().to_string().replace('/', "."),
        }
    }

    /// The descriptor this runtime type was resolved from.
    pub fn descriptor(&self) -> TypeDescriptor {
        match self {
            RuntimeType::Primitive(kind) => TypeDescriptor::Primitive(*kind),
            RuntimeType::Void => TypeDescriptor::Void,
            RuntimeType::Class(class) => TypeDescriptor::object(class.name()),
            RuntimeType::Array(element) => {
                TypeDescriptor::Array(alloc::sync::Arc::new(element.descriptor()))
            }
        }
    }
}

impl PartialEq for RuntimeType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RuntimeType::Primitive(a), RuntimeType::Primitive(b)) => a == b,
            (RuntimeType::Void, RuntimeType::Void) => true,
            (RuntimeType::Class(a), RuntimeType::Class(b)) => Rc::ptr_eq(a, b),
            (RuntimeType::Array(a), RuntimeType::Array(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for RuntimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RuntimeType({})", self.name())
    }
}

/// Resolves a descriptor to a runtime type using `find_class` as the defining
/// context for object types.
pub(crate) fn resolve_descriptor<F>(
    descriptor: &TypeDescriptor,
    find_class: &F,
) -> Result<RuntimeType, CodegenError>
where
    F: Fn(&str) -> Option<Rc<LoadedClass>>,
{
    match descriptor {
        TypeDescriptor::Array(element) => {
            if !element.is_value_type() {
                return Err(CodegenError::InvalidType(format!(
                    "{} cannot be an array element type",
                    element
                )));
            }
            let element = resolve_descriptor(element, find_class)?;
            Ok(RuntimeType::Array(Rc::new(element)))
        }
        TypeDescriptor::Object(name) => find_class(name)
            .map(RuntimeType::Class)
            .ok_or_else(|| CodegenError::TypeResolution(descriptor.to_string())),
        TypeDescriptor::Method(_) => Err(CodegenError::InvalidType(format!(
            "Method types are not supported: {}",
            descriptor
        ))),
        TypeDescriptor::Void => Ok(RuntimeType::Void),
        TypeDescriptor::Primitive(kind) => Ok(RuntimeType::Primitive(*kind)),
    }
}
