//! Method signatures and references.

use alloc::sync::Arc;
use core::fmt;

use crate::errors::CodegenError;
use crate::types::{MethodDescriptor, TypeDescriptor};

/// Name of instance initializers.
pub const INIT_NAME: &str = "<init>";

/// A method name plus its descriptor, independent of any owner class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Method {
    name: Arc<str>,
    descriptor: MethodDescriptor,
}

impl Method {
    pub fn new(name: &str, descriptor: MethodDescriptor) -> Self {
        Method {
            name: Arc::from(name),
            descriptor,
        }
    }

    /// Parses `name` and a descriptor string, e.g. `("valueOf", "(I)Ljava/lang/String;")`.
    pub fn parse(name: &str, descriptor: &str) -> Result<Self, CodegenError> {
        Ok(Method::new(name, MethodDescriptor::parse(descriptor)?))
    }

    /// `void <init>()`
    pub fn nullary_init() -> Self {
        Method::new(INIT_NAME, MethodDescriptor::nullary_void())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &MethodDescriptor {
        &self.descriptor
    }

    pub fn return_type(&self) -> &TypeDescriptor {
        self.descriptor.return_type()
    }

    pub fn is_constructor(&self) -> bool {
        &*self.name == INIT_NAME
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.descriptor)
    }
}

/// A method as named at a call site: owner class plus signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    owner: Arc<str>,
    method: Method,
}

impl MethodRef {
    /// `owner` is an internal class name (`"java/lang/Object"`).
    pub fn new(owner: &str, method: Method) -> Self {
        MethodRef {
            owner: Arc::from(owner),
            method,
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn method(&self) -> &Method {
        &self.method
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner, self.method)
    }
}
