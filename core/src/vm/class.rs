//! Class and method definitions as handed to the loader.

use alloc::rc::Rc;
use alloc::sync::Arc;
use core::fmt;
use core::ops::BitOr;

use hashbrown::HashMap;

use crate::types::Method;
use crate::vm::{Code, ExecutionError, Value};
use crate::Vec;

/// Access flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Access(u16);

impl Access {
    pub const PUBLIC: Access = Access(0x0001);
    pub const PRIVATE: Access = Access(0x0002);
    pub const STATIC: Access = Access(0x0008);
    pub const FINAL: Access = Access(0x0010);
    pub const ABSTRACT: Access = Access(0x0400);

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn contains(self, other: Access) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_static(self) -> bool {
        self.contains(Access::STATIC)
    }
}

impl BitOr for Access {
    type Output = Access;

    fn bitor(self, rhs: Access) -> Access {
        Access(self.0 | rhs.0)
    }
}

/// Host-implemented method body. Receives the receiver (if any) followed by
/// the arguments.
pub type NativeMethod = fn(&[Value]) -> Result<Option<Value>, ExecutionError>;

pub enum MethodBody {
    Code(Code),
    Native(NativeMethod),
}

pub struct MethodDefinition {
    pub access: Access,
    pub method: Method,
    pub body: MethodBody,
}

impl MethodDefinition {
    pub fn code(&self) -> Option<&Code> {
        match &self.body {
            MethodBody::Code(code) => Some(code),
            MethodBody::Native(_) => None,
        }
    }
}

impl fmt::Debug for MethodDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("MethodDefinition");
        s.field("access", &self.access).field("method", &self.method);
        match &self.body {
            MethodBody::Code(code) => s.field("code", code),
            MethodBody::Native(_) => s.field("code", &"<native>"),
        };
        s.finish()
    }
}

/// A finished class, ready to be defined by a [`ClassLoader`](crate::vm::ClassLoader).
#[derive(Debug)]
pub struct ClassDefinition {
    pub access: Access,
    /// Internal name, e.g. `"com/example/Foo"`.
    pub name: Arc<str>,
    /// Internal name of the superclass; only the root class has none.
    pub super_name: Option<Arc<str>>,
    pub methods: Vec<MethodDefinition>,
}

impl ClassDefinition {
    pub fn find_method(&self, method: &Method) -> Option<&MethodDefinition> {
        self.methods.iter().find(|def| &def.method == method)
    }
}

/// A class after definition and linking.
pub struct LoadedClass {
    name: Arc<str>,
    access: Access,
    super_class: Option<Rc<LoadedClass>>,
    methods: HashMap<Method, Rc<MethodDefinition>>,
}

impl LoadedClass {
    pub(crate) fn new(
        name: Arc<str>,
        access: Access,
        super_class: Option<Rc<LoadedClass>>,
        methods: Vec<MethodDefinition>,
    ) -> Self {
        let methods = methods
            .into_iter()
            .map(|def| (def.method.clone(), Rc::new(def)))
            .collect();
        LoadedClass {
            name,
            access,
            super_class,
            methods,
        }
    }

    /// Internal name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn super_class(&self) -> Option<&Rc<LoadedClass>> {
        self.super_class.as_ref()
    }

    /// A method declared by this class itself (initializers are never
    /// inherited).
    pub fn declared_method(&self, method: &Method) -> Option<&Rc<MethodDefinition>> {
        self.methods.get(method)
    }

    pub fn is_subclass_of(&self, name: &str) -> bool {
        let mut current = Some(self);
        while let Some(class) = current {
            if class.name() == name {
                return true;
            }
            current = class.super_class().map(|c| &**c);
        }
        false
    }
}

impl fmt::Debug for LoadedClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedClass")
            .field("name", &self.name)
            .field("super", &self.super_class.as_ref().map(|c| c.name()))
            .field("methods", &self.methods.len())
            .finish()
    }
}
