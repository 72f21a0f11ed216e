//! Class definition, linking and type resolution.
//!
//! A [`ClassLoader`] is the defining context for object types: descriptors
//! are resolved against the classes it has defined, never against a loader
//! supplied by the caller. It starts out with the bootstrap classes
//! `java/lang/Object` and `java/lang/String`.

use alloc::rc::Rc;
use alloc::sync::Arc;

use hashbrown::HashMap;
use thiserror::Error;
use tracing::debug;

use crate::errors::CodegenError;
use crate::options::LoaderOptions;
use crate::types::{
    Method, MethodRef, OBJECT_INTERNAL_NAME, RuntimeType, STRING_INTERNAL_NAME, TypeDescriptor,
    resolve_descriptor,
};
use crate::vm::verifier::{self, MethodContext, VerifyError};
use crate::vm::{
    Access, ClassDefinition, Constant, ExecutionError, Instruction, LoadedClass, MethodBody,
    MethodDefinition, Value,
};
use crate::{String, ToString, Vec};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinkError {
    #[error("class {0} is already defined")]
    DuplicateClass(String),

    #[error("{class}: no class named {name}")]
    NoSuchClass { class: String, name: String },

    #[error("{0}: only the root class may omit a superclass")]
    MissingSuperclass(String),

    #[error("{class}: cannot extend final class {superclass}")]
    FinalSuperclass { class: String, superclass: String },

    #[error("{class}: method {method} is declared twice")]
    DuplicateMethod { class: String, method: String },

    #[error("{class}: no such method {method}")]
    NoSuchMethod { class: String, method: String },

    #[error("{class}: {method} cannot be called with {instruction}")]
    IncompatibleCall {
        class: String,
        method: String,
        instruction: &'static str,
    },

    #[error("{class}.{method}: {source}")]
    Verify {
        class: String,
        method: String,
        #[source]
        source: VerifyError,
    },
}

pub struct ClassLoader {
    options: LoaderOptions,
    classes: HashMap<Arc<str>, Rc<LoadedClass>>,
}

fn object_init(_receiver: &[Value]) -> Result<Option<Value>, ExecutionError> {
    Ok(None)
}

impl Default for ClassLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassLoader {
    pub fn new() -> Self {
        Self::with_options(LoaderOptions::default())
    }

    pub fn with_options(options: LoaderOptions) -> Self {
        let object = Rc::new(LoadedClass::new(
            Arc::from(OBJECT_INTERNAL_NAME),
            Access::PUBLIC,
            None,
            Vec::from([MethodDefinition {
                access: Access::PUBLIC,
                method: Method::nullary_init(),
                body: MethodBody::Native(object_init),
            }]),
        ));
        let string = Rc::new(LoadedClass::new(
            Arc::from(STRING_INTERNAL_NAME),
            Access::PUBLIC | Access::FINAL,
            Some(object.clone()),
            Vec::new(),
        ));

        let mut classes = HashMap::new();
        classes.insert(Arc::from(OBJECT_INTERNAL_NAME), object);
        classes.insert(Arc::from(STRING_INTERNAL_NAME), string);
        ClassLoader { options, classes }
    }

    pub fn find_class(&self, name: &str) -> Option<&Rc<LoadedClass>> {
        self.classes.get(name)
    }

    /// Resolves a descriptor to a runtime type in this loader's context.
    ///
    /// Arrays resolve their element recursively; object types must name a
    /// class defined here (`TypeResolution` otherwise); method shapes are
    /// never value types (`InvalidType`).
    pub fn resolve_type(&self, descriptor: &TypeDescriptor) -> Result<RuntimeType, CodegenError> {
        resolve_descriptor(descriptor, &|name: &str| self.find_class(name).cloned())
    }

    /// Verifies, links and defines a class.
    pub fn define_class(
        &mut self,
        definition: ClassDefinition,
    ) -> Result<Rc<LoadedClass>, LinkError> {
        let class_name = definition.name.to_string();
        debug!(class = %class_name, "defining class");

        if self.classes.contains_key(&*definition.name) {
            return Err(LinkError::DuplicateClass(class_name));
        }

        let super_class = match &definition.super_name {
            None => return Err(LinkError::MissingSuperclass(class_name)),
            Some(super_name) => {
                let super_class =
                    self.find_class(super_name)
                        .cloned()
                        .ok_or_else(|| LinkError::NoSuchClass {
                            class: class_name.clone(),
                            name: super_name.to_string(),
                        })?;
                if super_class.access().contains(Access::FINAL) {
                    return Err(LinkError::FinalSuperclass {
                        class: class_name,
                        superclass: super_name.to_string(),
                    });
                }
                super_class
            }
        };

        for (i, def) in definition.methods.iter().enumerate() {
            if definition.methods[..i].iter().any(|m| m.method == def.method) {
                return Err(LinkError::DuplicateMethod {
                    class: class_name,
                    method: def.method.to_string(),
                });
            }
        }

        for def in &definition.methods {
            let Some(code) = def.code() else { continue };
            if self.options.verify {
                let context = MethodContext {
                    access: def.access,
                    descriptor: def.method.descriptor(),
                };
                verifier::verify(code, context).map_err(|source| LinkError::Verify {
                    class: class_name.clone(),
                    method: def.method.to_string(),
                    source,
                })?;
            }
            self.link_code(&definition, code.instructions.as_slice(), &code.constants)?;
        }

        let class = Rc::new(LoadedClass::new(
            definition.name.clone(),
            definition.access,
            Some(super_class),
            definition.methods,
        ));
        self.classes.insert(definition.name, class.clone());
        debug!(class = %class_name, "class defined");
        Ok(class)
    }

    /// Checks that every class and method a body refers to exists.
    fn link_code(
        &self,
        definition: &ClassDefinition,
        instructions: &[Instruction],
        constants: &[Constant],
    ) -> Result<(), LinkError> {
        let class_name = || definition.name.to_string();

        for instruction in instructions {
            let (index, kind) = match *instruction {
                Instruction::New(index) => (index, "new"),
                Instruction::InvokeSpecial(index) => (index, "invokespecial"),
                Instruction::InvokeStatic(index) => (index, "invokestatic"),
                _ => continue,
            };
            match constants.get(index as usize) {
                Some(Constant::Class(name)) => {
                    if **name != *definition.name && self.find_class(name).is_none() {
                        return Err(LinkError::NoSuchClass {
                            class: class_name(),
                            name: name.to_string(),
                        });
                    }
                }
                Some(Constant::Method(method_ref)) => {
                    let is_static = self.lookup_method(definition, method_ref, kind)?;
                    if is_static != (kind == "invokestatic") {
                        return Err(LinkError::IncompatibleCall {
                            class: class_name(),
                            method: method_ref.to_string(),
                            instruction: kind,
                        });
                    }
                }
                // Malformed pool references are reported by the verifier.
                _ => {}
            }
        }
        Ok(())
    }

    /// Finds the target of a call and returns whether it is static.
    ///
    /// Initializers must be declared by the named owner itself; static
    /// methods are also searched for in superclasses.
    fn lookup_method(
        &self,
        definition: &ClassDefinition,
        method_ref: &MethodRef,
        kind: &'static str,
    ) -> Result<bool, LinkError> {
        let not_found = || LinkError::NoSuchMethod {
            class: definition.name.to_string(),
            method: method_ref.to_string(),
        };
        let method = method_ref.method();
        let search_supers = kind == "invokestatic";

        if method_ref.owner() == &*definition.name {
            if let Some(def) = definition.find_method(method) {
                return Ok(def.access.is_static());
            }
            if !search_supers {
                return Err(not_found());
            }
            let super_name = definition.super_name.as_deref().ok_or_else(not_found)?;
            return self.lookup_loaded(super_name, method, search_supers).ok_or_else(not_found);
        }
        self.lookup_loaded(method_ref.owner(), method, search_supers)
            .ok_or_else(not_found)
    }

    fn lookup_loaded(&self, owner: &str, method: &Method, search_supers: bool) -> Option<bool> {
        let mut class = self.find_class(owner);
        while let Some(current) = class {
            if let Some(def) = current.declared_method(method) {
                return Some(def.access.is_static());
            }
            if !search_supers {
                return None;
            }
            class = current.super_class();
        }
        None
    }
}
