//! jbcgen - typed expression builders for a JVM-style stack machine
//!
//! # Overview
//!
//! A compiler backend builds [`Expression`]s for the values it needs on the
//! operand stack, then emits them into a [`CodeEmitter`], one emitter per
//! method body. Every type constraint is checked while an expression is
//! built, so emission itself cannot fail.
//!
//! The crate carries its own small machine so generated code can be checked
//! end to end: a verifier, a class loader that links call sites, and an
//! interpreter.
//!
//! # Quick Start
//!
//! ```
//! use jbcgen::{compare, constant_int, ComparisonOp};
//!
//! let lt = compare(ComparisonOp::Lt, &constant_int(3), &constant_int(5)).unwrap();
//! assert!(lt.is_constant());
//! assert_eq!(lt.result_type(), &jbcgen::TypeDescriptor::BOOLEAN);
//! ```
//!
//! # Classes
//!
//! ```
//! use jbcgen::{ClassLoader, ClassWriter, EmitOptions, TypeInfo, VM};
//! use jbcgen::vm::Access;
//!
//! let mut cw = ClassWriter::new(
//!     Access::PUBLIC,
//!     TypeInfo::create("com.example.Foo").unwrap(),
//!     TypeInfo::object(),
//!     EmitOptions::default(),
//! );
//! jbcgen::define_default_constructor(&mut cw).unwrap();
//!
//! let mut loader = ClassLoader::new();
//! loader.define_class(cw.finish()).unwrap();
//! let instance = VM::new(&loader).new_instance("com/example/Foo").unwrap();
//! assert!(instance.as_instance().is_some());
//! ```

// Re-export public API from jbcgen_core
pub use jbcgen_core::compiler::{
    ClassWriter, CodeEmitter, Expression, Literal, LocalVariable, TypeInfo, compare,
    constant_bool, constant_char, constant_double, constant_float, constant_int, constant_long,
    constant_str, define_default_constructor, dup_expr, invoke_static, load_default,
    logical_not, null_constant, numeric_conversion, try_constant_str,
};

// Re-export commonly used types
pub use jbcgen_core::types::{
    self, Method, MethodDescriptor, MethodRef, PrimitiveKind, RuntimeType, TypeDescriptor,
};
pub use jbcgen_core::vm::{self, ClassLoader, ComparisonOp, Label, VM, Value};

// Re-export errors and options
pub use jbcgen_core::errors::CodegenError;
pub use jbcgen_core::options::{self, EmitOptions, ExecutionOptions, LoaderOptions};
pub use jbcgen_core::vm::{ExecutionError, LinkError, VerifyError};
