//! Typed expression builders for a JVM-style stack machine.
//!
//! - [`types`]: type descriptors, method signatures and runtime resolution
//! - [`compiler`]: expressions, the code emitter and class assembly
//! - [`vm`]: instruction set, verifier, class loader and interpreter

extern crate alloc;

// Re-export for convenience so other modules don't need alloc:: prefix
#[allow(unused_imports)]
pub(crate) use alloc::{boxed::Box, format, string::String, string::ToString, vec, vec::Vec};

pub mod compiler;
pub mod errors;
pub mod options;
pub mod types;
pub mod vm;
