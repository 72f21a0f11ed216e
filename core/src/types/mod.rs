//! The type descriptor model.

mod descriptor;
mod method;
mod primitives;
mod resolve;


pub use descriptor::{
    MAX_ARRAY_DIMENSIONS, MethodDescriptor, OBJECT_INTERNAL_NAME, STRING_INTERNAL_NAME,
    TypeDescriptor,
};
pub use method::{INIT_NAME, Method, MethodRef};
pub use primitives::PrimitiveKind;
pub use resolve::RuntimeType;

pub(crate) use resolve::resolve_descriptor;
