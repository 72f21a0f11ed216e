mod class;
mod code;
mod instruction_set;
mod loader;
mod runtime;
mod stack;
mod value;
mod verifier;

#[cfg(test)]
mod verifier_test;

pub use class::{Access, ClassDefinition, LoadedClass, MethodBody, MethodDefinition, NativeMethod};
pub use code::{Code, Constant, LabelInfo, LineNumberEntry, LocalVariableEntry};
pub use instruction_set::{ComparisonOp, Instruction, Label};
pub use loader::{ClassLoader, LinkError};
pub use runtime::{Completion, ExecutionError, VM};
pub use value::{Instance, Object, Value};
pub use verifier::{MethodContext, VerificationType, VerifyError, verify};

pub(crate) use code::ConstantKey;
pub(crate) use stack::Stack;
