//! Helpers for running emitted code in tests.

use alloc::sync::Arc;

use crate::compiler::{CodeEmitter, Expression};
use crate::options::EmitOptions;
use crate::types::{Method, MethodDescriptor, OBJECT_INTERNAL_NAME, TypeDescriptor};
use crate::vm::{
    Access, ClassDefinition, ClassLoader, Code, Completion, MethodDefinition, VM, Value,
};
use crate::{Vec, vec};

/// `static T eval()`.
pub(crate) fn eval_method(result_type: &TypeDescriptor) -> Method {
    Method::new(
        "eval",
        MethodDescriptor::new(Vec::new(), result_type.clone()).unwrap(),
    )
}

/// Emits `expr` into a fresh static method body and returns it.
pub(crate) fn method_returning(expr: &Expression) -> MethodDefinition {
    let method = eval_method(expr.result_type());
    let mut mg = CodeEmitter::new(
        Access::PUBLIC | Access::STATIC,
        method,
        EmitOptions::default(),
    );
    expr.gen_code(&mut mg);
    mg.return_value();
    mg.end_method().unwrap()
}

/// Emits, verifies, loads and runs `expr`, returning its value.
pub(crate) fn evaluate(expr: &Expression) -> Value {
    let definition = method_returning(expr);
    let method = definition.method.clone();

    let mut loader = ClassLoader::new();
    loader
        .define_class(ClassDefinition {
            access: Access::PUBLIC,
            name: Arc::from("Eval"),
            super_name: Some(Arc::from(OBJECT_INTERNAL_NAME)),
            methods: vec![definition],
        })
        .unwrap();

    VM::new(&loader)
        .invoke_static("Eval", &method, &[])
        .unwrap()
        .expect("expression produced no value")
}

/// Runs unverified code and returns the operand stack it leaves behind.
pub(crate) fn final_stack(code: &Code) -> Vec<Value> {
    let loader = ClassLoader::new();
    match VM::new(&loader).execute(code, vec![]).unwrap() {
        Completion::FellThrough(stack) => stack,
        Completion::Returned(value) => panic!("code returned {:?}", value),
    }
}
