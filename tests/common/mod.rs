#![allow(dead_code)]

use std::sync::Arc;

use jbcgen::vm::{Access, ClassDefinition, Completion};
use jbcgen::{
    ClassLoader, CodeEmitter, EmitOptions, Expression, Method, MethodDescriptor, TypeDescriptor,
    VM, Value,
};
use once_cell::sync::Lazy;

/// Descriptors used across the end-to-end tests.
pub static NUMERIC_TYPES: Lazy<Vec<TypeDescriptor>> = Lazy::new(|| {
    vec![
        TypeDescriptor::BYTE,
        TypeDescriptor::SHORT,
        TypeDescriptor::CHAR,
        TypeDescriptor::INT,
        TypeDescriptor::LONG,
        TypeDescriptor::FLOAT,
        TypeDescriptor::DOUBLE,
    ]
});

pub static NON_NUMERIC_TYPES: Lazy<Vec<TypeDescriptor>> = Lazy::new(|| {
    vec![
        TypeDescriptor::BOOLEAN,
        TypeDescriptor::VOID,
        TypeDescriptor::object_type(),
        TypeDescriptor::string_type(),
        TypeDescriptor::parse("[I").unwrap(),
        TypeDescriptor::parse("[[Ljava/lang/String;").unwrap(),
    ]
});

fn emitter(result_type: &TypeDescriptor) -> CodeEmitter {
    let method = Method::new(
        "eval",
        MethodDescriptor::new(vec![], result_type.clone()).unwrap(),
    );
    CodeEmitter::new(Access::PUBLIC | Access::STATIC, method, EmitOptions::default())
}

/// Compiles `expr` as `static T eval()` of a fresh class and runs it.
pub fn evaluate(expr: &Expression) -> Value {
    let mut mg = emitter(expr.result_type());
    expr.gen_code(&mut mg);
    mg.return_value();
    let definition = mg.end_method().expect("generated code verifies");
    let method = definition.method.clone();

    let mut loader = ClassLoader::new();
    loader
        .define_class(ClassDefinition {
            access: Access::PUBLIC,
            name: Arc::from("Eval"),
            super_name: Some(Arc::from("java/lang/Object")),
            methods: vec![definition],
        })
        .expect("class links");
    VM::new(&loader)
        .invoke_static("Eval", &method, &[])
        .expect("evaluation succeeds")
        .expect("a value is returned")
}

/// Runs `emit` against an empty static method body and returns the operand
/// stack left when execution falls off the end.
pub fn run_fragment(emit: impl FnOnce(&mut CodeEmitter)) -> Vec<Value> {
    let mut mg = emitter(&TypeDescriptor::VOID);
    emit(&mut mg);
    let code = mg.into_code().expect("fragment resolves");
    let loader = ClassLoader::new();
    match VM::new(&loader).execute(&code, vec![]).expect("fragment runs") {
        Completion::FellThrough(stack) => stack,
        Completion::Returned(value) => panic!("fragment returned {:?}", value),
    }
}
