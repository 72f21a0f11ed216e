use alloc::sync::Arc;

use pretty_assertions::assert_eq;

use crate::compiler::test_support::eval_method;
use crate::compiler::*;
use crate::errors::CodegenError;
use crate::options::EmitOptions;
use crate::types::{Method, MethodRef, TypeDescriptor};
use crate::vm::{Access, ClassDefinition, ClassLoader, VM, Value};
use crate::vec;

/// `static long pick(int, long)` returning its second argument.
fn pick() -> MethodRef {
    MethodRef::new("Util", Method::parse("pick", "(IJ)J").unwrap())
}

fn util_class() -> ClassDefinition {
    let mut cw = ClassWriter::new(
        Access::PUBLIC,
        TypeInfo::create("Util").unwrap(),
        TypeInfo::object(),
        EmitOptions::default(),
    );
    let mut mg = cw.begin_method(Access::PUBLIC | Access::STATIC, pick().method().clone());
    mg.load_local(1, &TypeDescriptor::LONG);
    mg.return_value();
    cw.add_method(mg).unwrap();
    cw.finish()
}

#[test]
fn test_static_call_expression() {
    let call = invoke_static(&pick(), &[constant_int(1), constant_long(-9)]).unwrap();
    assert_eq!(call.result_type(), &TypeDescriptor::LONG);
    assert!(!call.is_constant());

    let mut cw = ClassWriter::new(
        Access::PUBLIC,
        TypeInfo::create("Caller").unwrap(),
        TypeInfo::object(),
        EmitOptions::default(),
    );
    let method = eval_method(call.result_type());
    let mut mg = cw.begin_method(Access::PUBLIC | Access::STATIC, method.clone());
    call.gen_code(&mut mg);
    mg.return_value();
    cw.add_method(mg).unwrap();

    let mut loader = ClassLoader::new();
    loader.define_class(util_class()).unwrap();
    loader.define_class(cw.finish()).unwrap();

    let result = VM::new(&loader).invoke_static("Caller", &method, &[]).unwrap();
    assert_eq!(result, Some(Value::Long(-9)));
}

#[test]
fn test_call_to_undefined_method_fails_to_link() {
    let call = invoke_static(&pick(), &[constant_int(1), constant_long(2)]).unwrap();
    let method = eval_method(call.result_type());
    let mut mg = CodeEmitter::new(Access::STATIC, method.clone(), EmitOptions::default());
    call.gen_code(&mut mg);
    mg.return_value();

    let mut loader = ClassLoader::new();
    let err = loader
        .define_class(ClassDefinition {
            access: Access::PUBLIC,
            name: Arc::from("Caller"),
            super_name: Some(Arc::from("java/lang/Object")),
            methods: vec![mg.end_method().unwrap()],
        })
        .unwrap_err();
    assert!(err.to_string().contains("Util"), "{}", err);
}

#[test]
fn test_argument_checks() {
    assert!(matches!(
        invoke_static(&pick(), &[constant_int(1)]),
        Err(CodegenError::InvalidArgument(_))
    ));
    assert_eq!(
        invoke_static(&pick(), &[constant_int(1), constant_int(2)]).unwrap_err(),
        CodegenError::TypeMismatch {
            expected: TypeDescriptor::LONG,
            found: TypeDescriptor::INT,
        }
    );

    let run = MethodRef::new("Util", Method::parse("run", "()V").unwrap());
    assert_eq!(
        invoke_static(&run, &[]).unwrap_err(),
        CodegenError::InvalidArgument("Util.run()V does not produce a value".into())
    );
}
