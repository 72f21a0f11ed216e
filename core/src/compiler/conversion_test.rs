//! Tests for numeric conversion, duplication and default values.

use alloc::sync::Arc;

use pretty_assertions::assert_eq;

use crate::compiler::test_support::{evaluate, final_stack};
use crate::compiler::*;
use crate::errors::CodegenError;
use crate::options::EmitOptions;
use crate::types::{Method, TypeDescriptor};
use crate::vm::{Access, Code, Instruction, Value};
use crate::vec;

fn static_emitter() -> CodeEmitter {
    CodeEmitter::new(
        Access::STATIC,
        Method::parse("f", "()V").unwrap(),
        EmitOptions::default(),
    )
}

fn emit(expr: &Expression) -> Code {
    let mut mg = static_emitter();
    expr.gen_code(&mut mg);
    mg.into_code().unwrap()
}

#[test]
fn test_identity_conversion_returns_same_expression() {
    let five = constant_int(5);
    let converted = numeric_conversion(&five, &TypeDescriptor::INT).unwrap();
    assert!(Expression::same(&five, &converted));

    let text = constant_str("x");
    let converted = numeric_conversion(&text, &TypeDescriptor::string_type()).unwrap();
    assert!(Expression::same(&text, &converted));
}

#[test]
fn test_conversion_requires_numeric_types() {
    let object = TypeDescriptor::object_type();
    let int_array = TypeDescriptor::parse("[I").unwrap();
    let sources = [
        constant_bool(true),
        null_constant(&object).unwrap(),
        null_constant(&int_array).unwrap(),
    ];
    let targets = [
        TypeDescriptor::BOOLEAN,
        object.clone(),
        int_array.clone(),
        TypeDescriptor::VOID,
    ];

    for source in &sources {
        for target in [TypeDescriptor::INT, TypeDescriptor::DOUBLE] {
            assert!(matches!(
                numeric_conversion(source, &target),
                Err(CodegenError::InvalidArgument(_))
            ));
        }
    }
    for target in &targets {
        assert!(matches!(
            numeric_conversion(&constant_int(1), target),
            Err(CodegenError::InvalidArgument(_))
        ));
    }

    assert_eq!(
        numeric_conversion(&constant_bool(true), &TypeDescriptor::INT).unwrap_err(),
        CodegenError::InvalidArgument("Cannot convert from boolean to int".into())
    );
}

#[test]
fn test_conversion_keeps_constant_flag_without_folding() {
    let converted = numeric_conversion(&constant_int(3), &TypeDescriptor::LONG).unwrap();
    assert_eq!(converted.result_type(), &TypeDescriptor::LONG);
    assert!(converted.is_constant());
    assert_eq!(converted.literal(), None);
    assert_eq!(
        emit(&converted).instructions,
        vec![Instruction::IConst(3), Instruction::I2L]
    );
}

#[test]
fn test_narrowing_goes_through_int() {
    let converted = numeric_conversion(&constant_double(300.7), &TypeDescriptor::BYTE).unwrap();
    assert_eq!(
        emit(&converted).instructions,
        vec![Instruction::Ldc2W(0), Instruction::D2I, Instruction::I2B]
    );
    assert_eq!(evaluate(&converted), Value::Int(44));

    let converted = numeric_conversion(&constant_long(-1), &TypeDescriptor::CHAR).unwrap();
    assert_eq!(evaluate(&converted), Value::Int(0xffff));
}

#[test]
fn test_conversion_semantics() {
    let to = |expr: Expression, ty: TypeDescriptor| evaluate(&numeric_conversion(&expr, &ty).unwrap());

    assert_eq!(to(constant_int(200), TypeDescriptor::BYTE), Value::Int(-56));
    assert_eq!(to(constant_int(70000), TypeDescriptor::SHORT), Value::Int(4464));
    assert_eq!(to(constant_int(-2), TypeDescriptor::LONG), Value::Long(-2));
    assert_eq!(to(constant_int(7), TypeDescriptor::DOUBLE), Value::Double(7.0));
    assert_eq!(to(constant_char(0xffff), TypeDescriptor::SHORT), Value::Int(-1));
    assert_eq!(to(constant_long(1 << 40), TypeDescriptor::INT), Value::Int(0));
    assert_eq!(to(constant_double(-3.9), TypeDescriptor::INT), Value::Int(-3));
    assert_eq!(to(constant_double(1e20), TypeDescriptor::LONG), Value::Long(i64::MAX));
    assert_eq!(to(constant_double(f64::NAN), TypeDescriptor::INT), Value::Int(0));
    assert_eq!(to(constant_float(0.1), TypeDescriptor::DOUBLE), Value::Double(0.1f32 as f64));
    assert_eq!(to(constant_double(0.1), TypeDescriptor::FLOAT), Value::Float(0.1));
}

#[test]
fn test_dup_single_and_double_slot() {
    let mut mg = static_emitter();
    mg.push_int(7);
    dup_expr(&TypeDescriptor::INT).gen_code(&mut mg);
    assert_eq!(mg.stack_depth(), Some(2));
    assert_eq!(
        final_stack(&mg.into_code().unwrap()),
        vec![Value::Int(7), Value::Int(7)]
    );

    let mut mg = static_emitter();
    mg.push_long(9);
    dup_expr(&TypeDescriptor::LONG).gen_code(&mut mg);
    assert_eq!(mg.stack_depth(), Some(4));
    let code = mg.into_code().unwrap();
    assert_eq!(code.instructions[1], Instruction::Dup2);
    assert_eq!(final_stack(&code), vec![Value::Long(9), Value::Long(9)]);

    let mut mg = static_emitter();
    mg.push_str("s");
    dup_expr(&TypeDescriptor::string_type()).gen_code(&mut mg);
    let stack = final_stack(&mg.into_code().unwrap());
    assert_eq!(stack.len(), 2);
    assert_eq!(stack[0], stack[1]);
}

#[test]
#[should_panic(expected = "cannot dup() V")]
fn test_dup_void_panics() {
    dup_expr(&TypeDescriptor::VOID);
}

#[test]
#[should_panic(expected = "cannot dup() [V")]
fn test_dup_void_array_panics() {
    dup_expr(&TypeDescriptor::Array(Arc::new(TypeDescriptor::VOID)));
}

#[test]
fn test_load_default() {
    let types = [
        TypeDescriptor::BOOLEAN,
        TypeDescriptor::CHAR,
        TypeDescriptor::INT,
        TypeDescriptor::LONG,
        TypeDescriptor::FLOAT,
        TypeDescriptor::DOUBLE,
        TypeDescriptor::string_type(),
        TypeDescriptor::parse("[J").unwrap(),
    ];
    let mut mg = static_emitter();
    for ty in &types {
        load_default(&mut mg, ty);
    }
    assert_eq!(
        final_stack(&mg.into_code().unwrap()),
        vec![
            Value::Int(0),
            Value::Int(0),
            Value::Int(0),
            Value::Long(0),
            Value::Float(0.0),
            Value::Double(0.0),
            Value::NULL,
            Value::NULL,
        ]
    );
}

#[test]
#[should_panic(expected = "unexpected sort for type")]
fn test_load_default_void_panics() {
    load_default(&mut static_emitter(), &TypeDescriptor::VOID);
}

#[test]
#[should_panic(expected = "unexpected sort for type [[V")]
fn test_load_default_nested_void_array_panics() {
    let void_array = TypeDescriptor::Array(Arc::new(TypeDescriptor::VOID));
    load_default(
        &mut static_emitter(),
        &TypeDescriptor::Array(Arc::new(void_array)),
    );
}
