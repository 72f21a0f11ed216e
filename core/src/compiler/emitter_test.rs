use pretty_assertions::assert_eq;

use crate::compiler::CodeEmitter;
use crate::compiler::test_support::final_stack;
use crate::errors::CodegenError;
use crate::options::EmitOptions;
use crate::types::{Method, TypeDescriptor};
use crate::vm::{
    Access, ComparisonOp, Instruction, LineNumberEntry, LocalVariableEntry, Value, VerifyError,
};
use crate::{ToString, format, vec};

fn emitter(access: Access, desc: &str) -> CodeEmitter {
    CodeEmitter::new(access, Method::parse("f", desc).unwrap(), EmitOptions::default())
}

fn static_emitter() -> CodeEmitter {
    emitter(Access::STATIC, "()V")
}

#[test]
fn test_stack_depth_tracking() {
    let mut mg = static_emitter();
    assert_eq!(mg.stack_depth(), Some(0));
    mg.push_int(1);
    mg.push_long(2);
    assert_eq!(mg.stack_depth(), Some(3));
    mg.dup2();
    assert_eq!(mg.stack_depth(), Some(5));
    mg.pop2();
    mg.pop2();
    mg.push_double(0.0);
    mg.cast(&TypeDescriptor::DOUBLE, &TypeDescriptor::FLOAT);
    assert_eq!(mg.stack_depth(), Some(2));
    mg.pop();
    mg.pop();
    assert_eq!(mg.stack_depth(), Some(0));

    let code = mg.into_code().unwrap();
    assert_eq!(code.max_stack, 5);
    assert_eq!(code.max_locals, 0);
}

#[test]
fn test_goto_makes_code_unreachable_until_a_target_is_marked() {
    let mut mg = static_emitter();
    let target = mg.new_label();
    mg.push_int(4);
    mg.goto(target);
    assert_eq!(mg.stack_depth(), None);

    // Emitting dead code does not disturb the accounting.
    mg.push_int(9);
    assert_eq!(mg.stack_depth(), None);

    mg.mark(target);
    assert_eq!(mg.stack_depth(), Some(1));

    let code = mg.into_code().unwrap();
    assert_eq!(code.label_position(target), Some(3));
    assert_eq!(final_stack(&code), vec![Value::Int(4)]);
}

#[test]
fn test_debug_label_does_not_restore_reachability() {
    let mut mg = static_emitter();
    mg.return_value();
    assert_eq!(mg.stack_depth(), None);
    let end = mg.new_debug_label();
    mg.mark(end);
    assert_eq!(mg.stack_depth(), None);

    let code = mg.into_code().unwrap();
    assert!(code.label_info(end).unwrap().debug_only);
    assert_eq!(code.label_position(end), Some(1));
}

#[test]
fn test_mark_new_fixes_depth_for_later_branches() {
    let mut mg = static_emitter();
    mg.push_int(0);
    let top = mg.mark_new();
    mg.push_int(1);
    mg.pop();
    mg.goto(top);
    mg.mark_new();
    assert_eq!(mg.stack_depth(), None);
    let code = mg.into_code().unwrap();
    assert_eq!(code.label_position(top), Some(1));
}

#[test]
#[should_panic(expected = "is marked twice")]
fn test_marking_twice_panics() {
    let mut mg = static_emitter();
    let label = mg.new_label();
    mg.mark(label);
    mg.mark(label);
}

#[test]
fn test_unmarked_branch_target_is_reported() {
    let mut mg = static_emitter();
    let nowhere = mg.new_label();
    mg.goto(nowhere);
    assert_eq!(
        mg.into_code().unwrap_err(),
        CodegenError::UnmarkedLabel(nowhere)
    );

    // A label nobody refers to may stay unmarked.
    let mut mg = static_emitter();
    mg.new_label();
    mg.return_value();
    assert!(mg.into_code().is_ok());
}

#[test]
fn test_branch_to_debug_label_fails_verification() {
    let mut mg = static_emitter();
    let debug = mg.new_debug_label();
    mg.goto(debug);
    mg.mark(debug);
    mg.return_value();
    assert_eq!(
        mg.end_method().unwrap_err(),
        CodegenError::Verify(VerifyError::InvalidBranchTarget {
            pc: 0,
            label: debug
        })
    );
}

#[test]
fn test_end_method_verifies_by_default() {
    let mut mg = emitter(Access::STATIC, "()I");
    mg.push_long(1);
    mg.return_value();
    assert!(matches!(
        mg.end_method(),
        Err(CodegenError::Verify(_))
    ));

    let options = EmitOptions {
        verify: false,
        ..EmitOptions::default()
    };
    let mut mg = CodeEmitter::new(Access::STATIC, Method::parse("f", "()I").unwrap(), options);
    mg.push_long(1);
    mg.return_value();
    assert!(mg.end_method().is_ok());
}

#[test]
fn test_debug_tables() {
    let mut mg = emitter(Access::PUBLIC, "(J)V");
    let start = mg.mark_new();
    let line = mg.new_debug_label();
    mg.mark(line);
    mg.visit_line_number(10, line);
    mg.load_local(1, &TypeDescriptor::LONG);
    let second = mg.mark_new();
    mg.visit_line_number(11, second);
    mg.pop2();
    mg.return_value();
    let end = mg.new_debug_label();
    mg.mark(end);
    mg.visit_local_variable("n", &TypeDescriptor::LONG, start, end, 1);

    let code = mg.into_code().unwrap();
    assert_eq!(
        code.line_numbers,
        vec![
            LineNumberEntry { pc: 0, line: 10 },
            LineNumberEntry { pc: 1, line: 11 },
        ]
    );
    assert_eq!(
        code.local_variables,
        vec![LocalVariableEntry {
            name: "n".to_string(),
            descriptor: TypeDescriptor::LONG,
            index: 1,
            start: 0,
            end: 3,
        }]
    );
    assert_eq!(code.line_number_at(0), Some(10));
    assert_eq!(code.line_number_at(2), Some(11));
}

#[test]
fn test_debug_info_off_drops_tables() {
    let options = EmitOptions {
        debug_info: false,
        ..EmitOptions::default()
    };
    let mut mg = CodeEmitter::new(Access::STATIC, Method::parse("f", "()V").unwrap(), options);
    let start = mg.mark_new();
    mg.visit_line_number(3, start);
    mg.return_value();
    let end = mg.new_debug_label();
    mg.mark(end);
    mg.visit_local_variable("x", &TypeDescriptor::INT, start, end, 4);

    let code = mg.into_code().unwrap();
    assert!(code.line_numbers.is_empty());
    assert!(code.local_variables.is_empty());
    // Slots are still reserved.
    assert_eq!(code.max_locals, 5);
}

#[test]
fn test_max_locals_counts_receiver_and_wide_parameters() {
    let mg = emitter(Access::PUBLIC, "(JI)V");
    assert_eq!(mg.into_code().unwrap().max_locals, 4);

    let mg = emitter(Access::STATIC, "(JI)V");
    assert_eq!(mg.into_code().unwrap().max_locals, 3);

    let mut mg = emitter(Access::STATIC, "()V");
    mg.load_local(6, &TypeDescriptor::DOUBLE);
    assert_eq!(mg.into_code().unwrap().max_locals, 8);
}

#[test]
fn test_cast_sequences() {
    use Instruction::*;

    let cases = [
        (TypeDescriptor::INT, TypeDescriptor::LONG, vec![I2L]),
        (TypeDescriptor::LONG, TypeDescriptor::SHORT, vec![L2I, I2S]),
        (TypeDescriptor::FLOAT, TypeDescriptor::CHAR, vec![F2I, I2C]),
        (TypeDescriptor::DOUBLE, TypeDescriptor::BYTE, vec![D2I, I2B]),
        (TypeDescriptor::BYTE, TypeDescriptor::INT, vec![]),
        (TypeDescriptor::CHAR, TypeDescriptor::BYTE, vec![I2B]),
        (TypeDescriptor::SHORT, TypeDescriptor::DOUBLE, vec![I2D]),
        (TypeDescriptor::LONG, TypeDescriptor::FLOAT, vec![L2F]),
        (TypeDescriptor::DOUBLE, TypeDescriptor::DOUBLE, vec![]),
    ];
    for (from, to, expected) in cases {
        let mut mg = static_emitter();
        mg.load_local(0, &from);
        mg.cast(&from, &to);
        assert_eq!(mg.stack_depth(), Some(to.size()));
        let code = mg.into_code().unwrap();
        assert_eq!(code.instructions[1..], expected[..], "{} -> {}", from, to);
    }
}

#[test]
#[should_panic(expected = "cannot cast")]
fn test_cast_from_boolean_panics() {
    static_emitter().cast(&TypeDescriptor::BOOLEAN, &TypeDescriptor::INT);
}

#[test]
fn test_floating_compare_variant_depends_on_operator() {
    let variant = |ty: &TypeDescriptor, op: ComparisonOp| {
        let mut mg = static_emitter();
        let label = mg.new_label();
        mg.load_local(0, ty);
        mg.load_local(ty.size() as u16, ty);
        mg.if_cmp(ty, op, label);
        assert_eq!(mg.stack_depth(), Some(0));
        mg.mark(label);
        mg.into_code().unwrap().instructions[2]
    };

    let float = TypeDescriptor::FLOAT;
    let double = TypeDescriptor::DOUBLE;
    assert_eq!(variant(&float, ComparisonOp::Gt), Instruction::FCmpL);
    assert_eq!(variant(&float, ComparisonOp::Ge), Instruction::FCmpL);
    assert_eq!(variant(&float, ComparisonOp::Lt), Instruction::FCmpG);
    assert_eq!(variant(&float, ComparisonOp::Eq), Instruction::FCmpG);
    assert_eq!(variant(&double, ComparisonOp::Gt), Instruction::DCmpL);
    assert_eq!(variant(&double, ComparisonOp::Le), Instruction::DCmpG);
}

#[test]
fn test_reference_if_cmp() {
    let string = TypeDescriptor::string_type();
    let mut mg = static_emitter();
    let label = mg.new_label();
    mg.push_null();
    mg.push_str("x");
    mg.if_cmp(&string, ComparisonOp::Ne, label);
    mg.mark(label);
    let code = mg.into_code().unwrap();
    assert_eq!(code.instructions[2], Instruction::IfACmp(ComparisonOp::Ne, label));
}

#[test]
#[should_panic(expected = "bad comparison operator")]
fn test_reference_ordering_panics() {
    let mut mg = static_emitter();
    let label = mg.new_label();
    mg.push_null();
    mg.push_null();
    mg.if_cmp(&TypeDescriptor::object_type(), ComparisonOp::Lt, label);
}

#[test]
#[should_panic(expected = "no receiver in static method")]
fn test_load_this_in_static_method_panics() {
    static_emitter().load_this();
}

#[test]
fn test_load_this_in_instance_method() {
    let mut mg = emitter(Access::PUBLIC, "()V");
    mg.load_this();
    mg.pop();
    mg.return_value();
    let definition = mg.end_method().unwrap();
    let code = definition.code().unwrap();
    assert_eq!(code.instructions[0], Instruction::ALoad(0));
    assert_eq!(code.max_locals, 1);
}

#[test]
fn test_code_debug_output() {
    let mut mg = static_emitter();
    let skip = mg.new_label();
    mg.push_int(1);
    mg.if_zcmp(ComparisonOp::Eq, skip);
    mg.push_str("hi");
    mg.pop();
    mg.mark(skip);
    mg.return_value();
    let code = mg.into_code().unwrap();

    let printed = format!("{:?}", code);
    assert!(printed.contains("max_stack: 1"), "{}", printed);
    assert!(printed.contains("[0] = String(\"hi\")"), "{}", printed);
    assert!(printed.contains("If(Eq, L0) (to @4)"), "{}", printed);
    assert!(printed.contains("L0:  Return"), "{}", printed);
}

#[test]
fn test_unlabelled_positions_are_not_printed() {
    let mut mg = static_emitter();
    let unused = mg.new_label();
    mg.mark(unused);
    mg.return_value();
    let printed = format!("{:?}", mg.into_code().unwrap());
    assert!(!printed.contains("L0"), "{}", printed);
}

#[test]
fn test_null_branches() {
    let run = |non_null: bool| {
        let mut mg = static_emitter();
        let taken = mg.new_label();
        let end = mg.new_label();
        mg.push_null();
        if non_null {
            mg.if_non_null(taken);
        } else {
            mg.if_null(taken);
        }
        mg.push_int(1);
        mg.goto(end);
        mg.mark(taken);
        mg.push_int(2);
        mg.mark(end);
        final_stack(&mg.into_code().unwrap())
    };
    assert_eq!(run(false), vec![Value::Int(2)]);
    assert_eq!(run(true), vec![Value::Int(1)]);
}
