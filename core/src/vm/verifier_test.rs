//! Tests for the stack-shape verifier.

use pretty_assertions::assert_eq;

use crate::types::{Method, MethodDescriptor, MethodRef, TypeDescriptor};
use crate::vm::{
    Access, Code, ComparisonOp, Constant, Instruction, Label, LabelInfo, MethodContext,
    VerificationType, VerifyError, verify,
};
use crate::{Vec, vec};

use Instruction::*;

fn body(instructions: Vec<Instruction>, labels: Vec<LabelInfo>, max_stack: usize) -> Code {
    Code {
        instructions,
        constants: vec![],
        labels,
        local_variables: vec![],
        line_numbers: vec![],
        max_stack,
        max_locals: 4,
    }
}

fn at(position: usize) -> LabelInfo {
    LabelInfo {
        position: Some(position),
        debug_only: false,
    }
}

fn check(code: &Code, access: Access, descriptor: &str) -> Result<usize, VerifyError> {
    let descriptor = MethodDescriptor::parse(descriptor).unwrap();
    verify(
        code,
        MethodContext {
            access,
            descriptor: &descriptor,
        },
    )
}

#[test]
fn test_branching_comparison() {
    let code = body(
        vec![
            IConst(1),
            IConst(2),
            IfICmp(ComparisonOp::Lt, Label(0)),
            IConst(0),
            IReturn,
            IConst(1),
            IReturn,
        ],
        vec![at(5)],
        2,
    );
    assert_eq!(check(&code, Access::STATIC, "()Z"), Ok(2));
}

#[test]
fn test_operand_mismatch() {
    let code = body(vec![LConst(0), IReturn], vec![], 2);
    assert_eq!(
        check(&code, Access::STATIC, "()I"),
        Err(VerifyError::OperandMismatch {
            pc: 1,
            expected: VerificationType::Int,
            found: VerificationType::Long,
        })
    );
}

#[test]
fn test_return_must_match_descriptor() {
    let code = body(vec![IConst(0), IReturn], vec![], 1);
    assert_eq!(
        check(&code, Access::STATIC, "()V"),
        Err(VerifyError::BadReturn {
            pc: 1,
            expected: TypeDescriptor::VOID,
        })
    );
}

#[test]
fn test_debug_label_is_not_a_branch_target() {
    let debug_label = LabelInfo {
        position: Some(2),
        debug_only: true,
    };
    let code = body(vec![Goto(Label(0)), Nop, Return], vec![debug_label], 0);
    assert_eq!(
        check(&code, Access::STATIC, "()V"),
        Err(VerifyError::InvalidBranchTarget {
            pc: 0,
            label: Label(0),
        })
    );
}

#[test]
fn test_unmarked_label_is_not_a_branch_target() {
    let unmarked = LabelInfo {
        position: None,
        debug_only: false,
    };
    let code = body(vec![Goto(Label(0)), Return], vec![unmarked], 0);
    assert!(matches!(
        check(&code, Access::STATIC, "()V"),
        Err(VerifyError::InvalidBranchTarget { pc: 0, .. })
    ));
}

#[test]
fn test_falls_off_end() {
    let code = body(vec![IConst(1)], vec![], 1);
    assert_eq!(
        check(&code, Access::STATIC, "()V"),
        Err(VerifyError::FallsOffEnd { pc: 0 })
    );

    let empty = body(vec![], vec![], 0);
    assert_eq!(
        check(&empty, Access::STATIC, "()V"),
        Err(VerifyError::FallsOffEnd { pc: 0 })
    );
}

#[test]
fn test_merge_with_different_stack_shapes() {
    let code = body(
        vec![IConst(0), If(ComparisonOp::Eq, Label(0)), IConst(1), Return],
        vec![at(3)],
        1,
    );
    assert_eq!(
        check(&code, Access::STATIC, "()V"),
        Err(VerifyError::StackShapeMismatch {
            pc: 3,
            expected: vec![],
            found: vec![VerificationType::Int],
        })
    );
}

#[test]
fn test_dup_rejects_wide_values() {
    let code = body(vec![LConst(1), Dup, Pop2, Pop2, Return], vec![], 4);
    assert_eq!(
        check(&code, Access::STATIC, "()V"),
        Err(VerifyError::WideOperand {
            pc: 1,
            found: VerificationType::Long,
        })
    );

    let code = body(vec![LConst(1), Dup2, Pop2, Pop2, Return], vec![], 4);
    assert_eq!(check(&code, Access::STATIC, "()V"), Ok(4));
}

#[test]
fn test_reference_ordering_is_rejected() {
    let code = body(
        vec![
            AConstNull,
            AConstNull,
            IfACmp(ComparisonOp::Lt, Label(0)),
            Return,
        ],
        vec![at(3)],
        2,
    );
    assert_eq!(
        check(&code, Access::STATIC, "()V"),
        Err(VerifyError::InvalidComparison {
            pc: 2,
            op: ComparisonOp::Lt,
        })
    );
}

#[test]
fn test_declared_max_stack_too_small() {
    let code = body(vec![LConst(1), LReturn], vec![], 1);
    assert_eq!(
        check(&code, Access::STATIC, "()J"),
        Err(VerifyError::MaxStackTooSmall {
            declared: 1,
            required: 2,
        })
    );
}

#[test]
fn test_locals_follow_receiver_and_parameters() {
    // this, long (two slots), int
    let code = body(
        vec![ALoad(0), Pop, LLoad(1), Pop2, ILoad(3), Pop, Return],
        vec![],
        2,
    );
    assert_eq!(check(&code, Access::PUBLIC, "(JI)V"), Ok(2));

    let code = body(vec![ILoad(2), Pop, Return], vec![], 1);
    assert_eq!(
        check(&code, Access::PUBLIC, "(JI)V"),
        Err(VerifyError::BadLocal { pc: 0, index: 2 })
    );

    // Static methods have no receiver.
    let code = body(vec![ILoad(0), IReturn], vec![], 1);
    assert_eq!(check(&code, Access::STATIC, "(I)I"), Ok(1));
}

#[test]
fn test_invoke_pops_arguments_and_receiver() {
    let init = MethodRef::new("java/lang/Object", Method::nullary_init());
    let mut code = body(vec![ALoad(0), InvokeSpecial(0), Return], vec![], 1);
    code.constants.push(Constant::Method(init));
    assert_eq!(check(&code, Access::PUBLIC, "()V"), Ok(1));

    // Same body in a static method: slot 0 is not a reference.
    assert_eq!(
        check(&code, Access::STATIC, "()V"),
        Err(VerifyError::BadLocal { pc: 0, index: 0 })
    );
}

#[test]
fn test_bad_constant_index() {
    let code = body(vec![Ldc(3), AReturn], vec![], 1);
    assert_eq!(
        check(&code, Access::STATIC, "()Ljava/lang/String;"),
        Err(VerifyError::BadConstant { pc: 0, index: 3 })
    );
}

#[test]
fn test_unreachable_code_is_not_checked() {
    let code = body(vec![Return, Pop, Pop2], vec![], 0);
    assert_eq!(check(&code, Access::STATIC, "()V"), Ok(0));
}
