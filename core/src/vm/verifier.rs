//! Static stack-shape verification.
//!
//! The verifier abstractly interprets a method body, tracking the kind of
//! every operand stack entry. It rejects instructions applied to the wrong
//! kinds, stacks that disagree where control flow merges, returns that do
//! not match the method descriptor and branches to labels that cannot carry
//! a frame (unmarked or debug-only). Code that no path reaches is not
//! checked.

use core::fmt;

use smallvec::SmallVec;
use thiserror::Error;

use crate::types::{MethodDescriptor, PrimitiveKind, TypeDescriptor};
use crate::vm::{Access, Code, ComparisonOp, Constant, Instruction, Label};
use crate::{Vec, vec};

/// Kind of a value as the verifier sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerificationType {
    Int,
    Float,
    Long,
    Double,
    Reference,
}

impl VerificationType {
    /// Stack kind of a value type; `None` for `void` and method shapes.
    pub fn of(ty: &TypeDescriptor) -> Option<VerificationType> {
        match ty {
            TypeDescriptor::Primitive(PrimitiveKind::Long) => Some(VerificationType::Long),
            TypeDescriptor::Primitive(PrimitiveKind::Float) => Some(VerificationType::Float),
            TypeDescriptor::Primitive(PrimitiveKind::Double) => Some(VerificationType::Double),
            TypeDescriptor::Primitive(_) => Some(VerificationType::Int),
            TypeDescriptor::Object(_) | TypeDescriptor::Array(_) => {
                Some(VerificationType::Reference)
            }
            TypeDescriptor::Void | TypeDescriptor::Method(_) => None,
        }
    }

    pub const fn size(self) -> usize {
        match self {
            VerificationType::Long | VerificationType::Double => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for VerificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VerificationType::Int => "int",
            VerificationType::Float => "float",
            VerificationType::Long => "long",
            VerificationType::Double => "double",
            VerificationType::Reference => "reference",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VerifyError {
    #[error("pc {pc}: operand stack underflow")]
    StackUnderflow { pc: usize },

    #[error("pc {pc}: expected {expected} on the operand stack, found {found}")]
    OperandMismatch {
        pc: usize,
        expected: VerificationType,
        found: VerificationType,
    },

    #[error("pc {pc}: {found} is a two-slot value where a single-slot value is required")]
    WideOperand { pc: usize, found: VerificationType },

    #[error("pc {pc}: stack shapes disagree where control flow merges: {expected:?} vs {found:?}")]
    StackShapeMismatch {
        pc: usize,
        expected: Vec<VerificationType>,
        found: Vec<VerificationType>,
    },

    #[error("pc {pc}: {label:?} is not a valid branch target")]
    InvalidBranchTarget { pc: usize, label: Label },

    #[error("pc {pc}: execution falls off the end of the code")]
    FallsOffEnd { pc: usize },

    #[error("pc {pc}: bad constant pool reference #{index}")]
    BadConstant { pc: usize, index: u16 },

    #[error("pc {pc}: bad local variable access at index {index}")]
    BadLocal { pc: usize, index: u16 },

    #[error("pc {pc}: return does not match method return type {expected}")]
    BadReturn { pc: usize, expected: TypeDescriptor },

    #[error("pc {pc}: references cannot be compared via {op}")]
    InvalidComparison { pc: usize, op: ComparisonOp },

    #[error("declared max_stack {declared} is smaller than the required {required}")]
    MaxStackTooSmall { declared: usize, required: usize },
}

/// What the verifier needs to know about the method a body belongs to.
#[derive(Debug, Clone, Copy)]
pub struct MethodContext<'a> {
    pub access: Access,
    pub descriptor: &'a MethodDescriptor,
}

type Frame = SmallVec<[VerificationType; 8]>;

enum Flow {
    Next,
    Branch(Label),
    Jump(Label),
    Exit,
}

/// Verifies `code` and returns the operand stack height (in slots) it needs.
pub fn verify(code: &Code, context: MethodContext<'_>) -> Result<usize, VerifyError> {
    let locals = initial_locals(context);
    let len = code.instructions.len();
    if len == 0 {
        return Err(VerifyError::FallsOffEnd { pc: 0 });
    }

    let mut frames: Vec<Option<Frame>> = vec![None; len];
    frames[0] = Some(Frame::new());
    let mut worklist = vec![0usize];
    let mut max_stack = 0;

    while let Some(pc) = worklist.pop() {
        let mut stack = match &frames[pc] {
            Some(frame) => frame.clone(),
            None => continue,
        };
        let flow = step(code, context, &locals, pc, &mut stack)?;
        max_stack = max_stack.max(slots(&stack));

        let mut successors: SmallVec<[usize; 2]> = SmallVec::new();
        match flow {
            Flow::Next => successors.push(pc + 1),
            Flow::Branch(label) => {
                successors.push(branch_target(code, pc, label)?);
                successors.push(pc + 1);
            }
            Flow::Jump(label) => successors.push(branch_target(code, pc, label)?),
            Flow::Exit => {}
        }

        for next in successors {
            if next >= len {
                return Err(VerifyError::FallsOffEnd { pc });
            }
            match &frames[next] {
                None => {
                    frames[next] = Some(stack.clone());
                    worklist.push(next);
                }
                Some(existing) if *existing == stack => {}
                Some(existing) => {
                    return Err(VerifyError::StackShapeMismatch {
                        pc: next,
                        expected: existing.to_vec(),
                        found: stack.to_vec(),
                    });
                }
            }
        }
    }

    if code.max_stack < max_stack {
        return Err(VerifyError::MaxStackTooSmall {
            declared: code.max_stack,
            required: max_stack,
        });
    }
    Ok(max_stack)
}

fn initial_locals(context: MethodContext<'_>) -> Vec<Option<VerificationType>> {
    let mut locals = Vec::new();
    if !context.access.is_static() {
        locals.push(Some(VerificationType::Reference));
    }
    for param in context.descriptor.params() {
        let kind = VerificationType::of(param);
        locals.push(kind);
        if param.size() == 2 {
            locals.push(None);
        }
    }
    locals
}

fn slots(stack: &Frame) -> usize {
    stack.iter().map(|kind| kind.size()).sum()
}

fn branch_target(code: &Code, pc: usize, label: Label) -> Result<usize, VerifyError> {
    match code.label_info(label) {
        Some(info) if !info.debug_only => match info.position {
            Some(position) if position < code.instructions.len() => Ok(position),
            _ => Err(VerifyError::InvalidBranchTarget { pc, label }),
        },
        _ => Err(VerifyError::InvalidBranchTarget { pc, label }),
    }
}

fn pop(stack: &mut Frame, pc: usize) -> Result<VerificationType, VerifyError> {
    stack.pop().ok_or(VerifyError::StackUnderflow { pc })
}

fn pop_expect(
    stack: &mut Frame,
    pc: usize,
    expected: VerificationType,
) -> Result<(), VerifyError> {
    let found = pop(stack, pc)?;
    if found == expected {
        Ok(())
    } else {
        Err(VerifyError::OperandMismatch {
            pc,
            expected,
            found,
        })
    }
}

fn pop_narrow(stack: &mut Frame, pc: usize) -> Result<VerificationType, VerifyError> {
    let found = pop(stack, pc)?;
    if found.size() == 1 {
        Ok(found)
    } else {
        Err(VerifyError::WideOperand { pc, found })
    }
}

fn convert(
    stack: &mut Frame,
    pc: usize,
    from: VerificationType,
    to: VerificationType,
) -> Result<Flow, VerifyError> {
    pop_expect(stack, pc, from)?;
    stack.push(to);
    Ok(Flow::Next)
}

fn load(
    locals: &[Option<VerificationType>],
    stack: &mut Frame,
    pc: usize,
    index: u16,
    expected: VerificationType,
) -> Result<Flow, VerifyError> {
    match locals.get(index as usize) {
        Some(Some(kind)) if *kind == expected => {
            stack.push(expected);
            Ok(Flow::Next)
        }
        _ => Err(VerifyError::BadLocal { pc, index }),
    }
}

fn check_return(
    context: MethodContext<'_>,
    stack: &mut Frame,
    pc: usize,
    returned: Option<VerificationType>,
) -> Result<Flow, VerifyError> {
    let declared = context.descriptor.return_type();
    if VerificationType::of(declared) != returned {
        return Err(VerifyError::BadReturn {
            pc,
            expected: declared.clone(),
        });
    }
    if let Some(kind) = returned {
        pop_expect(stack, pc, kind)?;
    }
    Ok(Flow::Exit)
}

fn step(
    code: &Code,
    context: MethodContext<'_>,
    locals: &[Option<VerificationType>],
    pc: usize,
    stack: &mut Frame,
) -> Result<Flow, VerifyError> {
    use Instruction::*;
    use VerificationType as V;

    let constant = move |index: u16| {
        code.constant(index)
            .ok_or(VerifyError::BadConstant { pc, index })
    };

    match code.instructions[pc] {
        Nop => Ok(Flow::Next),

        AConstNull => {
            stack.push(V::Reference);
            Ok(Flow::Next)
        }
        IConst(_) | BiPush(_) | SiPush(_) => {
            stack.push(V::Int);
            Ok(Flow::Next)
        }
        LConst(_) => {
            stack.push(V::Long);
            Ok(Flow::Next)
        }
        FConst(_) => {
            stack.push(V::Float);
            Ok(Flow::Next)
        }
        DConst(_) => {
            stack.push(V::Double);
            Ok(Flow::Next)
        }
        Ldc(index) => {
            let kind = match constant(index)? {
                Constant::Int(_) => V::Int,
                Constant::Float(_) => V::Float,
                Constant::String(_) | Constant::Class(_) => V::Reference,
                _ => return Err(VerifyError::BadConstant { pc, index }),
            };
            stack.push(kind);
            Ok(Flow::Next)
        }
        Ldc2W(index) => {
            let kind = match constant(index)? {
                Constant::Long(_) => V::Long,
                Constant::Double(_) => V::Double,
                _ => return Err(VerifyError::BadConstant { pc, index }),
            };
            stack.push(kind);
            Ok(Flow::Next)
        }

        ILoad(index) => load(locals, stack, pc, index, V::Int),
        LLoad(index) => load(locals, stack, pc, index, V::Long),
        FLoad(index) => load(locals, stack, pc, index, V::Float),
        DLoad(index) => load(locals, stack, pc, index, V::Double),
        ALoad(index) => load(locals, stack, pc, index, V::Reference),

        Pop => {
            pop_narrow(stack, pc)?;
            Ok(Flow::Next)
        }
        Pop2 => {
            if pop(stack, pc)?.size() == 1 {
                pop_narrow(stack, pc)?;
            }
            Ok(Flow::Next)
        }
        Dup => {
            let top = pop_narrow(stack, pc)?;
            stack.push(top);
            stack.push(top);
            Ok(Flow::Next)
        }
        Dup2 => {
            let top = pop(stack, pc)?;
            if top.size() == 2 {
                stack.push(top);
                stack.push(top);
            } else {
                let below = pop_narrow(stack, pc)?;
                stack.extend([below, top, below, top]);
            }
            Ok(Flow::Next)
        }

        I2L => convert(stack, pc, V::Int, V::Long),
        I2F => convert(stack, pc, V::Int, V::Float),
        I2D => convert(stack, pc, V::Int, V::Double),
        L2I => convert(stack, pc, V::Long, V::Int),
        L2F => convert(stack, pc, V::Long, V::Float),
        L2D => convert(stack, pc, V::Long, V::Double),
        F2I => convert(stack, pc, V::Float, V::Int),
        F2L => convert(stack, pc, V::Float, V::Long),
        F2D => convert(stack, pc, V::Float, V::Double),
        D2I => convert(stack, pc, V::Double, V::Int),
        D2L => convert(stack, pc, V::Double, V::Long),
        D2F => convert(stack, pc, V::Double, V::Float),
        I2B | I2C | I2S => convert(stack, pc, V::Int, V::Int),

        LCmp => {
            pop_expect(stack, pc, V::Long)?;
            convert(stack, pc, V::Long, V::Int)
        }
        FCmpL | FCmpG => {
            pop_expect(stack, pc, V::Float)?;
            convert(stack, pc, V::Float, V::Int)
        }
        DCmpL | DCmpG => {
            pop_expect(stack, pc, V::Double)?;
            convert(stack, pc, V::Double, V::Int)
        }

        If(_, label) => {
            pop_expect(stack, pc, V::Int)?;
            Ok(Flow::Branch(label))
        }
        IfICmp(_, label) => {
            pop_expect(stack, pc, V::Int)?;
            pop_expect(stack, pc, V::Int)?;
            Ok(Flow::Branch(label))
        }
        IfACmp(op, label) => {
            if op.is_ordering() {
                return Err(VerifyError::InvalidComparison { pc, op });
            }
            pop_expect(stack, pc, V::Reference)?;
            pop_expect(stack, pc, V::Reference)?;
            Ok(Flow::Branch(label))
        }
        IfNull(label) | IfNonNull(label) => {
            pop_expect(stack, pc, V::Reference)?;
            Ok(Flow::Branch(label))
        }
        Goto(label) => Ok(Flow::Jump(label)),

        New(index) => match constant(index)? {
            Constant::Class(_) => {
                stack.push(V::Reference);
                Ok(Flow::Next)
            }
            _ => Err(VerifyError::BadConstant { pc, index }),
        },
        InvokeSpecial(index) | InvokeStatic(index) => {
            let method_ref = match constant(index)? {
                Constant::Method(method_ref) => method_ref,
                _ => return Err(VerifyError::BadConstant { pc, index }),
            };
            let descriptor = method_ref.method().descriptor();
            for param in descriptor.params().iter().rev() {
                let expected =
                    VerificationType::of(param).ok_or(VerifyError::BadConstant { pc, index })?;
                pop_expect(stack, pc, expected)?;
            }
            if matches!(code.instructions[pc], InvokeSpecial(_)) {
                pop_expect(stack, pc, V::Reference)?;
            }
            if let Some(kind) = VerificationType::of(descriptor.return_type()) {
                stack.push(kind);
            }
            Ok(Flow::Next)
        }

        IReturn => check_return(context, stack, pc, Some(V::Int)),
        LReturn => check_return(context, stack, pc, Some(V::Long)),
        FReturn => check_return(context, stack, pc, Some(V::Float)),
        DReturn => check_return(context, stack, pc, Some(V::Double)),
        AReturn => check_return(context, stack, pc, Some(V::Reference)),
        Return => check_return(context, stack, pc, None),
    }
}
