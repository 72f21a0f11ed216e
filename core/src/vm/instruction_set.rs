//! Instruction set of the typed stack machine.
//!
//! Every value on the operand stack and in a local slot has a kind (int,
//! long, float, double or reference) and every instruction is typed for the
//! kinds it consumes. `long` and `double` values occupy two slots, which is
//! what separates `Dup` from `Dup2` and `Pop` from `Pop2`.
//!
//! Comparisons are branches, not value producers: `IfICmp`, `IfACmp` and `If`
//! consume their operands and transfer control to a [`Label`]. `LCmp` and the
//! float/double compares reduce wide operands to an int (-1, 0 or 1) that `If`
//! then tests against zero.
//!
//! # Stack Discipline
//!
//! Stack effect notation: `[..., operand1, operand2] -> [..., result]`

use core::cmp::Ordering;
use core::fmt;

/// A position in a method body, resolved when the method is finished.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub(crate) u32);

impl Label {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Branch predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Ge,
    Gt,
    Le,
}

impl ComparisonOp {
    pub const ALL: [ComparisonOp; 6] = [
        ComparisonOp::Eq,
        ComparisonOp::Ne,
        ComparisonOp::Lt,
        ComparisonOp::Ge,
        ComparisonOp::Gt,
        ComparisonOp::Le,
    ];

    /// GT, GE, LT and LE. These are only meaningful for primitive operands.
    pub const fn is_ordering(self) -> bool {
        !matches!(self, ComparisonOp::Eq | ComparisonOp::Ne)
    }

    /// Whether the predicate holds for `left.cmp(right) == ordering`.
    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            ComparisonOp::Eq => ordering == Ordering::Equal,
            ComparisonOp::Ne => ordering != Ordering::Equal,
            ComparisonOp::Lt => ordering == Ordering::Less,
            ComparisonOp::Ge => ordering != Ordering::Less,
            ComparisonOp::Gt => ordering == Ordering::Greater,
            ComparisonOp::Le => ordering != Ordering::Greater,
        }
    }

    pub const fn mnemonic(self) -> &'static str {
        match self {
            ComparisonOp::Eq => "EQ",
            ComparisonOp::Ne => "NE",
            ComparisonOp::Lt => "LT",
            ComparisonOp::Ge => "GE",
            ComparisonOp::Gt => "GT",
            ComparisonOp::Le => "LE",
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// No operation
    Nop,

    // ========================================================================
    // Constants
    // ========================================================================
    /// Stack: [...] -> [..., null]
    AConstNull,
    /// Push int -1..=5
    /// Stack: [...] -> [..., int]
    IConst(i8),
    /// Push long 0 or 1
    /// Stack: [...] -> [..., long]
    LConst(u8),
    /// Push float 0.0, 1.0 or 2.0
    /// Stack: [...] -> [..., float]
    FConst(u8),
    /// Push double 0.0 or 1.0
    /// Stack: [...] -> [..., double]
    DConst(u8),
    /// Push a sign-extended byte as int
    BiPush(i8),
    /// Push a sign-extended short as int
    SiPush(i16),
    /// Push an int, float or string pool entry
    /// Operand: u16 pool index | Stack: [...] -> [..., value]
    Ldc(u16),
    /// Push a long or double pool entry
    /// Operand: u16 pool index | Stack: [...] -> [..., value]
    Ldc2W(u16),

    // ========================================================================
    // Locals
    // ========================================================================
    ILoad(u16),
    LLoad(u16),
    FLoad(u16),
    DLoad(u16),
    ALoad(u16),

    // ========================================================================
    // Stack
    // ========================================================================
    /// Stack: [..., a] -> [...] (a is single-slot)
    Pop,
    /// Stack: [..., a, b] -> [...] or [..., wide] -> [...]
    Pop2,
    /// Stack: [..., a] -> [..., a, a] (a is single-slot)
    Dup,
    /// Stack: [..., a, b] -> [..., a, b, a, b] or [..., wide] -> [..., wide, wide]
    Dup2,

    // ========================================================================
    // Conversions
    // ========================================================================
    I2L,
    I2F,
    I2D,
    L2I,
    L2F,
    L2D,
    F2I,
    F2L,
    F2D,
    D2I,
    D2L,
    D2F,
    I2B,
    I2C,
    I2S,

    // ========================================================================
    // Wide comparisons
    // ========================================================================
    /// Stack: [..., a: long, b: long] -> [..., -1|0|1]
    LCmp,
    /// Like `LCmp` for floats; NaN yields -1
    FCmpL,
    /// Like `LCmp` for floats; NaN yields 1
    FCmpG,
    DCmpL,
    DCmpG,

    // ========================================================================
    // Control Flow
    // ========================================================================
    /// Branch if the int on top of the stack compares to zero
    /// Stack: [..., a: int] -> [...]
    If(ComparisonOp, Label),
    /// Stack: [..., a: int, b: int] -> [...]
    IfICmp(ComparisonOp, Label),
    /// Reference identity, `Eq`/`Ne` only
    /// Stack: [..., a: ref, b: ref] -> [...]
    IfACmp(ComparisonOp, Label),
    IfNull(Label),
    IfNonNull(Label),
    Goto(Label),

    // ========================================================================
    // Objects & Calls
    // ========================================================================
    /// Allocate an uninitialized instance
    /// Operand: u16 class pool index | Stack: [...] -> [..., ref]
    New(u16),
    /// Invoke an initializer (or other non-virtual instance method)
    /// Operand: u16 method pool index | Stack: [..., receiver, args...] -> [..., result?]
    InvokeSpecial(u16),
    /// Operand: u16 method pool index | Stack: [..., args...] -> [..., result?]
    InvokeStatic(u16),

    // ========================================================================
    // Returns
    // ========================================================================
    IReturn,
    LReturn,
    FReturn,
    DReturn,
    AReturn,
    Return,
}

static_assertions::const_assert!(core::mem::size_of::<Instruction>() <= 8);

impl Instruction {
    /// The label this instruction may transfer control to.
    pub const fn branch_target(&self) -> Option<Label> {
        match self {
            Instruction::If(_, label)
            | Instruction::IfICmp(_, label)
            | Instruction::IfACmp(_, label)
            | Instruction::IfNull(label)
            | Instruction::IfNonNull(label)
            | Instruction::Goto(label) => Some(*label),
            _ => None,
        }
    }

    pub const fn is_return(&self) -> bool {
        matches!(
            self,
            Instruction::IReturn
                | Instruction::LReturn
                | Instruction::FReturn
                | Instruction::DReturn
                | Instruction::AReturn
                | Instruction::Return
        )
    }

    /// True if control never falls through to the next instruction.
    pub const fn ends_block(&self) -> bool {
        matches!(self, Instruction::Goto(_)) || self.is_return()
    }
}
