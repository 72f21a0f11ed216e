use alloc::sync::Arc;
use core::fmt;

use hashbrown::HashSet;

use crate::types::{MethodRef, TypeDescriptor};
use crate::vm::{Instruction, Label};
use crate::{String, Vec, format};

/// Entries of a method's constant pool.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Int(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    String(Arc<str>),
    /// Internal class name.
    Class(Arc<str>),
    Method(MethodRef),
}

/// Hashable identity of a [`Constant`]; floats compare by bit pattern so that
/// `0.0` and `-0.0` (and distinct NaNs) get distinct pool entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum ConstantKey {
    Int(i32),
    Float(u32),
    Long(i64),
    Double(u64),
    String(Arc<str>),
    Class(Arc<str>),
    Method(MethodRef),
}

impl Constant {
    pub(crate) fn key(&self) -> ConstantKey {
        match self {
            Constant::Int(v) => ConstantKey::Int(*v),
            Constant::Float(v) => ConstantKey::Float(v.to_bits()),
            Constant::Long(v) => ConstantKey::Long(*v),
            Constant::Double(v) => ConstantKey::Double(v.to_bits()),
            Constant::String(s) => ConstantKey::String(s.clone()),
            Constant::Class(s) => ConstantKey::Class(s.clone()),
            Constant::Method(m) => ConstantKey::Method(m.clone()),
        }
    }

    /// True for entries loaded with `Ldc2W`.
    pub fn is_wide(&self) -> bool {
        matches!(self, Constant::Long(_) | Constant::Double(_))
    }
}

/// Where a label ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelInfo {
    /// Instruction index the label was marked at, if it was marked.
    pub position: Option<usize>,
    /// Debug-only labels carry position metadata and never start a frame.
    pub debug_only: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalVariableEntry {
    pub name: String,
    pub descriptor: TypeDescriptor,
    pub index: u16,
    /// First instruction index of the live range.
    pub start: usize,
    /// One past the last instruction index of the live range.
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineNumberEntry {
    pub pc: usize,
    pub line: u32,
}

/// A finished method body.
pub struct Code {
    pub instructions: Vec<Instruction>,
    pub constants: Vec<Constant>,
    pub labels: Vec<LabelInfo>,
    pub local_variables: Vec<LocalVariableEntry>,
    pub line_numbers: Vec<LineNumberEntry>,
    /// Maximum operand stack height, in slots.
    pub max_stack: usize,
    /// Number of local slots, including parameters and `this`.
    pub max_locals: usize,
}

impl Code {
    pub fn label_info(&self, label: Label) -> Option<&LabelInfo> {
        self.labels.get(label.index())
    }

    /// Instruction index of a marked label.
    pub fn label_position(&self, label: Label) -> Option<usize> {
        self.label_info(label).and_then(|info| info.position)
    }

    pub fn constant(&self, index: u16) -> Option<&Constant> {
        self.constants.get(index as usize)
    }

    /// Source line of the instruction at `pc`, if line numbers were recorded.
    pub fn line_number_at(&self, pc: usize) -> Option<u32> {
        self.line_numbers
            .iter()
            .filter(|entry| entry.pc <= pc)
            .max_by_key(|entry| entry.pc)
            .map(|entry| entry.line)
    }
}

impl fmt::Debug for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Code {{")?;
        writeln!(f, "  max_locals: {}", self.max_locals)?;
        writeln!(f, "  max_stack: {}", self.max_stack)?;

        if !self.constants.is_empty() {
            writeln!(f, "  constants: [")?;
            for (i, constant) in self.constants.iter().enumerate() {
                writeln!(f, "    [{}] = {:?}", i, constant)?;
            }
            writeln!(f, "  ]")?;
        } else {
            writeln!(f, "  constants: []")?;
        }

        // Only branch targets get a printed label.
        let targets: HashSet<Label> = self
            .instructions
            .iter()
            .filter_map(Instruction::branch_target)
            .collect();

        writeln!(f, "  instructions:")?;
        for (addr, instr) in self.instructions.iter().enumerate() {
            let mut label_prefix = String::new();
            for label in targets.iter() {
                if self.label_position(*label) == Some(addr) {
                    label_prefix = format!("{:?}:", label);
                }
            }
            match instr.branch_target() {
                Some(target) => {
                    let to = match self.label_position(target) {
                        Some(pos) => format!("@{}", pos),
                        None => "unmarked".into(),
                    };
                    writeln!(f, "    {:4} {:>5}  {:?} (to {})", addr, label_prefix, instr, to)?;
                }
                None => writeln!(f, "    {:4} {:>5}  {:?}", addr, label_prefix, instr)?,
            }
        }

        if !self.line_numbers.is_empty() {
            writeln!(f, "  line_numbers:")?;
            for entry in &self.line_numbers {
                writeln!(f, "    pc {} -> line {}", entry.pc, entry.line)?;
            }
        }
        if !self.local_variables.is_empty() {
            writeln!(f, "  local_variables:")?;
            for var in &self.local_variables {
                writeln!(
                    f,
                    "    [{}] {} {} ({}..{})",
                    var.index, var.name, var.descriptor, var.start, var.end
                )?;
            }
        }

        write!(f, "}}")
    }
}
