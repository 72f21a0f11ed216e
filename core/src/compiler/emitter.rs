//! Instruction emission for a single method body.

use alloc::sync::Arc;

use hashbrown::HashMap;
use tracing::trace;

use crate::errors::CodegenError;
use crate::options::EmitOptions;
use crate::types::{Method, MethodRef, PrimitiveKind, TypeDescriptor};
use crate::vm::{
    Access, Code, ComparisonOp, Constant, ConstantKey, Instruction, Label, LabelInfo,
    LineNumberEntry, LocalVariableEntry, MethodBody, MethodContext, MethodDefinition, verify,
};
use crate::{String, ToString, Vec};

/// Largest constant pool index an instruction can address.
const MAX_CONSTANTS: usize = u16::MAX as usize + 1;

#[derive(Debug, Clone, Copy)]
struct LabelState {
    position: Option<usize>,
    debug_only: bool,
    /// Operand stack depth on entry, once a branch or a fallthrough fixes it.
    depth: Option<usize>,
    /// Used as a branch target or as a debug-table bound.
    referenced: bool,
}

struct PendingLocal {
    name: String,
    descriptor: TypeDescriptor,
    index: u16,
    start: Label,
    end: Label,
}

/// Emits one method body.
///
/// The emitter tracks the operand stack depth in slots while emitting. After
/// an unconditional transfer (`goto`, a return) the stream is unreachable
/// until a label with a known entry depth is marked; debug labels never
/// restore reachability.
pub struct CodeEmitter {
    access: Access,
    method: Method,
    options: EmitOptions,

    instructions: Vec<Instruction>,
    constants: Vec<Constant>,
    /// Constant deduplication map: entry -> pool index.
    constant_map: HashMap<ConstantKey, u16>,
    too_many_constants: bool,

    labels: Vec<LabelState>,
    local_variables: Vec<PendingLocal>,
    line_numbers: Vec<(u32, Label)>,

    /// Current stack depth, `None` while unreachable.
    stack_depth: Option<usize>,
    max_stack: usize,
    max_locals: usize,
}

impl CodeEmitter {
    pub fn new(access: Access, method: Method, options: EmitOptions) -> Self {
        let receiver = if access.is_static() { 0 } else { 1 };
        let max_locals = receiver + method.descriptor().argument_slots();
        CodeEmitter {
            access,
            method,
            options,
            instructions: Vec::new(),
            constants: Vec::new(),
            constant_map: HashMap::new(),
            too_many_constants: false,
            labels: Vec::new(),
            local_variables: Vec::new(),
            line_numbers: Vec::new(),
            stack_depth: Some(0),
            max_stack: 0,
            max_locals,
        }
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Current operand stack depth in slots; `None` in unreachable code.
    pub fn stack_depth(&self) -> Option<usize> {
        self.stack_depth
    }

    // === Stack Management ===

    fn push_stack(&mut self, slots: usize) {
        if let Some(depth) = &mut self.stack_depth {
            *depth += slots;
            self.max_stack = self.max_stack.max(*depth);
        }
    }

    fn pop_stack(&mut self, slots: usize) {
        if let Some(depth) = &mut self.stack_depth {
            debug_assert!(
                *depth >= slots,
                "Stack underflow: trying to pop {} but depth is {}",
                slots,
                depth
            );
            *depth = depth.saturating_sub(slots);
        }
    }

    fn emit(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// Adds a constant to the pool (or reuses an existing entry) and returns
    /// its index.
    fn add_constant(&mut self, constant: Constant) -> u16 {
        let key = constant.key();
        if let Some(&index) = self.constant_map.get(&key) {
            return index;
        }
        let Ok(index) = u16::try_from(self.constants.len()) else {
            // Reported by `into_code`.
            self.too_many_constants = true;
            return 0;
        };
        self.constants.push(constant);
        self.constant_map.insert(key, index);
        index
    }

    // === Literal Pushes ===

    pub fn push_bool(&mut self, value: bool) {
        self.emit(Instruction::IConst(value as i8));
        self.push_stack(1);
    }

    /// Pushes a UTF-16 code unit.
    pub fn push_char(&mut self, value: u16) {
        self.push_int(value as i32);
    }

    pub fn push_int(&mut self, value: i32) {
        let instruction = if (-1..=5).contains(&value) {
            Instruction::IConst(value as i8)
        } else if let Ok(byte) = i8::try_from(value) {
            Instruction::BiPush(byte)
        } else if let Ok(short) = i16::try_from(value) {
            Instruction::SiPush(short)
        } else {
            Instruction::Ldc(self.add_constant(Constant::Int(value)))
        };
        self.emit(instruction);
        self.push_stack(1);
    }

    pub fn push_long(&mut self, value: i64) {
        let instruction = match value {
            0 | 1 => Instruction::LConst(value as u8),
            _ => Instruction::Ldc2W(self.add_constant(Constant::Long(value))),
        };
        self.emit(instruction);
        self.push_stack(2);
    }

    pub fn push_float(&mut self, value: f32) {
        // Bitwise, so -0.0 goes through the pool.
        let bits = value.to_bits();
        let instruction = if [0.0f32, 1.0, 2.0].iter().any(|c| c.to_bits() == bits) {
            Instruction::FConst(value as u8)
        } else {
            Instruction::Ldc(self.add_constant(Constant::Float(value)))
        };
        self.emit(instruction);
        self.push_stack(1);
    }

    pub fn push_double(&mut self, value: f64) {
        let bits = value.to_bits();
        let instruction = if [0.0f64, 1.0].iter().any(|c| c.to_bits() == bits) {
            Instruction::DConst(value as u8)
        } else {
            Instruction::Ldc2W(self.add_constant(Constant::Double(value)))
        };
        self.emit(instruction);
        self.push_stack(2);
    }

    pub fn push_str(&mut self, value: &str) {
        let index = self.add_constant(Constant::String(Arc::from(value)));
        self.emit(Instruction::Ldc(index));
        self.push_stack(1);
    }

    pub fn push_null(&mut self) {
        self.emit(Instruction::AConstNull);
        self.push_stack(1);
    }

    // === Stack Operations ===

    /// Converts the numeric value on top of the stack from `from` to `to`.
    /// Targets narrower than `int` go through `int`.
    ///
    /// # Panics
    ///
    /// Panics if either type is not a numeric primitive.
    pub fn cast(&mut self, from: &TypeDescriptor, to: &TypeDescriptor) {
        let (Some(from_kind), Some(to_kind)) = (from.primitive_kind(), to.primitive_kind()) else {
            panic!("cannot cast from {} to {}", from, to);
        };
        self.cast_kind(from_kind, to_kind);
    }

    fn cast_kind(&mut self, from: PrimitiveKind, to: PrimitiveKind) {
        use Instruction::*;
        use PrimitiveKind as P;

        if from == to {
            return;
        }
        assert!(
            from.is_numeric() && to.is_numeric(),
            "cannot cast from {} to {}",
            from,
            to
        );

        let (instruction, produced) = match (from, to) {
            (P::Double, P::Float) => (D2F, P::Float),
            (P::Double, P::Long) => (D2L, P::Long),
            (P::Double, _) => (D2I, P::Int),
            (P::Float, P::Double) => (F2D, P::Double),
            (P::Float, P::Long) => (F2L, P::Long),
            (P::Float, _) => (F2I, P::Int),
            (P::Long, P::Double) => (L2D, P::Double),
            (P::Long, P::Float) => (L2F, P::Float),
            (P::Long, _) => (L2I, P::Int),
            (_, P::Byte) => (I2B, P::Byte),
            (_, P::Char) => (I2C, P::Char),
            (_, P::Short) => (I2S, P::Short),
            (_, P::Double) => (I2D, P::Double),
            (_, P::Float) => (I2F, P::Float),
            (_, P::Long) => (I2L, P::Long),
            // Int-like to int.
            _ => return,
        };
        self.emit(instruction);
        self.pop_stack(from.size());
        self.push_stack(produced.size());
        if produced != to {
            self.cast_kind(P::Int, to);
        }
    }

    pub fn dup(&mut self) {
        self.emit(Instruction::Dup);
        self.push_stack(1);
    }

    pub fn dup2(&mut self) {
        self.emit(Instruction::Dup2);
        self.push_stack(2);
    }

    pub fn pop(&mut self) {
        self.emit(Instruction::Pop);
        self.pop_stack(1);
    }

    pub fn pop2(&mut self) {
        self.emit(Instruction::Pop2);
        self.pop_stack(2);
    }

    // === Branches ===

    /// Compares the two values of type `ty` on top of the stack and jumps to
    /// `label` if `op` holds.
    ///
    /// # Panics
    ///
    /// Panics on an ordering comparison of references, or on `void` and
    /// method types.
    pub fn if_cmp(&mut self, ty: &TypeDescriptor, op: ComparisonOp, label: Label) {
        use Instruction::*;

        match ty {
            TypeDescriptor::Primitive(PrimitiveKind::Long) => {
                self.emit(LCmp);
                self.pop_stack(4);
                self.push_stack(1);
                self.if_zcmp(op, label);
            }
            TypeDescriptor::Primitive(PrimitiveKind::Double) => {
                let compare = if is_greater(op) { DCmpL } else { DCmpG };
                self.emit(compare);
                self.pop_stack(4);
                self.push_stack(1);
                self.if_zcmp(op, label);
            }
            TypeDescriptor::Primitive(PrimitiveKind::Float) => {
                let compare = if is_greater(op) { FCmpL } else { FCmpG };
                self.emit(compare);
                self.pop_stack(2);
                self.push_stack(1);
                self.if_zcmp(op, label);
            }
            TypeDescriptor::Object(_) | TypeDescriptor::Array(_) => {
                assert!(
                    !op.is_ordering(),
                    "bad comparison operator {} for type {}",
                    op,
                    ty
                );
                self.emit(IfACmp(op, label));
                self.pop_stack(2);
                self.branch_to(label);
            }
            TypeDescriptor::Primitive(_) => {
                self.emit(IfICmp(op, label));
                self.pop_stack(2);
                self.branch_to(label);
            }
            TypeDescriptor::Void | TypeDescriptor::Method(_) => {
                panic!("cannot compare values of type {}", ty)
            }
        }
    }

    /// Jumps to `label` if `op` holds between the int on top of the stack and
    /// zero.
    pub fn if_zcmp(&mut self, op: ComparisonOp, label: Label) {
        self.emit(Instruction::If(op, label));
        self.pop_stack(1);
        self.branch_to(label);
    }

    pub fn if_null(&mut self, label: Label) {
        self.emit(Instruction::IfNull(label));
        self.pop_stack(1);
        self.branch_to(label);
    }

    pub fn if_non_null(&mut self, label: Label) {
        self.emit(Instruction::IfNonNull(label));
        self.pop_stack(1);
        self.branch_to(label);
    }

    pub fn goto(&mut self, label: Label) {
        self.emit(Instruction::Goto(label));
        self.branch_to(label);
        self.stack_depth = None;
    }

    fn branch_to(&mut self, label: Label) {
        let depth = self.stack_depth;
        // Branches to debug labels are left for the verifier to reject.
        let state = &mut self.labels[label.index()];
        state.referenced = true;
        match (state.depth, depth) {
            (None, Some(depth)) => state.depth = Some(depth),
            (Some(expected), Some(depth)) => debug_assert_eq!(
                expected, depth,
                "stack depth mismatch at branch to {:?}",
                label
            ),
            _ => {}
        }
    }

    // === Labels ===

    pub fn new_label(&mut self) -> Label {
        self.allocate_label(false)
    }

    /// A label for attaching position metadata only. It must never be used
    /// as a branch target; the verifier rejects branches to it.
    pub fn new_debug_label(&mut self) -> Label {
        self.allocate_label(true)
    }

    fn allocate_label(&mut self, debug_only: bool) -> Label {
        let label = Label(self.labels.len() as u32);
        self.labels.push(LabelState {
            position: None,
            debug_only,
            depth: None,
            referenced: false,
        });
        label
    }

    /// Marks `label` at the current position.
    ///
    /// # Panics
    ///
    /// Panics if the label was already marked.
    pub fn mark(&mut self, label: Label) {
        let position = self.instructions.len();
        let current = self.stack_depth;
        let state = &mut self.labels[label.index()];
        assert!(state.position.is_none(), "{:?} is marked twice", label);
        state.position = Some(position);
        if state.debug_only {
            return;
        }
        match (current, state.depth) {
            (None, depth) => self.stack_depth = depth,
            (Some(depth), None) => state.depth = Some(depth),
            (Some(depth), Some(expected)) => debug_assert_eq!(
                expected, depth,
                "stack depth mismatch on fallthrough into {:?}",
                label
            ),
        }
    }

    /// Creates a label and marks it at the current position.
    pub fn mark_new(&mut self) -> Label {
        let label = self.new_label();
        self.mark(label);
        label
    }

    // === Locals, Objects and Calls ===

    /// # Panics
    ///
    /// Panics in a static method.
    pub fn load_this(&mut self) {
        assert!(
            !self.access.is_static(),
            "no receiver in static method {}",
            self.method
        );
        self.emit(Instruction::ALoad(0));
        self.push_stack(1);
    }

    /// Loads local `index`, which holds a value of type `ty`.
    pub fn load_local(&mut self, index: u16, ty: &TypeDescriptor) {
        let instruction = match ty {
            TypeDescriptor::Primitive(PrimitiveKind::Long) => Instruction::LLoad(index),
            TypeDescriptor::Primitive(PrimitiveKind::Float) => Instruction::FLoad(index),
            TypeDescriptor::Primitive(PrimitiveKind::Double) => Instruction::DLoad(index),
            TypeDescriptor::Primitive(_) => Instruction::ILoad(index),
            TypeDescriptor::Object(_) | TypeDescriptor::Array(_) => Instruction::ALoad(index),
            TypeDescriptor::Void | TypeDescriptor::Method(_) => {
                panic!("cannot load a local of type {}", ty)
            }
        };
        self.emit(instruction);
        self.push_stack(ty.size());
        self.max_locals = self.max_locals.max(index as usize + ty.size());
    }

    /// Allocates an uninitialized instance of the object type `ty`.
    pub fn new_instance(&mut self, ty: &TypeDescriptor) {
        let TypeDescriptor::Object(name) = ty else {
            panic!("cannot instantiate {}", ty);
        };
        let index = self.add_constant(Constant::Class(name.clone()));
        self.emit(Instruction::New(index));
        self.push_stack(1);
    }

    /// Invokes initializer `method` of `owner` on the receiver below the
    /// arguments.
    pub fn invoke_constructor(&mut self, owner: &TypeDescriptor, method: &Method) {
        let TypeDescriptor::Object(name) = owner else {
            panic!("{} has no constructors", owner);
        };
        let index = self.add_constant(Constant::Method(MethodRef::new(name, method.clone())));
        self.emit(Instruction::InvokeSpecial(index));
        self.pop_stack(1 + method.descriptor().argument_slots());
        self.push_stack(method.return_type().size());
    }

    pub fn invoke_static(&mut self, method: &MethodRef) {
        let descriptor = method.method().descriptor();
        let arguments = descriptor.argument_slots();
        let returned = descriptor.return_type().size();
        let index = self.add_constant(Constant::Method(method.clone()));
        self.emit(Instruction::InvokeStatic(index));
        self.pop_stack(arguments);
        self.push_stack(returned);
    }

    /// Returns the value on top of the stack, typed by the method's return
    /// type.
    pub fn return_value(&mut self) {
        let return_type = self.method.return_type();
        let instruction = match return_type {
            TypeDescriptor::Void => Instruction::Return,
            TypeDescriptor::Primitive(PrimitiveKind::Long) => Instruction::LReturn,
            TypeDescriptor::Primitive(PrimitiveKind::Float) => Instruction::FReturn,
            TypeDescriptor::Primitive(PrimitiveKind::Double) => Instruction::DReturn,
            TypeDescriptor::Primitive(_) => Instruction::IReturn,
            TypeDescriptor::Object(_) | TypeDescriptor::Array(_) => Instruction::AReturn,
            TypeDescriptor::Method(_) => panic!("{} is not a return type", return_type),
        };
        let size = return_type.size();
        self.emit(instruction);
        self.pop_stack(size);
        self.stack_depth = None;
    }

    // === Debug Tables ===

    /// Records a local-variable table entry covering `start..end`. Dropped
    /// when debug info is off.
    pub fn visit_local_variable(
        &mut self,
        name: &str,
        ty: &TypeDescriptor,
        start: Label,
        end: Label,
        index: u16,
    ) {
        self.max_locals = self.max_locals.max(index as usize + ty.size());
        if !self.options.debug_info {
            return;
        }
        self.labels[start.index()].referenced = true;
        self.labels[end.index()].referenced = true;
        self.local_variables.push(PendingLocal {
            name: name.to_string(),
            descriptor: ty.clone(),
            index,
            start,
            end,
        });
    }

    /// Records that the instructions from `start` on come from source `line`.
    pub fn visit_line_number(&mut self, line: u32, start: Label) {
        if !self.options.debug_info {
            return;
        }
        self.labels[start.index()].referenced = true;
        self.line_numbers.push((line, start));
    }

    // === Finishing ===

    /// Resolves labels and debug tables into a [`Code`] without verifying it.
    pub fn into_code(self) -> Result<Code, CodegenError> {
        if self.too_many_constants {
            return Err(CodegenError::TooManyConstants {
                limit: MAX_CONSTANTS,
            });
        }
        for (i, state) in self.labels.iter().enumerate() {
            if state.referenced && state.position.is_none() {
                return Err(CodegenError::UnmarkedLabel(Label(i as u32)));
            }
        }

        let position = |label: Label| self.labels[label.index()].position.unwrap_or_default();
        let local_variables = self
            .local_variables
            .iter()
            .map(|local| LocalVariableEntry {
                name: local.name.clone(),
                descriptor: local.descriptor.clone(),
                index: local.index,
                start: position(local.start),
                end: position(local.end),
            })
            .collect();
        let line_numbers = self
            .line_numbers
            .iter()
            .map(|&(line, start)| LineNumberEntry {
                pc: position(start),
                line,
            })
            .collect();
        let labels = self
            .labels
            .iter()
            .map(|state| LabelInfo {
                position: state.position,
                debug_only: state.debug_only,
            })
            .collect();

        trace!(
            method = %self.method,
            instructions = self.instructions.len(),
            max_stack = self.max_stack,
            "method emitted"
        );

        Ok(Code {
            instructions: self.instructions,
            constants: self.constants,
            labels,
            local_variables,
            line_numbers,
            max_stack: self.max_stack,
            max_locals: self.max_locals,
        })
    }

    /// Finishes the method, verifying its body when
    /// [`EmitOptions::verify`] is set.
    pub fn end_method(self) -> Result<MethodDefinition, CodegenError> {
        let access = self.access;
        let method = self.method.clone();
        let check = self.options.verify;
        let code = self.into_code()?;
        if check {
            verify(
                &code,
                MethodContext {
                    access,
                    descriptor: method.descriptor(),
                },
            )?;
        }
        Ok(MethodDefinition {
            access,
            method,
            body: MethodBody::Code(code),
        })
    }
}

/// NaN must make `>` and `>=` false, so those use the compare that yields -1
/// for unordered operands.
fn is_greater(op: ComparisonOp) -> bool {
    matches!(op, ComparisonOp::Gt | ComparisonOp::Ge)
}
