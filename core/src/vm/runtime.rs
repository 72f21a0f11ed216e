use alloc::rc::Rc;
use alloc::sync::Arc;
use core::cmp::Ordering;

use hashbrown::HashMap;
use thiserror::Error;
use tracing::trace;

use crate::options::ExecutionOptions;
use crate::types::Method;
use crate::vm::{
    ClassLoader, Code, ComparisonOp, Constant, Instance, Instruction, Label, MethodBody,
    MethodDefinition, Object, Stack, Value,
};
use crate::{String, ToString, Vec, format};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutionError {
    #[error("operand stack underflow at pc {pc}")]
    StackUnderflow { pc: usize },

    #[error("expected {expected} at pc {pc}, found {found}")]
    UnexpectedValue {
        pc: usize,
        expected: &'static str,
        found: &'static str,
    },

    #[error("bad constant pool reference #{index} at pc {pc}")]
    BadConstant { pc: usize, index: u16 },

    #[error("bad local variable index {index} at pc {pc}")]
    BadLocal { pc: usize, index: u16 },

    #[error("branch at pc {pc} targets unmarked label {label:?}")]
    UnresolvedLabel { pc: usize, label: Label },

    #[error("no class named {0}")]
    NoSuchClass(String),

    #[error("no such method {0}")]
    NoSuchMethod(String),

    #[error("null receiver at pc {pc} (line {line:?})")]
    NullReference { pc: usize, line: Option<u32> },

    #[error("{0} completed without returning")]
    FellOffEnd(String),

    #[error("call depth exceeded the limit of {max_depth}")]
    CallDepthExceeded { max_depth: usize },
}

/// How a piece of code finished.
#[derive(Debug, PartialEq)]
pub enum Completion {
    /// A return instruction ran; `None` for `Return`.
    Returned(Option<Value>),
    /// Control reached the end of the code; holds the operand stack, bottom
    /// to top.
    FellThrough(Vec<Value>),
}

impl Completion {
    /// The returned value, or the top of the stack left behind.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Completion::Returned(value) => value,
            Completion::FellThrough(mut stack) => stack.pop(),
        }
    }
}

/// Interpreter for code defined through a [`ClassLoader`].
pub struct VM<'l> {
    loader: &'l ClassLoader,
    options: ExecutionOptions,
    depth: usize,
    /// Interned string literals, so equal literals are the same reference.
    strings: HashMap<Arc<str>, Rc<Object>>,
}

impl<'l> VM<'l> {
    pub fn new(loader: &'l ClassLoader) -> Self {
        Self::with_options(loader, ExecutionOptions::default())
    }

    pub fn with_options(loader: &'l ClassLoader, options: ExecutionOptions) -> Self {
        VM {
            loader,
            options,
            depth: 0,
            strings: HashMap::new(),
        }
    }

    /// Runs a body directly, with `locals` as its initial local slots.
    pub fn execute(&mut self, code: &Code, locals: Vec<Value>) -> Result<Completion, ExecutionError> {
        self.run(code, locals)
    }

    /// Calls a static method of a defined class.
    pub fn invoke_static(
        &mut self,
        class: &str,
        method: &Method,
        args: &[Value],
    ) -> Result<Option<Value>, ExecutionError> {
        let loader = self.loader;
        let def = Self::lookup_static(loader, class, method)?;
        self.call(def, args.to_vec())
    }

    /// Allocates an instance of `class` and runs its nullary initializer.
    pub fn new_instance(&mut self, class: &str) -> Result<Value, ExecutionError> {
        let loader = self.loader;
        let loaded = loader
            .find_class(class)
            .ok_or_else(|| ExecutionError::NoSuchClass(class.to_string()))?;
        let init = Method::nullary_init();
        let def = loaded
            .declared_method(&init)
            .ok_or_else(|| ExecutionError::NoSuchMethod(format!("{}.{}", class, init)))?;
        let receiver = Value::Reference(Some(Rc::new(Object::Instance(Instance::new(
            loaded.clone(),
        )))));
        self.call(def, Vec::from([receiver.clone()]))?;
        Ok(receiver)
    }

    fn lookup_static(
        loader: &'l ClassLoader,
        class: &str,
        method: &Method,
    ) -> Result<&'l Rc<MethodDefinition>, ExecutionError> {
        let mut current = loader.find_class(class);
        if current.is_none() {
            return Err(ExecutionError::NoSuchClass(class.to_string()));
        }
        while let Some(loaded) = current {
            if let Some(def) = loaded.declared_method(method) {
                if def.access.is_static() {
                    return Ok(def);
                }
                break;
            }
            current = loaded.super_class();
        }
        Err(ExecutionError::NoSuchMethod(format!("{}.{}", class, method)))
    }

    fn call(
        &mut self,
        def: &MethodDefinition,
        args: Vec<Value>,
    ) -> Result<Option<Value>, ExecutionError> {
        if self.depth >= self.options.max_depth {
            return Err(ExecutionError::CallDepthExceeded {
                max_depth: self.options.max_depth,
            });
        }
        trace!(method = %def.method, depth = self.depth, "invoke");

        self.depth += 1;
        let result = match &def.body {
            MethodBody::Native(native) => native(&args),
            MethodBody::Code(code) => {
                let mut locals = Vec::with_capacity(code.max_locals);
                for arg in args {
                    let wide = arg.size() == 2;
                    locals.push(arg);
                    if wide {
                        locals.push(Value::Top);
                    }
                }
                match self.run(code, locals) {
                    Ok(Completion::Returned(value)) => Ok(value),
                    Ok(Completion::FellThrough(_)) => {
                        Err(ExecutionError::FellOffEnd(def.method.to_string()))
                    }
                    Err(e) => Err(e),
                }
            }
        };
        self.depth -= 1;
        result
    }

    fn intern(&mut self, s: &Arc<str>) -> Rc<Object> {
        self.strings
            .entry(s.clone())
            .or_insert_with(|| Rc::new(Object::String(s.clone())))
            .clone()
    }

    fn run(&mut self, code: &Code, locals: Vec<Value>) -> Result<Completion, ExecutionError> {
        let loader = self.loader;
        let mut stack: Stack = Stack::new(code.max_stack);
        let mut pc = 0;

        loop {
            let Some(instruction) = code.instructions.get(pc) else {
                return Ok(Completion::FellThrough(stack.into_vec()));
            };
            let at = pc;
            pc += 1;
            trace!(pc = at, slots = stack.slots(), ?instruction, "step");

            let jump = |label: Label| {
                code.label_position(label)
                    .ok_or(ExecutionError::UnresolvedLabel { pc: at, label })
            };
            let constant = |index: u16| {
                code.constant(index)
                    .ok_or(ExecutionError::BadConstant { pc: at, index })
            };
            let local = |index: u16| {
                locals
                    .get(index as usize)
                    .cloned()
                    .ok_or(ExecutionError::BadLocal { pc: at, index })
            };

            use Instruction::*;
            match *instruction {
                Nop => {}

                AConstNull => stack.push(Value::NULL),
                IConst(v) | BiPush(v) => stack.push(Value::Int(v as i32)),
                SiPush(v) => stack.push(Value::Int(v as i32)),
                LConst(v) => stack.push(Value::Long(v as i64)),
                FConst(v) => stack.push(Value::Float(v as f32)),
                DConst(v) => stack.push(Value::Double(v as f64)),
                Ldc(index) | Ldc2W(index) => {
                    let value = match constant(index)? {
                        Constant::Int(v) => Value::Int(*v),
                        Constant::Float(v) => Value::Float(*v),
                        Constant::Long(v) => Value::Long(*v),
                        Constant::Double(v) => Value::Double(*v),
                        Constant::String(s) => Value::Reference(Some(self.intern(s))),
                        Constant::Class(_) | Constant::Method(_) => {
                            return Err(ExecutionError::BadConstant { pc: at, index });
                        }
                    };
                    stack.push(value);
                }

                ILoad(index) | LLoad(index) | FLoad(index) | DLoad(index) | ALoad(index) => {
                    stack.push(local(index)?);
                }

                Pop => {
                    pop(&mut stack, at)?;
                }
                Pop2 => {
                    if pop(&mut stack, at)?.size() == 1 {
                        pop(&mut stack, at)?;
                    }
                }
                Dup => {
                    let top = stack.peek().cloned().ok_or(ExecutionError::StackUnderflow { pc: at })?;
                    stack.push(top);
                }
                Dup2 => {
                    let top = pop(&mut stack, at)?;
                    if top.size() == 2 {
                        stack.push(top.clone());
                        stack.push(top);
                    } else {
                        let below = pop(&mut stack, at)?;
                        stack.push(below.clone());
                        stack.push(top.clone());
                        stack.push(below);
                        stack.push(top);
                    }
                }

                I2L => {
                    let v = pop_int(&mut stack, at)?;
                    stack.push(Value::Long(v as i64));
                }
                I2F => {
                    let v = pop_int(&mut stack, at)?;
                    stack.push(Value::Float(v as f32));
                }
                I2D => {
                    let v = pop_int(&mut stack, at)?;
                    stack.push(Value::Double(v as f64));
                }
                L2I => {
                    let v = pop_long(&mut stack, at)?;
                    stack.push(Value::Int(v as i32));
                }
                L2F => {
                    let v = pop_long(&mut stack, at)?;
                    stack.push(Value::Float(v as f32));
                }
                L2D => {
                    let v = pop_long(&mut stack, at)?;
                    stack.push(Value::Double(v as f64));
                }
                // `as` saturates and maps NaN to zero, which matches the
                // machine's float-to-integer rules.
                F2I => {
                    let v = pop_float(&mut stack, at)?;
                    stack.push(Value::Int(v as i32));
                }
                F2L => {
                    let v = pop_float(&mut stack, at)?;
                    stack.push(Value::Long(v as i64));
                }
                F2D => {
                    let v = pop_float(&mut stack, at)?;
                    stack.push(Value::Double(v as f64));
                }
                D2I => {
                    let v = pop_double(&mut stack, at)?;
                    stack.push(Value::Int(v as i32));
                }
                D2L => {
                    let v = pop_double(&mut stack, at)?;
                    stack.push(Value::Long(v as i64));
                }
                D2F => {
                    let v = pop_double(&mut stack, at)?;
                    stack.push(Value::Float(v as f32));
                }
                I2B => {
                    let v = pop_int(&mut stack, at)?;
                    stack.push(Value::Int(v as i8 as i32));
                }
                I2C => {
                    let v = pop_int(&mut stack, at)?;
                    stack.push(Value::Int(v as u16 as i32));
                }
                I2S => {
                    let v = pop_int(&mut stack, at)?;
                    stack.push(Value::Int(v as i16 as i32));
                }

                LCmp => {
                    let b = pop_long(&mut stack, at)?;
                    let a = pop_long(&mut stack, at)?;
                    stack.push(Value::Int(ordering_to_int(a.cmp(&b))));
                }
                FCmpL | FCmpG => {
                    let b = pop_float(&mut stack, at)?;
                    let a = pop_float(&mut stack, at)?;
                    let nan = if matches!(instruction, FCmpL) { -1 } else { 1 };
                    stack.push(Value::Int(a.partial_cmp(&b).map_or(nan, ordering_to_int)));
                }
                DCmpL | DCmpG => {
                    let b = pop_double(&mut stack, at)?;
                    let a = pop_double(&mut stack, at)?;
                    let nan = if matches!(instruction, DCmpL) { -1 } else { 1 };
                    stack.push(Value::Int(a.partial_cmp(&b).map_or(nan, ordering_to_int)));
                }

                If(op, label) => {
                    let v = pop_int(&mut stack, at)?;
                    if op.holds(v.cmp(&0)) {
                        pc = jump(label)?;
                    }
                }
                IfICmp(op, label) => {
                    let b = pop_int(&mut stack, at)?;
                    let a = pop_int(&mut stack, at)?;
                    if op.holds(a.cmp(&b)) {
                        pc = jump(label)?;
                    }
                }
                IfACmp(op, label) => {
                    let b = pop(&mut stack, at)?;
                    let a = pop(&mut stack, at)?;
                    let same = match (&a, &b) {
                        (Value::Reference(_), Value::Reference(_)) => a == b,
                        (Value::Reference(_), other) | (other, _) => {
                            return Err(ExecutionError::UnexpectedValue {
                                pc: at,
                                expected: "reference",
                                found: other.kind_name(),
                            });
                        }
                    };
                    let taken = match op {
                        ComparisonOp::Eq => same,
                        ComparisonOp::Ne => !same,
                        _ => {
                            return Err(ExecutionError::UnexpectedValue {
                                pc: at,
                                expected: "EQ or NE reference comparison",
                                found: op.mnemonic(),
                            });
                        }
                    };
                    if taken {
                        pc = jump(label)?;
                    }
                }
                IfNull(label) | IfNonNull(label) => {
                    let is_null = pop_reference(&mut stack, at)?.is_none();
                    if is_null == matches!(instruction, IfNull(_)) {
                        pc = jump(label)?;
                    }
                }
                Goto(label) => pc = jump(label)?,

                New(index) => {
                    let Constant::Class(name) = constant(index)? else {
                        return Err(ExecutionError::BadConstant { pc: at, index });
                    };
                    let class = loader
                        .find_class(name)
                        .ok_or_else(|| ExecutionError::NoSuchClass(name.to_string()))?;
                    stack.push(Value::Reference(Some(Rc::new(Object::Instance(
                        Instance::new(class.clone()),
                    )))));
                }
                InvokeSpecial(index) | InvokeStatic(index) => {
                    let Constant::Method(method_ref) = constant(index)? else {
                        return Err(ExecutionError::BadConstant { pc: at, index });
                    };
                    let method = method_ref.method();
                    let argc = method.descriptor().params().len();
                    let mut args = Vec::with_capacity(argc + 1);
                    for _ in 0..argc {
                        args.push(pop(&mut stack, at)?);
                    }

                    let def = if matches!(instruction, InvokeSpecial(_)) {
                        let receiver = pop(&mut stack, at)?;
                        if receiver.is_null() {
                            return Err(ExecutionError::NullReference {
                                pc: at,
                                line: code.line_number_at(at),
                            });
                        }
                        args.push(receiver);
                        loader
                            .find_class(method_ref.owner())
                            .and_then(|class| class.declared_method(method))
                            .ok_or_else(|| ExecutionError::NoSuchMethod(method_ref.to_string()))?
                    } else {
                        Self::lookup_static(loader, method_ref.owner(), method)?
                    };
                    args.reverse();

                    if let Some(result) = self.call(def, args)? {
                        stack.push(result);
                    }
                }

                IReturn | LReturn | FReturn | DReturn | AReturn => {
                    return Ok(Completion::Returned(Some(pop(&mut stack, at)?)));
                }
                Return => return Ok(Completion::Returned(None)),
            }
        }
    }
}

fn ordering_to_int(ordering: Ordering) -> i32 {
    match ordering {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}

fn pop(stack: &mut Stack, pc: usize) -> Result<Value, ExecutionError> {
    stack.pop().ok_or(ExecutionError::StackUnderflow { pc })
}

fn unexpected(pc: usize, expected: &'static str, found: &Value) -> ExecutionError {
    ExecutionError::UnexpectedValue {
        pc,
        expected,
        found: found.kind_name(),
    }
}

fn pop_int(stack: &mut Stack, pc: usize) -> Result<i32, ExecutionError> {
    match pop(stack, pc)? {
        Value::Int(v) => Ok(v),
        other => Err(unexpected(pc, "int", &other)),
    }
}

fn pop_long(stack: &mut Stack, pc: usize) -> Result<i64, ExecutionError> {
    match pop(stack, pc)? {
        Value::Long(v) => Ok(v),
        other => Err(unexpected(pc, "long", &other)),
    }
}

fn pop_float(stack: &mut Stack, pc: usize) -> Result<f32, ExecutionError> {
    match pop(stack, pc)? {
        Value::Float(v) => Ok(v),
        other => Err(unexpected(pc, "float", &other)),
    }
}

fn pop_double(stack: &mut Stack, pc: usize) -> Result<f64, ExecutionError> {
    match pop(stack, pc)? {
        Value::Double(v) => Ok(v),
        other => Err(unexpected(pc, "double", &other)),
    }
}

fn pop_reference(stack: &mut Stack, pc: usize) -> Result<Option<Rc<Object>>, ExecutionError> {
    match pop(stack, pc)? {
        Value::Reference(r) => Ok(r),
        other => Err(unexpected(pc, "reference", &other)),
    }
}
