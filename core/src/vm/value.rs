//! Runtime values held in operand stack and local slots.

use alloc::rc::Rc;
use alloc::sync::Arc;
use core::fmt;

use crate::vm::LoadedClass;

#[derive(Clone)]
pub enum Value {
    /// boolean, byte, short, char and int all live in an int slot.
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Reference(Option<Rc<Object>>),
    /// Filler for the second local slot of a long or double.
    Top,
}

pub enum Object {
    String(Arc<str>),
    Instance(Instance),
}

pub struct Instance {
    class: Rc<LoadedClass>,
}

impl Instance {
    pub(crate) fn new(class: Rc<LoadedClass>) -> Self {
        Instance { class }
    }

    pub fn class(&self) -> &Rc<LoadedClass> {
        &self.class
    }
}

impl Value {
    pub const NULL: Value = Value::Reference(None);

    pub fn string(s: &str) -> Value {
        Value::Reference(Some(Rc::new(Object::String(Arc::from(s)))))
    }

    pub fn boolean(b: bool) -> Value {
        Value::Int(b as i32)
    }

    /// Operand stack slots this value occupies.
    pub fn size(&self) -> usize {
        match self {
            Value::Long(_) | Value::Double(_) => 2,
            _ => 1,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Booleans are ints; any nonzero value is true.
    pub fn as_bool(&self) -> Option<bool> {
        self.as_int().map(|v| v != 0)
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Reference(Some(object)) => match &**object {
                Object::String(s) => Some(s),
                Object::Instance(_) => None,
            },
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Reference(Some(object)) => match &**object {
                Object::Instance(instance) => Some(instance),
                Object::String(_) => None,
            },
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Reference(None))
    }

    /// Name of the value's kind, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Reference(_) => "reference",
            Value::Top => "top",
        }
    }
}

/// Primitives compare by value (floats bitwise, so NaN equals itself);
/// references by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Reference(a), Value::Reference(b)) => match (a, b) {
                (None, None) => true,
                (Some(a), Some(b)) => Rc::ptr_eq(a, b),
                _ => false,
            },
            (Value::Top, Value::Top) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "Int({})", v),
            Value::Long(v) => write!(f, "Long({})", v),
            Value::Float(v) => write!(f, "Float({:?})", v),
            Value::Double(v) => write!(f, "Double({:?})", v),
            Value::Reference(None) => write!(f, "null"),
            Value::Reference(Some(object)) => match &**object {
                Object::String(s) => write!(f, "String({:?})", s),
                Object::Instance(instance) => write!(f, "Instance({})", instance.class.name()),
            },
            Value::Top => write!(f, "Top"),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::boolean(v)
    }
}
