//! Type descriptors.
//!
//! A [`TypeDescriptor`] names the type of a value the target machine can hold:
//! a primitive kind, an object class, an array, `void` (return position only),
//! or a method shape. Descriptors are immutable and cheap to clone; object
//! names and array elements are shared behind `Arc`s so a descriptor can be
//! handed between compilation threads.
//!
//! The textual form follows the JVM descriptor grammar:
//!
//! ```text
//! I                      int
//! [[J                    long[][]
//! Ljava/lang/String;     java.lang.String
//! (IJ)Z                  boolean (int, long)
//! ```

use alloc::sync::Arc;
use core::fmt;

use crate::errors::CodegenError;
use crate::types::PrimitiveKind;
use crate::{String, ToString, Vec, format};

/// Internal name of the root class.
pub const OBJECT_INTERNAL_NAME: &str = "java/lang/Object";
/// Internal name of the text class.
pub const STRING_INTERNAL_NAME: &str = "java/lang/String";

/// Maximum number of array dimensions a descriptor may carry.
pub const MAX_ARRAY_DIMENSIONS: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    Primitive(PrimitiveKind),
    Void,
    /// Object type, by internal (slash separated) name.
    Object(Arc<str>),
    /// Array type, by element type. Elements are never `Void` or `Method`;
    /// build arrays with [`TypeDescriptor::array_of`] or
    /// [`TypeDescriptor::parse`], which check this. Values built directly
    /// are caught by [`TypeDescriptor::is_well_formed`].
    Array(Arc<TypeDescriptor>),
    Method(Arc<MethodDescriptor>),
}

static_assertions::assert_impl_all!(TypeDescriptor: Send, Sync);

/// Parameter and return types of a method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    params: Vec<TypeDescriptor>,
    return_type: TypeDescriptor,
}

impl TypeDescriptor {
    pub const BOOLEAN: TypeDescriptor = TypeDescriptor::Primitive(PrimitiveKind::Boolean);
    pub const BYTE: TypeDescriptor = TypeDescriptor::Primitive(PrimitiveKind::Byte);
    pub const SHORT: TypeDescriptor = TypeDescriptor::Primitive(PrimitiveKind::Short);
    pub const CHAR: TypeDescriptor = TypeDescriptor::Primitive(PrimitiveKind::Char);
    pub const INT: TypeDescriptor = TypeDescriptor::Primitive(PrimitiveKind::Int);
    pub const LONG: TypeDescriptor = TypeDescriptor::Primitive(PrimitiveKind::Long);
    pub const FLOAT: TypeDescriptor = TypeDescriptor::Primitive(PrimitiveKind::Float);
    pub const DOUBLE: TypeDescriptor = TypeDescriptor::Primitive(PrimitiveKind::Double);
    pub const VOID: TypeDescriptor = TypeDescriptor::Void;

    /// Object type for the given class name. Dotted names are accepted and
    /// normalized to internal form.
    pub fn object(name: &str) -> TypeDescriptor {
        if name.contains('.') {
            TypeDescriptor::Object(Arc::from(name.replace('.', "/")))
        } else {
            TypeDescriptor::Object(Arc::from(name))
        }
    }

    pub fn object_type() -> TypeDescriptor {
        TypeDescriptor::object(OBJECT_INTERNAL_NAME)
    }

    pub fn string_type() -> TypeDescriptor {
        TypeDescriptor::object(STRING_INTERNAL_NAME)
    }

    /// Array type with the given element type.
    pub fn array_of(element: TypeDescriptor) -> Result<TypeDescriptor, CodegenError> {
        match element {
            TypeDescriptor::Void | TypeDescriptor::Method(_) => Err(CodegenError::InvalidType(
                format!("{} cannot be an array element type", element),
            )),
            _ if element.dimensions() >= MAX_ARRAY_DIMENSIONS => {
                Err(CodegenError::InvalidDescriptor {
                    descriptor: format!("[{}", element),
                    reason: "too many array dimensions".to_string(),
                })
            }
            _ => Ok(TypeDescriptor::Array(Arc::new(element))),
        }
    }

    pub fn method(descriptor: MethodDescriptor) -> TypeDescriptor {
        TypeDescriptor::Method(Arc::new(descriptor))
    }

    /// Parses a field or method descriptor (`"I"`, `"[Ljava/lang/String;"`,
    /// `"(IJ)V"`). `"V"` is accepted on its own.
    pub fn parse(descriptor: &str) -> Result<TypeDescriptor, CodegenError> {
        let mut parser = DescriptorParser::new(descriptor);
        let parsed = if descriptor.starts_with('(') {
            TypeDescriptor::method(parser.method()?)
        } else {
            parser.return_type()?
        };
        parser.finish()?;
        Ok(parsed)
    }

    /// Builds a descriptor from a source-level class name: `"int"`,
    /// `"java.lang.String"`, `"int[][]"`, `"void"`.
    pub fn from_class_name(name: &str) -> Result<TypeDescriptor, CodegenError> {
        let mut base = name;
        let mut dimensions = 0;
        while let Some(stripped) = base.strip_suffix("[]") {
            base = stripped;
            dimensions += 1;
        }
        let invalid = |reason: &str| CodegenError::InvalidDescriptor {
            descriptor: name.to_string(),
            reason: reason.to_string(),
        };
        if base.is_empty() || base.contains(['[', ']', ';', '/', '(', ')']) {
            return Err(invalid("not a class name"));
        }
        let mut ty = match PrimitiveKind::from_name(base) {
            Some(kind) => TypeDescriptor::Primitive(kind),
            None if base == "void" => TypeDescriptor::Void,
            None => TypeDescriptor::object(base),
        };
        for _ in 0..dimensions {
            ty = TypeDescriptor::array_of(ty).map_err(|_| invalid("invalid array element"))?;
        }
        Ok(ty)
    }

    /// Operand stack slots taken by a value of this type. `void` and method
    /// shapes take none.
    pub fn size(&self) -> usize {
        match self {
            TypeDescriptor::Primitive(kind) => kind.size(),
            TypeDescriptor::Void | TypeDescriptor::Method(_) => 0,
            TypeDescriptor::Object(_) | TypeDescriptor::Array(_) => 1,
        }
    }

    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self {
            TypeDescriptor::Primitive(kind) => Some(*kind),
            _ => None,
        }
    }

    /// True for byte, short, char, int, long, float and double.
    pub fn is_numeric_primitive(&self) -> bool {
        self.primitive_kind().is_some_and(PrimitiveKind::is_numeric)
    }

    /// True for object and array types.
    pub fn is_reference(&self) -> bool {
        matches!(self, TypeDescriptor::Object(_) | TypeDescriptor::Array(_))
    }

    /// True for anything that can be stored in a local or pushed on the stack.
    pub fn is_value_type(&self) -> bool {
        !matches!(self, TypeDescriptor::Void | TypeDescriptor::Method(_))
    }

    /// False for an array whose element, at any depth, is `void` or a method
    /// shape.
    pub fn is_well_formed(&self) -> bool {
        match self {
            TypeDescriptor::Array(element) => element.is_value_type() && element.is_well_formed(),
            _ => true,
        }
    }

    /// Component type of an array descriptor.
    pub fn element_type(&self) -> Option<&TypeDescriptor> {
        match self {
            TypeDescriptor::Array(element) => Some(element),
            _ => None,
        }
    }

    pub fn dimensions(&self) -> usize {
        let mut dimensions = 0;
        let mut current = self;
        while let TypeDescriptor::Array(element) = current {
            dimensions += 1;
            current = element;
        }
        dimensions
    }

    /// Internal name of an object type, or the descriptor of an array type
    /// (which is how arrays are named in the constant pool).
    pub fn internal_name(&self) -> Option<String> {
        match self {
            TypeDescriptor::Object(name) => Some(name.to_string()),
            TypeDescriptor::Array(_) => Some(self.to_string()),
            _ => None,
        }
    }

    /// Source-level name: `"int"`, `"java.lang.String"`, `"int[][]"`.
    pub fn class_name(&self) -> String {
        match self {
            TypeDescriptor::Primitive(kind) => kind.name().to_string(),
            TypeDescriptor::Void => "void".to_string(),
            TypeDescriptor::Object(name) => name.replace('/', "."),
            TypeDescriptor::Array(element) => format!("{}[]", element.class_name()),
            TypeDescriptor::Method(method) => method.to_string(),
        }
    }

    /// The descriptor string, e.g. `"[I"`.
    pub fn descriptor(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Primitive(kind) => write!(f, "{}", kind.descriptor_char()),
            TypeDescriptor::Void => f.write_str("V"),
            TypeDescriptor::Object(name) => write!(f, "L{};", name),
            TypeDescriptor::Array(element) => write!(f, "[{}", element),
            TypeDescriptor::Method(method) => write!(f, "{}", method),
        }
    }
}

impl MethodDescriptor {
    /// Creates a method shape. Parameters must be value types; the return type
    /// must be a value type or `void`.
    pub fn new(
        params: Vec<TypeDescriptor>,
        return_type: TypeDescriptor,
    ) -> Result<MethodDescriptor, CodegenError> {
        if let Some(bad) = params.iter().find(|param| !param.is_value_type()) {
            return Err(CodegenError::InvalidType(format!(
                "{} cannot be a parameter type",
                bad
            )));
        }
        if let TypeDescriptor::Method(_) = return_type {
            return Err(CodegenError::InvalidType(format!(
                "{} cannot be a return type",
                return_type
            )));
        }
        Ok(MethodDescriptor {
            params,
            return_type,
        })
    }

    /// `()V`
    pub fn nullary_void() -> MethodDescriptor {
        MethodDescriptor {
            params: Vec::new(),
            return_type: TypeDescriptor::Void,
        }
    }

    pub fn parse(descriptor: &str) -> Result<MethodDescriptor, CodegenError> {
        let mut parser = DescriptorParser::new(descriptor);
        let method = parser.method()?;
        parser.finish()?;
        Ok(method)
    }

    pub fn params(&self) -> &[TypeDescriptor] {
        &self.params
    }

    pub fn return_type(&self) -> &TypeDescriptor {
        &self.return_type
    }

    /// Local slots taken by the parameters (long/double count twice).
    pub fn argument_slots(&self) -> usize {
        self.params.iter().map(TypeDescriptor::size).sum()
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for param in &self.params {
            write!(f, "{}", param)?;
        }
        write!(f, "){}", self.return_type)
    }
}

struct DescriptorParser<'s> {
    source: &'s str,
    pos: usize,
}

impl<'s> DescriptorParser<'s> {
    fn new(source: &'s str) -> Self {
        DescriptorParser { source, pos: 0 }
    }

    fn error(&self, reason: &str) -> CodegenError {
        CodegenError::InvalidDescriptor {
            descriptor: self.source.to_string(),
            reason: format!("{} at offset {}", reason, self.pos),
        }
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn finish(&self) -> Result<(), CodegenError> {
        if self.pos == self.source.len() {
            Ok(())
        } else {
            Err(self.error("trailing characters"))
        }
    }

    fn method(&mut self) -> Result<MethodDescriptor, CodegenError> {
        if self.bump() != Some('(') {
            return Err(self.error("expected '('"));
        }
        let mut params = Vec::new();
        loop {
            match self.peek() {
                Some(')') => {
                    self.bump();
                    break;
                }
                Some(_) => params.push(self.field()?),
                None => return Err(self.error("unterminated parameter list")),
            }
        }
        let return_type = self.return_type()?;
        MethodDescriptor::new(params, return_type)
    }

    fn return_type(&mut self) -> Result<TypeDescriptor, CodegenError> {
        if self.peek() == Some('V') {
            self.bump();
            return Ok(TypeDescriptor::Void);
        }
        self.field()
    }

    fn field(&mut self) -> Result<TypeDescriptor, CodegenError> {
        let mut dimensions = 0;
        while self.peek() == Some('[') {
            self.bump();
            dimensions += 1;
        }
        if dimensions > MAX_ARRAY_DIMENSIONS {
            return Err(self.error("too many array dimensions"));
        }
        let mut ty = match self.bump() {
            Some('L') => {
                let source = self.source;
                let rest = &source[self.pos..];
                let end = rest.find(';').ok_or_else(|| self.error("unterminated class name"))?;
                let name = &rest[..end];
                if name.is_empty() || name.contains(['.', '[', '(', ')', '<', '>']) {
                    return Err(self.error("invalid class name"));
                }
                self.pos += end + 1;
                TypeDescriptor::Object(Arc::from(name))
            }
            Some(c) => match PrimitiveKind::from_descriptor_char(c) {
                Some(kind) => TypeDescriptor::Primitive(kind),
                None => return Err(self.error("unexpected character")),
            },
            None => return Err(self.error("unexpected end of descriptor")),
        };
        for _ in 0..dimensions {
            ty = TypeDescriptor::Array(Arc::new(ty));
        }
        Ok(ty)
    }
}
