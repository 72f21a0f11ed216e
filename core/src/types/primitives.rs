//! Primitive kinds and the process-wide primitive name table.

use hashbrown::HashMap;
use lazy_static::lazy_static;

/// One of the eight primitive value kinds of the target machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

lazy_static! {
    // Built once on first use, never mutated.
    static ref PRIMITIVES: HashMap<&'static str, PrimitiveKind> = PrimitiveKind::ALL
        .iter()
        .map(|kind| (kind.name(), *kind))
        .collect();
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 8] = [
        PrimitiveKind::Boolean,
        PrimitiveKind::Byte,
        PrimitiveKind::Short,
        PrimitiveKind::Char,
        PrimitiveKind::Int,
        PrimitiveKind::Long,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
    ];

    /// Source-level name, e.g. `"int"`.
    pub const fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
        }
    }

    /// Single-character descriptor code, e.g. `'I'`.
    pub const fn descriptor_char(self) -> char {
        match self {
            PrimitiveKind::Boolean => 'Z',
            PrimitiveKind::Byte => 'B',
            PrimitiveKind::Short => 'S',
            PrimitiveKind::Char => 'C',
            PrimitiveKind::Int => 'I',
            PrimitiveKind::Long => 'J',
            PrimitiveKind::Float => 'F',
            PrimitiveKind::Double => 'D',
        }
    }

    pub const fn from_descriptor_char(c: char) -> Option<PrimitiveKind> {
        Some(match c {
            'Z' => PrimitiveKind::Boolean,
            'B' => PrimitiveKind::Byte,
            'S' => PrimitiveKind::Short,
            'C' => PrimitiveKind::Char,
            'I' => PrimitiveKind::Int,
            'J' => PrimitiveKind::Long,
            'F' => PrimitiveKind::Float,
            'D' => PrimitiveKind::Double,
            _ => return None,
        })
    }

    /// Looks a kind up by its source-level name.
    pub fn from_name(name: &str) -> Option<PrimitiveKind> {
        PRIMITIVES.get(name).copied()
    }

    /// Number of operand stack / local slots a value of this kind occupies.
    pub const fn size(self) -> usize {
        match self {
            PrimitiveKind::Long | PrimitiveKind::Double => 2,
            _ => 1,
        }
    }

    pub const fn is_numeric(self) -> bool {
        !matches!(self, PrimitiveKind::Boolean)
    }

    /// Kinds that live in an `int` slot on the operand stack.
    pub const fn is_int_like(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Boolean
                | PrimitiveKind::Byte
                | PrimitiveKind::Short
                | PrimitiveKind::Char
                | PrimitiveKind::Int
        )
    }
}

impl core::fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_table_covers_all_kinds() {
        for kind in PrimitiveKind::ALL {
            assert_eq!(PrimitiveKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(PrimitiveKind::from_name("void"), None);
        assert_eq!(PrimitiveKind::from_name("java.lang.String"), None);
    }

    #[test]
    fn test_descriptor_chars_round_trip() {
        for kind in PrimitiveKind::ALL {
            assert_eq!(
                PrimitiveKind::from_descriptor_char(kind.descriptor_char()),
                Some(kind)
            );
        }
        assert_eq!(PrimitiveKind::from_descriptor_char('V'), None);
    }

    #[test]
    fn test_sizes() {
        assert_eq!(PrimitiveKind::Long.size(), 2);
        assert_eq!(PrimitiveKind::Double.size(), 2);
        assert_eq!(PrimitiveKind::Char.size(), 1);
        assert!(!PrimitiveKind::Boolean.is_numeric());
        assert!(PrimitiveKind::Char.is_numeric());
    }
}
