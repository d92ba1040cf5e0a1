//! Definition of the fields that make up a [crate::schema::Schema].

use std::fmt;
use std::sync::Arc;

use astruct_codec::EncodingPolicy;

use crate::layout::StructLayout;

/// A single named field in a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Accessor name; must be unique within its schema.
    pub name: String,
    /// What the field holds and how it is stored.
    pub kind: FieldKind,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Field {
            name: name.into(),
            kind,
        }
    }

    pub fn primitive(name: impl Into<String>, primitive: Primitive) -> Self {
        Field::new(name, FieldKind::Primitive(primitive))
    }

    pub fn u8(name: impl Into<String>) -> Self {
        Field::primitive(name, Primitive::U8)
    }

    pub fn i8(name: impl Into<String>) -> Self {
        Field::primitive(name, Primitive::I8)
    }

    pub fn u16(name: impl Into<String>) -> Self {
        Field::primitive(name, Primitive::U16)
    }

    pub fn i16(name: impl Into<String>) -> Self {
        Field::primitive(name, Primitive::I16)
    }

    pub fn u32(name: impl Into<String>) -> Self {
        Field::primitive(name, Primitive::U32)
    }

    pub fn i32(name: impl Into<String>) -> Self {
        Field::primitive(name, Primitive::I32)
    }

    pub fn u64(name: impl Into<String>) -> Self {
        Field::primitive(name, Primitive::U64)
    }

    pub fn i64(name: impl Into<String>) -> Self {
        Field::primitive(name, Primitive::I64)
    }

    pub fn f32(name: impl Into<String>) -> Self {
        Field::primitive(name, Primitive::F32)
    }

    pub fn f64(name: impl Into<String>) -> Self {
        Field::primitive(name, Primitive::F64)
    }

    /// A null-terminated string of `len` bytes with the default policy.
    pub fn str(name: impl Into<String>, len: usize) -> Self {
        Field::new(name, FieldKind::Str(StrSpec::new(len)))
    }

    pub fn str_with(name: impl Into<String>, spec: StrSpec) -> Self {
        Field::new(name, FieldKind::Str(spec))
    }

    /// Raw bytes kept exactly as found, e.g. unknown or reserved regions.
    pub fn bytes(name: impl Into<String>, len: usize) -> Self {
        Field::new(name, FieldKind::Bytes(len))
    }

    pub fn nested(name: impl Into<String>, layout: Arc<StructLayout>) -> Self {
        Field::new(name, FieldKind::Struct(layout))
    }

    /// A nested struct looked up by name when the schema is declared
    /// through a [crate::registry::Registry].
    pub fn nested_ref(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Field::new(name, FieldKind::StructRef(type_name.into()))
    }

    pub fn array(name: impl Into<String>, element: FieldKind, count: usize) -> Self {
        Field::new(name, FieldKind::array(element, count))
    }
}

/// The logical kind of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Fixed-width integer or float stored in its native representation.
    Primitive(Primitive),
    /// Fixed-width text stored through an [EncodingPolicy].
    Str(StrSpec),
    /// Opaque bytes.
    Bytes(usize),
    /// A struct whose layout is already synthesized.
    Struct(Arc<StructLayout>),
    /// A struct referenced by its declared name.
    StructRef(String),
    /// `count` contiguous elements of the same kind.
    Array(Box<FieldKind>, usize),
}

impl FieldKind {
    pub fn array(element: FieldKind, count: usize) -> Self {
        FieldKind::Array(Box::new(element), count)
    }
}

impl From<Primitive> for FieldKind {
    fn from(value: Primitive) -> Self {
        FieldKind::Primitive(value)
    }
}

impl From<StrSpec> for FieldKind {
    fn from(value: StrSpec) -> Self {
        FieldKind::Str(value)
    }
}

impl From<Arc<StructLayout>> for FieldKind {
    fn from(value: Arc<StructLayout>) -> Self {
        FieldKind::Struct(value)
    }
}

/// Fixed-width numeric types. Width and natural alignment are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
}

impl Primitive {
    /// Width in bytes.
    pub fn width(&self) -> usize {
        match self {
            Primitive::U8 | Primitive::I8 => 1,
            Primitive::U16 | Primitive::I16 => 2,
            Primitive::U32 | Primitive::I32 | Primitive::F32 => 4,
            Primitive::U64 | Primitive::I64 | Primitive::F64 => 8,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Primitive::F32 | Primitive::F64)
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            Primitive::I8 | Primitive::I16 | Primitive::I32 | Primitive::I64
        ) || self.is_float()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Primitive::U8 => "u8",
            Primitive::I8 => "i8",
            Primitive::U16 => "u16",
            Primitive::I16 => "i16",
            Primitive::U32 => "u32",
            Primitive::I32 => "i32",
            Primitive::U64 => "u64",
            Primitive::I64 => "i64",
            Primitive::F32 => "f32",
            Primitive::F64 => "f64",
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether the logical string ends at the first zero byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Termination {
    /// Text ends at the first zero byte; writes always leave room for one.
    #[default]
    Terminated,
    /// Every byte is significant; writes must fill the field exactly.
    FixedWidth,
}

/// What a write to a terminated string does with the bytes after the
/// terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrailingFill {
    /// Zero every byte after the text.
    #[default]
    Zero,
    /// Write a single terminator and leave the rest of the field untouched.
    Preserve,
}

/// Configuration of a fixed-width string field.
///
/// `len` counts *bytes* in the record, including the terminator for
/// terminated strings, not characters of the decoded text.
#[derive(Debug, Clone, PartialEq)]
pub struct StrSpec {
    pub len: usize,
    pub policy: Arc<EncodingPolicy>,
    pub termination: Termination,
    pub fill: TrailingFill,
}

impl StrSpec {
    /// A terminated, zero-filled string using the shared default policy.
    pub fn new(len: usize) -> Self {
        StrSpec {
            len,
            policy: EncodingPolicy::shared_default(),
            termination: Termination::Terminated,
            fill: TrailingFill::Zero,
        }
    }

    pub fn with_policy(mut self, policy: Arc<EncodingPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn fixed_width(mut self) -> Self {
        self.termination = Termination::FixedWidth;
        self
    }

    pub fn preserve_trailing_bytes(mut self) -> Self {
        self.fill = TrailingFill::Preserve;
        self
    }
}
