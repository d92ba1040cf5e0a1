//! Error types for schema declaration, field access and counted tables.

use thiserror::Error;

pub use astruct_codec::CodecError;

use crate::field::Primitive;

/// Errors produced while declaring a schema (parsing fields or synthesizing
/// the layout). A schema that fails never yields a struct type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Struct name is empty or not an identifier.
    #[error("invalid struct name {0:?}")]
    InvalidTypeName(String),
    /// Field name is empty or not an identifier.
    #[error("invalid field name {0:?}")]
    InvalidFieldName(String),
    /// The same field name appears twice in one schema.
    #[error("field {0:?} is declared more than once")]
    DuplicateField(String),
    /// String fields need at least one byte.
    #[error("string field {0:?} has zero length")]
    ZeroLengthString(String),
    /// Byte blobs need at least one byte.
    #[error("byte field {0:?} has zero length")]
    ZeroLengthBytes(String),
    /// Arrays need at least one element.
    #[error("array field {0:?} has zero elements")]
    InvalidArrayCount(String),
    #[error("string field {field:?} uses unsupported codec {name:?}")]
    UnsupportedCodec { field: String, name: String },
    #[error("string field {field:?} uses unsupported error mode {name:?}")]
    UnsupportedErrorMode { field: String, name: String },
    /// A nested field names a struct whose layout is not finalized yet.
    #[error("field {field:?} refers to struct {type_name:?}, which has not been declared yet")]
    UnresolvedType { field: String, type_name: String },
    /// Packing limits must be a power of two between 1 and 16.
    #[error("invalid packing limit {0}: must be a power of two between 1 and 16")]
    InvalidPacking(usize),
    /// The layout would not fit in `usize`.
    #[error("field {0:?} overflows the layout size")]
    SizeOverflow(String),
    /// A struct name is published twice with different layouts.
    #[error("struct {0:?} is already declared with a different layout")]
    ConflictingDeclaration(String),
}

/// Encoded text does not fit the byte budget of a string field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapacityError {
    #[error(
        "field {field:?}: encoded text is {len} bytes, but only {capacity} fit before the terminator"
    )]
    Overflow {
        field: String,
        len: usize,
        capacity: usize,
    },
    #[error("field {field:?}: encoded text is {len} bytes, but the field is exactly {width} bytes")]
    LengthMismatch {
        field: String,
        len: usize,
        width: usize,
    },
}

/// Errors produced by reading or writing a record through its accessors.
///
/// Writes validate before touching the buffer, so a failed write leaves the
/// record exactly as it was.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AccessError {
    #[error("struct {layout:?} has no field named {field:?}")]
    UnknownField { layout: String, field: String },
    #[error("field {field:?}: {source}")]
    Codec {
        field: String,
        #[source]
        source: CodecError,
    },
    #[error(transparent)]
    Capacity(#[from] CapacityError),
    #[error("field {field:?} expects {expected}, got {found}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("value {value} does not fit field {field:?} of type {primitive}")]
    OutOfRange {
        field: String,
        primitive: Primitive,
        value: String,
    },
    #[error("field {field:?} holds {expected} elements, got {found}")]
    CountMismatch {
        field: String,
        expected: usize,
        found: usize,
    },
    #[error("struct {layout:?} is {expected} bytes, got a buffer of {found}")]
    BufferSize {
        layout: String,
        expected: usize,
        found: usize,
    },
    /// An accessor was handed a slice that is not exactly its field's width.
    #[error("field {field:?} is {expected} bytes, got a slice of {found}")]
    FieldSize {
        field: String,
        expected: usize,
        found: usize,
    },
    #[error("index {index} is out of range for field {field:?} with {count} elements")]
    IndexOutOfRange {
        field: String,
        index: usize,
        count: usize,
    },
    #[error("field {0:?} is not a nested struct")]
    NotAStruct(String),
    #[error("field {0:?} is not an array")]
    NotAnArray(String),
}

/// Errors produced when locating a counted table inside a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("table at offset {offset:#x} needs {needed} bytes, but only {available} are available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("table header capacity ({capacity}) is not equal to its entry count ({count})")]
    CapacityMismatch { capacity: u32, count: u32 },
    #[error("struct {0:?} has zero size and cannot be stored in a table")]
    ZeroSizedRecord(String),
}
