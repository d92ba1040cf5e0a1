//! JSON-deserializable schema description.
//!
//! These types describe a struct declaration as data, for example a schema
//! file shipped with your application. Convert a [SchemaDef] into a
//! [Schema] with `TryFrom`, then compile or declare it as usual.

use std::sync::Arc;

use astruct_codec::EncodingPolicy;
use serde::{Deserialize, Serialize};

use crate::{
    errors::SchemaError,
    field::{Field, FieldKind, Primitive, StrSpec, Termination, TrailingFill},
    layout::{Endian, Packing},
    schema::Schema,
    validation,
};

/// Packing mode of a schema.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PackingDef {
    #[default]
    Packed,
    Aligned,
    /// `#pragma pack(n)`.
    Limit(usize),
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EndianDef {
    #[default]
    Little,
    Big,
}

/// Top-level struct declaration.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SchemaDef {
    /// Struct name; nested fields refer to other structs by it.
    pub name: String,
    #[serde(default)]
    pub packing: Option<PackingDef>,
    #[serde(default)]
    pub endian: Option<EndianDef>,
    /// Fields in layout order.
    pub fields: Vec<FieldDef>,
}

/// A single named field.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    #[serde(flatten)]
    pub kind: FieldKindDef,
}

/// What a field holds.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKindDef {
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
    /// Fixed-width text.
    Str {
        /// Width in bytes, including the terminator.
        len: usize,
        /// Codec name; defaults to Shift-JIS.
        #[serde(default)]
        encoding: Option<String>,
        /// Error mode name; defaults to strict.
        #[serde(default)]
        errors: Option<String>,
        /// Whether text ends at the first zero byte; defaults to true.
        #[serde(default)]
        null_terminated: Option<bool>,
        /// Whether writes zero the bytes after the terminator; defaults to true.
        #[serde(default)]
        zero_extra_bytes: Option<bool>,
    },
    Bytes {
        len: usize,
    },
    /// A previously declared struct, by its schema name.
    Struct {
        schema: String,
    },
    Array {
        element: Box<FieldKindDef>,
        count: usize,
    },
}

impl From<PackingDef> for Packing {
    fn from(value: PackingDef) -> Self {
        match value {
            PackingDef::Packed => Packing::Packed,
            PackingDef::Aligned => Packing::Aligned,
            PackingDef::Limit(n) => Packing::Limit(n),
        }
    }
}

impl From<EndianDef> for Endian {
    fn from(value: EndianDef) -> Self {
        match value {
            EndianDef::Little => Endian::Little,
            EndianDef::Big => Endian::Big,
        }
    }
}

impl TryFrom<SchemaDef> for Schema {
    type Error = SchemaError;

    fn try_from(value: SchemaDef) -> Result<Self, Self::Error> {
        let fields = value
            .fields
            .into_iter()
            .map(|def| -> Result<Field, SchemaError> {
                let kind = field_kind(&def.name, def.kind)?;
                Ok(Field::new(def.name, kind))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Schema::new(value.name)
            .packing(value.packing.unwrap_or_default().into())
            .endian(value.endian.unwrap_or_default().into())
            .fields(fields))
    }
}

fn field_kind(field: &str, def: FieldKindDef) -> Result<FieldKind, SchemaError> {
    Ok(match def {
        FieldKindDef::U8 => Primitive::U8.into(),
        FieldKindDef::I8 => Primitive::I8.into(),
        FieldKindDef::U16 => Primitive::U16.into(),
        FieldKindDef::I16 => Primitive::I16.into(),
        FieldKindDef::U32 => Primitive::U32.into(),
        FieldKindDef::I32 => Primitive::I32.into(),
        FieldKindDef::U64 => Primitive::U64.into(),
        FieldKindDef::I64 => Primitive::I64.into(),
        FieldKindDef::F32 => Primitive::F32.into(),
        FieldKindDef::F64 => Primitive::F64.into(),
        FieldKindDef::Str {
            len,
            encoding,
            errors,
            null_terminated,
            zero_extra_bytes,
        } => {
            let mut spec = StrSpec::new(len);
            if encoding.is_some() || errors.is_some() {
                let default = EncodingPolicy::default();
                let policy = validation::resolve_policy(
                    field,
                    encoding.as_deref().unwrap_or(default.codec().name()),
                    errors.as_deref().unwrap_or(default.errors().name()),
                )?;
                spec = spec.with_policy(Arc::new(policy));
            }
            if !null_terminated.unwrap_or(true) {
                spec.termination = Termination::FixedWidth;
            }
            if !zero_extra_bytes.unwrap_or(true) {
                spec.fill = TrailingFill::Preserve;
            }
            spec.into()
        }
        FieldKindDef::Bytes { len } => FieldKind::Bytes(len),
        FieldKindDef::Struct { schema } => FieldKind::StructRef(schema),
        FieldKindDef::Array { element, count } => {
            FieldKind::array(field_kind(field, *element)?, count)
        }
    })
}
