//! Read and write transforms installed on every field of a layout.
//!
//! Each accessor works on the field's own byte slice (exactly `width`
//! bytes; any other length is [AccessError::FieldSize]). Writes validate the whole value first and only then touch the
//! slice, so a failed write leaves it unchanged.

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::{
    compiled::{CompiledField, CompiledKind},
    errors::{AccessError, CapacityError, CodecError},
    field::{Primitive, StrSpec, Termination, TrailingFill},
    layout::{Endian, StructLayout},
    value::Value,
};

/// Logical read/write over the raw bytes of one field.
pub trait FieldAccess {
    /// Reads the logical value out of the field's bytes.
    fn read(&self, bytes: &[u8]) -> Result<Value, AccessError>;

    /// Validates `value` and writes it into the field's bytes.
    fn write(&self, bytes: &mut [u8], value: &Value) -> Result<(), AccessError>;
}

/// The accessor selected for a field when its layout is synthesized.
#[derive(Debug, Clone, PartialEq)]
pub enum Accessor {
    Primitive(PrimitiveAccessor),
    Text(TextAccessor),
    Bytes(BytesAccessor),
    Struct(StructAccessor),
    Array(ArrayAccessor),
}

impl Accessor {
    pub fn for_field(field: &CompiledField, endian: Endian) -> Self {
        Accessor::for_kind(&field.name, &field.kind, endian)
    }

    fn for_kind(name: &str, kind: &CompiledKind, endian: Endian) -> Self {
        let field = name.to_string();
        match kind {
            CompiledKind::Primitive(primitive) => Accessor::Primitive(PrimitiveAccessor {
                field,
                primitive: *primitive,
                endian,
            }),
            CompiledKind::Str(spec) => Accessor::Text(TextAccessor {
                field,
                spec: spec.clone(),
            }),
            CompiledKind::Bytes(len) => Accessor::Bytes(BytesAccessor { field, len: *len }),
            CompiledKind::Struct(layout) => Accessor::Struct(StructAccessor {
                field,
                layout: layout.clone(),
            }),
            CompiledKind::Array {
                element,
                count,
                stride,
            } => Accessor::Array(ArrayAccessor {
                element: Box::new(Accessor::for_kind(name, element, endian)),
                field,
                count: *count,
                stride: *stride,
            }),
        }
    }
}

impl FieldAccess for Accessor {
    fn read(&self, bytes: &[u8]) -> Result<Value, AccessError> {
        match self {
            Accessor::Primitive(a) => a.read(bytes),
            Accessor::Text(a) => a.read(bytes),
            Accessor::Bytes(a) => a.read(bytes),
            Accessor::Struct(a) => a.read(bytes),
            Accessor::Array(a) => a.read(bytes),
        }
    }

    fn write(&self, bytes: &mut [u8], value: &Value) -> Result<(), AccessError> {
        match self {
            Accessor::Primitive(a) => a.write(bytes, value),
            Accessor::Text(a) => a.write(bytes, value),
            Accessor::Bytes(a) => a.write(bytes, value),
            Accessor::Struct(a) => a.write(bytes, value),
            Accessor::Array(a) => a.write(bytes, value),
        }
    }
}

fn check_width(field: &str, expected: usize, bytes: &[u8]) -> Result<(), AccessError> {
    if bytes.len() != expected {
        return Err(AccessError::FieldSize {
            field: field.to_string(),
            expected,
            found: bytes.len(),
        });
    }
    Ok(())
}

fn type_mismatch(field: &str, expected: &'static str, value: &Value) -> AccessError {
    AccessError::TypeMismatch {
        field: field.to_string(),
        expected,
        found: value.kind_name(),
    }
}

/// Integers and floats in their native representation.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveAccessor {
    field: String,
    primitive: Primitive,
    endian: Endian,
}

impl PrimitiveAccessor {
    fn read_with<E: ByteOrder>(&self, bytes: &[u8]) -> Value {
        match self.primitive {
            Primitive::U8 => Value::UInt(bytes[0].into()),
            Primitive::I8 => Value::Int((bytes[0] as i8).into()),
            Primitive::U16 => Value::UInt(E::read_u16(bytes).into()),
            Primitive::I16 => Value::Int(E::read_i16(bytes).into()),
            Primitive::U32 => Value::UInt(E::read_u32(bytes).into()),
            Primitive::I32 => Value::Int(E::read_i32(bytes).into()),
            Primitive::U64 => Value::UInt(E::read_u64(bytes)),
            Primitive::I64 => Value::Int(E::read_i64(bytes)),
            Primitive::F32 => Value::Float(E::read_f32(bytes).into()),
            Primitive::F64 => Value::Float(E::read_f64(bytes)),
        }
    }

    fn write_with<E: ByteOrder>(&self, bytes: &mut [u8], value: &Value) -> Result<(), AccessError> {
        match self.primitive {
            Primitive::U8 => bytes[0] = self.narrow(self.unsigned(value)?, value)?,
            Primitive::I8 => bytes[0] = self.narrow::<i8, _>(self.signed(value)?, value)? as u8,
            Primitive::U16 => E::write_u16(bytes, self.narrow(self.unsigned(value)?, value)?),
            Primitive::I16 => E::write_i16(bytes, self.narrow(self.signed(value)?, value)?),
            Primitive::U32 => E::write_u32(bytes, self.narrow(self.unsigned(value)?, value)?),
            Primitive::I32 => E::write_i32(bytes, self.narrow(self.signed(value)?, value)?),
            Primitive::U64 => E::write_u64(bytes, self.unsigned(value)?),
            Primitive::I64 => E::write_i64(bytes, self.signed(value)?),
            Primitive::F32 => E::write_f32(bytes, self.float(value)? as f32),
            Primitive::F64 => E::write_f64(bytes, self.float(value)?),
        }
        Ok(())
    }

    fn out_of_range(&self, value: &Value) -> AccessError {
        let value = match value {
            Value::Int(v) => v.to_string(),
            Value::UInt(v) => v.to_string(),
            other => format!("{other:?}"),
        };
        AccessError::OutOfRange {
            field: self.field.clone(),
            primitive: self.primitive,
            value,
        }
    }

    fn narrow<T: TryFrom<W>, W>(&self, v: W, value: &Value) -> Result<T, AccessError> {
        T::try_from(v).map_err(|_| self.out_of_range(value))
    }

    fn unsigned(&self, value: &Value) -> Result<u64, AccessError> {
        match value {
            Value::UInt(v) => Ok(*v),
            Value::Int(v) => u64::try_from(*v).map_err(|_| self.out_of_range(value)),
            other => Err(type_mismatch(&self.field, "integer", other)),
        }
    }

    fn signed(&self, value: &Value) -> Result<i64, AccessError> {
        match value {
            Value::Int(v) => Ok(*v),
            Value::UInt(v) => i64::try_from(*v).map_err(|_| self.out_of_range(value)),
            other => Err(type_mismatch(&self.field, "integer", other)),
        }
    }

    fn float(&self, value: &Value) -> Result<f64, AccessError> {
        value
            .as_f64()
            .ok_or_else(|| type_mismatch(&self.field, "number", value))
    }
}

impl FieldAccess for PrimitiveAccessor {
    fn read(&self, bytes: &[u8]) -> Result<Value, AccessError> {
        check_width(&self.field, self.primitive.width(), bytes)?;
        Ok(match self.endian {
            Endian::Little => self.read_with::<LittleEndian>(bytes),
            Endian::Big => self.read_with::<BigEndian>(bytes),
        })
    }

    fn write(&self, bytes: &mut [u8], value: &Value) -> Result<(), AccessError> {
        check_width(&self.field, self.primitive.width(), bytes)?;
        match self.endian {
            Endian::Little => self.write_with::<LittleEndian>(bytes, value),
            Endian::Big => self.write_with::<BigEndian>(bytes, value),
        }
    }
}

/// Fixed-width text decoded and encoded through the field's policy.
#[derive(Debug, Clone, PartialEq)]
pub struct TextAccessor {
    field: String,
    spec: StrSpec,
}

impl TextAccessor {
    pub fn spec(&self) -> &StrSpec {
        &self.spec
    }

    fn codec_error(&self, source: CodecError) -> AccessError {
        AccessError::Codec {
            field: self.field.clone(),
            source,
        }
    }

    /// Decodes the significant bytes of the field: everything before the
    /// first zero byte when terminated, all of them otherwise.
    pub fn decode(&self, bytes: &[u8]) -> Result<String, AccessError> {
        check_width(&self.field, self.spec.len, bytes)?;
        let significant = match self.spec.termination {
            Termination::Terminated => bytes
                .iter()
                .position(|&b| b == 0)
                .map_or(bytes, |end| &bytes[..end]),
            Termination::FixedWidth => bytes,
        };

        self.spec
            .policy
            .decode(significant)
            .map_err(|source| self.codec_error(source))
    }

    /// Encodes `text` and checks it against the field's byte budget without
    /// writing anything.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>, AccessError> {
        let encoded = self
            .spec
            .policy
            .encode(text)
            .map_err(|source| self.codec_error(source))?;

        match self.spec.termination {
            Termination::Terminated => {
                if let Some(offset) = encoded.iter().position(|&b| b == 0) {
                    return Err(self.codec_error(CodecError::EmbeddedNul { offset }));
                }

                let capacity = self.spec.len.saturating_sub(1);
                if encoded.len() > capacity {
                    return Err(CapacityError::Overflow {
                        field: self.field.clone(),
                        len: encoded.len(),
                        capacity,
                    }
                    .into());
                }
            }
            Termination::FixedWidth => {
                if encoded.len() != self.spec.len {
                    return Err(CapacityError::LengthMismatch {
                        field: self.field.clone(),
                        len: encoded.len(),
                        width: self.spec.len,
                    }
                    .into());
                }
            }
        }

        Ok(encoded)
    }

    pub fn encode_into(&self, bytes: &mut [u8], text: &str) -> Result<(), AccessError> {
        check_width(&self.field, self.spec.len, bytes)?;
        let encoded = self.encode(text)?;
        let (head, tail) = bytes.split_at_mut(encoded.len());
        head.copy_from_slice(&encoded);

        if self.spec.termination == Termination::Terminated {
            match self.spec.fill {
                TrailingFill::Zero => tail.fill(0),
                TrailingFill::Preserve => tail[0] = 0,
            }
        }
        Ok(())
    }
}

impl FieldAccess for TextAccessor {
    fn read(&self, bytes: &[u8]) -> Result<Value, AccessError> {
        self.decode(bytes).map(Value::Text)
    }

    fn write(&self, bytes: &mut [u8], value: &Value) -> Result<(), AccessError> {
        let text = value
            .as_str()
            .ok_or_else(|| type_mismatch(&self.field, "text", value))?;
        self.encode_into(bytes, text)
    }
}

/// Opaque bytes, copied verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct BytesAccessor {
    field: String,
    len: usize,
}

impl FieldAccess for BytesAccessor {
    fn read(&self, bytes: &[u8]) -> Result<Value, AccessError> {
        check_width(&self.field, self.len, bytes)?;
        Ok(Value::Bytes(bytes.to_vec()))
    }

    fn write(&self, bytes: &mut [u8], value: &Value) -> Result<(), AccessError> {
        let src = value
            .as_bytes()
            .ok_or_else(|| type_mismatch(&self.field, "bytes", value))?;
        check_width(&self.field, self.len, bytes)?;
        if src.len() != self.len {
            return Err(AccessError::CountMismatch {
                field: self.field.clone(),
                expected: self.len,
                found: src.len(),
            });
        }
        bytes.copy_from_slice(src);
        Ok(())
    }
}

/// A nested struct, read as a map of its members.
///
/// Writes accept any subset of the members; the others keep their bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct StructAccessor {
    field: String,
    layout: Arc<StructLayout>,
}

impl StructAccessor {
    pub fn layout(&self) -> &Arc<StructLayout> {
        &self.layout
    }
}

impl FieldAccess for StructAccessor {
    fn read(&self, bytes: &[u8]) -> Result<Value, AccessError> {
        check_width(&self.field, self.layout.size(), bytes)?;
        read_members(&self.layout, bytes).map(Value::Struct)
    }

    fn write(&self, bytes: &mut [u8], value: &Value) -> Result<(), AccessError> {
        let members = value
            .as_struct()
            .ok_or_else(|| type_mismatch(&self.field, "struct", value))?;
        check_width(&self.field, self.layout.size(), bytes)?;

        let mut staged = bytes.to_vec();
        for (name, member) in members {
            let field = self
                .layout
                .field(name)
                .ok_or_else(|| AccessError::UnknownField {
                    layout: self.layout.name().to_string(),
                    field: name.clone(),
                })?;
            field.accessor.write(&mut staged[field.range()], member)?;
        }
        bytes.copy_from_slice(&staged);
        Ok(())
    }
}

/// Reads every member of `layout` out of `bytes` (exactly `layout.size()`).
pub(crate) fn read_members(
    layout: &StructLayout,
    bytes: &[u8],
) -> Result<BTreeMap<String, Value>, AccessError> {
    layout
        .fields()
        .iter()
        .map(|f| -> Result<_, AccessError> {
            Ok((f.name().to_string(), f.accessor.read(&bytes[f.range()])?))
        })
        .collect()
}

/// `count` elements laid out `stride` bytes apart.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayAccessor {
    field: String,
    element: Box<Accessor>,
    count: usize,
    stride: usize,
}

impl ArrayAccessor {
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn element(&self) -> &Accessor {
        &self.element
    }

    /// Byte range of element `index` inside the array's bytes.
    fn width(&self) -> usize {
        self.count * self.stride
    }

    pub fn element_range(&self, index: usize) -> Result<Range<usize>, AccessError> {
        if index >= self.count {
            return Err(AccessError::IndexOutOfRange {
                field: self.field.clone(),
                index,
                count: self.count,
            });
        }
        let start = index * self.stride;
        Ok(start..start + self.stride)
    }

    pub fn read_element(&self, bytes: &[u8], index: usize) -> Result<Value, AccessError> {
        check_width(&self.field, self.width(), bytes)?;
        let range = self.element_range(index)?;
        self.element.read(&bytes[range])
    }

    pub fn write_element(
        &self,
        bytes: &mut [u8],
        index: usize,
        value: &Value,
    ) -> Result<(), AccessError> {
        check_width(&self.field, self.width(), bytes)?;
        let range = self.element_range(index)?;
        self.element.write(&mut bytes[range], value)
    }
}

impl FieldAccess for ArrayAccessor {
    fn read(&self, bytes: &[u8]) -> Result<Value, AccessError> {
        check_width(&self.field, self.width(), bytes)?;
        bytes
            .chunks_exact(self.stride)
            .take(self.count)
            .map(|chunk| self.element.read(chunk))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }

    fn write(&self, bytes: &mut [u8], value: &Value) -> Result<(), AccessError> {
        let items = value
            .as_array()
            .ok_or_else(|| type_mismatch(&self.field, "array", value))?;
        check_width(&self.field, self.width(), bytes)?;
        if items.len() != self.count {
            return Err(AccessError::CountMismatch {
                field: self.field.clone(),
                expected: self.count,
                found: items.len(),
            });
        }

        let mut staged = bytes.to_vec();
        for (chunk, item) in staged.chunks_exact_mut(self.stride).zip(items) {
            self.element.write(chunk, item)?;
        }
        bytes.copy_from_slice(&staged);
        Ok(())
    }
}
