//! Record instances: byte buffers interpreted through a [StructLayout].
//!
//! [RecordRef] and [RecordMut] borrow a buffer, typically a slice of a
//! larger file image, without copying it. [Record] owns its bytes.
//! `buffer -> record -> buffer` is byte-identical unless a field was
//! written through an accessor.

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;

use crate::{
    accessor::{self, Accessor, ArrayAccessor, FieldAccess, TextAccessor},
    errors::AccessError,
    layout::{LayoutField, StructLayout},
    value::Value,
};

fn lookup<'l>(layout: &'l StructLayout, name: &str) -> Result<&'l LayoutField, AccessError> {
    layout.field(name).ok_or_else(|| AccessError::UnknownField {
        layout: layout.name().to_string(),
        field: name.to_string(),
    })
}

fn check_size(layout: &StructLayout, len: usize) -> Result<(), AccessError> {
    if len != layout.size() {
        return Err(AccessError::BufferSize {
            layout: layout.name().to_string(),
            expected: layout.size(),
            found: len,
        });
    }
    Ok(())
}

/// The `size` bytes at `offset` in a buffer of `len` bytes.
fn window(layout: &StructLayout, len: usize, offset: usize) -> Result<Range<usize>, AccessError> {
    let available = len.saturating_sub(offset);
    if available < layout.size() {
        return Err(AccessError::BufferSize {
            layout: layout.name().to_string(),
            expected: layout.size(),
            found: available,
        });
    }
    Ok(offset..offset + layout.size())
}

fn text_accessor(field: &LayoutField) -> Result<&TextAccessor, AccessError> {
    match &field.accessor {
        Accessor::Text(text) => Ok(text),
        _ => Err(AccessError::TypeMismatch {
            field: field.name().to_string(),
            expected: "text field",
            found: "non-text field",
        }),
    }
}

fn array_accessor(field: &LayoutField) -> Result<&ArrayAccessor, AccessError> {
    match &field.accessor {
        Accessor::Array(array) => Ok(array),
        _ => Err(AccessError::NotAnArray(field.name().to_string())),
    }
}

fn struct_layout(field: &LayoutField) -> Result<&StructLayout, AccessError> {
    match &field.accessor {
        Accessor::Struct(nested) => Ok(nested.layout().as_ref()),
        _ => Err(AccessError::NotAStruct(field.name().to_string())),
    }
}

/// A read-only view of one record.
#[derive(Debug, Clone, Copy)]
pub struct RecordRef<'a> {
    layout: &'a StructLayout,
    bytes: &'a [u8],
}

impl<'a> RecordRef<'a> {
    /// Views `bytes`, which must be exactly `layout.size()` long.
    pub fn new(layout: &'a StructLayout, bytes: &'a [u8]) -> Result<Self, AccessError> {
        check_size(layout, bytes.len())?;
        Ok(Self { layout, bytes })
    }

    /// Views the record starting at `offset` inside a larger buffer.
    pub fn at(layout: &'a StructLayout, buf: &'a [u8], offset: usize) -> Result<Self, AccessError> {
        let range = window(layout, buf.len(), offset)?;
        Ok(Self {
            layout,
            bytes: &buf[range],
        })
    }

    /// Caller guarantees `bytes.len() == layout.size()`.
    pub(crate) fn from_exact(layout: &'a StructLayout, bytes: &'a [u8]) -> Self {
        debug_assert_eq!(bytes.len(), layout.size());
        Self { layout, bytes }
    }

    pub fn layout(&self) -> &'a StructLayout {
        self.layout
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn get(&self, name: &str) -> Result<Value, AccessError> {
        let field = lookup(self.layout, name)?;
        field.accessor.read(&self.bytes[field.range()])
    }

    /// Decodes a string field.
    pub fn get_text(&self, name: &str) -> Result<String, AccessError> {
        let field = lookup(self.layout, name)?;
        text_accessor(field)?.decode(&self.bytes[field.range()])
    }

    /// The raw bytes of a field, whatever its kind.
    pub fn raw(&self, name: &str) -> Result<&'a [u8], AccessError> {
        let field = lookup(self.layout, name)?;
        Ok(&self.bytes[field.range()])
    }

    /// A view of a nested struct field, sharing this record's buffer.
    pub fn nested(&self, name: &str) -> Result<RecordRef<'a>, AccessError> {
        let field = lookup(self.layout, name)?;
        let layout = struct_layout(field)?;
        Ok(RecordRef::from_exact(layout, &self.bytes[field.range()]))
    }

    pub fn get_element(&self, name: &str, index: usize) -> Result<Value, AccessError> {
        let field = lookup(self.layout, name)?;
        array_accessor(field)?.read_element(&self.bytes[field.range()], index)
    }

    /// Every field, by name.
    pub fn to_map(&self) -> Result<BTreeMap<String, Value>, AccessError> {
        accessor::read_members(self.layout, self.bytes)
    }

    pub fn to_value(&self) -> Result<Value, AccessError> {
        self.to_map().map(Value::Struct)
    }
}

/// A mutable view of one record.
#[derive(Debug)]
pub struct RecordMut<'a> {
    layout: &'a StructLayout,
    bytes: &'a mut [u8],
}

impl<'a> RecordMut<'a> {
    pub fn new(layout: &'a StructLayout, bytes: &'a mut [u8]) -> Result<Self, AccessError> {
        check_size(layout, bytes.len())?;
        Ok(Self { layout, bytes })
    }

    pub fn at(
        layout: &'a StructLayout,
        buf: &'a mut [u8],
        offset: usize,
    ) -> Result<Self, AccessError> {
        let range = window(layout, buf.len(), offset)?;
        Ok(Self {
            layout,
            bytes: &mut buf[range],
        })
    }

    pub(crate) fn from_exact(layout: &'a StructLayout, bytes: &'a mut [u8]) -> Self {
        debug_assert_eq!(bytes.len(), layout.size());
        Self { layout, bytes }
    }

    pub fn layout(&self) -> &'a StructLayout {
        self.layout
    }

    pub fn view(&self) -> RecordRef<'_> {
        RecordRef::from_exact(self.layout, &*self.bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &*self.bytes
    }

    pub fn get(&self, name: &str) -> Result<Value, AccessError> {
        self.view().get(name)
    }

    pub fn get_text(&self, name: &str) -> Result<String, AccessError> {
        self.view().get_text(name)
    }

    /// Writes a field. On error the record is unchanged.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), AccessError> {
        let field = lookup(self.layout, name)?;
        field
            .accessor
            .write(&mut self.bytes[field.range()], &value.into())
    }

    /// Encodes `text` into a string field. On error the record is unchanged.
    pub fn set_text(&mut self, name: &str, text: &str) -> Result<(), AccessError> {
        let field = lookup(self.layout, name)?;
        text_accessor(field)?.encode_into(&mut self.bytes[field.range()], text)
    }

    pub fn set_element(
        &mut self,
        name: &str,
        index: usize,
        value: impl Into<Value>,
    ) -> Result<(), AccessError> {
        let field = lookup(self.layout, name)?;
        array_accessor(field)?.write_element(&mut self.bytes[field.range()], index, &value.into())
    }

    pub fn nested_mut(&mut self, name: &str) -> Result<RecordMut<'_>, AccessError> {
        let field = lookup(self.layout, name)?;
        let layout = struct_layout(field)?;
        Ok(RecordMut::from_exact(layout, &mut self.bytes[field.range()]))
    }
}

/// A record that owns its bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    layout: Arc<StructLayout>,
    bytes: Vec<u8>,
}

impl Record {
    /// A zero-filled record.
    pub fn new(layout: Arc<StructLayout>) -> Self {
        let bytes = vec![0; layout.size()];
        Record { layout, bytes }
    }

    /// Copies `bytes`, which must be exactly `layout.size()` long.
    pub fn from_bytes(layout: Arc<StructLayout>, bytes: &[u8]) -> Result<Self, AccessError> {
        Record::from_vec(layout, bytes.to_vec())
    }

    pub fn from_vec(layout: Arc<StructLayout>, bytes: Vec<u8>) -> Result<Self, AccessError> {
        check_size(&layout, bytes.len())?;
        Ok(Record { layout, bytes })
    }

    pub fn layout(&self) -> &Arc<StructLayout> {
        &self.layout
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn view(&self) -> RecordRef<'_> {
        RecordRef::from_exact(&self.layout, &self.bytes)
    }

    pub fn view_mut(&mut self) -> RecordMut<'_> {
        RecordMut::from_exact(&self.layout, &mut self.bytes)
    }

    pub fn get(&self, name: &str) -> Result<Value, AccessError> {
        self.view().get(name)
    }

    pub fn get_text(&self, name: &str) -> Result<String, AccessError> {
        self.view().get_text(name)
    }

    pub fn get_element(&self, name: &str, index: usize) -> Result<Value, AccessError> {
        self.view().get_element(name, index)
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), AccessError> {
        self.view_mut().set(name, value)
    }

    pub fn set_text(&mut self, name: &str, text: &str) -> Result<(), AccessError> {
        self.view_mut().set_text(name, text)
    }

    pub fn set_element(
        &mut self,
        name: &str,
        index: usize,
        value: impl Into<Value>,
    ) -> Result<(), AccessError> {
        self.view_mut().set_element(name, index, value)
    }

    pub fn to_value(&self) -> Result<Value, AccessError> {
        self.view().to_value()
    }
}

#[cfg(test)]
mod tests {
    use astruct_codec::{Codec, EncodingPolicy, ErrorMode};

    use super::*;
    use crate::{
        errors::CapacityError,
        field::{Field, FieldKind, Primitive, StrSpec},
        schema::Schema,
    };

    fn stat() -> Arc<StructLayout> {
        Arc::new(
            Schema::new("Stat")
                .field(Field::u16("base"))
                .field(Field::u8("growth"))
                .compile()
                .unwrap(),
        )
    }

    fn character() -> Arc<StructLayout> {
        let ascii = Arc::new(EncodingPolicy::new(Codec::Ascii, ErrorMode::Strict));
        Arc::new(
            Schema::new("Character")
                .field(Field::u16("id"))
                .field(Field::str_with("name", StrSpec::new(8).with_policy(ascii)))
                .field(Field::nested("hp", stat()))
                .field(Field::array("levels", FieldKind::from(Primitive::U8), 3))
                .compile()
                .unwrap(),
        )
    }

    #[test]
    fn test_owned_record() {
        let mut record = Record::new(character());
        assert_eq!(record.as_bytes().len(), 16);

        record.set("id", 0x0102u16).unwrap();
        record.set_text("name", "AB").unwrap();
        assert_eq!(&record.as_bytes()[..10], b"\x02\x01AB\0\0\0\0\0\0");
        assert_eq!(record.get_text("name").unwrap(), "AB");
        assert_eq!(record.get("id"), Ok(Value::UInt(0x0102)));
    }

    #[test]
    fn test_buffer_size() {
        assert_eq!(
            Record::from_bytes(character(), &[0; 15]),
            Err(AccessError::BufferSize {
                layout: "Character".to_string(),
                expected: 16,
                found: 15,
            })
        );
    }

    #[test]
    fn test_view_at_offset() {
        let layout = stat();
        let buf = [0xff, 0x10, 0x00, 0x05, 0xee];
        let record = RecordRef::at(&layout, &buf, 1).unwrap();
        assert_eq!(record.get("base"), Ok(Value::UInt(0x10)));
        assert_eq!(record.get("growth"), Ok(Value::UInt(5)));
        assert!(matches!(
            RecordRef::at(&layout, &buf, 3),
            Err(AccessError::BufferSize { found: 2, .. })
        ));
    }

    #[test]
    fn test_nested() {
        let layout = character();
        let mut buf = vec![0u8; layout.size()];
        {
            let mut record = RecordMut::new(&layout, &mut buf).unwrap();
            let mut hp = record.nested_mut("hp").unwrap();
            hp.set("base", 300u16).unwrap();
            hp.set("growth", 4u8).unwrap();
        }
        assert_eq!(&buf[10..13], &[0x2c, 0x01, 4]);

        let record = RecordRef::new(&layout, &buf).unwrap();
        assert_eq!(record.nested("hp").unwrap().get("base"), Ok(Value::UInt(300)));
        assert_eq!(
            record.nested("id").unwrap_err(),
            AccessError::NotAStruct("id".to_string())
        );
    }

    #[test]
    fn test_struct_value_write_merges_members() {
        let mut record = Record::new(character());
        record.set("hp", BTreeMap::from([("growth".to_string(), Value::UInt(9))])).unwrap();
        assert_eq!(record.view().nested("hp").unwrap().get("growth"), Ok(Value::UInt(9)));
        assert_eq!(
            record.set("hp", BTreeMap::from([("mp".to_string(), Value::UInt(1))])),
            Err(AccessError::UnknownField {
                layout: "Stat".to_string(),
                field: "mp".to_string(),
            })
        );
    }

    #[test]
    fn test_elements() {
        let mut record = Record::new(character());
        record.set_element("levels", 1, 42u8).unwrap();
        assert_eq!(record.get_element("levels", 1), Ok(Value::UInt(42)));
        assert_eq!(
            record.get("levels"),
            Ok(Value::Array(vec![Value::UInt(0), Value::UInt(42), Value::UInt(0)]))
        );
        assert!(matches!(
            record.set_element("levels", 3, 1u8),
            Err(AccessError::IndexOutOfRange { index: 3, count: 3, .. })
        ));
        assert_eq!(
            record.get_element("id", 0),
            Err(AccessError::NotAnArray("id".to_string()))
        );
    }

    #[test]
    fn test_failed_write_leaves_record_unchanged() {
        let mut record = Record::new(character());
        record.set_text("name", "KEEP").unwrap();
        let before = record.clone();

        assert!(matches!(
            record.set_text("name", "TOO LONG!"),
            Err(AccessError::Capacity(CapacityError::Overflow { .. }))
        ));
        assert!(record.set_text("id", "x").is_err());
        assert!(record.set("missing", 1u8).is_err());
        assert_eq!(record, before);
    }

    #[test]
    fn test_unmodified_round_trip() {
        let bytes: Vec<u8> = (0..16).map(|i| i * 17).collect();
        let record = Record::from_bytes(character(), &bytes).unwrap();
        assert_eq!(record.view().raw("hp").unwrap(), &bytes[10..13]);
        assert_eq!(record.into_bytes(), bytes);
    }
}
