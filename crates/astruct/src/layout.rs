//! Struct layouts: field offsets, total size and alignment.
//!
//! A [StructLayout] is synthesized once from compiled fields and is
//! immutable afterwards. Layouts are `Send + Sync` and are normally shared
//! behind an `Arc`.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use crate::{
    accessor::Accessor,
    compiled::{CompiledField, CompiledKind},
    errors::SchemaError,
    validation,
};

/// How field offsets are aligned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Packing {
    /// No padding: offsets are a prefix sum of widths.
    #[default]
    Packed,
    /// Natural alignment, as a C compiler lays out a plain struct.
    Aligned,
    /// Natural alignment capped at `n` bytes (`#pragma pack(n)`).
    Limit(usize),
}

impl Packing {
    /// Alignment actually applied to a field whose natural alignment is `align`.
    pub fn effective_align(&self, align: usize) -> usize {
        match self {
            Packing::Packed => 1,
            Packing::Aligned => align.max(1),
            Packing::Limit(n) => align.min(*n).max(1),
        }
    }
}

/// Byte order of multi-byte primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    #[default]
    Little,
    Big,
}

/// A field placed at its byte offset, with the accessor that reads and
/// writes it.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutField {
    pub field: CompiledField,
    pub offset: usize,
    pub accessor: Accessor,
}

impl LayoutField {
    pub fn name(&self) -> &str {
        &self.field.name
    }

    pub fn width(&self) -> usize {
        self.field.width
    }

    /// Byte range of the field inside a record.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.field.width
    }
}

/// The synthesized layout of one struct type.
#[derive(Debug, Clone, PartialEq)]
pub struct StructLayout {
    name: String,
    fields: Vec<LayoutField>,
    index: BTreeMap<String, usize>,
    size: usize,
    align: usize,
    packing: Packing,
    endian: Endian,
}

impl StructLayout {
    /// Places `fields` in declaration order and installs their accessors.
    /// Field names are expected to be validated already (see
    /// [crate::schema::Schema::compile]).
    pub fn synthesize(
        name: &str,
        fields: Vec<CompiledField>,
        packing: Packing,
        endian: Endian,
    ) -> Result<Self, SchemaError> {
        validation::check_packing(packing)?;

        let mut placed = Vec::with_capacity(fields.len());
        let mut index = BTreeMap::new();
        let mut cursor = 0usize;
        let mut align = 1usize;

        for field in fields {
            let field_align = packing.effective_align(field.align);
            let offset = validation::round_up(&field.name, cursor, field_align)?;
            cursor = validation::checked_add(&field.name, offset, field.width)?;
            align = align.max(field_align);

            let accessor = Accessor::for_field(&field, endian);
            index.insert(field.name.clone(), placed.len());
            placed.push(LayoutField {
                field,
                offset,
                accessor,
            });
        }

        let size = validation::round_up(name, cursor, align)?;

        tracing::debug!(
            layout = name,
            size,
            align,
            fields = placed.len(),
            ?packing,
            ?endian,
            "synthesized struct layout"
        );

        Ok(StructLayout {
            name: name.to_string(),
            fields: placed,
            index,
            size,
            align,
            packing,
            endian,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total size in bytes, including trailing padding.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Alignment of the struct when nested in another layout.
    pub fn align(&self) -> usize {
        self.align
    }

    pub fn packing(&self) -> Packing {
        self.packing
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[LayoutField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&LayoutField> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    pub fn offset_of(&self, name: &str) -> Option<usize> {
        self.field(name).map(|f| f.offset)
    }
}

/// Writes the layout as an annotated C-style declaration.
impl fmt::Display for StructLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "struct {} {{ /* size {:#x}, align {}, {:?}, {:?} */",
            self.name, self.size, self.align, self.packing, self.endian
        )?;
        for field in &self.fields {
            writeln!(
                f,
                "    /* {:#06x} */ {};",
                field.offset,
                c_decl(&field.field.name, &field.field.kind)
            )?;
        }
        write!(f, "}}")
    }
}

fn c_decl(name: &str, kind: &CompiledKind) -> String {
    match kind {
        CompiledKind::Primitive(p) => format!("{p} {name}"),
        CompiledKind::Str(spec) => format!("char {name}[{}] /* {} */", spec.len, spec.policy),
        CompiledKind::Bytes(len) => format!("u8 {name}[{len}]"),
        CompiledKind::Struct(layout) => format!("struct {} {name}", layout.name()),
        CompiledKind::Array { element, count, .. } => {
            format!("{}[{count}]", c_decl(name, element))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::field::Field;
    use crate::schema::Schema;

    fn compile(fields: &[Field]) -> Vec<CompiledField> {
        fields
            .iter()
            .map(|f| CompiledField::try_from(f).unwrap())
            .collect()
    }

    fn mixed() -> Vec<CompiledField> {
        compile(&[
            Field::u8("flag"),
            Field::u32("value"),
            Field::u16("id"),
        ])
    }

    fn offsets(layout: &StructLayout) -> Vec<usize> {
        layout.fields().iter().map(|f| f.offset).collect()
    }

    #[test]
    fn test_packed() {
        let layout = StructLayout::synthesize("Mixed", mixed(), Packing::Packed, Endian::Little)
            .unwrap();
        assert_eq!(offsets(&layout), vec![0, 1, 5]);
        assert_eq!(layout.size(), 7);
        assert_eq!(layout.align(), 1);
    }

    #[test]
    fn test_aligned() {
        let layout = StructLayout::synthesize("Mixed", mixed(), Packing::Aligned, Endian::Little)
            .unwrap();
        assert_eq!(offsets(&layout), vec![0, 4, 8]);
        assert_eq!(layout.size(), 12);
        assert_eq!(layout.align(), 4);
    }

    #[test]
    fn test_pack_limit() {
        let fields = compile(&[Field::u8("flag"), Field::u64("value")]);
        let layout =
            StructLayout::synthesize("Capped", fields, Packing::Limit(2), Endian::Little).unwrap();
        assert_eq!(offsets(&layout), vec![0, 2]);
        assert_eq!(layout.size(), 10);
        assert_eq!(layout.align(), 2);
    }

    #[test]
    fn test_invalid_pack_limit() {
        assert_eq!(
            StructLayout::synthesize("Bad", mixed(), Packing::Limit(6), Endian::Little),
            Err(SchemaError::InvalidPacking(6))
        );
    }

    #[test]
    fn test_empty() {
        let layout =
            StructLayout::synthesize("Empty", vec![], Packing::Aligned, Endian::Little).unwrap();
        assert_eq!(layout.size(), 0);
        assert_eq!(layout.align(), 1);
    }

    #[test]
    fn test_nested_aligned_struct_is_padded() {
        let inner = Arc::new(
            Schema::new("Inner")
                .packing(Packing::Aligned)
                .field(Field::u32("a"))
                .field(Field::u8("b"))
                .compile()
                .unwrap(),
        );
        assert_eq!(inner.size(), 8);

        let fields = compile(&[
            Field::u8("tag"),
            Field::nested("inner", inner.clone()),
            Field::array("more", inner.into(), 2),
        ]);
        let layout =
            StructLayout::synthesize("Outer", fields, Packing::Aligned, Endian::Little).unwrap();
        assert_eq!(offsets(&layout), vec![0, 4, 12]);
        assert_eq!(layout.size(), 28);
    }

    #[test]
    fn test_lookup() {
        let layout =
            StructLayout::synthesize("Mixed", mixed(), Packing::Packed, Endian::Big).unwrap();
        assert_eq!(layout.offset_of("id"), Some(5));
        assert_eq!(layout.field("value").map(|f| f.range()), Some(1..5));
        assert!(layout.field("missing").is_none());
        assert_eq!(layout.endian(), Endian::Big);
    }

    #[test]
    fn test_display() {
        let fields = compile(&[Field::u16("id"), Field::str("name", 8)]);
        let layout =
            StructLayout::synthesize("Item", fields, Packing::Packed, Endian::Little).unwrap();
        let text = layout.to_string();
        assert!(text.starts_with("struct Item { /* size 0xa"));
        assert!(text.contains("/* 0x0000 */ u16 id;"));
        assert!(text.contains("/* 0x0002 */ char name[8] /* shift_jis/strict */;"));
    }
}
