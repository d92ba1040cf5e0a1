//! Normalized field descriptors produced from declared [Field]s.

use std::sync::Arc;

use crate::{
    errors::SchemaError,
    field::{Field, FieldKind, Primitive, StrSpec},
    layout::StructLayout,
    validation,
};

/// Resolved kind of a compiled field: every nested reference points to a
/// finished layout.
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledKind {
    Primitive(Primitive),
    Str(StrSpec),
    Bytes(usize),
    Struct(Arc<StructLayout>),
    Array {
        element: Box<CompiledKind>,
        count: usize,
        /// Distance in bytes between consecutive elements.
        stride: usize,
    },
}

/// A field descriptor: name, resolved kind, raw width and alignment.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledField {
    pub name: String,
    pub kind: CompiledKind,
    pub width: usize,
    pub align: usize,
}

impl CompiledField {
    /// Compiles `field`, resolving [FieldKind::StructRef] through `resolve`.
    pub fn compile(
        field: &Field,
        resolve: &dyn Fn(&str) -> Option<Arc<StructLayout>>,
    ) -> Result<Self, SchemaError> {
        let (kind, width, align) = compile_kind(&field.name, &field.kind, resolve)?;

        Ok(CompiledField {
            name: field.name.clone(),
            kind,
            width,
            align,
        })
    }
}

impl TryFrom<&Field> for CompiledField {
    type Error = SchemaError;

    /// Compiles without a registry; named struct references fail.
    fn try_from(value: &Field) -> Result<Self, Self::Error> {
        CompiledField::compile(value, &|_| None)
    }
}

fn compile_kind(
    name: &str,
    kind: &FieldKind,
    resolve: &dyn Fn(&str) -> Option<Arc<StructLayout>>,
) -> Result<(CompiledKind, usize, usize), SchemaError> {
    match kind {
        FieldKind::Primitive(p) => Ok((CompiledKind::Primitive(*p), p.width(), p.width())),
        FieldKind::Str(spec) => {
            validation::check_string(name, spec)?;
            Ok((CompiledKind::Str(spec.clone()), spec.len, 1))
        }
        FieldKind::Bytes(len) => {
            validation::check_bytes(name, *len)?;
            Ok((CompiledKind::Bytes(*len), *len, 1))
        }
        FieldKind::Struct(layout) => Ok((
            CompiledKind::Struct(layout.clone()),
            layout.size(),
            layout.align(),
        )),
        FieldKind::StructRef(type_name) => {
            let layout = resolve(type_name).ok_or_else(|| SchemaError::UnresolvedType {
                field: name.to_string(),
                type_name: type_name.clone(),
            })?;
            let (size, align) = (layout.size(), layout.align());
            Ok((CompiledKind::Struct(layout), size, align))
        }
        FieldKind::Array(element, count) => {
            validation::check_array_count(name, *count)?;
            let (element, stride, align) = compile_kind(name, element, resolve)?;
            let width = validation::checked_mul(name, stride, *count)?;

            Ok((
                CompiledKind::Array {
                    element: Box::new(element),
                    count: *count,
                    stride,
                },
                width,
                align,
            ))
        }
    }
}
