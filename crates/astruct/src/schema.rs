//! Schema: an ordered field declaration compiled into a [StructLayout].

use std::collections::HashSet;
use std::sync::Arc;

use crate::{
    compiled::CompiledField,
    errors::SchemaError,
    field::Field,
    layout::{Endian, Packing, StructLayout},
    registry::Registry,
    validation,
};

/// A struct declaration. Build it with [Schema::new] and the chained
/// setters, then [Schema::compile] or [Schema::declare] it.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub name: String,
    pub packing: Packing,
    pub endian: Endian,
    /// Fields in layout order.
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Schema {
            name: name.into(),
            packing: Packing::default(),
            endian: Endian::default(),
            fields: Vec::new(),
        }
    }

    pub fn packing(mut self, packing: Packing) -> Self {
        self.packing = packing;
        self
    }

    pub fn endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Compiles the schema into a layout. Fields referring to other structs
    /// by name ([crate::field::FieldKind::StructRef]) fail here; use
    /// [Schema::declare] or [Schema::compile_with] for those.
    pub fn compile(&self) -> Result<StructLayout, SchemaError> {
        self.compile_with(&|_| None)
    }

    /// Compiles the schema, resolving struct references through `resolve`.
    pub fn compile_with(
        &self,
        resolve: &dyn Fn(&str) -> Option<Arc<StructLayout>>,
    ) -> Result<StructLayout, SchemaError> {
        validation::check_type_name(&self.name)?;

        let mut seen = HashSet::with_capacity(self.fields.len());
        let mut compiled = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            validation::check_field_name(&mut seen, &field.name)?;
            compiled.push(CompiledField::compile(field, resolve)?);
        }

        StructLayout::synthesize(&self.name, compiled, self.packing, self.endian)
    }

    /// Compiles the schema and publishes it in the process-wide registry.
    pub fn declare(&self) -> Result<Arc<StructLayout>, SchemaError> {
        Registry::global().declare(self)
    }
}
