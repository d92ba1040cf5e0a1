//! Published struct layouts, looked up by name.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::{errors::SchemaError, layout::StructLayout, schema::Schema};

/// A table of finished layouts keyed by struct name.
///
/// Declaring resolves [crate::field::FieldKind::StructRef] fields against
/// the layouts already published here, so declarations must be ordered
/// dependencies first.
#[derive(Debug, Default)]
pub struct Registry {
    layouts: RwLock<BTreeMap<String, Arc<StructLayout>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by [Schema::declare].
    pub fn global() -> &'static Registry {
        static GLOBAL: OnceLock<Registry> = OnceLock::new();
        GLOBAL.get_or_init(Registry::new)
    }

    /// Compiles `schema` and publishes its layout.
    ///
    /// Declaring the same schema again returns the layout already published.
    /// Declaring a different layout under a taken name fails.
    pub fn declare(&self, schema: &Schema) -> Result<Arc<StructLayout>, SchemaError> {
        let layout = schema.compile_with(&|name| self.get(name))?;

        let mut layouts = self.layouts.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = layouts.get(&schema.name) {
            if **existing != layout {
                return Err(SchemaError::ConflictingDeclaration(schema.name.clone()));
            }
            tracing::debug!(layout = %schema.name, "struct already declared, reusing layout");
            return Ok(existing.clone());
        }

        let layout = Arc::new(layout);
        layouts.insert(schema.name.clone(), layout.clone());
        tracing::debug!(
            layout = %schema.name,
            size = layout.size(),
            declared = layouts.len(),
            "published struct layout"
        );
        Ok(layout)
    }

    pub fn get(&self, name: &str) -> Option<Arc<StructLayout>> {
        self.layouts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.layouts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Names of every published layout, sorted.
    pub fn names(&self) -> Vec<String> {
        self.layouts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}
