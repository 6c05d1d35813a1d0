//! Tag-keyed constructor registry for open record families
//!
//! Each [`Family`] owns an independent vocabulary of variant tags. A
//! constructor is bound to a `(family, tag)` pair during setup; lookups read
//! the first tag of a raw record and dispatch to the bound constructor.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::error::{DictionaryError, Result};
use crate::record::{Family, Record};

type TagTable = HashMap<String, Box<dyn Any + Send + Sync>>;

/// Registry of variant constructors for every record family
#[derive(Default)]
pub struct Registry {
    families: HashMap<TypeId, TagTable>,
    names: HashMap<TypeId, &'static str>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with all built-in C dictionary families registered
    pub fn standard() -> Self {
        let mut registry = Self::new();
        crate::families::register_all(&mut registry);
        registry
    }

    /// Process-wide shared instance of [`Registry::standard`]
    pub fn shared() -> Arc<Registry> {
        static SHARED: OnceLock<Arc<Registry>> = OnceLock::new();
        SHARED.get_or_init(|| Arc::new(Registry::standard())).clone()
    }

    /// Bind `constructor` to `tag` within family `F`
    pub fn register<F: Family>(&mut self, tag: &str, constructor: F::Constructor) -> Result<()> {
        if self.is_registered::<F>(tag) {
            return Err(DictionaryError::DuplicateTag {
                family: F::NAME,
                tag: tag.to_string(),
            });
        }
        self.bind::<F>(tag, constructor);
        Ok(())
    }

    /// Bind `constructor` to `tag`, replacing any earlier binding
    pub(crate) fn bind<F: Family>(&mut self, tag: &str, constructor: F::Constructor) {
        self.names.insert(TypeId::of::<F>(), F::NAME);
        self.families
            .entry(TypeId::of::<F>())
            .or_default()
            .insert(tag.to_string(), Box::new(constructor));
    }

    pub fn is_registered<F: Family>(&self, tag: &str) -> bool {
        self.families
            .get(&TypeId::of::<F>())
            .is_some_and(|t| t.contains_key(tag))
    }

    /// Registered tags of family `F`, sorted
    pub fn tags<F: Family>(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self
            .families
            .get(&TypeId::of::<F>())
            .map(|t| t.keys().map(String::as_str).collect())
            .unwrap_or_default();
        tags.sort_unstable();
        tags
    }

    /// Dispatch `record` on its first tag to the constructor bound in `F`
    pub fn construct<'d, F: Family>(&self, record: Record<'d>) -> Result<Box<F::View<'d>>> {
        let tag = record.tag();
        let constructor = self
            .families
            .get(&TypeId::of::<F>())
            .and_then(|t| t.get(tag))
            .and_then(|c| c.downcast_ref::<F::Constructor>())
            .ok_or_else(|| DictionaryError::UnknownVariant {
                family: F::NAME,
                tag: tag.to_string(),
            })?;
        Ok(F::construct(*constructor, record))
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut families: Vec<_> = self
            .families
            .iter()
            .map(|(id, tags)| (self.names.get(id).copied().unwrap_or("?"), tags.len()))
            .collect();
        families.sort_unstable();
        f.debug_struct("Registry").field("families", &families).finish()
    }
}
