//! Per-translation-unit structural-sharing store
//!
//! A [`Dictionary`] owns one [`IndexedTable`] per record family and resolves
//! raw records into typed views. Views borrow the dictionary; references
//! between records, within a table or across tables, stay plain indices
//! until an accessor follows them.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{DictionaryError, Result};
use crate::families::{
    AttrParam, AttrParams, Attribute, Attributes, CConst, CExp, CTyp, Constants, Exps, FunArg,
    FunArgs, Typs,
};
use crate::indexed_table::{Checkpoint, IndexedTable};
use crate::record::{Family, Record};
use crate::registry::Registry;
use crate::xml::Element;

/// Root element name of a persisted dictionary
pub const DICTIONARY_ELEMENT: &str = "c-dictionary";

pub const ATTRPARAM_TABLE: &str = "attrparam-table";
pub const ATTRIBUTE_TABLE: &str = "attribute-table";
pub const ATTRIBUTES_TABLE: &str = "attributes-table";
pub const CONSTANT_TABLE: &str = "constant-table";
pub const EXP_TABLE: &str = "exp-table";
pub const FUNARG_TABLE: &str = "funarg-table";
pub const FUNARGS_TABLE: &str = "funargs-table";
pub const TYP_TABLE: &str = "typ-table";

/// Checkpoints of every table of a dictionary, taken together
#[derive(Debug, Clone)]
pub struct DictionaryCheckpoint {
    tokens: Vec<Checkpoint>,
}

#[derive(Clone)]
pub struct Dictionary {
    registry: Arc<Registry>,
    attrparam_table: IndexedTable,
    attribute_table: IndexedTable,
    attributes_table: IndexedTable,
    constant_table: IndexedTable,
    exp_table: IndexedTable,
    funarg_table: IndexedTable,
    funargs_table: IndexedTable,
    typ_table: IndexedTable,
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::new(Registry::shared())
    }
}

impl Dictionary {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            attrparam_table: IndexedTable::new(ATTRPARAM_TABLE),
            attribute_table: IndexedTable::new(ATTRIBUTE_TABLE),
            attributes_table: IndexedTable::new(ATTRIBUTES_TABLE),
            constant_table: IndexedTable::new(CONSTANT_TABLE),
            exp_table: IndexedTable::new(EXP_TABLE),
            funarg_table: IndexedTable::new(FUNARG_TABLE),
            funargs_table: IndexedTable::new(FUNARGS_TABLE),
            typ_table: IndexedTable::new(TYP_TABLE),
        }
    }

    /// Load a dictionary from its persisted root element
    pub fn from_xml(registry: Arc<Registry>, root: &Element) -> Result<Self> {
        let mut dictionary = Self::new(registry);
        dictionary.read_xml(root)?;
        Ok(dictionary)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn tables(&self) -> [&IndexedTable; 8] {
        [
            &self.attrparam_table,
            &self.attribute_table,
            &self.attributes_table,
            &self.constant_table,
            &self.exp_table,
            &self.funarg_table,
            &self.funargs_table,
            &self.typ_table,
        ]
    }

    fn tables_mut(&mut self) -> [&mut IndexedTable; 8] {
        [
            &mut self.attrparam_table,
            &mut self.attribute_table,
            &mut self.attributes_table,
            &mut self.constant_table,
            &mut self.exp_table,
            &mut self.funarg_table,
            &mut self.funargs_table,
            &mut self.typ_table,
        ]
    }

    pub fn table(&self, name: &str) -> Option<&IndexedTable> {
        self.tables().into_iter().find(|t| t.name() == name)
    }

    pub fn attrparam_table(&self) -> &IndexedTable {
        &self.attrparam_table
    }

    pub fn attribute_table(&self) -> &IndexedTable {
        &self.attribute_table
    }

    pub fn attributes_table(&self) -> &IndexedTable {
        &self.attributes_table
    }

    pub fn constant_table(&self) -> &IndexedTable {
        &self.constant_table
    }

    pub fn exp_table(&self) -> &IndexedTable {
        &self.exp_table
    }

    pub fn funarg_table(&self) -> &IndexedTable {
        &self.funarg_table
    }

    pub fn funargs_table(&self) -> &IndexedTable {
        &self.funargs_table
    }

    pub fn typ_table(&self) -> &IndexedTable {
        &self.typ_table
    }

    pub(crate) fn attrparam_table_mut(&mut self) -> &mut IndexedTable {
        &mut self.attrparam_table
    }

    pub(crate) fn constant_table_mut(&mut self) -> &mut IndexedTable {
        &mut self.constant_table
    }

    pub(crate) fn exp_table_mut(&mut self) -> &mut IndexedTable {
        &mut self.exp_table
    }

    pub(crate) fn typ_table_mut(&mut self) -> &mut IndexedTable {
        &mut self.typ_table
    }

    // -------------- Retrieve items from dictionary tables -------------------

    /// Typed view of record `index` of family `F`, dispatched on its tag
    pub fn get<F: Family>(&self, index: usize) -> Result<Box<F::View<'_>>> {
        let value = F::table(self).retrieve(index)?;
        self.registry.construct::<F>(Record::new(self, value))
    }

    /// Typed views of every record of family `F`, by index
    pub fn objectmap<F: Family>(&self) -> Result<BTreeMap<usize, Box<F::View<'_>>>> {
        F::table(self)
            .keys()
            .map(|index| Ok((index, self.get::<F>(index)?)))
            .collect()
    }

    pub fn get_attrparam(&self, index: usize) -> Result<Box<dyn AttrParam<'_> + '_>> {
        self.get::<AttrParams>(index)
    }

    pub fn get_constant(&self, index: usize) -> Result<Box<dyn CConst<'_> + '_>> {
        self.get::<Constants>(index)
    }

    pub fn get_exp(&self, index: usize) -> Result<Box<dyn CExp<'_> + '_>> {
        self.get::<Exps>(index)
    }

    pub fn get_exp_opt(&self, index: Option<usize>) -> Result<Option<Box<dyn CExp<'_> + '_>>> {
        index.map(|ix| self.get_exp(ix)).transpose()
    }

    pub fn get_typ(&self, index: usize) -> Result<Box<dyn CTyp<'_> + '_>> {
        self.get::<Typs>(index)
    }

    pub fn get_attribute(&self, index: usize) -> Result<Attribute<'_>> {
        let value = self.attribute_table.retrieve(index)?;
        value.check_key(1, value.args().len(), ATTRIBUTE_TABLE)?;
        Ok(Attribute::new(Record::new(self, value)))
    }

    pub fn get_attributes(&self, index: usize) -> Result<Attributes<'_>> {
        let value = self.attributes_table.retrieve(index)?;
        value.check_key(0, value.args().len(), ATTRIBUTES_TABLE)?;
        Ok(Attributes::new(Record::new(self, value)))
    }

    pub fn get_funarg(&self, index: usize) -> Result<FunArg<'_>> {
        let value = self.funarg_table.retrieve(index)?;
        value.check_key(1, 2, FUNARG_TABLE)?;
        Ok(FunArg::new(Record::new(self, value)))
    }

    pub fn get_funargs(&self, index: usize) -> Result<FunArgs<'_>> {
        let value = self.funargs_table.retrieve(index)?;
        value.check_key(0, value.args().len(), FUNARGS_TABLE)?;
        Ok(FunArgs::new(Record::new(self, value)))
    }

    pub fn get_funargs_opt(&self, index: Option<usize>) -> Result<Option<FunArgs<'_>>> {
        index.map(|ix| self.get_funargs(ix)).transpose()
    }

    // ----------------------- Index items by family --------------------------

    /// Intern a record of family `F`; the variant tag must be registered
    pub fn index<F: Family, S: AsRef<str>>(&mut self, tags: &[S], args: &[i64]) -> Result<usize> {
        let tag = tags.first().map(|t| t.as_ref()).unwrap_or("");
        if !self.registry.is_registered::<F>(tag) {
            return Err(DictionaryError::UnknownVariant {
                family: F::NAME,
                tag: tag.to_string(),
            });
        }
        Ok(F::table_mut(self).intern(tags, args))
    }

    pub fn index_attrparam<S: AsRef<str>>(&mut self, tags: &[S], args: &[i64]) -> Result<usize> {
        self.index::<AttrParams, S>(tags, args)
    }

    pub fn index_constant<S: AsRef<str>>(&mut self, tags: &[S], args: &[i64]) -> Result<usize> {
        self.index::<Constants, S>(tags, args)
    }

    pub fn index_exp<S: AsRef<str>>(&mut self, tags: &[S], args: &[i64]) -> Result<usize> {
        self.index::<Exps, S>(tags, args)
    }

    pub fn index_typ<S: AsRef<str>>(&mut self, tags: &[S], args: &[i64]) -> Result<usize> {
        self.index::<Typs, S>(tags, args)
    }

    /// Intern an attribute `name(params...)`; every parameter must exist
    pub fn index_attribute(&mut self, name: &str, params: &[usize]) -> Result<usize> {
        let args = self.existing_indices(ATTRPARAM_TABLE, params)?;
        Ok(self.attribute_table.intern(&[name], &args))
    }

    /// Intern a list of attributes; an empty list is a valid record
    pub fn index_attributes(&mut self, attributes: &[usize]) -> Result<usize> {
        let args = self.existing_indices(ATTRIBUTE_TABLE, attributes)?;
        Ok(self.attributes_table.intern::<&str>(&[], &args))
    }

    pub fn index_funarg(&mut self, name: &str, typ: usize, attributes: usize) -> Result<usize> {
        self.typ_table.retrieve(typ)?;
        self.attributes_table.retrieve(attributes)?;
        Ok(self
            .funarg_table
            .intern(&[name], &[typ as i64, attributes as i64]))
    }

    pub fn index_funargs(&mut self, funargs: &[usize]) -> Result<usize> {
        let args = self.existing_indices(FUNARG_TABLE, funargs)?;
        Ok(self.funargs_table.intern::<&str>(&[], &args))
    }

    fn existing_indices(&self, table: &str, indices: &[usize]) -> Result<Vec<i64>> {
        let table = self
            .table(table)
            .ok_or_else(|| DictionaryError::MissingTable(table.to_string()))?;
        indices
            .iter()
            .map(|&ix| table.retrieve(ix).map(|_| ix as i64))
            .collect()
    }

    // ------------------------- Speculative interning -------------------------

    /// Checkpoint every table of the dictionary
    pub fn checkpoint_all(&mut self) -> DictionaryCheckpoint {
        DictionaryCheckpoint {
            tokens: self.tables_mut().into_iter().map(|t| t.checkpoint()).collect(),
        }
    }

    /// Roll every table back to `checkpoint`
    pub fn rollback_all(&mut self, checkpoint: DictionaryCheckpoint) -> Result<()> {
        for (table, token) in self.tables_mut().into_iter().zip(checkpoint.tokens) {
            table.rollback(token)?;
        }
        Ok(())
    }

    /// Keep everything interned since `checkpoint`
    pub fn release_all(&mut self, checkpoint: DictionaryCheckpoint) -> Result<()> {
        for (table, token) in self.tables_mut().into_iter().zip(checkpoint.tokens) {
            table.release(token)?;
        }
        Ok(())
    }

    // ------------------------- Persisted representation ----------------------

    /// Replace the contents of every table with the sections under `root`.
    ///
    /// All sections must be present and well formed; on any error the
    /// dictionary is left as it was.
    pub fn read_xml(&mut self, root: &Element) -> Result<()> {
        let loaded = self
            .tables()
            .into_iter()
            .map(|table| {
                let section = root
                    .find(table.name())
                    .ok_or_else(|| DictionaryError::MissingTable(table.name().to_string()))?;
                table.parse_xml(section)
            })
            .collect::<Result<Vec<_>>>()?;

        for (table, fresh) in self.tables_mut().into_iter().zip(loaded) {
            *table = fresh;
        }

        debug!(
            records = self.tables().iter().map(|t| t.size()).sum::<usize>(),
            "loaded dictionary"
        );
        Ok(())
    }

    pub fn write_xml(&self) -> Result<Element> {
        let mut root = Element::new(DICTIONARY_ELEMENT);
        for table in self.tables() {
            root.push(table.to_xml()?);
        }
        Ok(root)
    }
}

impl fmt::Debug for Dictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sizes: Vec<(&str, usize)> = self.tables().iter().map(|t| (t.name(), t.size())).collect();
        f.debug_struct("Dictionary").field("tables", &sizes).finish()
    }
}

impl fmt::Display for Dictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for table in self.tables() {
            write!(f, "{}", table)?;
        }
        Ok(())
    }
}
