//! Hash-consed dictionaries for whole-program C analysis
//!
//! Every structurally distinct type, expression, constant and attribute of a
//! translation unit is stored exactly once, in an [`IndexedTable`], and is
//! referred to by its integer index. A [`Dictionary`] groups the tables of
//! one translation unit and resolves raw records into typed views through a
//! tag-keyed [`Registry`].

pub mod dictionary;
pub mod error;
pub mod families;
pub mod indexed_table;
pub mod record;
pub mod registry;
pub mod xml;

pub use dictionary::{Dictionary, DictionaryCheckpoint};
pub use error::{DictionaryError, Result};
pub use indexed_table::{Checkpoint, IndexedTable, IndexedTableValue, TableKey};
pub use record::{Family, Record, Target};
pub use registry::Registry;
pub use xml::Element;
