//! Cross-file identity for whole-program C analysis
//!
//! Each translation unit has its own [`cdict_core::Dictionary`] and its own
//! numbering of global variables and struct keys. The [`IndexManager`]
//! translates between these numberings through program-wide global ids and
//! persists each file's share of the mapping as a small xref document.

pub mod config;
pub mod error;
pub mod index_manager;
pub mod reference;
pub mod unit;
pub mod xrefs;

pub use config::XrefConfig;
pub use error::{Result, XrefError};
pub use index_manager::{IndexManager, FIDVIDMAX_INITIAL_VALUE};
pub use reference::{FileKeyReference, FileVarReference};
pub use unit::{SourceFile, TranslationUnit};
pub use xrefs::FileXrefs;
