//! Typed views over raw dictionary records

use std::fmt;
use std::ops::Deref;

use tracing::debug;

use crate::dictionary::Dictionary;
use crate::error::{DictionaryError, Result};
use crate::indexed_table::{IndexedTable, IndexedTableValue};

/// Argument value marking an absent optional reference
pub const NO_REFERENCE: i64 = -1;

/// A raw record together with the dictionary that owns it.
///
/// The dictionary reference is used for lookups only; records never own
/// the records they refer to, they only hold their indices.
#[derive(Clone, Copy)]
pub struct Record<'d> {
    dictionary: &'d Dictionary,
    value: &'d IndexedTableValue,
}

impl<'d> Record<'d> {
    pub fn new(dictionary: &'d Dictionary, value: &'d IndexedTableValue) -> Self {
        Self { dictionary, value }
    }

    pub fn dictionary(&self) -> &'d Dictionary {
        self.dictionary
    }

    pub fn value(&self) -> &'d IndexedTableValue {
        self.value
    }

    pub fn index(&self) -> usize {
        self.value.index()
    }

    pub fn tag(&self) -> &'d str {
        self.value.tag()
    }

    pub fn tags(&self) -> &'d [String] {
        self.value.tags()
    }

    pub fn args(&self) -> &'d [i64] {
        self.value.args()
    }

    /// Tag at `position`, or an empty string if the record has fewer tags
    pub fn tag_at(&self, position: usize) -> &'d str {
        self.value
            .tags()
            .get(position)
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn arg(&self, position: usize, table: &str) -> Result<i64> {
        self.value
            .args()
            .get(position)
            .copied()
            .ok_or_else(|| DictionaryError::MalformedEntry {
                table: table.to_string(),
                reason: format!(
                    "record {} ({}) has no argument {}",
                    self.index(),
                    self.tag(),
                    position
                ),
            })
    }

    /// Argument at `position` interpreted as an index into another table
    pub fn arg_index(&self, position: usize, table: &str) -> Result<usize> {
        let arg = self.arg(position, table)?;
        usize::try_from(arg).map_err(|_| DictionaryError::InvalidReference {
            table: table.to_string(),
            index: self.index(),
            position,
            arg,
        })
    }

    /// Like [`Record::arg_index`], but `-1` denotes an absent reference
    pub fn opt_arg_index(&self, position: usize, table: &str) -> Result<Option<usize>> {
        match self.arg(position, table)? {
            NO_REFERENCE => Ok(None),
            _ => self.arg_index(position, table).map(Some),
        }
    }

    /// Whether argument `position` refers back to this record itself
    pub fn is_self_reference(&self, position: usize) -> bool {
        self.value
            .args()
            .get(position)
            .is_some_and(|&arg| arg >= 0 && arg as usize == self.index())
    }

    /// Follow a reference into this record's own table. A reference to the
    /// record's own index yields `this` instead of a fresh view.
    pub fn follow<'v, V, G>(
        &self,
        this: &'v V,
        position: usize,
        table: &str,
        get: G,
    ) -> Result<Target<'v, V>>
    where
        V: ?Sized,
        G: FnOnce(&'d Dictionary, usize) -> Result<Box<V>>,
    {
        if self.is_self_reference(position) {
            debug!(table, index = self.index(), position, "self-referential record");
            return Ok(Target::Itself(this));
        }
        let index = self.arg_index(position, table)?;
        Ok(Target::Other(get(self.dictionary, index)?))
    }
}

impl fmt::Debug for Record<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("index", &self.index())
            .field("tags", &self.tags())
            .field("args", &self.args())
            .finish()
    }
}

/// An independently tagged record family whose variants are resolved through
/// the [`Registry`](crate::registry::Registry).
pub trait Family: 'static {
    /// Human-readable family name used in diagnostics
    const NAME: &'static str;

    /// The typed view every variant of the family is exposed as
    type View<'d>: ?Sized + 'd;

    /// Function building the view of one registered variant, typically
    /// `for<'d> fn(Record<'d>) -> Box<dyn SomeView<'d> + 'd>`
    type Constructor: Copy + Send + Sync + 'static;

    fn construct<'d>(constructor: Self::Constructor, record: Record<'d>) -> Box<Self::View<'d>>;

    /// The table in which records of this family are stored
    fn table(dictionary: &Dictionary) -> &IndexedTable;

    fn table_mut(dictionary: &mut Dictionary) -> &mut IndexedTable;
}

/// Result of following a reference that may point back at its own record
pub enum Target<'a, V: ?Sized> {
    /// The reference is a fixed point; this is the referring view itself
    Itself(&'a V),
    Other(Box<V>),
}

impl<V: ?Sized> Target<'_, V> {
    pub fn is_itself(&self) -> bool {
        matches!(self, Target::Itself(_))
    }
}

impl<V: ?Sized> Deref for Target<'_, V> {
    type Target = V;

    fn deref(&self) -> &V {
        match self {
            Target::Itself(view) => view,
            Target::Other(view) => view,
        }
    }
}

/// Marker rendered in place of a record that refers to itself
pub const SELF_MARKER: &str = "self";

impl<V: ?Sized + fmt::Display> fmt::Display for Target<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Itself(_) => f.write_str(SELF_MARKER),
            Target::Other(view) => view.fmt(f),
        }
    }
}

impl<V: ?Sized + fmt::Debug> fmt::Debug for Target<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Itself(_) => f.write_str("Itself"),
            Target::Other(view) => f.debug_tuple("Other").field(view).finish(),
        }
    }
}
