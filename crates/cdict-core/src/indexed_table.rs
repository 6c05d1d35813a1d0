//! Hash-consing table that assigns stable indices to tagged records
//!
//! Every record is described by a list of string tags (the first one names
//! the variant) and a list of integer arguments. Structurally equal records
//! always receive the same index; indices are never reassigned, only
//! discarded by rolling back to an earlier checkpoint.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use tracing::debug;

use crate::error::{DictionaryError, Result};
use crate::xml::Element;

/// Element name of a single persisted table entry
pub const ENTRY_ELEMENT: &str = "n";

/// Structural identity of a record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableKey {
    pub tags: Vec<String>,
    pub args: Vec<i64>,
}

impl TableKey {
    pub fn new(tags: Vec<String>, args: Vec<i64>) -> Self {
        Self { tags, args }
    }

    /// Comma-joined tag and argument strings, as persisted
    pub fn joined(&self) -> (String, String) {
        (self.tags.join(","), join_args(&self.args))
    }
}

/// A record stored in an [`IndexedTable`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedTableValue {
    index: usize,
    key: TableKey,
}

impl IndexedTableValue {
    pub fn new(index: usize, tags: Vec<String>, args: Vec<i64>) -> Self {
        Self {
            index,
            key: TableKey::new(tags, args),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn tags(&self) -> &[String] {
        &self.key.tags
    }

    pub fn args(&self) -> &[i64] {
        &self.key.args
    }

    pub fn key(&self) -> &TableKey {
        &self.key
    }

    /// Variant discriminant, or the empty string for untagged records
    pub fn tag(&self) -> &str {
        self.key.tags.first().map(String::as_str).unwrap_or("")
    }

    /// Verify that the record has exactly the expected number of tags and args
    pub fn check_key(&self, tag_count: usize, arg_count: usize, name: &str) -> Result<()> {
        if self.key.tags.len() == tag_count && self.key.args.len() == arg_count {
            Ok(())
        } else {
            Err(DictionaryError::ValueMismatch {
                tag: self.tag().to_string(),
                name: name.to_string(),
                expected_tags: tag_count,
                expected_args: arg_count,
                found_tags: self.key.tags.len(),
                found_args: self.key.args.len(),
            })
        }
    }

    /// Write the `t`, `a` and `ix` attributes of a persisted entry
    ///
    /// `t` is present exactly when the record has tags, so `[""]` and `[]`
    /// stay distinct.
    pub fn write_xml(&self, node: &mut Element) {
        let (tags, args) = self.key.joined();
        if !self.key.tags.is_empty() {
            node.set("t", tags);
        }
        if !args.is_empty() {
            node.set("a", args);
        }
        node.set("ix", self.index.to_string());
    }
}

impl fmt::Display for IndexedTableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: [{}] [{}]",
            self.index,
            self.key.tags.join(","),
            join_args(&self.key.args)
        )
    }
}

/// Token returned by [`IndexedTable::checkpoint`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    depth: usize,
    next: usize,
}

impl Checkpoint {
    /// The allocation frontier captured by this checkpoint
    pub fn frontier(&self) -> usize {
        self.next
    }
}

/// Append-only interning table for one record family
#[derive(Debug, Clone)]
pub struct IndexedTable {
    name: String,
    keytable: HashMap<TableKey, usize>,
    indextable: BTreeMap<usize, IndexedTableValue>,
    next: usize,
    reserved: BTreeSet<usize>,
    checkpoints: Vec<usize>,
}

impl IndexedTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keytable: HashMap::new(),
            indextable: BTreeMap::new(),
            next: 0,
            reserved: BTreeSet::new(),
            checkpoints: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of occupied indices
    pub fn size(&self) -> usize {
        self.indextable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indextable.is_empty()
    }

    /// The index the next new record will receive
    pub fn next_index(&self) -> usize {
        self.next
    }

    pub fn reset(&mut self) {
        self.keytable.clear();
        self.indextable.clear();
        self.next = 0;
        self.reserved.clear();
        self.checkpoints.clear();
    }

    /// Return the index of `(tags, args)`, allocating a new one if the record
    /// has not been seen before
    pub fn intern<S: AsRef<str>>(&mut self, tags: &[S], args: &[i64]) -> usize {
        let key = TableKey::new(
            tags.iter().map(|t| t.as_ref().to_string()).collect(),
            args.to_vec(),
        );
        self.intern_key(key)
    }

    pub fn intern_key(&mut self, key: TableKey) -> usize {
        if let Some(&index) = self.keytable.get(&key) {
            return index;
        }
        let index = self.next;
        self.keytable.insert(key.clone(), index);
        self.indextable
            .insert(index, IndexedTableValue { index, key });
        self.next += 1;
        index
    }

    /// Intern a record at a conventional low index that must never be
    /// reassigned (e.g. a canonical `void` type)
    pub fn reserve<S: AsRef<str>>(&mut self, tags: &[S], args: &[i64]) -> usize {
        let index = self.intern(tags, args);
        self.reserved.insert(index);
        index
    }

    pub fn is_reserved(&self, index: usize) -> bool {
        self.reserved.contains(&index)
    }

    /// Index of an already interned record, without allocating
    pub fn lookup<S: AsRef<str>>(&self, tags: &[S], args: &[i64]) -> Option<usize> {
        let key = TableKey::new(
            tags.iter().map(|t| t.as_ref().to_string()).collect(),
            args.to_vec(),
        );
        self.keytable.get(&key).copied()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indextable.contains_key(&index)
    }

    pub fn retrieve(&self, index: usize) -> Result<&IndexedTableValue> {
        self.indextable
            .get(&index)
            .ok_or_else(|| DictionaryError::MissingIndex {
                table: self.name.clone(),
                index,
                size: self.size(),
            })
    }

    /// All records in index order
    pub fn values(&self) -> impl Iterator<Item = &IndexedTableValue> {
        self.indextable.values()
    }

    /// All occupied indices in ascending order
    pub fn keys(&self) -> impl Iterator<Item = usize> + '_ {
        self.indextable.keys().copied()
    }

    pub fn checkpoint(&mut self) -> Checkpoint {
        let token = Checkpoint {
            depth: self.checkpoints.len(),
            next: self.next,
        };
        self.checkpoints.push(self.next);
        token
    }

    pub fn has_checkpoint(&self) -> bool {
        !self.checkpoints.is_empty()
    }

    /// Discard every record interned since `token` was taken, together with
    /// any checkpoint taken after it
    pub fn rollback(&mut self, token: Checkpoint) -> Result<()> {
        self.validate(token)?;
        self.checkpoints.truncate(token.depth);

        let discarded = self.indextable.split_off(&token.next);
        for value in discarded.values() {
            self.keytable.remove(&value.key);
        }
        self.reserved.retain(|&index| index < token.next);
        self.next = token.next;

        debug!(
            table = %self.name,
            frontier = token.next,
            discarded = discarded.len(),
            "rolled back indexed table"
        );
        Ok(())
    }

    /// Keep the records interned since `token` and drop the checkpoint
    pub fn release(&mut self, token: Checkpoint) -> Result<()> {
        self.validate(token)?;
        self.checkpoints.truncate(token.depth);
        Ok(())
    }

    fn validate(&self, token: Checkpoint) -> Result<()> {
        if self.checkpoints.get(token.depth) == Some(&token.next) {
            Ok(())
        } else {
            Err(DictionaryError::StaleCheckpoint {
                table: self.name.clone(),
                next: token.next,
            })
        }
    }

    /// Install previously persisted records with their original indices
    pub fn load<I>(&mut self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = IndexedTableValue>,
    {
        if self.has_checkpoint() {
            return Err(DictionaryError::CheckpointActive(self.name.clone()));
        }

        let mut loaded = 0usize;
        for value in entries {
            let index = value.index;

            if let Some(existing) = self.indextable.get(&index) {
                if existing.key == value.key {
                    continue;
                }
                if self.reserved.contains(&index) {
                    return Err(DictionaryError::ReservedIndexConflict {
                        table: self.name.clone(),
                        index,
                    });
                }
                return Err(DictionaryError::MalformedEntry {
                    table: self.name.clone(),
                    reason: format!("index {} occurs twice with different records", index),
                });
            }
            if let Some(&other) = self.keytable.get(&value.key) {
                return Err(DictionaryError::MalformedEntry {
                    table: self.name.clone(),
                    reason: format!("record at index {} duplicates index {}", index, other),
                });
            }

            let after = index.checked_add(1).ok_or_else(|| {
                self.malformed(&format!("index {} is out of range", index))
            })?;
            self.keytable.insert(value.key.clone(), index);
            self.indextable.insert(index, value);
            self.next = self.next.max(after);
            loaded += 1;
        }

        debug!(table = %self.name, loaded, next = self.next, "loaded indexed table");
        Ok(())
    }

    /// Append one `n` element per record, in index order
    pub fn write_xml(&self, node: &mut Element) -> Result<()> {
        for value in self.indextable.values() {
            if let Some(tag) = value.tags().iter().find(|t| t.contains(',')) {
                return Err(DictionaryError::UnencodableTag {
                    table: self.name.clone(),
                    tag: tag.clone(),
                });
            }
            let mut entry = Element::new(ENTRY_ELEMENT);
            value.write_xml(&mut entry);
            node.push(entry);
        }
        Ok(())
    }

    /// Container element named after the table, holding all records
    pub fn to_xml(&self) -> Result<Element> {
        let mut node = Element::new(self.name.clone());
        self.write_xml(&mut node)?;
        Ok(node)
    }

    /// Replace the table with the records persisted under `node`; the
    /// table is left untouched if any record fails to load
    pub fn read_xml(&mut self, node: &Element) -> Result<()> {
        *self = self.parse_xml(node)?;
        Ok(())
    }

    /// A new table of the same name holding the records persisted under `node`
    pub fn parse_xml(&self, node: &Element) -> Result<IndexedTable> {
        let entries = node
            .find_all(ENTRY_ELEMENT)
            .map(|entry| self.parse_entry(entry))
            .collect::<Result<Vec<_>>>()?;
        let mut table = IndexedTable::new(self.name.clone());
        table.load(entries)?;
        Ok(table)
    }

    fn parse_entry(&self, entry: &Element) -> Result<IndexedTableValue> {
        let index = entry
            .get("ix")
            .ok_or_else(|| self.malformed("entry without ix attribute"))?;
        let index = index
            .parse::<usize>()
            .map_err(|e| self.malformed(&format!("invalid index {:?}: {}", index, e)))?;

        let tags = match entry.get("t") {
            Some(t) => t.split(',').map(str::to_string).collect(),
            None => Vec::new(),
        };
        let args = get_attribute_int_list(entry, "a")
            .map_err(|e| self.malformed(&format!("entry {}: {}", index, e)))?;

        Ok(IndexedTableValue::new(index, tags, args))
    }

    fn malformed(&self, reason: &str) -> DictionaryError {
        DictionaryError::MalformedEntry {
            table: self.name.clone(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for IndexedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({} entries)", self.name, self.size())?;
        for value in self.indextable.values() {
            writeln!(f, "  {}", value)?;
        }
        Ok(())
    }
}

/// Integers in the comma-separated attribute `attr`, or an empty list if
/// the attribute is absent or empty
pub fn get_attribute_int_list(node: &Element, attr: &str) -> Result<Vec<i64>, String> {
    match node.get(attr) {
        None | Some("") => Ok(Vec::new()),
        Some(text) => text
            .split(',')
            .map(|s| {
                s.trim()
                    .parse::<i64>()
                    .map_err(|e| format!("invalid integer {:?} in {}: {}", s, attr, e))
            })
            .collect(),
    }
}

fn join_args(args: &[i64]) -> String {
    args.iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const NO_TAGS: &[&str] = &[];

    #[test]
    fn test_intern_deduplicates() {
        let mut table = IndexedTable::new("typ-table");

        assert_eq!(table.intern(&["tint"], &[]), 0);
        assert_eq!(table.intern(&["tint"], &[]), 0);
        assert_eq!(table.intern(&["tptr"], &[0]), 1);
        assert_eq!(table.size(), 2);

        let value = table.retrieve(1).unwrap();
        assert_eq!(value.index(), 1);
        assert_eq!(value.tags(), &["tptr".to_string()]);
        assert_eq!(value.args(), &[0i64]);
    }

    #[test]
    fn test_tags_and_args_are_distinguished() {
        let mut table = IndexedTable::new("t");
        let a = table.intern(&["x", "1"], &[]);
        let b = table.intern(&["x"], &[1]);
        let c = table.intern(NO_TAGS, &[1]);
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_eq!(table.lookup(&["x"], &[1]), Some(b));
        assert_eq!(table.lookup(&["y"], &[]), None);
    }

    #[test]
    fn test_retrieve_missing_index() {
        let mut table = IndexedTable::new("exp-table");
        table.intern(&["const"], &[0]);

        let err = table.retrieve(5).unwrap_err();
        assert!(matches!(err, DictionaryError::MissingIndex { index: 5, size: 1, .. }));
        assert!(err.to_string().contains("exp-table"));
    }

    #[test]
    fn test_rollback_reuses_discarded_range() {
        let mut table = IndexedTable::new("t");
        table.intern(&["a"], &[]);

        let token = table.checkpoint();
        assert_eq!(table.intern(&["b"], &[]), 1);
        assert_eq!(table.intern(&["c"], &[]), 2);
        table.rollback(token).unwrap();

        assert_eq!(table.next_index(), 1);
        assert!(!table.contains(1));
        assert_eq!(table.lookup(&["b"], &[]), None);
        assert_eq!(table.intern(&["c"], &[]), 1);
        assert!(!table.has_checkpoint());
    }

    #[test]
    fn test_nested_checkpoints() {
        let mut table = IndexedTable::new("t");
        let outer = table.checkpoint();
        table.intern(&["a"], &[]);
        let inner = table.checkpoint();
        table.intern(&["b"], &[]);

        table.release(inner).unwrap();
        assert_eq!(table.size(), 2);

        // inner was released, it cannot be rolled back any more
        assert!(matches!(
            table.rollback(inner),
            Err(DictionaryError::StaleCheckpoint { .. })
        ));

        let inner = table.checkpoint();
        table.intern(&["c"], &[]);
        table.rollback(outer).unwrap();
        assert!(table.is_empty());
        assert!(table.rollback(inner).is_err());
    }

    #[test]
    fn test_reserved_index_survives_rollback() {
        let mut table = IndexedTable::new("typ-table");
        assert_eq!(table.reserve(&["tvoid"], &[]), 0);
        let token = table.checkpoint();
        table.intern(&["tint", "int"], &[]);
        table.rollback(token).unwrap();

        assert!(table.is_reserved(0));
        assert_eq!(table.retrieve(0).unwrap().tag(), "tvoid");
    }

    #[test]
    fn test_load_preserves_indices() {
        let mut table = IndexedTable::new("t");
        table
            .load(vec![
                IndexedTableValue::new(3, vec!["tptr".into()], vec![0]),
                IndexedTableValue::new(0, vec!["tint".into()], vec![]),
            ])
            .unwrap();

        assert_eq!(table.next_index(), 4);
        assert_eq!(table.intern(&["tint"], &[]), 0);
        assert_eq!(table.intern(&["tptr"], &[0]), 3);
        assert_eq!(table.intern(&["tfloat"], &[]), 4);
        assert!(table.retrieve(1).is_err());
    }

    #[test]
    fn test_load_rejects_conflicts() {
        let mut table = IndexedTable::new("typ-table");
        table.reserve(&["tvoid"], &[]);
        let err = table
            .load(vec![IndexedTableValue::new(0, vec!["tint".into()], vec![])])
            .unwrap_err();
        assert!(matches!(err, DictionaryError::ReservedIndexConflict { index: 0, .. }));

        let mut table = IndexedTable::new("t");
        let err = table
            .load(vec![
                IndexedTableValue::new(0, vec!["a".into()], vec![]),
                IndexedTableValue::new(1, vec!["a".into()], vec![]),
            ])
            .unwrap_err();
        assert!(matches!(err, DictionaryError::MalformedEntry { .. }));

        let mut table = IndexedTable::new("t");
        let _token = table.checkpoint();
        assert!(matches!(
            table.load(Vec::new()),
            Err(DictionaryError::CheckpointActive(_))
        ));
    }

    #[test]
    fn test_check_key() {
        let value = IndexedTableValue::new(2, vec!["tptr".into()], vec![0, 1]);
        assert!(value.check_key(1, 2, "typ-table").is_ok());
        let err = value.check_key(1, 1, "typ-table").unwrap_err();
        assert!(err.to_string().contains("Expected 1 tags and 1 args"));
    }

    #[test]
    fn test_xml_entry_attributes() {
        let mut table = IndexedTable::new("attributes-table");
        table.intern(NO_TAGS, &[]);
        table.intern(NO_TAGS, &[4, 7]);
        table.intern(&["tint", "int"], &[]);

        let node = table.to_xml().unwrap();
        assert_eq!(node.name, "attributes-table");
        assert_eq!(node.children.len(), 3);

        assert_eq!(node.children[0].attributes, vec![("ix".to_string(), "0".to_string())]);
        assert_eq!(node.children[1].get("a"), Some("4,7"));
        assert_eq!(node.children[1].get("t"), None);
        assert_eq!(node.children[2].get("t"), Some("tint,int"));

        let mut reloaded = IndexedTable::new("attributes-table");
        reloaded.read_xml(&node).unwrap();
        assert_eq!(reloaded.lookup(NO_TAGS, &[4, 7]), Some(1));
        assert_eq!(reloaded.lookup(&["tint", "int"], &[]), Some(2));
    }

    #[test]
    fn test_empty_tag_is_not_confused_with_no_tags() {
        let mut table = IndexedTable::new("t");
        assert_eq!(table.intern(NO_TAGS, &[1]), 0);
        assert_eq!(table.intern(&[""], &[1]), 1);

        let node = table.to_xml().unwrap();
        assert_eq!(node.children[0].get("t"), None);
        assert_eq!(node.children[1].get("t"), Some(""));

        let mut reloaded = IndexedTable::new("t");
        reloaded.read_xml(&node).unwrap();
        assert_eq!(reloaded.lookup(NO_TAGS, &[1]), Some(0));
        assert_eq!(reloaded.lookup(&[""], &[1]), Some(1));
    }

    #[test]
    fn test_load_rejects_largest_index() {
        let mut parent = Element::new("t");
        parent.push(
            Element::new("n")
                .with_attr("t", "a")
                .with_attr("ix", usize::MAX.to_string()),
        );

        let mut table = IndexedTable::new("t");
        let err = table.read_xml(&parent).unwrap_err();
        assert!(matches!(err, DictionaryError::MalformedEntry { .. }));
        assert!(table.is_empty());
    }

    #[test]
    fn test_failed_read_leaves_table_untouched() {
        let mut table = IndexedTable::new("typ-table");
        table.intern(&["tvoid"], &[]);

        let mut parent = Element::new("typ-table");
        parent.push(Element::new("n").with_attr("t", "tint").with_attr("ix", "0"));
        parent.push(Element::new("n").with_attr("t", "tint").with_attr("ix", "1"));
        assert!(matches!(
            table.read_xml(&parent),
            Err(DictionaryError::MalformedEntry { .. })
        ));

        assert_eq!(table.size(), 1);
        assert_eq!(table.lookup(&["tvoid"], &[]), Some(0));
        assert_eq!(table.lookup(&["tint"], &[]), None);
    }

    #[test]
    fn test_write_rejects_comma_in_tag() {
        let mut table = IndexedTable::new("constant-table");
        table.intern(&["str", "a,b"], &[]);
        assert!(matches!(
            table.to_xml(),
            Err(DictionaryError::UnencodableTag { .. })
        ));
    }

    #[test]
    fn test_malformed_entries() {
        let node = Element::new("t").with_attr("x", "y");
        let mut table = IndexedTable::new("t");
        let mut parent = Element::new("t");
        parent.push(Element::new("n").with_attr("t", "a"));
        assert!(table.read_xml(&parent).is_err());

        let mut parent = Element::new("t");
        parent.push(Element::new("n").with_attr("a", "1,x").with_attr("ix", "0"));
        assert!(table.read_xml(&parent).is_err());

        table.read_xml(&node).unwrap();
        assert!(table.is_empty());
    }
}
