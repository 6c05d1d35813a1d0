//! Interning, rollback and reload properties of indexed tables

use std::collections::HashMap;

use cdict_core::{IndexedTable, IndexedTableValue, TableKey};
use proptest::prelude::*;

fn table_key() -> impl Strategy<Value = TableKey> {
    (
        prop::collection::vec("[a-z]{0,4}", 0..3),
        prop::collection::vec(-2i64..20, 0..4),
    )
        .prop_map(|(tags, args)| TableKey::new(tags, args))
}

fn snapshot(table: &IndexedTable) -> (usize, Vec<IndexedTableValue>) {
    (table.next_index(), table.values().cloned().collect())
}

proptest! {
    #[test]
    fn intern_is_idempotent(keys in prop::collection::vec(table_key(), 0..40)) {
        let mut table = IndexedTable::new("t");
        let mut seen: HashMap<TableKey, usize> = HashMap::new();

        for key in &keys {
            let index = table.intern(&key.tags, &key.args);
            if let Some(&earlier) = seen.get(key) {
                prop_assert_eq!(index, earlier);
            }
            seen.insert(key.clone(), index);
        }

        // distinct keys received distinct indices
        prop_assert_eq!(table.size(), seen.len());
        prop_assert_eq!(table.next_index(), seen.len());

        for (key, &index) in &seen {
            let value = table.retrieve(index).unwrap();
            prop_assert_eq!(value.tags(), key.tags.as_slice());
            prop_assert_eq!(value.args(), key.args.as_slice());
        }
    }

    #[test]
    fn rollback_restores_state(
        before in prop::collection::vec(table_key(), 0..20),
        speculative in prop::collection::vec(table_key(), 1..20),
    ) {
        let mut table = IndexedTable::new("t");
        for key in &before {
            table.intern_key(key.clone());
        }
        let expected = snapshot(&table);

        let token = table.checkpoint();
        for key in &speculative {
            table.intern_key(key.clone());
        }
        table.rollback(token).unwrap();

        prop_assert_eq!(snapshot(&table), expected);
        for key in &speculative {
            let present = before.contains(key);
            prop_assert_eq!(table.lookup(&key.tags, &key.args).is_some(), present);
        }
    }

    #[test]
    fn reload_reproduces_indices(keys in prop::collection::vec(table_key(), 0..40)) {
        let mut table = IndexedTable::new("exp-table");
        for key in &keys {
            table.intern_key(key.clone());
        }

        let mut reloaded = IndexedTable::new("exp-table");
        reloaded.read_xml(&table.to_xml().unwrap()).unwrap();

        prop_assert_eq!(snapshot(&reloaded), snapshot(&table));
        for key in &keys {
            prop_assert_eq!(
                reloaded.lookup(&key.tags, &key.args),
                table.lookup(&key.tags, &key.args)
            );
        }
    }
}
