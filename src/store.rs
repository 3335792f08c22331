//! Append-only, in-memory knowledge store.
//!
//! Entries are kept in insertion order. That order is the tie-break for
//! equal search scores, so the store never reorders or removes individual
//! entries; the only way to shrink it is [`KnowledgeStore::clear`].

use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::{EntryType, KnowledgeEntry};

/// Summary counts for progress display and `lens stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total_entries: usize,
    pub by_type: BTreeMap<EntryType, usize>,
    pub processed_files: usize,
}

#[derive(Debug, Default, Clone)]
pub struct KnowledgeStore {
    entries: Vec<KnowledgeEntry>,
}

impl KnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: KnowledgeEntry) {
        self.entries.push(entry);
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = KnowledgeEntry>) {
        self.entries.extend(entries);
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> &[KnowledgeEntry] {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [KnowledgeEntry] {
        &mut self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entry counts per type. `processed_files` comes from the owning session.
    pub fn stats(&self, processed_files: usize) -> StoreStats {
        let mut by_type = BTreeMap::new();
        for entry in &self.entries {
            *by_type.entry(entry.entry_type).or_insert(0) += 1;
        }
        StoreStats {
            total_entries: self.entries.len(),
            by_type,
            processed_files,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryBuilder;

    #[test]
    fn stats_count_by_type() {
        let mut store = KnowledgeStore::new();
        store.push(EntryBuilder::new(EntryType::Function, "a.ts", "function a() {}").build());
        store.push(EntryBuilder::new(EntryType::Function, "a.ts", "function b() {}").build());
        store.push(EntryBuilder::new(EntryType::Comment, "a.ts", "explains things").build());

        let stats = store.stats(1);
        assert_eq!(stats.total_entries, 3);
        assert_eq!(stats.by_type.get(&EntryType::Function), Some(&2));
        assert_eq!(stats.by_type.get(&EntryType::Comment), Some(&1));
        assert_eq!(stats.processed_files, 1);
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut store = KnowledgeStore::new();
        let first = EntryBuilder::new(EntryType::Export, "x.ts", "first").build();
        let second = EntryBuilder::new(EntryType::Export, "x.ts", "second").build();
        let first_id = first.id.clone();
        store.extend([first, second]);
        assert_eq!(store.entries()[0].id, first_id);
        assert_eq!(store.len(), 2);

        store.clear();
        assert!(store.is_empty());
    }
}
