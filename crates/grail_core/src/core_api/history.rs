//! Ever-found history and the recent-finds list.

use std::collections::BTreeMap;

use super::categorize::ItemCategory;
use super::types::{HISTORY_SAVE_LABEL, ItemEntry, ItemMap, RecentFind};

pub const ETHEREAL_HISTORY_SUFFIX: &str = "#eth";

pub fn ethereal_history_key(key: &str) -> String {
    format!("{key}{ETHEREAL_HISTORY_SUFFIX}")
}

/// Durable record of every key ever seen. Only [`EverFoundHistory::clear`]
/// removes marks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EverFoundHistory {
    marks: BTreeMap<String, bool>,
}

impl EverFoundHistory {
    pub fn from_marks(marks: BTreeMap<String, bool>) -> Self {
        Self { marks }
    }

    pub fn marks(&self) -> &BTreeMap<String, bool> {
        &self.marks
    }

    pub fn is_found(&self, key: &str) -> bool {
        self.marks.get(key).copied().unwrap_or(false)
    }

    /// Returns true when a mark was added.
    pub fn mark(&mut self, key: &str) -> bool {
        let slot = self.marks.entry(key.to_string()).or_insert(false);
        let added = !*slot;
        *slot = true;
        added
    }

    /// Marks every key of both maps; ethereal copies also get a suffixed mark.
    pub fn mark_collection(&mut self, items: &ItemMap, eth_items: &ItemMap) -> usize {
        let mut added = 0;
        for (key, entry) in items {
            added += usize::from(self.mark(key));
            if entry.has_ethereal() {
                added += usize::from(self.mark(&ethereal_history_key(key)));
            }
        }
        for key in eth_items.keys() {
            added += usize::from(self.mark(&ethereal_history_key(key)));
        }
        added
    }

    pub fn clear(&mut self) {
        self.marks.clear();
    }

    /// Copies of the live maps with a stub entry for every remembered key
    /// that is missing from them.
    pub fn augment(&self, items: &ItemMap, eth_items: &ItemMap) -> (ItemMap, ItemMap) {
        let mut items = items.clone();
        let mut eth_items = eth_items.clone();
        for (raw, found) in &self.marks {
            if !*found {
                continue;
            }
            let (target, key) = match raw.strip_suffix(ETHEREAL_HISTORY_SUFFIX) {
                Some(key) => (&mut eth_items, key),
                None => (&mut items, raw.as_str()),
            };
            target.entry(key.to_string()).or_insert_with(|| {
                let mut stub = ItemEntry::stub(HISTORY_SAVE_LABEL, 1);
                stub.name = key.to_string();
                stub
            });
        }
        (items, eth_items)
    }
}

/// Newest-first list of recent finds with strictly decreasing timestamps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecentFinds {
    entries: Vec<RecentFind>,
}

impl RecentFinds {
    pub fn from_entries(entries: Vec<RecentFind>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[RecentFind] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(
        &mut self,
        name: &str,
        category: ItemCategory,
        ethereal: bool,
        now_ms: i64,
        cap: usize,
    ) -> RecentFind {
        let timestamp = match self.entries.first() {
            Some(head) if head.timestamp >= now_ms => head.timestamp + 1,
            _ => now_ms,
        };
        self.entries.retain(|find| find.name != name);
        let find = RecentFind {
            name: name.to_string(),
            category,
            timestamp,
            ethereal,
        };
        self.entries.insert(0, find.clone());
        self.entries.truncate(cap);
        find
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
