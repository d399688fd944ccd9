use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize};

use crate::extract::ItemKind;

use super::categorize::ItemCategory;

/// Save label under which hand-entered items are recorded.
pub const MANUAL_SAVE_LABEL: &str = "Manual entry";
/// Save label of stubs synthesized from the ever-found history.
pub const HISTORY_SAVE_LABEL: &str = "History";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Occurrence {
    pub ethereal: bool,
    #[serde(rename = "ilevel")]
    pub level: u32,
    pub socketed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ItemEntry {
    pub name: String,
    #[serde(rename = "type", deserialize_with = "lenient_kind")]
    pub kind: ItemKind,
    /// Occurrences per save label; a label may hold duplicates.
    pub in_saves: BTreeMap<String, Vec<Occurrence>>,
}

impl ItemEntry {
    pub fn new(name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            name: name.into(),
            kind,
            in_saves: BTreeMap::new(),
        }
    }

    /// An entry holding `count` empty occurrences under `label`.
    pub fn stub(label: &str, count: usize) -> Self {
        let mut entry = Self::default();
        entry
            .in_saves
            .insert(label.to_string(), vec![Occurrence::default(); count]);
        entry
    }

    pub fn push(&mut self, label: &str, occurrence: Occurrence) {
        self.in_saves
            .entry(label.to_string())
            .or_default()
            .push(occurrence);
    }

    pub fn occurrence_count(&self) -> usize {
        self.in_saves.values().map(Vec::len).sum()
    }

    pub fn has_ethereal(&self) -> bool {
        self.in_saves.values().flatten().any(|o| o.ethereal)
    }
}

/// Older blobs store an empty string or a raw decoder type code here.
fn lenient_kind<'de, D>(deserializer: D) -> Result<ItemKind, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(match raw.as_deref() {
        Some("Unique") => ItemKind::Unique,
        Some("Set") => ItemKind::Set,
        Some("Rune") => ItemKind::Rune,
        Some("Runeword") | Some("runeword") => ItemKind::Runeword,
        _ => ItemKind::Plain,
    })
}

pub type ItemMap = BTreeMap<String, ItemEntry>;

/// Merged result of one aggregation pass. Replaced wholesale, never patched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ItemCollection {
    pub items: ItemMap,
    /// Only filled when ethereal copies are counted separately.
    pub eth_items: ItemMap,
    /// Items per save label; `None` marks a file that failed to decode.
    #[serde(rename = "stats")]
    pub per_file_counts: BTreeMap<String, Option<usize>>,
    pub available_runes: ItemMap,
}

impl ItemCollection {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.eth_items.is_empty()
    }

    pub fn keys(&self) -> BTreeSet<&str> {
        self.items
            .keys()
            .chain(self.eth_items.keys())
            .map(String::as_str)
            .collect()
    }

    /// Keys present here but not in `previous`, with the flag set when the key
    /// only lives in the ethereal map.
    pub fn new_keys_since(&self, previous: &ItemCollection) -> Vec<NewKey> {
        let before = previous.keys();
        let mut found = Vec::new();
        for (key, entry) in &self.items {
            if !before.contains(key.as_str()) {
                found.push(NewKey::new(key, entry, false));
            }
        }
        for (key, entry) in &self.eth_items {
            if !before.contains(key.as_str()) && !self.items.contains_key(key) {
                found.push(NewKey::new(key, entry, true));
            }
        }
        found
    }

    /// Rebuilds `available_runes` from the rune entries of `items`.
    pub fn refill_available_runes(&mut self, is_rune: impl Fn(&str) -> bool) {
        self.available_runes = self
            .items
            .iter()
            .filter(|(key, _)| is_rune(key))
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewKey {
    pub key: String,
    pub display_name: String,
    pub ethereal: bool,
}

impl NewKey {
    fn new(key: &str, entry: &ItemEntry, ethereal: bool) -> Self {
        let display_name = if entry.name.is_empty() {
            key.to_string()
        } else {
            entry.name.clone()
        };
        Self {
            key: key.to_string(),
            display_name,
            ethereal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentFind {
    pub name: String,
    /// Missing or unknown values load as [`ItemCategory::Item`].
    #[serde(rename = "type", default, deserialize_with = "lenient_category")]
    pub category: ItemCategory,
    /// Milliseconds since the Unix epoch, strictly decreasing down the list.
    pub timestamp: i64,
    #[serde(default, alias = "eth", alias = "isEthereal")]
    pub ethereal: bool,
}

fn lenient_category<'de, D>(deserializer: D) -> Result<ItemCategory, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(match raw.as_deref() {
        Some("Rune") => ItemCategory::Rune,
        Some("Runeword") => ItemCategory::Runeword,
        Some("Set") => ItemCategory::Set,
        Some("Unique") => ItemCategory::Unique,
        _ => ItemCategory::Item,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub snapshot: ItemCollection,
    /// File names whose decode failed.
    pub failed_files: Vec<String>,
    pub new_finds: Vec<RecentFind>,
    pub has_new_items: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// No directory was configured or it could not be listed.
    NoDirectory,
    Completed(ScanReport),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    ScanCompleted { item_count: usize, file_count: usize },
    FilesFailed(Vec<String>),
    NewItemsFound(Vec<RecentFind>),
    NoDirectory,
    HistoryCleared,
}

#[cfg(test)]
mod tests {
    use super::{ItemCollection, ItemEntry, Occurrence, RecentFind};
    use crate::core_api::categorize::ItemCategory;
    use crate::extract::ItemKind;

    fn entry(name: &str) -> ItemEntry {
        let mut entry = ItemEntry::new(name, ItemKind::Unique);
        entry.push("Hero", Occurrence::default());
        entry
    }

    #[test]
    fn new_keys_compare_both_maps() {
        let mut previous = ItemCollection::default();
        previous.items.insert("shako".into(), entry("Harlequin Crest"));

        let mut next = previous.clone();
        next.items.insert("arachnidmesh".into(), entry("Arachnid Mesh"));
        next.eth_items.insert("shako".into(), entry("Harlequin Crest"));
        next.eth_items.insert("deathsweb".into(), entry("Death's Web"));

        let found = next.new_keys_since(&previous);
        let keys: Vec<_> = found.iter().map(|n| (n.key.as_str(), n.ethereal)).collect();
        assert_eq!(keys, vec![("arachnidmesh", false), ("deathsweb", true)]);
        assert_eq!(found[0].display_name, "Arachnid Mesh");
    }

    #[test]
    fn legacy_manual_blob_parses() {
        let raw = r#"{"items":{"ber":{"inSaves":{"Manual entry":[{},{}]},"name":"","type":""}},"stats":{"Hero":2,"Broken":null}}"#;
        let parsed: ItemCollection = serde_json::from_str(raw).expect("manual blob");
        assert_eq!(parsed.items["ber"].occurrence_count(), 2);
        assert_eq!(parsed.items["ber"].kind, ItemKind::Plain);
        assert_eq!(parsed.per_file_counts["Hero"], Some(2));
        assert_eq!(parsed.per_file_counts["Broken"], None);
        assert!(parsed.eth_items.is_empty());
    }

    #[test]
    fn recent_finds_without_type_still_load() {
        let raw = r#"[
            {"name":"Ber","type":"Rune","timestamp":3},
            {"name":"runewordenigma","timestamp":2},
            {"name":"Titan's Revenge","type":"Mystery","timestamp":1,"eth":true}
        ]"#;
        let parsed: Vec<RecentFind> = serde_json::from_str(raw).expect("recent finds");
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].category, ItemCategory::Rune);
        assert_eq!(parsed[1].category, ItemCategory::Item);
        assert!(!parsed[1].ethereal);
        assert_eq!(parsed[2].category, ItemCategory::Item);
        assert!(parsed[2].ethereal);
    }
}
