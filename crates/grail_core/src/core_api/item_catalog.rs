//! Grail seed datasets and their flattened key lookups.
//!
//! The seed is a nested category tree whose leaves are either empty
//! objects (keyed by display name) or strings (canonical key to display
//! name, used by the rune and runeword tables). Flattening folds every leaf
//! name with [`simplify_name`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::extract::facet_variants;
use crate::mode::GrailType;
use crate::settings::GrailSettings;

use super::error::{CoreError, CoreErrorCode};
use super::well_known_items::{rune_keys, runeword_keys, simplify_name};

const HOLY_GRAIL_SEED: &str = include_str!("../../data/holy_grail_seed.json");
const ETH_GRAIL_SEED: &str = include_str!("../../data/eth_grail_seed.json");
const WARLOCK_OVERLAY: &str = include_str!("../../data/warlock_overlay.json");
const WARLOCK_ETH_OVERLAY: &str = include_str!("../../data/warlock_eth_overlay.json");

const FACET_GROUP: &[&str] = &["uniques", "other", "rainbow facet (jewel)"];

#[rustfmt::skip]
const ETHEREAL_ONLY_UNIQUES: [(&[&str], &str); 4] = [
    (&["uniques", "weapons", "throwing", "elite"], "Wraith Flight"),
    (&["uniques", "weapons", "axe (2-h)", "elite"], "Ethereal Edge"),
    (&["uniques", "weapons", "dagger", "elite"], "Ghostflame"),
    (&["uniques", "other", "classes", "assasin"], "Shadow Killer"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedLeaf {
    pub name: String,
    /// Category path from the seed root down to the leaf's parent.
    pub path: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlattenedLookup {
    entries: BTreeMap<String, SeedLeaf>,
}

impl FlattenedLookup {
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&SeedLeaf> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SeedLeaf)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn collect(&mut self, node: &Map<String, Value>, path: &mut Vec<String>) {
        for (name, value) in node {
            match value {
                Value::Object(children) if !children.is_empty() => {
                    path.push(name.clone());
                    self.collect(children, path);
                    path.pop();
                }
                Value::String(display) => self.insert(name, display, path),
                _ => self.insert(name, name, path),
            }
        }
    }

    fn insert(&mut self, name: &str, display: &str, path: &[String]) {
        let key = simplify_name(name);
        if key.is_empty() {
            return;
        }
        self.entries.insert(
            key,
            SeedLeaf {
                name: display.to_string(),
                path: path.to_vec(),
            },
        );
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeedDataset {
    root: Map<String, Value>,
}

impl SeedDataset {
    pub fn from_json(text: &str) -> Result<Self, CoreError> {
        match serde_json::from_str(text) {
            Ok(Value::Object(root)) => Ok(Self { root }),
            Ok(_) => Err(CoreError::new(
                CoreErrorCode::Parse,
                "seed dataset root must be an object",
            )),
            Err(e) => Err(CoreError::new(
                CoreErrorCode::Parse,
                format!("invalid seed dataset: {e}"),
            )),
        }
    }

    /// The normal-item seed shaped by `settings`.
    pub fn normal(settings: &GrailSettings) -> Result<Self, CoreError> {
        let mut seed = Self::from_json(HOLY_GRAIL_SEED)?;
        for (group, display) in facet_variants() {
            let mut path: Vec<&str> = FACET_GROUP.to_vec();
            path.push(group);
            seed.insert_leaf(&path, &display, Value::Object(Map::new()));
        }
        if settings.grail_warlock {
            seed.merge(&Self::from_json(WARLOCK_OVERLAY)?);
        }
        if matches!(settings.grail_type, GrailType::Normal | GrailType::Each) {
            for (path, name) in ETHEREAL_ONLY_UNIQUES {
                seed.remove_leaf(path, name);
            }
        }
        if settings.grail_runes {
            seed.root.insert("runes".to_string(), runes_table());
        }
        if settings.grail_runewords {
            seed.root.insert("runewords".to_string(), runewords_table());
        }
        Ok(seed)
    }

    pub fn ethereal(settings: &GrailSettings) -> Result<Self, CoreError> {
        let mut seed = Self::from_json(ETH_GRAIL_SEED)?;
        if settings.grail_warlock {
            seed.merge(&Self::from_json(WARLOCK_ETH_OVERLAY)?);
        }
        Ok(seed)
    }

    pub fn subtree(&self, path: &[&str]) -> Option<&Map<String, Value>> {
        let mut node = &self.root;
        for segment in path {
            node = node.get(*segment)?.as_object()?;
        }
        Some(node)
    }

    pub fn flatten(&self) -> FlattenedLookup {
        self.flatten_at(&[])
    }

    /// Flattens the subtree at `path`; a missing subtree flattens to nothing.
    pub fn flatten_at(&self, path: &[&str]) -> FlattenedLookup {
        let mut lookup = FlattenedLookup::default();
        if let Some(node) = self.subtree(path) {
            let mut prefix: Vec<String> = path.iter().map(|s| s.to_string()).collect();
            lookup.collect(node, &mut prefix);
        }
        lookup
    }

    /// Deep-merges `overlay` into this seed. Objects merge key by key, anything
    /// else in the overlay replaces the existing value.
    pub fn merge(&mut self, overlay: &SeedDataset) {
        merge_objects(&mut self.root, &overlay.root);
    }

    fn insert_leaf(&mut self, path: &[&str], name: &str, leaf: Value) {
        let mut node = &mut self.root;
        for segment in path {
            let child = node
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            let Value::Object(next) = child else {
                return;
            };
            node = next;
        }
        node.insert(name.to_string(), leaf);
    }

    fn remove_leaf(&mut self, path: &[&str], name: &str) -> bool {
        let mut node = &mut self.root;
        for segment in path {
            match node.get_mut(*segment) {
                Some(Value::Object(next)) => node = next,
                _ => return false,
            }
        }
        node.remove(name).is_some()
    }
}

fn merge_objects(target: &mut Map<String, Value>, overlay: &Map<String, Value>) {
    for (key, value) in overlay {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_objects(existing, incoming);
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

fn runes_table() -> Value {
    Value::Object(
        rune_keys()
            .map(|(key, name)| (key, Value::String(name.to_string())))
            .collect(),
    )
}

fn runewords_table() -> Value {
    Value::Object(
        runeword_keys()
            .map(|(key, name)| (key, Value::String(name.to_string())))
            .collect(),
    )
}

/// Every lookup one scan or stats pass needs, built from one settings fingerprint.
#[derive(Debug, Clone, PartialEq)]
pub struct GrailCatalog {
    pub normal: FlattenedLookup,
    pub ethereal: FlattenedLookup,
    pub sets: FlattenedLookup,
    pub uniques: FlattenedLookup,
    pub normal_armor: FlattenedLookup,
    pub normal_weapons: FlattenedLookup,
    pub normal_other: FlattenedLookup,
    pub eth_armor: FlattenedLookup,
    pub eth_weapons: FlattenedLookup,
    pub eth_other: FlattenedLookup,
    /// Full rune and runeword tables, whether or not the toggles add them to the seed.
    pub runes: FlattenedLookup,
    pub runewords: FlattenedLookup,
}

impl GrailCatalog {
    pub fn build(settings: &GrailSettings) -> Result<Self, CoreError> {
        let normal = SeedDataset::normal(settings)?;
        let ethereal = SeedDataset::ethereal(settings)?;
        let mut runes = FlattenedLookup::default();
        if let Value::Object(table) = runes_table() {
            runes.collect(&table, &mut vec!["runes".to_string()]);
        }
        let mut runewords = FlattenedLookup::default();
        if let Value::Object(table) = runewords_table() {
            runewords.collect(&table, &mut vec!["runewords".to_string()]);
        }
        Ok(Self {
            normal: normal.flatten(),
            ethereal: ethereal.flatten(),
            sets: normal.flatten_at(&["sets"]),
            uniques: normal.flatten_at(&["uniques"]),
            normal_armor: normal.flatten_at(&["uniques", "armor"]),
            normal_weapons: normal.flatten_at(&["uniques", "weapons"]),
            normal_other: normal.flatten_at(&["uniques", "other"]),
            eth_armor: ethereal.flatten_at(&["uniques", "armor"]),
            eth_weapons: ethereal.flatten_at(&["uniques", "weapons"]),
            eth_other: ethereal.flatten_at(&["uniques", "other"]),
            runes,
            runewords,
        })
    }
}

/// Catalogs keyed by [`GrailSettings::fingerprint`]; rebuilt only when the
/// fingerprint changes.
#[derive(Debug, Default)]
pub struct CatalogCache {
    entries: HashMap<String, Arc<GrailCatalog>>,
}

impl CatalogCache {
    pub fn get(&mut self, settings: &GrailSettings) -> Result<Arc<GrailCatalog>, CoreError> {
        let fingerprint = settings.fingerprint();
        if let Some(catalog) = self.entries.get(&fingerprint) {
            return Ok(Arc::clone(catalog));
        }
        debug!(%fingerprint, "building grail catalog");
        let catalog = Arc::new(GrailCatalog::build(settings)?);
        self.entries.insert(fingerprint, Arc::clone(&catalog));
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
