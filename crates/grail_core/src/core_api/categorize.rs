use std::fmt;

use serde::{Deserialize, Serialize};

use crate::extract::{CanonicalItem, ItemKind, is_facet_key};

use super::item_catalog::GrailCatalog;
use super::well_known_items::{RUNEWORD_KEY_PREFIX, rune_by_key};

const ETHEREAL_MARKER: &str = "ethereal";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ItemCategory {
    Rune,
    Runeword,
    Set,
    Unique,
    #[default]
    Item,
}

impl ItemCategory {
    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::Rune => "Rune",
            Self::Runeword => "Runeword",
            Self::Set => "Set",
            Self::Unique => "Unique",
            Self::Item => "Item",
        }
    }
}

impl fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `item` counts toward the grail at all.
pub fn accepts(item: &CanonicalItem, catalog: &GrailCatalog) -> bool {
    match item.kind {
        ItemKind::Rune | ItemKind::Runeword => true,
        _ if is_facet_key(&item.key) => true,
        _ => {
            catalog.normal.contains(&item.key)
                || (item.ethereal && catalog.ethereal.contains(&item.key))
        }
    }
}

/// First match wins: rune, runeword, set, unique, ethereal heuristic, item.
pub fn categorize(
    key: &str,
    display_name: &str,
    ethereal: bool,
    catalog: &GrailCatalog,
) -> ItemCategory {
    if rune_by_key(key).is_some() || catalog.runes.contains(key) {
        return ItemCategory::Rune;
    }
    if catalog.runewords.contains(key) || key.starts_with(RUNEWORD_KEY_PREFIX) {
        return ItemCategory::Runeword;
    }
    if catalog.sets.contains(key) {
        return ItemCategory::Set;
    }
    if catalog.uniques.contains(key) {
        return ItemCategory::Unique;
    }
    if ethereal || display_name.to_lowercase().contains(ETHEREAL_MARKER) {
        return ItemCategory::Unique;
    }
    ItemCategory::Item
}

#[cfg(test)]
mod tests {
    use super::{ItemCategory, accepts, categorize};
    use crate::core_api::item_catalog::GrailCatalog;
    use crate::extract::{CanonicalItem, ItemKind};
    use crate::settings::GrailSettings;

    fn catalog() -> GrailCatalog {
        GrailCatalog::build(&GrailSettings::default()).expect("catalog")
    }

    fn item(key: &str, kind: ItemKind, ethereal: bool) -> CanonicalItem {
        CanonicalItem {
            key: key.to_string(),
            display_name: key.to_string(),
            kind,
            ethereal,
            socketed: false,
            level: 1,
        }
    }

    #[test]
    fn runes_runewords_and_facets_are_always_accepted() {
        let catalog = catalog();
        assert!(accepts(&item("zod", ItemKind::Rune, false), &catalog));
        assert!(accepts(&item("runewordspirit", ItemKind::Runeword, false), &catalog));
        assert!(accepts(&item("rainbowfacet", ItemKind::Unique, false), &catalog));
    }

    #[test]
    fn other_items_need_a_seed_entry() {
        let catalog = catalog();
        assert!(accepts(&item("harlequincrest", ItemKind::Unique, false), &catalog));
        assert!(!accepts(&item("notagrailitem", ItemKind::Unique, false), &catalog));
        // Removed from the normal seed, still present in the ethereal one.
        assert!(!accepts(&item("etherealedge", ItemKind::Unique, false), &catalog));
        assert!(accepts(&item("etherealedge", ItemKind::Unique, true), &catalog));
    }

    #[test]
    fn category_resolution_order() {
        let catalog = catalog();
        assert_eq!(categorize("ber", "Ber", false, &catalog), ItemCategory::Rune);
        assert_eq!(
            categorize("runewordinfinity", "Infinity", false, &catalog),
            ItemCategory::Runeword
        );
        assert_eq!(
            categorize("runewordunknown", "Unknown", false, &catalog),
            ItemCategory::Runeword
        );
        assert_eq!(
            categorize("immortalkingsstonecrusher", "Immortal King's Stone Crusher", false, &catalog),
            ItemCategory::Set
        );
        assert_eq!(
            categorize("harlequincrest", "Harlequin Crest", false, &catalog),
            ItemCategory::Unique
        );
        assert_eq!(
            categorize("ghostflame", "Ghostflame", true, &catalog),
            ItemCategory::Unique
        );
        assert_eq!(
            categorize("mystery", "Ethereal Mystery", false, &catalog),
            ItemCategory::Unique
        );
        assert_eq!(categorize("mystery", "Mystery", false, &catalog), ItemCategory::Item);
    }
}
