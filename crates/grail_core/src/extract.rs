//! Item tree extraction.
//!
//! Walks the decoder's item tree and folds every notable node into a
//! [`CanonicalItem`]. Nodes inside a socket are always reported as
//! socketed, whatever their own flag says.

use serde::{Deserialize, Serialize};

use crate::core_api::well_known_items::{
    RUNEWORD_KEY_PREFIX, rune_name, runeword_key, runeword_name, simplify_name,
};
use crate::decoder::RawItem;

const FACET_KEY_MARKER: &str = "rainbowfacet";

/// The decoder reports Lore as "Love".
const MISREPORTED_RUNEWORD: (&str, &str) = ("Love", "Lore");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ItemKind {
    Unique,
    Set,
    Rune,
    Runeword,
    #[default]
    Plain,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalItem {
    pub key: String,
    pub display_name: String,
    pub kind: ItemKind,
    pub ethereal: bool,
    pub socketed: bool,
    pub level: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FacetElement {
    Cold,
    Poison,
    Fire,
    Lightning,
}

impl FacetElement {
    fn from_attribute(name: &str) -> Option<Self> {
        match name {
            "passive_cold_mastery" => Some(Self::Cold),
            "passive_pois_mastery" => Some(Self::Poison),
            "passive_fire_mastery" => Some(Self::Fire),
            "passive_ltng_mastery" => Some(Self::Lightning),
            _ => None,
        }
    }

    fn key_part(self) -> &'static str {
        match self {
            Self::Cold => "cold",
            Self::Poison => "poison",
            Self::Fire => "fire",
            Self::Lightning => "lightning",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Cold => "Cold",
            Self::Poison => "Poison",
            Self::Fire => "Fire",
            Self::Lightning => "Lightning",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FacetTrigger {
    LevelUp,
    Death,
}

impl FacetTrigger {
    fn from_attribute(name: &str) -> Option<Self> {
        match name {
            "item_skillonlevelup" => Some(Self::LevelUp),
            "item_skillondeath" => Some(Self::Death),
            _ => None,
        }
    }

    fn key_part(self) -> &'static str {
        match self {
            Self::LevelUp => "levelup",
            Self::Death => "death",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::LevelUp => "Level-up",
            Self::Death => "Death",
        }
    }
}

pub fn is_facet_key(key: &str) -> bool {
    key.starts_with(FACET_KEY_MARKER)
}

/// Display names of every facet variant, in seed order.
pub fn facet_variants() -> Vec<(&'static str, String)> {
    let mut variants = Vec::with_capacity(8);
    for (trigger, group) in [(FacetTrigger::LevelUp, "level up"), (FacetTrigger::Death, "die")] {
        for element in [
            FacetElement::Cold,
            FacetElement::Fire,
            FacetElement::Lightning,
            FacetElement::Poison,
        ] {
            variants.push((
                group,
                format!("Rainbow Facet: {} {}", element.label(), trigger.label()),
            ));
        }
    }
    variants
}

pub fn collapse_apostrophes(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut previous_apostrophe = false;
    for c in name.chars() {
        if c == '\'' {
            if previous_apostrophe {
                continue;
            }
            previous_apostrophe = true;
        } else {
            previous_apostrophe = false;
        }
        out.push(c);
    }
    out
}

/// Extracts every notable item in `items`, depth first, parents before children.
pub fn extract_items(items: &[RawItem]) -> Vec<CanonicalItem> {
    let mut out = Vec::new();
    visit(items, false, &mut out);
    out
}

fn visit(items: &[RawItem], inside_socket: bool, out: &mut Vec<CanonicalItem>) {
    for item in items {
        let socketed = inside_socket || item.socketed;
        if let Some(found) = canonicalize_named(item, socketed) {
            out.push(found);
        }
        if let Some(found) = canonicalize_rune(item, socketed) {
            out.push(found);
        }
        if !item.socketed_items.is_empty() {
            visit(&item.socketed_items, true, out);
        }
        if let Some(found) = runeword_pseudo_item(item) {
            out.push(found);
        }
    }
}

fn canonicalize_named(item: &RawItem, socketed: bool) -> Option<CanonicalItem> {
    let (raw_name, kind) = match (&item.unique_name, &item.set_name) {
        (Some(name), _) if !name.is_empty() => (name.as_str(), ItemKind::Unique),
        (_, Some(name)) if !name.is_empty() => (name.as_str(), ItemKind::Set),
        _ => return None,
    };
    let folded = simplify_name(raw_name);
    if folded.is_empty() {
        return None;
    }

    let (key, display_name) = if folded.contains(FACET_KEY_MARKER) {
        facet_identity(item, &folded)
    } else {
        (folded, collapse_apostrophes(raw_name))
    };

    Some(CanonicalItem {
        key,
        display_name,
        kind,
        ethereal: item.ethereal,
        socketed,
        level: item.level,
    })
}

/// The two signals can appear anywhere in the attribute list; the last one wins.
fn facet_identity(item: &RawItem, folded: &str) -> (String, String) {
    let mut element = None;
    let mut trigger = None;
    for attribute in &item.magic_attributes {
        if let Some(found) = FacetElement::from_attribute(&attribute.name) {
            element = Some(found);
        }
        if let Some(found) = FacetTrigger::from_attribute(&attribute.name) {
            trigger = Some(found);
        }
    }
    let key = format!(
        "{folded}{}{}",
        element.map_or("", FacetElement::key_part),
        trigger.map_or("", FacetTrigger::key_part)
    );
    let display = format!(
        "Rainbow Facet: {} {}",
        element.map_or("", FacetElement::label),
        trigger.map_or("", FacetTrigger::label)
    );
    (key, display.trim_end().to_string())
}

fn canonicalize_rune(item: &RawItem, socketed: bool) -> Option<CanonicalItem> {
    let name = rune_name(&item.type_code)?;
    Some(CanonicalItem {
        key: name.to_ascii_lowercase(),
        display_name: name.to_string(),
        kind: ItemKind::Rune,
        ethereal: item.ethereal,
        socketed,
        level: item.level,
    })
}

fn runeword_pseudo_item(item: &RawItem) -> Option<CanonicalItem> {
    let raw = item.runeword_name.as_deref()?;
    let raw = if raw == MISREPORTED_RUNEWORD.0 {
        MISREPORTED_RUNEWORD.1
    } else {
        raw
    };
    let key = runeword_key(raw);
    if key.len() == RUNEWORD_KEY_PREFIX.len() {
        return None;
    }
    let display_name = runeword_name(&key)
        .map(str::to_string)
        .unwrap_or_else(|| collapse_apostrophes(raw));
    Some(CanonicalItem {
        key,
        display_name,
        kind: ItemKind::Runeword,
        ethereal: false,
        socketed: false,
        level: 0,
    })
}
