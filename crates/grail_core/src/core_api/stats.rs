//! Completion statistics over a merged item map.

use serde::{Deserialize, Serialize};

use crate::mode::GrailType;
use crate::settings::GrailSettings;

use super::item_catalog::{FlattenedLookup, GrailCatalog};
use super::types::ItemMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub exists: usize,
    pub owned: usize,
    pub remaining: usize,
    pub percent: u32,
}

impl CategoryStats {
    pub fn new(exists: usize, owned: usize) -> Self {
        Self {
            exists,
            owned,
            remaining: exists.saturating_sub(owned),
            percent: display_percent(owned, exists),
        }
    }

    pub fn sum(parts: &[CategoryStats]) -> Self {
        let exists = parts.iter().map(|p| p.exists).sum();
        let owned = parts.iter().map(|p| p.owned).sum();
        Self::new(exists, owned)
    }
}

/// Rounded completion percent, never showing 100 before the last item.
pub fn display_percent(owned: usize, exists: usize) -> u32 {
    if exists == 0 {
        return 0;
    }
    let percent = owned as f64 / exists as f64 * 100.0;
    if percent > 99.5 && percent < 100.0 {
        99
    } else {
        percent.round() as u32
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalStats {
    pub armor: CategoryStats,
    pub weapon: CategoryStats,
    pub other: CategoryStats,
    pub sets: CategoryStats,
    pub total: CategoryStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EtherealStats {
    pub armor: CategoryStats,
    pub weapon: CategoryStats,
    pub other: CategoryStats,
    pub total: CategoryStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrailStats {
    pub normal: NormalStats,
    pub ethereal: EtherealStats,
    pub runes: CategoryStats,
    pub runewords: CategoryStats,
}

/// What the headline counter shows for the active grail type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionSummary {
    pub counter: CategoryStats,
    /// Ethereal progress when it is counted on its own.
    pub sub_counter: Option<CategoryStats>,
    pub grand_total: CategoryStats,
}

fn owned_in(lookup: &FlattenedLookup, owned: impl Fn(&str) -> bool) -> CategoryStats {
    CategoryStats::new(lookup.len(), lookup.keys().filter(|k| owned(k)).count())
}

/// `items` and `eth_items` should already include any history stubs.
pub fn compute_stats(
    items: &ItemMap,
    eth_items: &ItemMap,
    catalog: &GrailCatalog,
    grail_type: GrailType,
) -> GrailStats {
    let in_normal = |key: &str| items.contains_key(key);
    let in_ethereal = |key: &str| {
        eth_items.contains_key(key)
            || (!grail_type.counts_ethereal_separately()
                && items.get(key).is_some_and(|e| e.has_ethereal()))
    };

    let armor = owned_in(&catalog.normal_armor, in_normal);
    let weapon = owned_in(&catalog.normal_weapons, in_normal);
    let other = owned_in(&catalog.normal_other, in_normal);
    let sets = owned_in(&catalog.sets, in_normal);
    let normal = NormalStats {
        armor,
        weapon,
        other,
        sets,
        total: CategoryStats::sum(&[armor, weapon, other, sets]),
    };

    let armor = owned_in(&catalog.eth_armor, in_ethereal);
    let weapon = owned_in(&catalog.eth_weapons, in_ethereal);
    let other = owned_in(&catalog.eth_other, in_ethereal);
    let ethereal = EtherealStats {
        armor,
        weapon,
        other,
        total: CategoryStats::sum(&[armor, weapon, other]),
    };

    GrailStats {
        normal,
        ethereal,
        runes: owned_in(&catalog.runes, in_normal),
        runewords: owned_in(&catalog.runewords, in_normal),
    }
}

/// The headline counter follows `grail_type`; the grand total always spans
/// normal and ethereal plus whichever extras are enabled.
pub fn summarize(stats: &GrailStats, settings: &GrailSettings) -> CompletionSummary {
    let mut extras = Vec::new();
    if settings.grail_runes {
        extras.push(stats.runes);
    }
    if settings.grail_runewords {
        extras.push(stats.runewords);
    }
    let with_extras = |base: &[CategoryStats]| {
        let mut parts = base.to_vec();
        parts.extend(extras.iter().copied());
        CategoryStats::sum(&parts)
    };

    let (counter, sub_counter) = match settings.grail_type {
        GrailType::Normal | GrailType::Both => (with_extras(&[stats.normal.total]), None),
        GrailType::Ethereal => (with_extras(&[stats.ethereal.total]), None),
        GrailType::Each => (
            with_extras(&[stats.normal.total]),
            Some(stats.ethereal.total),
        ),
    };
    CompletionSummary {
        counter,
        sub_counter,
        grand_total: with_extras(&[stats.normal.total, stats.ethereal.total]),
    }
}
