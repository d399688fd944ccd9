//! Built-in rune and runeword tables.
//!
//! Rune type codes are the three-character item codes the save decoders
//! report (`r01`..`r33`). Runeword names are the in-game display names; their
//! canonical keys are `runeword` followed by the folded name.

pub const RUNEWORD_KEY_PREFIX: &str = "runeword";

struct WellKnownRune {
    code: &'static str,
    name: &'static str,
}

#[rustfmt::skip]
const RUNES: &[WellKnownRune] = &[
    WellKnownRune { code: "r01", name: "El" },
    WellKnownRune { code: "r02", name: "Eld" },
    WellKnownRune { code: "r03", name: "Tir" },
    WellKnownRune { code: "r04", name: "Nef" },
    WellKnownRune { code: "r05", name: "Eth" },
    WellKnownRune { code: "r06", name: "Ith" },
    WellKnownRune { code: "r07", name: "Tal" },
    WellKnownRune { code: "r08", name: "Ral" },
    WellKnownRune { code: "r09", name: "Ort" },
    WellKnownRune { code: "r10", name: "Thul" },
    WellKnownRune { code: "r11", name: "Amn" },
    WellKnownRune { code: "r12", name: "Sol" },
    WellKnownRune { code: "r13", name: "Shael" },
    WellKnownRune { code: "r14", name: "Dol" },
    WellKnownRune { code: "r15", name: "Hel" },
    WellKnownRune { code: "r16", name: "Io" },
    WellKnownRune { code: "r17", name: "Lum" },
    WellKnownRune { code: "r18", name: "Ko" },
    WellKnownRune { code: "r19", name: "Fal" },
    WellKnownRune { code: "r20", name: "Lem" },
    WellKnownRune { code: "r21", name: "Pul" },
    WellKnownRune { code: "r22", name: "Um" },
    WellKnownRune { code: "r23", name: "Mal" },
    WellKnownRune { code: "r24", name: "Ist" },
    WellKnownRune { code: "r25", name: "Gul" },
    WellKnownRune { code: "r26", name: "Vex" },
    WellKnownRune { code: "r27", name: "Ohm" },
    WellKnownRune { code: "r28", name: "Lo" },
    WellKnownRune { code: "r29", name: "Sur" },
    WellKnownRune { code: "r30", name: "Ber" },
    WellKnownRune { code: "r31", name: "Jah" },
    WellKnownRune { code: "r32", name: "Cham" },
    WellKnownRune { code: "r33", name: "Zod" },
];

const RUNEWORDS: &[&str] = &[
    "Ancient's Pledge", "Beast", "Black", "Bone", "Bramble", "Brand",
    "Breath of the Dying", "Bulwark", "Call to Arms", "Chains of Honor", "Chaos",
    "Crescent Moon", "Cure", "Death", "Delirium", "Destruction", "Doom", "Dragon",
    "Dream", "Duress", "Edge", "Enigma", "Enlightenment", "Eternity", "Exile",
    "Faith", "Famine", "Flickering Flame", "Fortitude", "Fury", "Gloom", "Grief",
    "Ground", "Hand of Justice", "Harmony", "Hearth", "Heart of the Oak",
    "Holy Thunder", "Honor", "Hustle", "Ice", "Infinity", "Insight", "King's Grace",
    "Kingslayer", "Last Wish", "Lawbringer", "Leaf", "Lionheart", "Lore", "Malice",
    "Melody", "Memory", "Metamorphosis", "Mist", "Mosaic", "Myth", "Nadir", "Oath",
    "Obedience", "Obsession", "Passion", "Pattern", "Peace", "Phoenix", "Plague",
    "Pride", "Principle", "Prudence", "Radiance", "Rain", "Rhyme", "Rift",
    "Sanctuary", "Silence", "Smoke", "Spirit", "Splendor", "Stealth", "Steel",
    "Stone", "Strength", "Temper", "Treachery", "Unbending Will", "Venom",
    "Voice of Reason", "Wealth", "White", "Wind", "Wisdom", "Wrath", "Zephyr",
];

/// Lowercase alphanumeric-only folding used for every canonical key.
pub fn simplify_name(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Look up a rune by its item type code. Returns the display name.
pub fn rune_name(type_code: &str) -> Option<&'static str> {
    RUNES.iter().find(|r| r.code == type_code).map(|r| r.name)
}

/// Look up a rune by canonical key (`"ber"`). Returns (type code, display name).
pub fn rune_by_key(key: &str) -> Option<(&'static str, &'static str)> {
    RUNES
        .iter()
        .find(|r| r.name.eq_ignore_ascii_case(key))
        .map(|r| (r.code, r.name))
}

pub fn rune_keys() -> impl Iterator<Item = (String, &'static str)> {
    RUNES
        .iter()
        .map(|r| (r.name.to_ascii_lowercase(), r.name))
}

pub fn runeword_key(name: &str) -> String {
    format!("{RUNEWORD_KEY_PREFIX}{}", simplify_name(name))
}

pub fn runeword_keys() -> impl Iterator<Item = (String, &'static str)> {
    RUNEWORDS.iter().map(|name| (runeword_key(name), *name))
}

/// Display name for a canonical runeword key.
pub fn runeword_name(key: &str) -> Option<&'static str> {
    RUNEWORDS.iter().copied().find(|name| runeword_key(name) == key)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::{rune_by_key, rune_keys, rune_name, runeword_key, runeword_keys, runeword_name, simplify_name};

    #[test]
    fn simplify_folds_case_and_punctuation() {
        assert_eq!(simplify_name("Tal Rasha's Guardianship"), "talrashasguardianship");
        assert_eq!(simplify_name("TAL RASHA''S guardianship!"), "talrashasguardianship");
        assert_eq!(simplify_name("  "), "");
        assert_eq!(simplify_name(&simplify_name("Griffon's Eye")), "griffonseye");
    }

    #[test]
    fn rune_tables_agree() {
        assert_eq!(rune_name("r30"), Some("Ber"));
        assert_eq!(rune_name("r34"), None);
        assert_eq!(rune_by_key("ber"), Some(("r30", "Ber")));
        assert_eq!(rune_keys().count(), 33);
    }

    #[test]
    fn runeword_keys_are_unique_and_resolvable() {
        let keys: BTreeSet<String> = runeword_keys().map(|(key, _)| key).collect();
        assert_eq!(keys.len(), runeword_keys().count());
        assert_eq!(runeword_key("Call to Arms"), "runewordcalltoarms");
        assert_eq!(runeword_name("runewordkingsgrace"), Some("King's Grace"));
        assert_eq!(runeword_name("runewordnope"), None);
    }
}
