use std::collections::BTreeMap;

use grail_core::core_api::well_known_items::{rune_keys, runeword_keys, simplify_name};
use grail_core::core_api::{GrailCatalog, SeedDataset};
use grail_core::mode::GrailType;
use grail_core::settings::GrailSettings;
use serde_json::Value;

const SEED_FILES: [&str; 2] = ["data/holy_grail_seed.json", "data/eth_grail_seed.json"];

fn leaf_names(node: &serde_json::Map<String, Value>, out: &mut Vec<String>) {
    for (name, value) in node {
        match value {
            Value::Object(children) if !children.is_empty() => leaf_names(children, out),
            _ => out.push(name.clone()),
        }
    }
}

fn load(relative: &str) -> serde_json::Map<String, Value> {
    let path = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(relative);
    let text = std::fs::read_to_string(&path).expect("seed file should be readable");
    match serde_json::from_str(&text).expect("seed file should be JSON") {
        Value::Object(root) => root,
        other => panic!("seed root should be an object, got {other}"),
    }
}

#[test]
fn distinct_seed_entries_never_fold_together() {
    for file in SEED_FILES {
        let mut names = Vec::new();
        leaf_names(&load(file), &mut names);
        let mut folded: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for name in names {
            folded.entry(simplify_name(&name)).or_default().push(name);
        }
        let collisions: Vec<_> = folded.values().filter(|v| v.len() > 1).collect();
        assert!(collisions.is_empty(), "{file}: {collisions:?}");
        assert!(!folded.contains_key(""), "{file} has a leaf that folds to nothing");
    }
}

#[test]
fn rune_and_runeword_keys_do_not_shadow_seed_entries() {
    let mut names = Vec::new();
    leaf_names(&load(SEED_FILES[0]), &mut names);
    let seed_keys: Vec<String> = names.iter().map(|n| simplify_name(n)).collect();
    for (key, _) in rune_keys().chain(runeword_keys()) {
        assert!(!seed_keys.contains(&key), "{key} collides with a seed entry");
    }
}

#[test]
fn folding_is_idempotent_over_the_whole_catalog() {
    let settings = GrailSettings {
        grail_type: GrailType::Both,
        grail_runes: true,
        grail_runewords: true,
        grail_warlock: true,
        ..GrailSettings::default()
    };
    let catalog = GrailCatalog::build(&settings).expect("catalog");
    for (key, leaf) in catalog.normal.iter() {
        assert_eq!(simplify_name(key), key);
        if leaf.path.first().map(String::as_str) != Some("runewords") {
            assert_eq!(simplify_name(&leaf.name), key);
        }
    }
}

#[test]
fn bundled_seed_sections_are_present() {
    let seed = SeedDataset::normal(&GrailSettings::default()).expect("seed");
    for path in [
        &["uniques", "armor"][..],
        &["uniques", "weapons"][..],
        &["uniques", "other"][..],
        &["sets"][..],
    ] {
        assert!(
            seed.subtree(path).is_some_and(|s| !s.is_empty()),
            "missing {path:?}"
        );
    }
    let eth = SeedDataset::ethereal(&GrailSettings::default()).expect("seed");
    assert!(eth.subtree(&["sets"]).is_none());
    assert!(!eth.flatten().is_empty());
}
