//! File-set aggregation: sniff, decode, extract and categorize every save in
//! a directory, then merge the per-file results into one [`ItemCollection`].

use std::path::{Path, PathBuf};

use futures::future::join_all;
use tracing::{debug, warn};

use crate::decoder::{DecodedSave, SaveDecoder};
use crate::extract::{CanonicalItem, ItemKind, extract_items};
use crate::mode::GrailType;
use crate::settings::GrailSettings;
use crate::sniff::{CandidateFile, SaveKind, save_label};

use super::categorize::accepts;
use super::error::{CoreError, CoreErrorCode};
use super::item_catalog::GrailCatalog;
use super::types::{ItemCollection, ItemEntry, ItemMap, Occurrence};

#[derive(Debug)]
pub struct FileOutcome {
    pub file_name: String,
    pub save_label: String,
    pub result: Result<Vec<CanonicalItem>, CoreError>,
}

#[derive(Debug, Default)]
pub struct Aggregation {
    pub snapshot: ItemCollection,
    pub failed_files: Vec<String>,
}

/// Supported save files directly inside `dir`, sorted by name.
pub async fn list_candidates(dir: &Path) -> Result<Vec<PathBuf>, CoreError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| CoreError::io(format!("failed to list {}", dir.display()), e))?;
    let mut files = Vec::new();
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                return Err(CoreError::io(format!("failed to list {}", dir.display()), e));
            }
        };
        let path = entry.path();
        if SaveKind::from_path(&path).is_some() && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Everything the grail accepts from one save file, in tree order.
pub async fn process_file(
    path: &Path,
    decoder: &dyn SaveDecoder,
    settings: &GrailSettings,
    catalog: &GrailCatalog,
) -> FileOutcome {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let save_label = save_label(path);
    let result = read_and_extract(path, decoder, settings, catalog).await;
    FileOutcome {
        file_name,
        save_label,
        result,
    }
}

async fn read_and_extract(
    path: &Path,
    decoder: &dyn SaveDecoder,
    settings: &GrailSettings,
    catalog: &GrailCatalog,
) -> Result<Vec<CanonicalItem>, CoreError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| CoreError::io(format!("failed to read {}", path.display()), e))?;
    let candidate = CandidateFile::new(path.to_path_buf(), bytes).ok_or_else(|| {
        CoreError::new(
            CoreErrorCode::UnsupportedFormat,
            format!("unsupported save file {}", path.display()),
        )
    })?;
    let decoded = decoder.decode(candidate.kind, &candidate.decoder_input())?;
    let raw_items = match decoded {
        DecodedSave::Character {
            hardcore,
            items,
            merc_items,
            corpse_items,
        } => {
            if !settings.game_mode.accepts_character(hardcore) {
                debug!(label = %candidate.save_label, "character skipped by game mode");
                return Ok(Vec::new());
            }
            let mut all = items;
            all.extend(merc_items);
            all.extend(corpse_items);
            all
        }
        DecodedSave::Stash { pages } => {
            if !settings.game_mode.accepts_stash(&candidate.save_label) {
                debug!(label = %candidate.save_label, "stash skipped by game mode");
                return Ok(Vec::new());
            }
            pages.into_iter().flatten().collect()
        }
    };
    Ok(extract_items(&raw_items)
        .into_iter()
        .filter(|item| accepts(item, catalog))
        .collect())
}

/// Processes every file concurrently and merges once all have settled.
pub async fn aggregate_files(
    files: &[PathBuf],
    decoder: &dyn SaveDecoder,
    settings: &GrailSettings,
    catalog: &GrailCatalog,
) -> Aggregation {
    let outcomes = join_all(
        files
            .iter()
            .map(|path| process_file(path, decoder, settings, catalog)),
    )
    .await;
    merge_outcomes(outcomes, settings.grail_type)
}

pub fn merge_outcomes(outcomes: Vec<FileOutcome>, grail_type: GrailType) -> Aggregation {
    let mut aggregation = Aggregation::default();
    let snapshot = &mut aggregation.snapshot;
    for outcome in outcomes {
        let items = match outcome.result {
            Ok(items) => items,
            Err(e) => {
                warn!(file = %outcome.file_name, error = %e, "failed to read save file");
                snapshot.per_file_counts.insert(outcome.save_label, None);
                aggregation.failed_files.push(outcome.file_name);
                continue;
            }
        };
        snapshot
            .per_file_counts
            .insert(outcome.save_label.clone(), Some(items.len()));
        for item in items {
            let occurrence = Occurrence {
                ethereal: item.ethereal,
                level: item.level,
                socketed: item.socketed,
            };
            if item.kind == ItemKind::Rune {
                insert_occurrence(
                    &mut snapshot.available_runes,
                    &item,
                    &outcome.save_label,
                    occurrence,
                );
            }
            let target = if grail_type.counts_ethereal_separately() && item.ethereal {
                &mut snapshot.eth_items
            } else {
                &mut snapshot.items
            };
            insert_occurrence(target, &item, &outcome.save_label, occurrence);
        }
    }
    aggregation
}

fn insert_occurrence(
    map: &mut ItemMap,
    item: &CanonicalItem,
    label: &str,
    occurrence: Occurrence,
) {
    map.entry(item.key.clone())
        .or_insert_with(|| ItemEntry::new(item.display_name.clone(), item.kind))
        .push(label, occurrence);
}

#[cfg(test)]
mod tests {
    use super::{FileOutcome, merge_outcomes};
    use crate::core_api::error::{CoreError, CoreErrorCode};
    use crate::extract::{CanonicalItem, ItemKind};
    use crate::mode::GrailType;

    fn found(key: &str, kind: ItemKind, ethereal: bool) -> CanonicalItem {
        CanonicalItem {
            key: key.to_string(),
            display_name: key.to_uppercase(),
            kind,
            ethereal,
            socketed: false,
            level: 10,
        }
    }

    fn ok(label: &str, items: Vec<CanonicalItem>) -> FileOutcome {
        FileOutcome {
            file_name: format!("{label}.d2s"),
            save_label: label.to_string(),
            result: Ok(items),
        }
    }

    #[test]
    fn occurrences_accumulate_per_label() {
        let outcomes = vec![
            ok(
                "Amazon",
                vec![
                    found("shako", ItemKind::Unique, false),
                    found("shako", ItemKind::Unique, false),
                ],
            ),
            ok("Sorc", vec![found("shako", ItemKind::Unique, false)]),
        ];
        let merged = merge_outcomes(outcomes, GrailType::Normal);
        let entry = &merged.snapshot.items["shako"];
        assert_eq!(entry.name, "SHAKO");
        assert_eq!(entry.in_saves["Amazon"].len(), 2);
        assert_eq!(entry.in_saves["Sorc"].len(), 1);
        assert_eq!(merged.snapshot.per_file_counts["Amazon"], Some(2));
    }

    #[test]
    fn failures_are_recorded_without_stopping_the_batch() {
        let outcomes = vec![
            FileOutcome {
                file_name: "Broken.d2s".to_string(),
                save_label: "Broken".to_string(),
                result: Err(CoreError::new(CoreErrorCode::Decode, "bad bytes")),
            },
            ok("Fine", vec![found("ber", ItemKind::Rune, false)]),
        ];
        let merged = merge_outcomes(outcomes, GrailType::Normal);
        assert_eq!(merged.failed_files, vec!["Broken.d2s"]);
        assert_eq!(merged.snapshot.per_file_counts["Broken"], None);
        assert_eq!(merged.snapshot.per_file_counts["Fine"], Some(1));
        assert!(merged.snapshot.items.contains_key("ber"));
        assert!(merged.snapshot.available_runes.contains_key("ber"));
    }

    #[test]
    fn ethereal_copies_split_only_when_counted_separately() {
        let items = || vec![found("titansrevenge", ItemKind::Unique, true)];
        let each = merge_outcomes(vec![ok("Zon", items())], GrailType::Each);
        assert!(each.snapshot.eth_items.contains_key("titansrevenge"));
        assert!(each.snapshot.items.is_empty());

        let both = merge_outcomes(vec![ok("Zon", items())], GrailType::Both);
        assert!(both.snapshot.items.contains_key("titansrevenge"));
        assert!(both.snapshot.eth_items.is_empty());
    }
}
