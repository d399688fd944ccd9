//! Durable state: one JSON blob per key under a single data directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::core_api::{CoreError, CoreErrorCode};
use crate::settings::GrailSettings;

pub const APP_DIR_NAME: &str = "d2-grail";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobKey {
    Settings,
    ManualItems,
    RecentFinds,
    EverFound,
    ItemNotes,
}

impl BlobKey {
    pub fn file_name(&self) -> &'static str {
        match *self {
            Self::Settings => "settings.json",
            Self::ManualItems => "manualItems.json",
            Self::RecentFinds => "recentFinds.json",
            Self::EverFound => "everFound.json",
            Self::ItemNotes => "itemNotes.json",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrailStore {
    root: PathBuf,
}

impl GrailStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn default_root() -> Option<PathBuf> {
        dirs::data_local_dir().map(|d| d.join(APP_DIR_NAME))
    }

    pub fn open_default() -> Result<Self, CoreError> {
        Self::default_root().map(Self::new).ok_or_else(|| {
            CoreError::new(
                CoreErrorCode::Store,
                "could not determine the local data directory",
            )
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, key: BlobKey) -> PathBuf {
        self.root.join(key.file_name())
    }

    /// Raw blob contents; `None` when missing or unreadable.
    pub fn load_value(&self, key: BlobKey) -> Option<Value> {
        let path = self.path(key);
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read store blob");
                return None;
            }
        };
        match serde_json::from_str(&data) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring malformed store blob");
                None
            }
        }
    }

    /// Typed blob contents, falling back to the default for missing or
    /// malformed data.
    pub fn load<T: DeserializeOwned + Default>(&self, key: BlobKey) -> T {
        let Some(value) = self.load_value(key) else {
            return T::default();
        };
        serde_json::from_value(value).unwrap_or_else(|e| {
            warn!(blob = key.file_name(), error = %e, "store blob has unexpected shape");
            T::default()
        })
    }

    pub fn save<T: Serialize>(&self, key: BlobKey, value: &T) -> Result<(), CoreError> {
        let json = serde_json::to_string_pretty(value).map_err(|e| {
            CoreError::new(
                CoreErrorCode::Store,
                format!("failed to encode {}: {e}", key.file_name()),
            )
        })?;
        let path = self.path(key);
        atomic_write(&path, &json).map_err(|e| {
            CoreError::new(
                CoreErrorCode::Store,
                format!("failed to write {}: {e}", path.display()),
            )
        })
    }

    pub fn load_settings(&self) -> GrailSettings {
        let Some(value) = self.load_value(BlobKey::Settings) else {
            return GrailSettings::default();
        };
        GrailSettings::from_value(value).unwrap_or_else(|e| {
            warn!(error = %e, "settings blob has unexpected shape, using defaults");
            GrailSettings::default()
        })
    }

    pub fn save_settings(&self, settings: &GrailSettings) -> Result<(), CoreError> {
        self.save(BlobKey::Settings, settings)
    }
}

/// Logs a failed best-effort write and carries on.
pub fn log_store_failure(result: Result<(), CoreError>, what: &str) {
    if let Err(e) = result {
        warn!(error = %e, "failed to persist {what}");
    }
}

fn atomic_write(path: &Path, content: &str) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(dir)?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content)?;
    // Windows refuses to rename over an existing file.
    if cfg!(windows) && path.exists() {
        fs::remove_file(path)?;
    }
    fs::rename(tmp, path)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::fs;

    use super::{BlobKey, GrailStore};
    use crate::mode::GameMode;
    use crate::settings::GrailSettings;

    #[test]
    fn missing_and_malformed_blobs_load_as_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = GrailStore::new(dir.path());
        let notes: BTreeMap<String, String> = store.load(BlobKey::ItemNotes);
        assert!(notes.is_empty());

        fs::write(store.path(BlobKey::EverFound), "{not json").expect("write");
        let marks: BTreeMap<String, bool> = store.load(BlobKey::EverFound);
        assert!(marks.is_empty());
    }

    #[test]
    fn save_creates_the_directory_and_replaces_atomically() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = GrailStore::new(dir.path().join("nested"));
        let mut marks = BTreeMap::new();
        marks.insert("shako".to_string(), true);
        store.save(BlobKey::EverFound, &marks).expect("first save");
        marks.insert("ber".to_string(), true);
        store.save(BlobKey::EverFound, &marks).expect("second save");

        let loaded: BTreeMap<String, bool> = store.load(BlobKey::EverFound);
        assert_eq!(loaded.len(), 2);
        assert!(!store.path(BlobKey::EverFound).with_extension("json.tmp").exists());
    }

    #[test]
    fn settings_round_trip_with_legacy_migration() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = GrailStore::new(dir.path());
        fs::write(
            store.path(BlobKey::Settings),
            r#"{"gameMode":"both","enableSaves":true}"#,
        )
        .expect("write");
        let settings = store.load_settings();
        assert_eq!(settings.game_mode, GameMode::Both);
        assert!(settings.persist_found_on_drop);

        let updated = GrailSettings {
            grail_runes: true,
            ..settings
        };
        store.save_settings(&updated).expect("save");
        assert_eq!(store.load_settings(), updated);
    }
}
