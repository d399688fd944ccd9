use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::mode::{GameMode, GrailType};

pub const DEFAULT_RECENT_FINDS_COUNT: usize = 5;

/// Mode flags read at the start of every scan pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GrailSettings {
    pub save_dir: Option<PathBuf>,
    pub game_mode: GameMode,
    pub grail_type: GrailType,
    pub grail_runes: bool,
    pub grail_runewords: bool,
    pub grail_warlock: bool,
    pub persist_found_on_drop: bool,
    pub overlay_recent_finds_count: usize,
}

impl Default for GrailSettings {
    fn default() -> Self {
        Self {
            save_dir: None,
            game_mode: GameMode::Softcore,
            grail_type: GrailType::Normal,
            grail_runes: false,
            grail_runewords: false,
            grail_warlock: false,
            persist_found_on_drop: false,
            overlay_recent_finds_count: DEFAULT_RECENT_FINDS_COUNT,
        }
    }
}

impl GrailSettings {
    /// Parses a stored settings blob, filling gaps with defaults.
    ///
    /// Older blobs used `enableSaves` for what is now `persistFoundOnDrop`;
    /// the old key is honoured only when the new one is absent.
    pub fn from_value(mut value: Value) -> Result<Self, serde_json::Error> {
        if let Some(obj) = value.as_object_mut() {
            let legacy = obj.remove("enableSaves");
            if !obj.contains_key("persistFoundOnDrop") {
                if let Some(enabled) = legacy.and_then(|v| v.as_bool()) {
                    obj.insert("persistFoundOnDrop".to_string(), Value::Bool(enabled));
                }
            }
        }
        serde_json::from_value(value)
    }

    pub fn recent_finds_cap(&self) -> usize {
        if self.overlay_recent_finds_count == 0 {
            DEFAULT_RECENT_FINDS_COUNT
        } else {
            self.overlay_recent_finds_count
        }
    }

    /// Cache key for the normal seed shaped by these settings.
    pub fn fingerprint(&self) -> String {
        format!(
            "all|type={}|runes={}|runewords={}|warlock={}",
            self.grail_type, self.grail_runes, self.grail_runewords, self.grail_warlock
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::GrailSettings;
    use crate::mode::{GameMode, GrailType};

    #[test]
    fn missing_fields_take_defaults() {
        let settings = GrailSettings::from_value(json!({ "gameMode": "hardcore" }))
            .expect("partial settings should parse");
        assert_eq!(settings.game_mode, GameMode::Hardcore);
        assert_eq!(settings.grail_type, GrailType::Normal);
        assert_eq!(settings.recent_finds_cap(), 5);
    }

    #[test]
    fn legacy_enable_saves_migrates() {
        let settings = GrailSettings::from_value(json!({ "enableSaves": true }))
            .expect("legacy settings should parse");
        assert!(settings.persist_found_on_drop);

        let settings = GrailSettings::from_value(json!({
            "enableSaves": true,
            "persistFoundOnDrop": false
        }))
        .expect("settings should parse");
        assert!(!settings.persist_found_on_drop);
    }

    #[test]
    fn fingerprint_tracks_seed_shaping_fields() {
        let base = GrailSettings::default();
        let mut runes = base.clone();
        runes.grail_runes = true;
        let mut moved = base.clone();
        moved.overlay_recent_finds_count = 9;
        assert_ne!(base.fingerprint(), runes.fingerprint());
        assert_eq!(base.fingerprint(), moved.fingerprint());
    }
}
