//! Seam to the external save decoders.
//!
//! Decoding the binary character and stash formats is not done here. A
//! [`SaveDecoder`] turns the bytes chosen by the sniffer into a tree of
//! [`RawItem`]s or fails; the engine only records the failure.

use serde::{Deserialize, Deserializer, Serialize};

use crate::core_api::{CoreError, CoreErrorCode};
use crate::sniff::SaveKind;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MagicAttribute {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawItem {
    #[serde(rename = "type")]
    pub type_code: String,
    pub unique_name: Option<String>,
    pub set_name: Option<String>,
    pub runeword_name: Option<String>,
    #[serde(deserialize_with = "flag")]
    pub ethereal: bool,
    #[serde(deserialize_with = "flag")]
    pub socketed: bool,
    pub level: u32,
    pub magic_attributes: Vec<MagicAttribute>,
    pub socketed_items: Vec<RawItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedSave {
    Character {
        hardcore: bool,
        items: Vec<RawItem>,
        merc_items: Vec<RawItem>,
        corpse_items: Vec<RawItem>,
    },
    Stash {
        pages: Vec<Vec<RawItem>>,
    },
}

pub trait SaveDecoder: Send + Sync {
    fn decode(&self, kind: SaveKind, bytes: &[u8]) -> Result<DecodedSave, CoreError>;
}

/// Reads the JSON item-tree dumps written by external save tooling.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonDumpDecoder;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CharacterDump {
    header: CharacterHeader,
    items: Vec<RawItem>,
    merc_items: Vec<RawItem>,
    corpse_items: Vec<RawItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CharacterHeader {
    status: CharacterStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CharacterStatus {
    #[serde(deserialize_with = "flag")]
    hardcore: bool,
}

#[derive(Debug, Deserialize)]
struct StashDump {
    pages: Vec<StashPage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StashPage {
    items: Vec<RawItem>,
}

impl SaveDecoder for JsonDumpDecoder {
    fn decode(&self, kind: SaveKind, bytes: &[u8]) -> Result<DecodedSave, CoreError> {
        match kind {
            SaveKind::Character => {
                let dump: CharacterDump = serde_json::from_slice(bytes).map_err(|e| {
                    CoreError::new(
                        CoreErrorCode::Decode,
                        format!("failed to decode character dump: {e}"),
                    )
                })?;
                Ok(DecodedSave::Character {
                    hardcore: dump.header.status.hardcore,
                    items: dump.items,
                    merc_items: dump.merc_items,
                    corpse_items: dump.corpse_items,
                })
            }
            SaveKind::ClassicStash | SaveKind::ModernStash => {
                let dump: StashDump = serde_json::from_slice(bytes).map_err(|e| {
                    CoreError::new(
                        CoreErrorCode::Decode,
                        format!("failed to decode stash dump: {e}"),
                    )
                })?;
                Ok(DecodedSave::Stash {
                    pages: dump.pages.into_iter().map(|page| page.items).collect(),
                })
            }
        }
    }
}

fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Null(()),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(v) => v,
        Flag::Int(v) => v != 0,
        Flag::Null(()) => false,
    })
}

#[cfg(test)]
mod tests {
    use super::{DecodedSave, JsonDumpDecoder, SaveDecoder};
    use crate::sniff::SaveKind;

    #[test]
    fn decodes_character_dump_with_numeric_flags() {
        let json = br#"{
            "header": { "status": { "hardcore": 1 } },
            "items": [
                { "type": "uap", "unique_name": "Harlequin Crest", "ethereal": 0, "level": 85 },
                { "type": "xsk", "socketed": 1, "socketed_items": [ { "type": "r31" } ] }
            ],
            "merc_items": [ { "type": "r01" } ]
        }"#;

        let decoded = JsonDumpDecoder
            .decode(SaveKind::Character, json)
            .expect("character dump should decode");
        let DecodedSave::Character {
            hardcore,
            items,
            merc_items,
            corpse_items,
        } = decoded
        else {
            panic!("expected a character save");
        };
        assert!(hardcore);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].unique_name.as_deref(), Some("Harlequin Crest"));
        assert!(!items[0].ethereal);
        assert!(items[1].socketed);
        assert_eq!(items[1].socketed_items[0].type_code, "r31");
        assert_eq!(merc_items.len(), 1);
        assert!(corpse_items.is_empty());
    }

    #[test]
    fn stash_dump_requires_pages() {
        let err = JsonDumpDecoder
            .decode(SaveKind::ClassicStash, br#"{"items": []}"#)
            .expect_err("stash without pages should fail");
        assert_eq!(err.code, crate::core_api::CoreErrorCode::Decode);
    }

    #[test]
    fn garbage_fails_to_decode() {
        assert!(JsonDumpDecoder.decode(SaveKind::Character, &[0xAA, 0x55, 0x00]).is_err());
    }
}
