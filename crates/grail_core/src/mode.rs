use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which characters' saves feed the grail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    #[default]
    Softcore,
    Hardcore,
    Both,
    /// Items are entered by hand; file scanning is suppressed.
    Manual,
}

impl GameMode {
    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::Softcore => "softcore",
            Self::Hardcore => "hardcore",
            Self::Both => "both",
            Self::Manual => "manual",
        }
    }

    pub fn scans_files(&self) -> bool {
        *self != Self::Manual
    }

    pub fn accepts_character(&self, hardcore: bool) -> bool {
        match *self {
            Self::Softcore => !hardcore,
            Self::Hardcore => hardcore,
            Self::Both | Self::Manual => true,
        }
    }

    /// Stashes carry no mode flag we trust, so the file name decides.
    pub fn accepts_stash(&self, save_label: &str) -> bool {
        let label = save_label.to_lowercase();
        match *self {
            Self::Softcore => !label.contains("hardcore"),
            Self::Hardcore => !label.contains("softcore"),
            Self::Both | Self::Manual => true,
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "softcore" | "sc" => Ok(Self::Softcore),
            "hardcore" | "hc" => Ok(Self::Hardcore),
            "both" => Ok(Self::Both),
            "manual" => Ok(Self::Manual),
            other => Err(format!("unknown game mode '{other}'")),
        }
    }
}

/// How normal and ethereal finds count toward completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrailType {
    #[default]
    Normal,
    Ethereal,
    /// Normal and ethereal copies both satisfy the same entry.
    Both,
    /// Normal and ethereal copies are separate entries.
    Each,
}

impl GrailType {
    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::Normal => "normal",
            Self::Ethereal => "ethereal",
            Self::Both => "both",
            Self::Each => "each",
        }
    }

    pub fn counts_ethereal_separately(&self) -> bool {
        *self == Self::Each
    }
}

impl fmt::Display for GrailType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GrailType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "ethereal" | "eth" => Ok(Self::Ethereal),
            "both" => Ok(Self::Both),
            "each" => Ok(Self::Each),
            other => Err(format!("unknown grail type '{other}'")),
        }
    }
}
