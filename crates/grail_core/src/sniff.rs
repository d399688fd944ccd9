//! Save-file kind detection and sector-stash reconstruction.
//!
//! Character saves (`.d2s`) and classic stashes (`.sss`, `.d2x`) go to the
//! decoder untouched. Shared stashes (`.d2i`) come in two layouts: the legacy
//! one the decoder understands, and a sector-based one where every sector
//! starts with [`SECTOR_MAGIC`]. For the latter only the item-bearing sectors
//! are concatenated and handed on.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core_api::{CoreError, CoreErrorCode};
use crate::layout::{ByteRange, SectorKind, SectorLayout, StashLayout};
use crate::reader::LittleEndianView;

pub const SECTOR_MAGIC: u32 = 0xAA55_AA55;
pub const SECTOR_STASH_VERSION: u32 = 105;
pub const ITEM_SECTION_TAG: [u8; 2] = *b"JM";
pub const MAX_ITEM_SECTORS: usize = 6;

const VERSION_OFFSET: usize = 8;
const SECTOR_SIZE_OFFSET: usize = 16;
const SECTION_TAG_OFFSET: usize = 64;
const MIN_SECTOR_HEADER_LEN: usize = SECTION_TAG_OFFSET + 4;

pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["d2s", "sss", "d2x", "d2i"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaveKind {
    Character,
    ClassicStash,
    ModernStash,
}

impl SaveKind {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "d2s" => Some(Self::Character),
            "sss" | "d2x" => Some(Self::ClassicStash),
            "d2i" => Some(Self::ModernStash),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub kind: SaveKind,
    pub bytes: Vec<u8>,
    pub save_label: String,
}

impl CandidateFile {
    /// Returns `None` for files whose extension is not a supported save kind.
    pub fn new(path: PathBuf, bytes: Vec<u8>) -> Option<Self> {
        let kind = SaveKind::from_path(&path)?;
        let save_label = save_label(&path);
        Some(Self {
            path,
            kind,
            bytes,
            save_label,
        })
    }

    /// The buffer the external decoder should see for this file.
    pub fn decoder_input(&self) -> Cow<'_, [u8]> {
        match self.kind {
            SaveKind::ModernStash => reconstruct_item_sectors(&self.bytes),
            SaveKind::Character | SaveKind::ClassicStash => Cow::Borrowed(&self.bytes),
        }
    }
}

pub fn save_label(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn is_sector_stash(bytes: &[u8]) -> bool {
    if bytes.len() < SECTION_TAG_OFFSET {
        return false;
    }
    let view = LittleEndianView::new(bytes);
    if view.read_u32(0) != SECTOR_MAGIC || view.read_u32(VERSION_OFFSET) != SECTOR_STASH_VERSION {
        return false;
    }
    let first_sector = view.read_u32(SECTOR_SIZE_OFFSET) as usize;
    first_sector > 0 && first_sector <= bytes.len()
}

/// Walks sectors from the start of the buffer until [`MAX_ITEM_SECTORS`]
/// item sectors are found or fewer than a sector header's worth of bytes
/// remain. Any sector with a bad magic or size fails the whole walk.
pub fn walk_sectors(bytes: &[u8]) -> Result<StashLayout, CoreError> {
    let view = LittleEndianView::new(bytes);
    let mut layout = StashLayout {
        file_len: bytes.len(),
        sectors: Vec::new(),
    };
    let mut offset = 0usize;
    let mut item_sectors = 0usize;

    while offset + MIN_SECTOR_HEADER_LEN <= bytes.len() && item_sectors < MAX_ITEM_SECTORS {
        let index = layout.sectors.len();
        if view.read_u32(offset) != SECTOR_MAGIC {
            return Err(CoreError::new(
                CoreErrorCode::UnsupportedFormat,
                format!("sector {index} at offset {offset} is missing the sector magic"),
            ));
        }

        let size = view.read_u32(offset + SECTOR_SIZE_OFFSET) as usize;
        let end = offset.checked_add(size).filter(|end| size > 0 && *end <= bytes.len());
        let Some(end) = end else {
            return Err(CoreError::new(
                CoreErrorCode::UnsupportedFormat,
                format!(
                    "sector {index} at offset {offset} declares size {size}, buffer length {}",
                    bytes.len()
                ),
            ));
        };

        let tag = view.read_tag(offset + SECTION_TAG_OFFSET);
        let kind = if tag == ITEM_SECTION_TAG {
            item_sectors += 1;
            SectorKind::Items
        } else {
            SectorKind::Other(tag)
        };

        layout.sectors.push(SectorLayout {
            index,
            kind,
            range: ByteRange { start: offset, end },
        });
        offset = end;
    }

    layout.validate().map_err(|e| {
        CoreError::new(
            CoreErrorCode::UnsupportedFormat,
            format!("sector layout rejected: {e}"),
        )
    })?;
    Ok(layout)
}

/// Best-effort rebuild of a decoder-compatible buffer from a sector stash.
/// Anything short of a clean walk with at least one item sector returns the
/// original bytes unchanged.
pub fn reconstruct_item_sectors(bytes: &[u8]) -> Cow<'_, [u8]> {
    if !is_sector_stash(bytes) {
        return Cow::Borrowed(bytes);
    }

    let layout = match walk_sectors(bytes) {
        Ok(layout) => layout,
        Err(e) => {
            debug!("falling back to raw stash bytes: {e}");
            return Cow::Borrowed(bytes);
        }
    };

    let mut out = Vec::new();
    for sector in layout.item_sectors() {
        out.extend_from_slice(&bytes[sector.range.start..sector.range.end]);
    }

    if out.is_empty() {
        debug!("sector stash has no item sectors, passing raw bytes through");
        return Cow::Borrowed(bytes);
    }
    Cow::Owned(out)
}
