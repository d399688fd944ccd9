use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: usize,
    pub end: usize,
}

impl ByteRange {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorKind {
    Items,
    Other([u8; 2]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorLayout {
    pub index: usize,
    pub kind: SectorKind,
    pub range: ByteRange,
}

/// Sector map of a sector-based shared stash, as far as it was walked.
#[derive(Debug, Clone, Default)]
pub struct StashLayout {
    pub file_len: usize,
    pub sectors: Vec<SectorLayout>,
}

impl StashLayout {
    pub fn item_sectors(&self) -> impl Iterator<Item = &SectorLayout> {
        self.sectors
            .iter()
            .filter(|sector| sector.kind == SectorKind::Items)
    }

    pub fn validate(&self) -> io::Result<()> {
        let Some(first) = self.sectors.first() else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "stash layout must contain at least one sector",
            ));
        };

        if first.range.start != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "layout does not start at byte 0",
            ));
        }

        let mut expected = 0usize;
        for sector in &self.sectors {
            if sector.range.start != expected {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "layout gap/overlap around sector {}: expected start {}, got {}",
                        sector.index, expected, sector.range.start
                    ),
                ));
            }
            if sector.range.is_empty() || sector.range.end > self.file_len {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "invalid sector range {}: {}..{} (file length {})",
                        sector.index, sector.range.start, sector.range.end, self.file_len
                    ),
                ));
            }
            expected = sector.range.end;
        }

        Ok(())
    }
}
