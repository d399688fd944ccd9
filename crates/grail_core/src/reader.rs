/// Bounds-checked little-endian view over a byte buffer.
///
/// Reads that would run past the end of the buffer yield zero instead of
/// failing, so callers can probe headers of truncated files without
/// special-casing short inputs.
#[derive(Debug, Clone, Copy)]
pub struct LittleEndianView<'a> {
    bytes: &'a [u8],
}

impl<'a> LittleEndianView<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn read_u8(&self, offset: usize) -> u8 {
        self.bytes.get(offset).copied().unwrap_or(0)
    }

    pub fn read_u32(&self, offset: usize) -> u32 {
        let Some(end) = offset.checked_add(4) else {
            return 0;
        };
        match self.bytes.get(offset..end) {
            Some(slice) => u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]),
            None => 0,
        }
    }

    pub fn read_tag(&self, offset: usize) -> [u8; 2] {
        [self.read_u8(offset), self.read_u8(offset.saturating_add(1))]
    }

    pub fn slice(&self, start: usize, end: usize) -> Option<&'a [u8]> {
        self.bytes.get(start..end)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
