//! String table regions and NUL-terminated string lookup.

use std::io::{Read, Seek};

use crate::error::ElfError;
use crate::reader::Decoder;

/// Number of bytes pulled from the file per read while scanning for a NUL.
const STRING_WINDOW: usize = 512;

/// Longest name (excluding the terminator) that [`resolve`] will return.
pub const MAX_STRING_LEN: usize = 4096;

/// The byte range of a table within the file.
///
/// A region whose `offset` is 0 is absent, whatever its recorded size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableRegion {
    /// File offset of the first byte of the table.
    pub offset: u64,
    /// Size of the table in bytes.
    pub size: u64,
}

impl TableRegion {
    /// A region that was never discovered.
    pub const ABSENT: Self = Self { offset: 0, size: 0 };

    /// Creates a region from a section's `sh_offset` and `sh_size`.
    #[must_use]
    pub const fn new(offset: u64, size: u64) -> Self {
        Self { offset, size }
    }

    /// Returns `true` if the region was found in the file.
    #[must_use]
    pub const fn is_present(&self) -> bool {
        self.offset != 0
    }

    /// Returns the file offset one past the last byte of the region.
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.offset.saturating_add(self.size)
    }
}

/// Looks up the string at `offset` within `region`.
///
/// Returns `Ok(None)` if the region is absent, `offset` is not inside it, or
/// the region ends before a terminator. The decoder's read position is the
/// same on return as on entry.
///
/// # Errors
///
/// Returns [`ElfError::StringTooLong`] if no terminator appears within
/// [`MAX_STRING_LEN`] bytes, or [`ElfError::Io`] if the read fails.
pub(crate) fn resolve<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    region: TableRegion,
    offset: u64,
) -> Result<Option<String>, ElfError> {
    if !region.is_present() || offset >= region.size {
        return Ok(None);
    }

    let saved = decoder.position()?;
    let start = region.offset.saturating_add(offset);
    let result = read_terminated(decoder, start, region.size - offset);
    let restored = decoder.seek(saved);
    let string = result?;
    restored?;
    Ok(string)
}

/// Reads bytes from `start` up to the first NUL, looking at no more than
/// `available` bytes.
#[expect(
    clippy::cast_possible_truncation,
    reason = "scan length is bounded by MAX_STRING_LEN"
)]
fn read_terminated<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    start: u64,
    available: u64,
) -> Result<Option<String>, ElfError> {
    let max_scan = MAX_STRING_LEN as u64 + 1;
    let limit = available.min(max_scan) as usize;
    let mut window = [0u8; STRING_WINDOW];
    let mut bytes = Vec::new();

    decoder.seek(start)?;
    while bytes.len() < limit {
        let n = (limit - bytes.len()).min(STRING_WINDOW);
        decoder.read_bytes(&mut window[..n])?;
        if let Some(nul) = window[..n].iter().position(|&b| b == 0) {
            bytes.extend_from_slice(&window[..nul]);
            return Ok(Some(String::from_utf8_lossy(&bytes).into_owned()));
        }
        bytes.extend_from_slice(&window[..n]);
    }

    if available > max_scan {
        return Err(ElfError::StringTooLong { offset: start });
    }
    log::warn!("string at offset {start:#x} runs off the end of its table");
    Ok(None)
}
