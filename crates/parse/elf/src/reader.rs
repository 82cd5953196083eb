//! Little-endian field decoding over a seekable byte source.
//!
//! Every structure in the file is read by seeking to its offset and pulling
//! fields one at a time, so the decoder keeps a single read position that the
//! scanners advance as they go.

use std::io::{Read, Seek, SeekFrom};

use crate::error::ElfError;
use crate::header::ElfClass;

/// Sequential field reader for one ELF source.
#[derive(Debug)]
pub(crate) struct Decoder<R> {
    inner: R,
    class: ElfClass,
}

impl<R: Read + Seek> Decoder<R> {
    /// Wraps `inner`, decoding address-sized fields with the width of `class`.
    pub(crate) fn new(inner: R, class: ElfClass) -> Self {
        Self { inner, class }
    }

    /// Returns the address class the decoder was created with.
    pub(crate) fn class(&self) -> ElfClass {
        self.class
    }

    /// Moves the read position to the absolute file offset `offset`.
    pub(crate) fn seek(&mut self, offset: u64) -> Result<(), ElfError> {
        self.inner.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /// Returns the current absolute read position.
    pub(crate) fn position(&mut self) -> Result<u64, ElfError> {
        Ok(self.inner.stream_position()?)
    }

    /// Fills `buf` from the current position.
    pub(crate) fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), ElfError> {
        self.inner.read_exact(buf)?;
        Ok(())
    }

    /// Reads a `width`-byte little-endian unsigned integer (`1..=8` bytes).
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::Io`] if fewer than `width` bytes remain.
    pub(crate) fn read_uint(&mut self, width: usize) -> Result<u64, ElfError> {
        debug_assert!((1..=8).contains(&width), "field width {width} out of range");
        let mut buf = [0u8; 8];
        self.inner.read_exact(&mut buf[..width])?;
        Ok(u64::from_le_bytes(buf))
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, ElfError> {
        let mut buf = [0u8; 1];
        self.inner.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    #[expect(clippy::cast_possible_truncation, reason = "read exactly two bytes")]
    pub(crate) fn read_half(&mut self) -> Result<u16, ElfError> {
        Ok(self.read_uint(2)? as u16)
    }

    #[expect(clippy::cast_possible_truncation, reason = "read exactly four bytes")]
    pub(crate) fn read_word(&mut self) -> Result<u32, ElfError> {
        Ok(self.read_uint(4)? as u32)
    }

    /// Reads an address (`ElfN_Addr`): 4 or 8 bytes depending on class.
    pub(crate) fn read_addr(&mut self) -> Result<u64, ElfError> {
        self.read_uint(self.class.addr_size())
    }

    /// Reads a file offset (`ElfN_Off`): 4 or 8 bytes depending on class.
    pub(crate) fn read_off(&mut self) -> Result<u64, ElfError> {
        self.read_uint(self.class.addr_size())
    }

    /// Reads a class-sized word such as `sh_flags` or `sh_size`.
    pub(crate) fn read_xword(&mut self) -> Result<u64, ElfError> {
        self.read_uint(self.class.addr_size())
    }

    /// Consumes the decoder, returning the underlying source.
    pub(crate) fn into_inner(self) -> R {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn decoder(bytes: &[u8], class: ElfClass) -> Decoder<Cursor<Vec<u8>>> {
        Decoder::new(Cursor::new(bytes.to_vec()), class)
    }

    #[test]
    fn reads_little_endian_values() {
        let mut d = decoder(&[0x34, 0x12, 0x78, 0x56, 0x34, 0x12, 0xff], ElfClass::Elf64);
        assert_eq!(d.read_half().unwrap(), 0x1234);
        assert_eq!(d.read_word().unwrap(), 0x1234_5678);
        assert_eq!(d.read_u8().unwrap(), 0xff);
    }

    #[test]
    fn full_width_value_keeps_high_bit() {
        let mut d = decoder(&[0xff; 8], ElfClass::Elf64);
        assert_eq!(d.read_uint(8).unwrap(), u64::MAX);
    }

    #[test]
    fn address_width_follows_class() {
        let bytes = [1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0];
        let mut d32 = decoder(&bytes, ElfClass::Elf32);
        assert_eq!(d32.read_addr().unwrap(), 1);
        assert_eq!(d32.read_off().unwrap(), 2);
        assert_eq!(d32.position().unwrap(), 8);

        let mut d64 = decoder(&bytes, ElfClass::Elf64);
        assert_eq!(d64.read_addr().unwrap(), 0x2_0000_0001);
        assert_eq!(d64.position().unwrap(), 8);
    }

    #[test]
    fn seek_then_read() {
        let mut d = decoder(&[0, 0, 0, 0, 0xaa, 0xbb], ElfClass::Elf32);
        d.seek(4).unwrap();
        assert_eq!(d.read_half().unwrap(), 0xbbaa);
    }

    #[test]
    fn truncated_read_is_io_error() {
        let mut d = decoder(&[1, 2, 3], ElfClass::Elf64);
        let err = d.read_word().unwrap_err();
        assert!(matches!(err, ElfError::Io(ref e) if e.kind() == std::io::ErrorKind::UnexpectedEof));
    }
}
