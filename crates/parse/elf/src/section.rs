//! Section header scanning.
//!
//! Locates the symbol and string tables by walking the section header table
//! twice: once to find the section-name string table, and once to name and
//! classify every other section.

use std::io::{Read, Seek};

use crate::error::ElfError;
use crate::header::ElfHeader;
use crate::reader::Decoder;
use crate::strtab::{self, TableRegion};

/// Section type: symbol table.
pub const SHT_SYMTAB: u32 = 2;

/// Section type: string table.
pub const SHT_STRTAB: u32 = 3;

/// Section type: dynamic linking information.
pub const SHT_DYNAMIC: u32 = 6;

/// Section type: dynamic symbol table.
pub const SHT_DYNSYM: u32 = 11;

/// Name of the static symbol table section.
pub const SYMTAB_NAME: &str = ".symtab";

/// Name of the dynamic symbol table section.
pub const DYNSYM_NAME: &str = ".dynsym";

/// Name of the static string table section.
pub const STRTAB_NAME: &str = ".strtab";

/// Name of the dynamic string table section.
pub const DYNSTR_NAME: &str = ".dynstr";

/// The leading fields of a section header entry.
///
/// `sh_link` and later fields are never needed, so they are not read.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SectionHeader {
    pub sh_name: u32,
    pub sh_type: u32,
    pub sh_flags: u64,
    pub sh_addr: u64,
    pub sh_offset: u64,
    pub sh_size: u64,
}

impl SectionHeader {
    /// Reads the section header at file offset `offset`.
    fn read<R: Read + Seek>(decoder: &mut Decoder<R>, offset: u64) -> Result<Self, ElfError> {
        decoder.seek(offset)?;
        Ok(Self {
            sh_name: decoder.read_word()?,
            sh_type: decoder.read_word()?,
            sh_flags: decoder.read_xword()?,
            sh_addr: decoder.read_addr()?,
            sh_offset: decoder.read_off()?,
            sh_size: decoder.read_xword()?,
        })
    }

    fn region(&self) -> TableRegion {
        TableRegion::new(self.sh_offset, self.sh_size)
    }
}

/// Table regions discovered by the section scan.
///
/// Each symbol table is paired with the string table found in the same scan:
/// `symtab` with `strtab`, `dynsym` with `dynstr`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectionTables {
    /// The section-name string table (`e_shstrndx`).
    pub shstrtab: TableRegion,
    /// `.symtab`.
    pub symtab: TableRegion,
    /// `.strtab`.
    pub strtab: TableRegion,
    /// `.dynsym`.
    pub dynsym: TableRegion,
    /// `.dynstr`.
    pub dynstr: TableRegion,
    /// Whether an `SHT_DYNAMIC` section exists.
    pub has_dynamic: bool,
}

/// Walks the section header table described by `hdr`.
///
/// # Errors
///
/// Returns [`ElfError::Io`] if a section header or name cannot be read.
pub(crate) fn scan_sections<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    hdr: &ElfHeader,
) -> Result<SectionTables, ElfError> {
    let mut tables = SectionTables::default();
    if hdr.e_shnum == 0 {
        return Ok(tables);
    }

    let entry_offset = |index: u16| {
        hdr.e_shoff
            .saturating_add(u64::from(index) * u64::from(hdr.e_shentsize))
    };

    // The name table cannot be looked up by name, only by index and type.
    if hdr.e_shstrndx < hdr.e_shnum {
        let shdr = SectionHeader::read(decoder, entry_offset(hdr.e_shstrndx))?;
        if shdr.sh_type == SHT_STRTAB {
            tables.shstrtab = shdr.region();
        }
    }
    if !tables.shstrtab.is_present() {
        log::warn!(
            "no section-name string table at index {}; sections cannot be named",
            hdr.e_shstrndx
        );
    }

    for index in 0..hdr.e_shnum {
        if index == hdr.e_shstrndx {
            continue;
        }
        let shdr = SectionHeader::read(decoder, entry_offset(index))?;
        log::trace!(
            "section {index}: type={} flags={:#x} addr={:#x} offset={:#x} size={:#x}",
            shdr.sh_type,
            shdr.sh_flags,
            shdr.sh_addr,
            shdr.sh_offset,
            shdr.sh_size
        );

        match shdr.sh_type {
            SHT_SYMTAB | SHT_DYNSYM => {
                let name = strtab::resolve(decoder, tables.shstrtab, u64::from(shdr.sh_name))?;
                match name.as_deref() {
                    Some(SYMTAB_NAME) => tables.symtab = shdr.region(),
                    Some(DYNSYM_NAME) => tables.dynsym = shdr.region(),
                    _ => {}
                }
            }
            SHT_STRTAB => {
                let name = strtab::resolve(decoder, tables.shstrtab, u64::from(shdr.sh_name))?;
                match name.as_deref() {
                    Some(STRTAB_NAME) => tables.strtab = shdr.region(),
                    Some(DYNSTR_NAME) => tables.dynstr = shdr.region(),
                    _ => {}
                }
            }
            SHT_DYNAMIC => tables.has_dynamic = true,
            _ => {}
        }
    }

    Ok(tables)
}
