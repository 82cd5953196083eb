//! Program header scanning.

use std::io::{Read, Seek};

use crate::error::ElfError;
use crate::header::{ElfClass, ElfHeader};
use crate::reader::Decoder;

/// Program header type: loadable segment.
pub const PT_LOAD: u32 = 1;

/// Returns `true` if any `PT_LOAD` segment is linked at virtual address 0.
///
/// # Errors
///
/// Returns [`ElfError::Io`] if a program header cannot be read.
pub(crate) fn scan_segments<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    hdr: &ElfHeader,
) -> Result<bool, ElfError> {
    let mut is_pie = false;
    for index in 0..hdr.e_phnum {
        let offset = hdr
            .e_phoff
            .saturating_add(u64::from(index) * u64::from(hdr.e_phentsize));
        decoder.seek(offset)?;

        let p_type = decoder.read_word()?;
        if p_type != PT_LOAD {
            continue;
        }
        // Elf64_Phdr carries p_flags right after p_type; Elf32_Phdr has it last.
        if decoder.class() == ElfClass::Elf64 {
            let _p_flags = decoder.read_word()?;
        }
        let p_offset = decoder.read_off()?;
        let p_vaddr = decoder.read_addr()?;
        log::trace!("PT_LOAD {index}: offset={p_offset:#x} vaddr={p_vaddr:#x}");

        if p_vaddr == 0 {
            is_pie = true;
        }
    }
    Ok(is_pie)
}
