//! Symbol table entries and name-keyed symbol tables.

use core::fmt;
use std::collections::HashMap;
use std::io::{Read, Seek};

use crate::error::ElfError;
use crate::header::ElfClass;
use crate::reader::Decoder;
use crate::strtab::{self, TableRegion};

/// Symbol binding: local.
pub const STB_LOCAL: u8 = 0;

/// Symbol binding: global.
pub const STB_GLOBAL: u8 = 1;

/// Symbol binding: weak.
pub const STB_WEAK: u8 = 2;

/// Symbol binding: start of the processor-specific range.
pub const STB_LOPROC: u8 = 13;

/// Symbol binding: end of the processor-specific range.
pub const STB_HIPROC: u8 = 15;

/// Symbol type: unspecified.
pub const STT_NOTYPE: u8 = 0;

/// Symbol type: data object.
pub const STT_OBJECT: u8 = 1;

/// Symbol type: function.
pub const STT_FUNC: u8 = 2;

/// Symbol type: section.
pub const STT_SECTION: u8 = 3;

/// Symbol type: source file.
pub const STT_FILE: u8 = 4;

/// Symbol type: uninitialized common block.
pub const STT_COMMON: u8 = 5;

/// Symbol type: thread-local storage.
pub const STT_TLS: u8 = 6;

/// Size of an ELF32 symbol entry (16 bytes).
const ELF32_SYM_SIZE: u64 = 16;

/// Size of an ELF64 symbol entry (24 bytes).
const ELF64_SYM_SIZE: u64 = 24;

/// Symbol visibility class, from the high nibble of `st_info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolBind {
    /// `STB_LOCAL`.
    Local,
    /// `STB_GLOBAL`.
    Global,
    /// `STB_WEAK`.
    Weak,
    /// `STB_LOPROC..=STB_HIPROC`.
    Processor(u8),
    /// Any other value.
    Other(u8),
}

impl SymbolBind {
    /// Decodes a 4-bit binding value.
    #[must_use]
    pub const fn from_raw(bind: u8) -> Self {
        match bind {
            STB_LOCAL => Self::Local,
            STB_GLOBAL => Self::Global,
            STB_WEAK => Self::Weak,
            STB_LOPROC..=STB_HIPROC => Self::Processor(bind),
            other => Self::Other(other),
        }
    }

    /// The raw 4-bit binding value.
    #[must_use]
    pub const fn raw(self) -> u8 {
        match self {
            Self::Local => STB_LOCAL,
            Self::Global => STB_GLOBAL,
            Self::Weak => STB_WEAK,
            Self::Processor(raw) | Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for SymbolBind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("LOCAL"),
            Self::Global => f.write_str("GLOBAL"),
            Self::Weak => f.write_str("WEAK"),
            Self::Processor(raw) | Self::Other(raw) => write!(f, "STB_??? ({raw})"),
        }
    }
}

/// Symbol category, from the low nibble of `st_info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolType {
    /// `STT_NOTYPE`.
    NoType,
    /// `STT_OBJECT`.
    Object,
    /// `STT_FUNC`.
    Func,
    /// `STT_SECTION`.
    Section,
    /// `STT_FILE`.
    File,
    /// `STT_COMMON`.
    Common,
    /// `STT_TLS`.
    Tls,
    /// Any other value.
    Other(u8),
}

impl SymbolType {
    /// Decodes a 4-bit type value.
    #[must_use]
    pub const fn from_raw(kind: u8) -> Self {
        match kind {
            STT_NOTYPE => Self::NoType,
            STT_OBJECT => Self::Object,
            STT_FUNC => Self::Func,
            STT_SECTION => Self::Section,
            STT_FILE => Self::File,
            STT_COMMON => Self::Common,
            STT_TLS => Self::Tls,
            other => Self::Other(other),
        }
    }

    /// The raw 4-bit type value.
    #[must_use]
    pub const fn raw(self) -> u8 {
        match self {
            Self::NoType => STT_NOTYPE,
            Self::Object => STT_OBJECT,
            Self::Func => STT_FUNC,
            Self::Section => STT_SECTION,
            Self::File => STT_FILE,
            Self::Common => STT_COMMON,
            Self::Tls => STT_TLS,
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for SymbolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoType => f.write_str("NOTYPE"),
            Self::Object => f.write_str("OBJECT"),
            Self::Func => f.write_str("FUNC"),
            Self::Section => f.write_str("SECTION"),
            Self::File => f.write_str("FILE"),
            Self::Common => f.write_str("COMMON"),
            Self::Tls => f.write_str("TLS"),
            Self::Other(raw) => write!(f, "STT_??? ({raw})"),
        }
    }
}

/// A named symbol table entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol {
    name: String,
    bind: SymbolBind,
    kind: SymbolType,
}

impl Symbol {
    /// Builds a symbol from its name and raw `st_info` byte.
    #[must_use]
    pub fn from_info(name: impl Into<String>, st_info: u8) -> Self {
        Self {
            name: name.into(),
            bind: SymbolBind::from_raw(st_info >> 4),
            kind: SymbolType::from_raw(st_info & 0xf),
        }
    }

    /// The symbol's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The symbol's binding.
    #[must_use]
    pub fn bind(&self) -> SymbolBind {
        self.bind
    }

    /// The symbol's type.
    #[must_use]
    pub fn kind(&self) -> SymbolType {
        self.kind
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol[{},{},{}]", self.name, self.bind, self.kind)
    }
}

/// Named symbols of one table, keyed by name.
pub type SymbolTable = HashMap<String, Symbol>;

/// Reads every named entry of `symbols`, resolving names in `strings`.
///
/// Entries with `st_name == 0` or a name outside `strings` are skipped. When
/// two entries share a name, the later one wins.
///
/// # Errors
///
/// Returns [`ElfError::Io`] if an entry or its name cannot be read. Entries
/// whose name exceeds [`MAX_STRING_LEN`](crate::strtab::MAX_STRING_LEN) are
/// skipped.
pub(crate) fn read_symbol_table<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    strings: TableRegion,
    symbols: TableRegion,
) -> Result<SymbolTable, ElfError> {
    let mut table = SymbolTable::new();
    if !symbols.is_present() {
        return Ok(table);
    }

    let class = decoder.class();
    let entry_size = match class {
        ElfClass::Elf32 => ELF32_SYM_SIZE,
        ElfClass::Elf64 => ELF64_SYM_SIZE,
    };

    let mut offset = symbols.offset;
    while offset.saturating_add(entry_size) <= symbols.end() {
        decoder.seek(offset)?;
        offset += entry_size;

        let st_name = decoder.read_word()?;
        let st_info = match class {
            ElfClass::Elf64 => decoder.read_u8()?,
            ElfClass::Elf32 => {
                // st_value and st_size precede st_info in Elf32_Sym.
                let _st_value = decoder.read_addr()?;
                let _st_size = decoder.read_word()?;
                decoder.read_u8()?
            }
        };
        if st_name == 0 {
            continue;
        }

        let name = match strtab::resolve(decoder, strings, u64::from(st_name)) {
            Ok(Some(name)) => name,
            Ok(None) => {
                log::trace!("symbol name offset {st_name:#x} outside string table");
                continue;
            }
            Err(ElfError::StringTooLong { offset }) => {
                log::warn!("skipping symbol with over-long name at offset {offset:#x}");
                continue;
            }
            Err(e) => return Err(e),
        };
        if name.is_empty() {
            continue;
        }
        let symbol = Symbol::from_info(name, st_info);
        log::trace!("{symbol}");
        table.insert(symbol.name.clone(), symbol);
    }

    Ok(table)
}
