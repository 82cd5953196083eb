//! Error type shared by every stage of ELF inspection.

use core::fmt;
use std::io;

/// Errors that can occur when opening or querying an ELF file.
///
/// Every variant except [`ElfError::Io`] and [`ElfError::Closed`] describes
/// structurally invalid or unsupported input; see
/// [`ElfError::is_format_error`].
#[derive(Debug)]
pub enum ElfError {
    /// Reading the underlying source failed (including truncated input).
    Io(io::Error),
    /// The source is shorter than the 16-byte identification block.
    TooSmall {
        /// Length of the source in bytes.
        len: u64,
    },
    /// The file does not start with the ELF magic bytes.
    BadMagic,
    /// `EI_CLASS` is neither `ELFCLASS32` nor `ELFCLASS64`.
    InvalidClass(u8),
    /// `EI_DATA` is `ELFDATA2MSB`; big-endian files are not supported.
    BigEndian,
    /// `EI_DATA` is neither `ELFDATA2LSB` nor `ELFDATA2MSB`.
    InvalidEncoding(u8),
    /// `e_machine` is not in the list of recognized architectures.
    UnsupportedMachine(u16),
    /// `e_machine` is recognized but paired with the wrong `EI_CLASS`.
    MachineClassMismatch {
        /// Raw `e_machine` value.
        machine: u16,
        /// Raw `EI_CLASS` value.
        class: u8,
    },
    /// `e_version` is not `EV_CURRENT`.
    InvalidVersion(u64),
    /// A header table declares entries smaller than the class requires.
    InvalidEntrySize {
        /// Which table: `"program header"` or `"section header"`.
        table: &'static str,
        /// Declared entry size.
        size: u16,
    },
    /// A string table entry ran past the maximum supported name length.
    StringTooLong {
        /// File offset where the string starts.
        offset: u64,
    },
    /// The handle was closed before the requested table was read.
    Closed,
}

impl ElfError {
    /// Returns `true` for errors caused by invalid or unsupported file
    /// contents, as opposed to I/O failures or use after close.
    #[must_use]
    pub fn is_format_error(&self) -> bool {
        !matches!(self, Self::Io(_) | Self::Closed)
    }
}

impl fmt::Display for ElfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "I/O error: {err}"),
            Self::TooSmall { len } => {
                write!(f, "too small to be an ELF file ({len} bytes)")
            }
            Self::BadMagic => write!(f, "invalid ELF magic bytes"),
            Self::InvalidClass(class) => write!(f, "invalid ELF EI_CLASS: {class}"),
            Self::BigEndian => write!(f, "unsupported ELFDATA2MSB (big-endian) file"),
            Self::InvalidEncoding(data) => write!(f, "invalid ELF EI_DATA: {data}"),
            Self::UnsupportedMachine(machine) => {
                write!(f, "unsupported ELF e_machine: {machine}")
            }
            Self::MachineClassMismatch { machine, class } => write!(
                f,
                "invalid e_machine/EI_CLASS combination: {machine}/{class}"
            ),
            Self::InvalidVersion(version) => write!(f, "invalid e_version: {version}"),
            Self::InvalidEntrySize { table, size } => {
                write!(f, "{table} entry size {size} is too small")
            }
            Self::StringTooLong { offset } => {
                write!(f, "unterminated string at offset {offset:#x}")
            }
            Self::Closed => write!(f, "ELF file already closed"),
        }
    }
}

impl std::error::Error for ElfError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ElfError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}
