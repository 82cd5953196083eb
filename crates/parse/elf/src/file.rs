//! The parsed-file handle.
//!
//! [`ElfFile`] validates the header and scans the section and program header
//! tables when it is created, then reads each symbol table the first time it
//! is queried and keeps the result for the life of the handle.

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use crate::error::ElfError;
use crate::header::{ElfClass, ElfHeader, Machine, ObjectType};
use crate::reader::Decoder;
use crate::section::{self, SectionTables};
use crate::segment;
use crate::strtab::TableRegion;
use crate::symbol::{self, Symbol, SymbolTable};

/// An open, fully validated ELF file.
///
/// The handle owns its source exclusively and reads it by seeking, so
/// lookups take `&mut self`. Sharing one handle between threads requires the
/// caller to wrap it in a lock.
#[derive(Debug)]
pub struct ElfFile<R = File> {
    name: String,
    header: ElfHeader,
    tables: SectionTables,
    is_pie: bool,
    /// `None` once the handle has been closed.
    decoder: Option<Decoder<R>>,
    symbols: Option<SymbolTable>,
    dynamic_symbols: Option<SymbolTable>,
}

/// Opens and validates the ELF file at `path`.
///
/// # Errors
///
/// Returns [`ElfError::Io`] if the file cannot be opened or is truncated, or
/// a format error describing the first header check that failed.
pub fn open(path: impl AsRef<Path>) -> Result<ElfFile<File>, ElfError> {
    ElfFile::open(path)
}

impl ElfFile<File> {
    /// Opens and validates the ELF file at `path`.
    ///
    /// # Errors
    ///
    /// See [`open`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ElfError> {
        let path = path.as_ref();
        log::debug!("opening ELF file {}", path.display());
        let file = File::open(path).inspect_err(|e| {
            log::debug!("failed to open {}: {e}", path.display());
        })?;
        Self::from_reader(path.display().to_string(), file)
    }
}

impl<R: Read + Seek> ElfFile<R> {
    /// Validates and scans an ELF image read from `reader`.
    ///
    /// `name` identifies the source in log output.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::Io`] if the source is truncated, or a format error
    /// describing the first header check that failed. The reader is dropped
    /// on failure.
    pub fn from_reader(name: impl Into<String>, reader: R) -> Result<Self, ElfError> {
        let name = name.into();
        let (header, mut decoder) = ElfHeader::read(reader).inspect_err(|e| {
            log::debug!("{name}: {e}");
        })?;
        let tables = section::scan_sections(&mut decoder, &header)?;
        let is_pie = segment::scan_segments(&mut decoder, &header)?;
        log::debug!(
            "{name}: dynamic={} pie={is_pie} symtab={} dynsym={}",
            tables.has_dynamic,
            tables.symtab.is_present(),
            tables.dynsym.is_present()
        );

        Ok(Self {
            name,
            header,
            tables,
            is_pie,
            decoder: Some(decoder),
            symbols: None,
            dynamic_symbols: None,
        })
    }

    /// The path or name the handle was created with.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The parsed file header.
    #[must_use]
    pub fn header(&self) -> &ElfHeader {
        &self.header
    }

    /// The table regions found by the section scan.
    #[must_use]
    pub fn tables(&self) -> &SectionTables {
        &self.tables
    }

    /// Address width of the file.
    #[must_use]
    pub fn class(&self) -> ElfClass {
        self.header.class
    }

    /// Target architecture.
    #[must_use]
    pub fn machine(&self) -> Machine {
        self.header.machine
    }

    /// Object file type.
    #[must_use]
    pub fn object_type(&self) -> ObjectType {
        self.header.object_type
    }

    /// Virtual address of the entry point.
    #[must_use]
    pub fn entry_point(&self) -> u64 {
        self.header.e_entry
    }

    /// Returns `true` if the file has an `SHT_DYNAMIC` section.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.tables.has_dynamic
    }

    /// Returns `true` if a loadable segment is linked at address 0.
    #[must_use]
    pub fn is_pie(&self) -> bool {
        self.is_pie
    }

    /// Looks up `name` in `.symtab`.
    ///
    /// The table is read on the first call and cached.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::Closed`] if the table was not read before
    /// [`close`](Self::close), or the error that stopped the table read.
    pub fn get_symbol(&mut self, name: &str) -> Result<Option<&Symbol>, ElfError> {
        Ok(self.symbols()?.get(name))
    }

    /// Looks up `name` in `.dynsym`.
    ///
    /// The table is read on the first call and cached.
    ///
    /// # Errors
    ///
    /// See [`get_symbol`](Self::get_symbol).
    pub fn get_dynamic_symbol(&mut self, name: &str) -> Result<Option<&Symbol>, ElfError> {
        Ok(self.dynamic_symbols()?.get(name))
    }

    /// All named symbols of `.symtab`.
    ///
    /// # Errors
    ///
    /// See [`get_symbol`](Self::get_symbol).
    pub fn symbols(&mut self) -> Result<&SymbolTable, ElfError> {
        load_table(
            &mut self.symbols,
            self.decoder.as_mut(),
            self.tables.strtab,
            self.tables.symtab,
        )
    }

    /// All named symbols of `.dynsym`.
    ///
    /// # Errors
    ///
    /// See [`get_symbol`](Self::get_symbol).
    pub fn dynamic_symbols(&mut self) -> Result<&SymbolTable, ElfError> {
        load_table(
            &mut self.dynamic_symbols,
            self.decoder.as_mut(),
            self.tables.dynstr,
            self.tables.dynsym,
        )
    }

    /// Releases the underlying source. Calling it again has no effect.
    ///
    /// Tables already read keep answering lookups.
    pub fn close(&mut self) {
        if self.decoder.take().is_some() {
            log::debug!("closed {}", self.name);
        }
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.decoder.is_none()
    }

    /// Closes the handle and returns the underlying source, if still open.
    pub fn into_inner(mut self) -> Option<R> {
        self.decoder.take().map(Decoder::into_inner)
    }
}

/// Returns the cached table in `slot`, reading it first if needed.
fn load_table<'a, R: Read + Seek>(
    slot: &'a mut Option<SymbolTable>,
    decoder: Option<&mut Decoder<R>>,
    strings: TableRegion,
    symbols: TableRegion,
) -> Result<&'a SymbolTable, ElfError> {
    let table = match slot.take() {
        Some(table) => table,
        None => {
            let decoder = decoder.ok_or(ElfError::Closed)?;
            let table = symbol::read_symbol_table(decoder, strings, symbols)?;
            log::debug!(
                "read {} symbols from table at {:#x}",
                table.len(),
                symbols.offset
            );
            table
        }
    };
    Ok(slot.insert(table))
}
