//! Seek-and-read ELF inspector.
//!
//! Validates little-endian ELF32 and ELF64 files for a fixed set of
//! architectures, reports whether a file is dynamically linked or
//! position-independent, and looks up symbols by exact name in `.symtab` and
//! `.dynsym`. Only the header, the program and section header tables, and the
//! tables a lookup needs are ever read.
//!
//! # Usage
//!
//! ```no_run
//! fn check(path: &str) -> Result<(), elfscan_elf::ElfError> {
//!     let mut elf = elfscan_elf::open(path)?;
//!     if elf.is_dynamic() && elf.is_pie() {
//!         if let Some(sym) = elf.get_dynamic_symbol("malloc")? {
//!             println!("{sym}");
//!         }
//!     }
//!     elf.close();
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod file;
pub mod header;
mod reader;
pub mod section;
pub mod segment;
pub mod strtab;
pub mod symbol;

pub use error::ElfError;
pub use file::{ElfFile, open};
pub use header::{ElfClass, ElfHeader, Machine, ObjectType};
pub use section::SectionTables;
pub use strtab::{MAX_STRING_LEN, TableRegion};
pub use symbol::{Symbol, SymbolBind, SymbolTable, SymbolType};
