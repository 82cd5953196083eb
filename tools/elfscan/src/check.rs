//! Checking files against manifest expectations.

use std::fmt;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use elfscan_elf::ElfFile;

use crate::manifest::{LibrarySpec, Manifest};

/// One unmet expectation.
#[derive(Debug, PartialEq, Eq)]
pub struct Failure {
    /// File the expectation belongs to.
    pub path: PathBuf,
    /// What went wrong.
    pub problem: Problem,
}

/// Why a library failed verification.
#[derive(Debug, PartialEq, Eq)]
pub enum Problem {
    /// The file could not be opened or is not a supported ELF file.
    Open(String),
    /// A symbol table could not be read.
    Read(String),
    /// A required `.symtab` entry is absent.
    MissingSymbol(String),
    /// A required `.dynsym` entry is absent.
    MissingDynamicSymbol(String),
    /// PIE status differs from the manifest.
    Pie { expected: bool },
    /// Dynamic-linkage status differs from the manifest.
    Dynamic { expected: bool },
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open(msg) => write!(f, "cannot open: {msg}"),
            Self::Read(msg) => write!(f, "cannot read symbols: {msg}"),
            Self::MissingSymbol(name) => write!(f, "missing symbol `{name}`"),
            Self::MissingDynamicSymbol(name) => write!(f, "missing dynamic symbol `{name}`"),
            Self::Pie { expected: true } => f.write_str("expected PIE"),
            Self::Pie { expected: false } => f.write_str("expected fixed-address"),
            Self::Dynamic { expected: true } => f.write_str("expected dynamic linkage"),
            Self::Dynamic { expected: false } => f.write_str("expected static linkage"),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.problem)
    }
}

/// Check every library in `manifest`, returning all unmet expectations.
pub fn verify(manifest: &Manifest) -> Vec<Failure> {
    manifest.libraries.iter().flat_map(check_library).collect()
}

/// Check one library. An unopenable file yields a single failure.
pub fn check_library(spec: &LibrarySpec) -> Vec<Failure> {
    let fail = |problem| Failure {
        path: spec.path.clone(),
        problem,
    };

    let mut elf = match elfscan_elf::open(&spec.path) {
        Ok(elf) => elf,
        Err(e) => return vec![fail(Problem::Open(e.to_string()))],
    };

    let mut failures = Vec::new();
    if let Some(expected) = spec.pie.filter(|&pie| elf.is_pie() != pie) {
        failures.push(fail(Problem::Pie { expected }));
    }
    if let Some(expected) = spec.dynamic.filter(|&dynamic| elf.is_dynamic() != dynamic) {
        failures.push(fail(Problem::Dynamic { expected }));
    }
    failures.extend(missing_symbols(&mut elf, &spec.symbols, false).into_iter().map(fail));
    failures.extend(
        missing_symbols(&mut elf, &spec.dynamic_symbols, true)
            .into_iter()
            .map(fail),
    );

    elf.close();
    log::debug!("{}: {} unmet expectations", spec.path.display(), failures.len());
    failures
}

/// Problems for each name in `wanted` absent from `.symtab`, or `.dynsym`
/// when `dynamic` is set. A read error ends the scan.
fn missing_symbols<R: Read + Seek>(
    elf: &mut ElfFile<R>,
    wanted: &[String],
    dynamic: bool,
) -> Vec<Problem> {
    let mut missing = Vec::new();
    for name in wanted {
        let found = if dynamic {
            elf.get_dynamic_symbol(name)
        } else {
            elf.get_symbol(name)
        };
        match found {
            Ok(Some(_)) => {}
            Ok(None) if dynamic => missing.push(Problem::MissingDynamicSymbol(name.clone())),
            Ok(None) => missing.push(Problem::MissingSymbol(name.clone())),
            Err(e) => {
                missing.push(Problem::Read(e.to_string()));
                break;
            }
        }
    }
    missing
}

/// Display path relative to `base` when possible.
pub fn display_path<'a>(path: &'a Path, base: &Path) -> std::path::Display<'a> {
    path.strip_prefix(base).unwrap_or(path).display()
}
