//! Verification manifest loading.
//!
//! ```toml
//! [[library]]
//! path = "out/libfoo.so"
//! symbols = ["foo_init"]
//! dynamic-symbols = ["foo_open", "foo_close"]
//! pie = true
//! dynamic = true
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Expectations for a set of ELF files.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// One entry per `[[library]]` table.
    #[serde(default, rename = "library")]
    pub libraries: Vec<LibrarySpec>,
}

/// Expectations for one file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct LibrarySpec {
    /// File to check. Relative paths are resolved against the manifest.
    pub path: PathBuf,
    /// Names that must be present in `.symtab`.
    #[serde(default)]
    pub symbols: Vec<String>,
    /// Names that must be present in `.dynsym`.
    #[serde(default)]
    pub dynamic_symbols: Vec<String>,
    /// Required PIE status, if any.
    pub pie: Option<bool>,
    /// Required dynamic-linkage status, if any.
    pub dynamic: Option<bool>,
}

impl Manifest {
    /// Load a manifest from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Self::parse(&content, base)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Parse manifest text, resolving relative library paths against `base`.
    pub fn parse(content: &str, base: &Path) -> Result<Self> {
        let mut manifest: Self = toml::from_str(content)?;
        for library in &mut manifest.libraries {
            if library.path.is_relative() {
                library.path = base.join(&library.path);
            }
        }
        Ok(manifest)
    }
}
