//! Command-line interface definitions for elfscan.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Inspect ELF linkage and look up symbols.
#[derive(Parser)]
#[command(name = "elfscan", version, about)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Show only errors.
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Show per-file progress and library trace output.
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Print header facts for one or more files.
    Info(InfoArgs),
    /// Look up a symbol by exact name.
    Symbol(SymbolArgs),
    /// Check files against the expectations in a manifest.
    Verify(VerifyArgs),
}

/// Arguments for the `info` subcommand.
#[derive(Parser)]
pub struct InfoArgs {
    /// Files to inspect.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

/// Arguments for the `symbol` subcommand.
#[derive(Parser)]
pub struct SymbolArgs {
    /// File to search.
    pub path: PathBuf,

    /// Symbol name.
    pub name: String,

    /// Search `.dynsym` instead of `.symtab`.
    #[arg(long, short = 'd')]
    pub dynamic: bool,
}

/// Arguments for the `verify` subcommand.
#[derive(Parser)]
pub struct VerifyArgs {
    /// Manifest listing libraries and their expected symbols.
    #[arg(long, short = 'm', default_value = "elfscan.toml")]
    pub manifest: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_and_verbose_conflict() {
        assert!(Cli::try_parse_from(["elfscan", "-q", "-v", "info", "a.out"]).is_err());
    }

    #[test]
    fn verify_defaults_manifest() {
        let cli = Cli::try_parse_from(["elfscan", "verify"]).unwrap();
        match cli.command {
            Command::Verify(args) => assert_eq!(args.manifest, PathBuf::from("elfscan.toml")),
            _ => panic!("expected verify"),
        }
    }

    #[test]
    fn symbol_parses_dynamic_flag() {
        let cli = Cli::try_parse_from(["elfscan", "symbol", "libc.so", "malloc", "--dynamic"])
            .unwrap();
        match cli.command {
            Command::Symbol(args) => {
                assert_eq!(args.name, "malloc");
                assert!(args.dynamic);
            }
            _ => panic!("expected symbol"),
        }
    }

    #[test]
    fn info_requires_a_path() {
        assert!(Cli::try_parse_from(["elfscan", "info"]).is_err());
    }
}
