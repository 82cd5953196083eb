//! elfscan: inspect ELF linkage and verify exported symbols.
//!
//! `info` prints the header facts of each file, `symbol` looks up a single
//! name, and `verify` checks a set of files against a TOML manifest.

mod check;
mod cli;
mod manifest;
mod verbose;

use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Parser;
use elfscan_elf::ElfFile;
use verbose::{dprintln, vprintln};

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    verbose::init(cli.quiet, cli.verbose);

    match cli.command {
        cli::Command::Info(ref args) => cmd_info(args),
        cli::Command::Symbol(ref args) => cmd_symbol(args),
        cli::Command::Verify(ref args) => cmd_verify(args),
    }
}

fn open(path: &Path) -> Result<ElfFile> {
    elfscan_elf::open(path).with_context(|| format!("Failed to open {}", path.display()))
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

fn cmd_info(args: &cli::InfoArgs) -> Result<()> {
    for path in &args.paths {
        let mut elf = open(path)?;
        println!("{}:", path.display());
        println!("  type:    {}", elf.object_type());
        println!("  class:   {}", elf.class());
        println!("  machine: {}", elf.machine());
        println!("  entry:   {:#x}", elf.entry_point());
        println!("  dynamic: {}", yes_no(elf.is_dynamic()));
        println!("  pie:     {}", yes_no(elf.is_pie()));

        if verbose::is_verbose() {
            let symbols = elf
                .symbols()
                .with_context(|| format!("Failed to read .symtab of {}", path.display()))?
                .len();
            let dynamic = elf
                .dynamic_symbols()
                .with_context(|| format!("Failed to read .dynsym of {}", path.display()))?
                .len();
            vprintln!("  symbols: {symbols} static, {dynamic} dynamic");
        }
        elf.close();
    }
    Ok(())
}

fn cmd_symbol(args: &cli::SymbolArgs) -> Result<()> {
    let mut elf = open(&args.path)?;
    let table = if args.dynamic { ".dynsym" } else { ".symtab" };
    let found = if args.dynamic {
        elf.get_dynamic_symbol(&args.name)
    } else {
        elf.get_symbol(&args.name)
    }
    .with_context(|| format!("Failed to read {table} of {}", args.path.display()))?;

    match found {
        Some(symbol) => {
            println!("{symbol}");
            Ok(())
        }
        None => bail!(
            "symbol `{}` not found in {table} of {}",
            args.name,
            args.path.display()
        ),
    }
}

fn cmd_verify(args: &cli::VerifyArgs) -> Result<()> {
    let _t = verbose::Timer::start("verify");
    let manifest = manifest::Manifest::load(&args.manifest)?;
    let base = args.manifest.parent().unwrap_or_else(|| Path::new(""));

    for library in &manifest.libraries {
        vprintln!("  Checking {}", check::display_path(&library.path, base));
    }
    let failures = check::verify(&manifest);

    if failures.is_empty() {
        dprintln!("verified {} libraries", manifest.libraries.len());
        return Ok(());
    }
    for failure in &failures {
        eprintln!(
            "{}: {}",
            check::display_path(&failure.path, base),
            failure.problem
        );
    }
    bail!("{} expectation(s) not met", failures.len())
}
