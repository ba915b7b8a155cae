//! `rg`, the ropgadget command-line front-end.
//!
//! Wires `clap` argument parsing to the [`ropgadget::program::Program`]
//! orchestrator. All gadget-discovery logic lives in the library; this
//! binary is just plumbing (spec §6: "CLI surface (informative, not
//! core)").

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use ropgadget::disassemble::{CpuMode, Syntax};
use ropgadget::errors::{GadgetError, Result};
use ropgadget::format::object::ObjectFormat;
use ropgadget::format::raw::RawFormat;
use ropgadget::format::ExecutableFormat;
use ropgadget::gadget::Gadget;
use ropgadget::program::Program;
use tracing::{error, info};

/// A return-oriented-programming gadget finder for ELF, PE, Mach-O and raw
/// executables.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The executable to scan.
    #[arg(long = "file")]
    file: PathBuf,

    /// Find ROP gadgets up to this many bytes of preamble before a
    /// terminator.
    #[arg(long = "rop", value_name = "DEPTH")]
    rop: Option<u64>,

    /// Treat `--file` as a headerless buffer for the given CPU
    /// (`x86`|`x64`), loaded at `--base`.
    #[arg(long = "raw", value_name = "CPU")]
    raw: Option<CpuMode>,

    /// Base virtual address used with `--raw`.
    #[arg(long = "base", value_name = "ADDR", default_value_t = 0)]
    base: u64,

    /// Use AT&T syntax instead of the default Intel syntax.
    #[arg(long = "att")]
    att: bool,

    /// Search every executable section for this literal byte pattern,
    /// given as a hex string (e.g. `90c3`).
    #[arg(long = "search-hexa", value_name = "HEX")]
    search_hexa: Option<String>,

    /// Only filter gadgets compatible with fine-grained KASLR, dropping
    /// occurrences inside `.text.*` named sub-regions.
    #[arg(long = "fgkaslr")]
    fgkaslr: bool,

    /// Emit each unique gadget once, without listing every occurrence
    /// address.
    #[arg(long = "unique")]
    unique: bool,

    /// Emit machine-readable JSON instead of plain text.
    #[arg(long = "format", value_name = "text|json", default_value = "text")]
    format: String,

    /// Increase verbosity; repeat for more detail.
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    human_panic::setup_panic!();
    let args = Args::parse();
    setup_logger(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "rg failed");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let syntax = if args.att { Syntax::Att } else { Syntax::Intel };

    let program = match args.raw {
        Some(cpu) => {
            let format = RawFormat::new(cpu, args.base);
            Program::open_with_format(&args.file, &format, syntax)?
        }
        None => {
            let format = ObjectFormat::new();
            Program::open_with_format(&args.file, &format, syntax)?
        }
    };

    info!(file = %args.file.display(), "opened executable");
    println!("{}", program.display_information(args.verbose));

    if let Some(hex) = &args.search_hexa {
        let pattern = decode_hex(hex)?;
        let hits = program.search_and_display(&pattern)?;
        for (section, va) in hits {
            println!("{section}: {va:#018x}");
        }
        return Ok(());
    }

    let Some(depth) = args.rop else {
        return Ok(());
    };

    let gadgets = if args.fgkaslr {
        program.find_fgkaslr_compatible_gadgets(depth)
    } else {
        program.find_gadgets(depth)
    };

    display_gadgets(&gadgets, args)
}

fn display_gadgets(gadgets: &[Gadget], args: &Args) -> Result<()> {
    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(gadgets)?);
        return Ok(());
    }

    for gadget in gadgets {
        if args.unique {
            println!("{gadget}");
            continue;
        }
        for (section_va, offset) in gadget.occurrences() {
            println!("{:#018x}: {gadget}", section_va + offset);
        }
    }
    println!("\n==> found {} unique gadget(s)", gadgets.len());
    Ok(())
}

fn decode_hex(hex: &str) -> Result<Vec<u8>> {
    let hex = hex.strip_prefix("0x").unwrap_or(hex);
    if hex.len() % 2 != 0 {
        return Err(GadgetError::InvalidRange(hex.to_string()));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).map_err(GadgetError::from))
        .collect()
}

fn setup_logger(verbosity: u8) {
    let level = match verbosity {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("could not setup logger");
}
