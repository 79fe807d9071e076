use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use subsys_discovery::commands::{
    discover_command, fn_pointers_command, registry_info_command, update_registry_command,
    DiscoverArgs,
};
use subsys_discovery::parse_hex_u64;

/// Kernel subsystem boundary discovery.
///
/// This CLI is a thin wrapper around `subsys-core` (exposed in code as `subsys_core`).
/// It walks a kernel image's disassembly, attributes every function to a
/// maintained subsystem, and writes the probe table for the instrumentation emitter.
#[derive(Parser, Debug)]
#[command(
    name = "subsys-discovery",
    version,
    about = "Discover kernel subsystem boundaries for probe generation",
    long_about = None
)]
struct Cli {
    /// Log at debug level (RUST_LOG still takes precedence).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan a kernel image and emit its subsystem probe table.
    ///
    /// This will:
    /// - Walk the `objdump -d` listing and record cross-subsystem calls.
    /// - Scan `.rodata` for function pointers (unless `--no-fp`).
    /// - Assign registry ids and write the table as JSON.
    Discover(DiscoverArgs),

    /// Show the subsystem registry ordered by id.
    RegistryInfo {
        /// Registry JSON file.
        #[arg(long)]
        registry: PathBuf,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Add subsystem names to the registry, assigning fresh ids.
    UpdateRegistry {
        /// Registry JSON file (created if missing).
        #[arg(long)]
        registry: PathBuf,

        /// Subsystem name as printed by get_maintainer.pl; may be repeated.
        #[arg(long = "name", required = true)]
        names: Vec<String>,
    },

    /// List function pointer targets found in `.rodata`.
    FnPointers {
        /// Kernel image to scan.
        #[arg(long)]
        vmlinux: PathBuf,

        /// High bits OR-ed onto every 32-bit word, in hex.
        #[arg(long, value_parser = parse_hex_u64, default_value = "ffffffff00000000")]
        address_prefix: u64,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Discover(args) => discover_command(&args)?,
        Command::RegistryInfo { registry, json } => registry_info_command(&registry, json)?,
        Command::UpdateRegistry { registry, names } => {
            update_registry_command(&registry, &names)?
        }
        Command::FnPointers { vmlinux, address_prefix, json } => {
            fn_pointers_command(&vmlinux, address_prefix, json)?
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}
