use std::fs;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use log::{info, warn};
use serde::Serialize;
use subsys_core::config::{DiscoveryConfig, RecordSite};
use subsys_core::oracles::{
    resolve_addr2line_path, resolve_objdump_path, Addr2LineOracle, GetMaintainerOracle,
    ObjdumpStream,
};
use subsys_core::registry::SubsystemRegistry;
use subsys_core::services::{
    AddressResolver, DiscoveryOutcome, DiscoveryRunner, FunctionPointerScan, SubsystemClassifier,
    SubsystemOracleClient,
};
use subsys_core::table::ProbeTable;

use crate::{apply_blacklist_file, canonicalize_or_current, load_discovery_config, sha256_file};

#[derive(Args, Debug)]
pub struct DiscoverArgs {
    /// Kernel image with debug info (the `vmlinux` ELF).
    #[arg(long)]
    pub vmlinux: PathBuf,

    /// Root of the kernel source tree (must contain `scripts/get_maintainer.pl`).
    #[arg(long, default_value = ".")]
    pub linux_root: String,

    /// Directory the kernel was built in; stripped from addr2line paths.
    /// Defaults to the config value, then to the canonical linux root.
    #[arg(long)]
    pub build_dir: Option<String>,

    /// Read a saved `objdump -d` listing instead of running objdump.
    #[arg(long)]
    pub disassembly: Option<PathBuf>,

    /// Discovery config (YAML, or JSON by `.json` extension).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Extra function blacklist, one name per line.
    #[arg(long)]
    pub fn_blacklist: Option<PathBuf>,

    /// Skip the `.rodata` function-pointer pass.
    #[arg(long)]
    pub no_fp: bool,

    /// Record the call instruction address instead of the callee entry.
    #[arg(long)]
    pub record_caller_site: bool,

    /// Subsystem registry JSON used to assign stable ids.
    #[arg(long)]
    pub registry: Option<PathBuf>,

    /// Write newly discovered subsystems back to the registry.
    #[arg(long)]
    pub update_registry: bool,

    /// Output file for the probe table; stdout when omitted.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// addr2line executable (default: `ADDR2LINE_BIN` or `addr2line` on PATH).
    #[arg(long)]
    pub addr2line: Option<PathBuf>,

    /// get_maintainer script (default: `GET_MAINTAINER_BIN` or the one in the linux root).
    #[arg(long)]
    pub get_maintainer: Option<PathBuf>,

    /// objdump executable (default: `OBJDUMP_BIN` or `objdump` on PATH).
    #[arg(long)]
    pub objdump: Option<PathBuf>,
}

/// Probe table plus provenance, as written for the emitter.
#[derive(Serialize)]
pub struct ProbeTableArtifact {
    pub binary: String,
    pub binary_sha256: String,
    pub generated_at: String,
    pub generator_version: String,
    pub record_site: RecordSite,
    #[serde(flatten)]
    pub table: ProbeTable,
}

pub fn discover_command(args: &DiscoverArgs) -> Result<()> {
    let linux_root = canonicalize_or_current(&args.linux_root)?;
    let config = build_config(args, &linux_root)?;

    let function_pointers = if config.scan_function_pointers {
        FunctionPointerScan::scan_file_if_present(&args.vmlinux, config.address_prefix)
            .with_context(|| {
                format!("Failed to scan {} for function pointers", args.vmlinux.display())
            })?
    } else {
        None
    };

    let tool = args.addr2line.clone().unwrap_or_else(resolve_addr2line_path);
    let addr2line = Addr2LineOracle::spawn(&tool, &args.vmlinux)
        .with_context(|| format!("Failed to start addr2line ({})", tool.display()))?;
    let maintainers = GetMaintainerOracle::new(&linux_root, args.get_maintainer.clone());
    let classifier = SubsystemClassifier::new(
        AddressResolver::new(addr2line, config.build_dir.as_deref()),
        SubsystemOracleClient::new(maintainers, config.maintainer_sentinel.as_str()),
    );
    let mut runner = DiscoveryRunner::new(&config, classifier);

    let outcome = match &args.disassembly {
        Some(listing) => {
            let file = fs::File::open(listing).with_context(|| {
                format!("Failed to open disassembly listing {}", listing.display())
            })?;
            runner.run(BufReader::new(file), function_pointers.as_ref())
        }
        None => {
            let tool = args.objdump.clone().unwrap_or_else(resolve_objdump_path);
            let mut stream = ObjdumpStream::spawn(&tool, &args.vmlinux)
                .with_context(|| format!("Failed to start objdump ({})", tool.display()))?;
            let outcome = runner.run(&mut stream, function_pointers.as_ref());
            if outcome.is_ok() {
                stream.finish().context("objdump did not complete")?;
            }
            outcome
        }
    }
    .context("Discovery failed")?;
    log_outcome(&outcome);

    // Ids for new subsystems live in memory until the artifact is on disk.
    let mut registry = match &args.registry {
        Some(path) => SubsystemRegistry::load(path),
        None => SubsystemRegistry::new(),
    };
    let added = registry.merge(&outcome.boundaries.names());
    let table = ProbeTable::build(&outcome.boundaries, &registry)?;
    let artifact = ProbeTableArtifact {
        binary: args.vmlinux.display().to_string(),
        binary_sha256: sha256_file(&args.vmlinux)?,
        generated_at: chrono::Utc::now().to_rfc3339(),
        generator_version: subsys_core::version().to_string(),
        record_site: config.record_site,
        table,
    };
    write_artifact(&artifact, args.out.as_deref())?;
    persist_registry(args, &registry, added.len())
}

/// Config file, then blacklist file, then command-line overrides.
fn build_config(args: &DiscoverArgs, linux_root: &Path) -> Result<DiscoveryConfig> {
    let mut config = load_discovery_config(args.config.as_deref())?;
    if let Some(path) = &args.fn_blacklist {
        apply_blacklist_file(&mut config, path)?;
    }
    if let Some(dir) = &args.build_dir {
        config.build_dir = Some(dir.clone());
    }
    if config.build_dir.is_none() {
        config.build_dir = Some(linux_root.display().to_string());
    }
    if args.no_fp {
        config.scan_function_pointers = false;
    }
    if args.record_caller_site {
        config.record_site = RecordSite::Caller;
    }
    Ok(config)
}

fn persist_registry(
    args: &DiscoverArgs,
    registry: &SubsystemRegistry,
    added: usize,
) -> Result<()> {
    let Some(path) = &args.registry else {
        return Ok(());
    };
    if added == 0 {
        return Ok(());
    }
    if !args.update_registry {
        warn!(
            "{added} subsystems are missing from {}; their ids are provisional \
             (pass --update-registry to keep them)",
            path.display()
        );
        return Ok(());
    }
    registry
        .save(path)
        .with_context(|| format!("Failed to save registry {}", path.display()))?;
    info!("added {added} subsystems to {}", path.display());
    Ok(())
}

fn log_outcome(outcome: &DiscoveryOutcome) {
    let stats = &outcome.disassembly;
    info!(
        "scanned {} functions ({} blacklisted), {} calls, {} boundary entries",
        stats.functions, stats.blacklisted_functions, stats.calls, stats.boundaries_added
    );
    if let Some(targets) = outcome.function_pointer_targets {
        info!(
            "function pointer pass: {} targets, {} unclassified",
            targets, outcome.unclassified_targets
        );
    }
    info!(
        "{} subsystems, {} probes",
        outcome.boundaries.len(),
        outcome.boundaries.total_entries()
    );
}

fn write_artifact(artifact: &ProbeTableArtifact, out: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(artifact)?;
    match out {
        Some(path) => fs::write(path, format!("{json}\n"))
            .with_context(|| format!("Failed to write probe table {}", path.display())),
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{json}")?;
            Ok(())
        }
    }
}
