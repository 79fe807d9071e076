use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use subsys_core::config::DiscoveryConfig;

pub mod commands;

/// Absolute form of a user-supplied directory such as `--linux-root`.
///
/// Existing paths are canonicalized. A path that does not exist yet is joined
/// onto the working directory unchanged.
pub fn canonicalize_or_current(root: &str) -> Result<PathBuf> {
    let cwd = env::current_dir().context("Failed to get current directory")?;
    if root.is_empty() || root == "." {
        return Ok(cwd);
    }
    let path = Path::new(root);
    Ok(path.canonicalize().unwrap_or_else(|_| cwd.join(path)))
}

/// Lowercase hex SHA-256 of the analyzed binary, recorded in the probe table artifact.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = fs::File::open(path)
        .with_context(|| format!("Failed to open binary for hashing: {}", path.display()))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)
        .with_context(|| format!("Failed to hash {}", path.display()))?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Load a discovery config file, or the defaults when none is given.
pub fn load_discovery_config(path: Option<&Path>) -> Result<DiscoveryConfig> {
    match path {
        Some(p) => DiscoveryConfig::load(p)
            .with_context(|| format!("Failed to load discovery config {}", p.display())),
        None => Ok(DiscoveryConfig::default()),
    }
}

/// Merge a blacklist file (one function name per line) into `config`.
pub fn apply_blacklist_file(config: &mut DiscoveryConfig, path: &Path) -> Result<()> {
    let body = fs::read_to_string(path)
        .with_context(|| format!("Failed to read function blacklist {}", path.display()))?;
    config.extend_blacklist(&body);
    Ok(())
}

/// Parse a hex `u64`, with or without a `0x` prefix (used for CLI arguments).
pub fn parse_hex_u64(text: &str) -> Result<u64, String> {
    let digits = text.trim().trim_start_matches("0x").trim_start_matches("0X");
    u64::from_str_radix(digits, 16).map_err(|e| format!("invalid hex value {text:?}: {e}"))
}
