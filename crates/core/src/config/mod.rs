//! Discovery configuration.
//!
//! A `DiscoveryConfig` can be built in code, or loaded from a YAML (`.yaml`/`.yml`)
//! or JSON file. Every field has a default, so a config file only needs to name
//! what it changes.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Marker found in the names of syscall entry points (also as `compat_SyS_*`).
pub const DEFAULT_SYSCALL_MARKER: &str = "SyS_";

/// Compiler-inserted entry hook called from every traced function.
pub const DEFAULT_TRAMPOLINES: &[&str] = &["__fentry__"];

/// High half of a kernel text address; rodata holds only the low 32 bits.
pub const DEFAULT_ADDRESS_PREFIX: u64 = 0xffff_ffff_0000_0000;

/// `get_maintainer.pl` lists the most specific subsystem right after this line.
pub const DEFAULT_MAINTAINER_SENTINEL: &str = "linux-kernel@vger.kernel.org";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("Failed to parse YAML config {path}: {source}")]
    Yaml { path: PathBuf, source: serde_yaml::Error },
    #[error("Failed to parse JSON config {path}: {source}")]
    Json { path: PathBuf, source: serde_json::Error },
}

/// Which address of a cross-subsystem call is recorded as the probe site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSite {
    /// Entry address of the called function; repeated calls collapse to one probe.
    #[default]
    Callee,
    /// Address of the call instruction itself, one probe per call site.
    Caller,
}

/// Call site forced into a named subsystem regardless of file ownership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinnedCall {
    /// Name of the function containing the call.
    pub caller: String,
    /// Name of the called function.
    pub callee: String,
    /// Subsystem the call site is recorded under.
    pub subsystem: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Directory the binary was built in; stripped from resolved source paths.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_dir: Option<String>,
    /// Functions whose calls are never considered, as caller or callee.
    pub blacklist: BTreeSet<String>,
    pub syscall_marker: String,
    /// Callees that are always ignored (e.g. `__fentry__`).
    pub trampolines: Vec<String>,
    pub record_site: RecordSite,
    pub scan_function_pointers: bool,
    pub address_prefix: u64,
    pub maintainer_sentinel: String,
    /// Subsystems that always appear in the output, even with no entries.
    pub seed_subsystems: Vec<String>,
    pub pinned_calls: Vec<PinnedCall>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            build_dir: None,
            blacklist: BTreeSet::new(),
            syscall_marker: DEFAULT_SYSCALL_MARKER.to_string(),
            trampolines: DEFAULT_TRAMPOLINES.iter().map(|s| s.to_string()).collect(),
            record_site: RecordSite::default(),
            scan_function_pointers: true,
            address_prefix: DEFAULT_ADDRESS_PREFIX,
            maintainer_sentinel: DEFAULT_MAINTAINER_SENTINEL.to_string(),
            seed_subsystems: Vec::new(),
            pinned_calls: Vec::new(),
        }
    }
}

impl DiscoveryConfig {
    /// Load a config file, picking the format from its extension (JSON for `.json`,
    /// YAML otherwise).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let body = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        if ext.eq_ignore_ascii_case("json") {
            serde_json::from_str(&body)
                .map_err(|source| ConfigError::Json { path: path.to_path_buf(), source })
        } else {
            serde_yaml::from_str(&body)
                .map_err(|source| ConfigError::Yaml { path: path.to_path_buf(), source })
        }
    }

    /// Merge a newline-separated list of function names into the blacklist.
    pub fn extend_blacklist(&mut self, body: &str) {
        self.blacklist
            .extend(body.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string));
    }

    pub fn is_blacklisted(&self, fn_name: &str) -> bool {
        self.blacklist.contains(fn_name.trim())
    }

    pub fn is_trampoline(&self, fn_name: &str) -> bool {
        self.trampolines.iter().any(|t| t == fn_name)
    }

    pub fn is_syscall(&self, fn_name: &str) -> bool {
        !self.syscall_marker.is_empty() && fn_name.contains(&self.syscall_marker)
    }

    /// Subsystem a call from `caller` to `callee` is pinned to, if any.
    pub fn pinned_subsystem(&self, caller: &str, callee: &str) -> Option<&str> {
        self.pinned_calls
            .iter()
            .find(|p| p.caller == caller && p.callee == callee)
            .map(|p| p.subsystem.as_str())
    }
}
