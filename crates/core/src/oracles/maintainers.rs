use std::path::{Path, PathBuf};
use std::process::Command;

use log::debug;

use crate::model::SourceFile;
use crate::oracles::{OracleError, OwnershipOracle};

const ORACLE: &str = "get_maintainer";

/// Runs `scripts/get_maintainer.pl` from the kernel source tree, once per file.
pub struct GetMaintainerOracle {
    script: PathBuf,
    linux_root: PathBuf,
}

impl GetMaintainerOracle {
    /// `script` defaults to `<linux_root>/scripts/get_maintainer.pl`, or `GET_MAINTAINER_BIN`
    /// when set.
    pub fn new(linux_root: impl Into<PathBuf>, script: Option<PathBuf>) -> Self {
        let linux_root = linux_root.into();
        let script = script
            .or_else(|| std::env::var_os("GET_MAINTAINER_BIN").map(PathBuf::from))
            .unwrap_or_else(|| linux_root.join("scripts").join("get_maintainer.pl"));
        Self { script, linux_root }
    }

    pub fn script(&self) -> &Path {
        &self.script
    }
}

impl OwnershipOracle for GetMaintainerOracle {
    fn maintainers(&mut self, file: &SourceFile) -> Result<String, OracleError> {
        debug!("{} -f {}", self.script.display(), file);
        let output = Command::new(&self.script)
            .args(["--subsystem", "--noemail", "--no-remove-duplicates", "--no-rolestats", "-f"])
            .arg(file.as_str())
            .current_dir(&self.linux_root)
            .output()
            .map_err(|source| OracleError::Spawn { oracle: ORACLE, source })?;
        if !output.status.success() {
            return Err(OracleError::Exited { oracle: ORACLE, status: output.status });
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn name(&self) -> &'static str {
        ORACLE
    }
}
