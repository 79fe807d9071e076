use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use log::debug;

use crate::model::Address;
use crate::oracles::{LineOracle, OracleError};

const ORACLE: &str = "addr2line";

/// Resolve the addr2line executable from `ADDR2LINE_BIN`, falling back to `PATH`.
pub fn resolve_addr2line_path() -> PathBuf {
    std::env::var_os("ADDR2LINE_BIN").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(ORACLE))
}

/// A single `addr2line -e <binary>` process answering one address per line.
pub struct Addr2LineOracle {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl Addr2LineOracle {
    pub fn spawn(tool: &Path, binary: &Path) -> Result<Self, OracleError> {
        debug!("spawning {} -e {}", tool.display(), binary.display());
        let mut child = Command::new(tool)
            .arg("-e")
            .arg(binary)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|source| OracleError::Spawn { oracle: ORACLE, source })?;
        let stdin = child.stdin.take().ok_or(OracleError::Closed { oracle: ORACLE })?;
        let stdout = child.stdout.take().ok_or(OracleError::Closed { oracle: ORACLE })?;
        Ok(Self { child, stdin: Some(stdin), stdout: BufReader::new(stdout) })
    }
}

impl LineOracle for Addr2LineOracle {
    fn lookup(&mut self, address: Address) -> Result<String, OracleError> {
        let stdin = self.stdin.as_mut().ok_or(OracleError::Closed { oracle: ORACLE })?;
        writeln!(stdin, "{}", address.to_hex())
            .and_then(|_| stdin.flush())
            .map_err(|source| OracleError::Io { oracle: ORACLE, source })?;

        let mut line = String::new();
        let n = self
            .stdout
            .read_line(&mut line)
            .map_err(|source| OracleError::Io { oracle: ORACLE, source })?;
        if n == 0 {
            return Err(OracleError::Closed { oracle: ORACLE });
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn name(&self) -> &'static str {
        ORACLE
    }
}

impl Drop for Addr2LineOracle {
    fn drop(&mut self) {
        // Closing stdin lets addr2line exit on its own.
        drop(self.stdin.take());
        let _ = self.child.wait();
    }
}
