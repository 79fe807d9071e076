//! External oracles queried during discovery.
//!
//! The engine never maps addresses to files or files to subsystems itself; it asks
//! tools that already know:
//! - `addr2line` (address -> `path:line`), one long-lived process per run.
//! - `get_maintainer.pl` (file -> ownership listing), one process per distinct file.
//! - `objdump -d` (binary -> textual disassembly), streamed once per run.
//!
//! The traits below are the seams; tests substitute in-memory implementations.

use std::process::ExitStatus;

use thiserror::Error;

use crate::model::{Address, SourceFile};

pub mod addr2line;
pub mod maintainers;
pub mod objdump;

pub use addr2line::{resolve_addr2line_path, Addr2LineOracle};
pub use maintainers::GetMaintainerOracle;
pub use objdump::{resolve_objdump_path, ObjdumpStream};

/// Failure of an oracle process. Always fatal for the run.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("failed to spawn {oracle}: {source}")]
    Spawn { oracle: &'static str, source: std::io::Error },
    #[error("I/O error talking to {oracle}: {source}")]
    Io { oracle: &'static str, source: std::io::Error },
    #[error("{oracle} exited with {status}")]
    Exited { oracle: &'static str, status: ExitStatus },
    #[error("{oracle} closed its output unexpectedly")]
    Closed { oracle: &'static str },
}

impl OracleError {
    /// Name of the oracle that failed.
    pub fn oracle(&self) -> &'static str {
        match self {
            OracleError::Spawn { oracle, .. }
            | OracleError::Io { oracle, .. }
            | OracleError::Exited { oracle, .. }
            | OracleError::Closed { oracle } => oracle,
        }
    }
}

/// Address-to-source oracle. Returns the raw response line (`path:line` or `??:...`).
pub trait LineOracle {
    fn lookup(&mut self, address: Address) -> Result<String, OracleError>;
    fn name(&self) -> &'static str;
}

/// File-to-owner oracle. Returns the raw, newline-separated listing.
pub trait OwnershipOracle {
    fn maintainers(&mut self, file: &SourceFile) -> Result<String, OracleError>;
    fn name(&self) -> &'static str;
}

impl<T: LineOracle + ?Sized> LineOracle for Box<T> {
    fn lookup(&mut self, address: Address) -> Result<String, OracleError> {
        (**self).lookup(address)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

impl<T: OwnershipOracle + ?Sized> OwnershipOracle for Box<T> {
    fn maintainers(&mut self, file: &SourceFile) -> Result<String, OracleError> {
        (**self).maintainers(file)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
