use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use crate::oracles::OracleError;

const ORACLE: &str = "objdump";

/// Resolve the objdump executable from `OBJDUMP_BIN`, falling back to `PATH`.
pub fn resolve_objdump_path() -> PathBuf {
    std::env::var_os("OBJDUMP_BIN").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(ORACLE))
}

/// Streaming `objdump -d <binary>` output. Call [`ObjdumpStream::finish`] once the
/// listing has been consumed to surface a failed exit.
pub struct ObjdumpStream {
    child: Child,
    stdout: BufReader<ChildStdout>,
}

impl ObjdumpStream {
    pub fn spawn(tool: &Path, binary: &Path) -> Result<Self, OracleError> {
        let mut child = Command::new(tool)
            .arg("-d")
            .arg(binary)
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|source| OracleError::Spawn { oracle: ORACLE, source })?;
        let stdout = child.stdout.take().ok_or(OracleError::Closed { oracle: ORACLE })?;
        Ok(Self { child, stdout: BufReader::new(stdout) })
    }

    pub fn finish(mut self) -> Result<(), OracleError> {
        let status =
            self.child.wait().map_err(|source| OracleError::Io { oracle: ORACLE, source })?;
        if status.success() {
            Ok(())
        } else {
            Err(OracleError::Exited { oracle: ORACLE, status })
        }
    }
}

impl Read for ObjdumpStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stdout.read(buf)
    }
}

impl BufRead for ObjdumpStream {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.stdout.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.stdout.consume(amt)
    }
}

impl Drop for ObjdumpStream {
    fn drop(&mut self) {
        // No-op after `finish`; otherwise objdump may still be writing.
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
