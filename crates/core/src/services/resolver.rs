use std::collections::HashMap;

use log::debug;

use crate::model::{Address, SourceFile};
use crate::oracles::{LineOracle, OracleError};

/// Maps addresses to build-relative source files through a [`LineOracle`], memoizing
/// every answer (including misses) for the lifetime of the resolver.
pub struct AddressResolver<L> {
    oracle: L,
    build_prefix: Option<String>,
    cache: HashMap<Address, Option<SourceFile>>,
    queries: usize,
}

impl<L: LineOracle> AddressResolver<L> {
    /// `build_dir` is the directory the binary was compiled in; it is stripped from
    /// the absolute paths the oracle reports.
    pub fn new(oracle: L, build_dir: Option<&str>) -> Self {
        let build_prefix = build_dir
            .map(|d| d.trim_end_matches('/'))
            .filter(|d| !d.is_empty())
            .map(|d| format!("{d}/"));
        Self { oracle, build_prefix, cache: HashMap::new(), queries: 0 }
    }

    /// Source file containing `address`, or `None` when the oracle cannot map it.
    pub fn resolve(&mut self, address: Address) -> Result<Option<SourceFile>, OracleError> {
        if let Some(cached) = self.cache.get(&address) {
            return Ok(cached.clone());
        }
        let response = self.oracle.lookup(address)?;
        self.queries += 1;
        let file = parse_response(&response, self.build_prefix.as_deref());
        if file.is_none() {
            debug!("{} cannot map {address}", self.oracle.name());
        }
        self.cache.insert(address, file.clone());
        Ok(file)
    }

    /// Number of times the oracle has actually been queried.
    pub fn oracle_queries(&self) -> usize {
        self.queries
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

/// Parse one oracle response line (`path:line` or `??:...`) into a relative path.
pub fn parse_response(line: &str, build_prefix: Option<&str>) -> Option<SourceFile> {
    let line = line.trim();
    if line.starts_with("??") {
        return None;
    }
    let path = line.split(':').next().unwrap_or_default();
    // Generated files are already reported relative to the build directory.
    let relative = match build_prefix.and_then(|p| path.find(p).map(|idx| idx + p.len())) {
        Some(start) => &path[start..],
        None => path,
    };
    if relative.is_empty() {
        None
    } else {
        Some(SourceFile::new(relative))
    }
}
