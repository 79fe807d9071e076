use std::collections::HashMap;

use log::{debug, warn};

use crate::model::{SourceFile, SubsystemName};
use crate::oracles::{OracleError, OwnershipOracle};

/// Answer of the ownership oracle for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ownership {
    Subsystem(SubsystemName),
    /// The listing did not contain the sentinel line; treated as "no subsystem".
    Undecodable,
}

impl Ownership {
    pub fn subsystem(&self) -> Option<&SubsystemName> {
        match self {
            Ownership::Subsystem(name) => Some(name),
            Ownership::Undecodable => None,
        }
    }
}

/// Maps source files to owning subsystems, querying the oracle once per distinct file.
pub struct SubsystemOracleClient<O> {
    oracle: O,
    sentinel: String,
    cache: HashMap<SourceFile, Ownership>,
    queries: usize,
}

impl<O: OwnershipOracle> SubsystemOracleClient<O> {
    pub fn new(oracle: O, sentinel: impl Into<String>) -> Self {
        Self { oracle, sentinel: sentinel.into(), cache: HashMap::new(), queries: 0 }
    }

    pub fn subsystem_of(&mut self, file: &SourceFile) -> Result<Ownership, OracleError> {
        if let Some(cached) = self.cache.get(file) {
            return Ok(cached.clone());
        }
        let listing = self.oracle.maintainers(file)?;
        self.queries += 1;
        let ownership = parse_ownership(&listing, &self.sentinel);
        match &ownership {
            Ownership::Subsystem(name) => debug!("{file} -> {name}"),
            Ownership::Undecodable => {
                warn!("could not decode {} output for {file}", self.oracle.name())
            }
        }
        self.cache.insert(file.clone(), ownership.clone());
        Ok(ownership)
    }

    pub fn oracle_queries(&self) -> usize {
        self.queries
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

/// The most specific subsystem is the line straight after the sentinel line.
pub fn parse_ownership(listing: &str, sentinel: &str) -> Ownership {
    let mut lines = listing.lines();
    while let Some(line) = lines.next() {
        if line.starts_with(sentinel) {
            return match lines.next().map(str::trim) {
                Some(name) if !name.is_empty() => Ownership::Subsystem(SubsystemName::new(name)),
                _ => Ownership::Undecodable,
            };
        }
    }
    Ownership::Undecodable
}
