//! Persisted subsystem registry.
//!
//! Maps each canonical subsystem key to a stable numeric id plus display and
//! code-identifier names. The registry is append-only: ids are handed out densely
//! in order of first appearance and never reassigned, so probe tables generated by
//! different runs agree on what id `N` means.
//!
//! On disk it is a JSON object keyed by canonical key, written in ascending key
//! order so diffs stay readable.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{SubsystemKey, SubsystemName};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Failed to serialize registry: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Failed to write registry {path}: {source}")]
    Write { path: PathBuf, source: std::io::Error },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub id: u32,
    /// Human-readable name; may be hand-edited.
    pub long_name: String,
    /// Identifier used in generated code; may be hand-edited.
    pub short_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubsystemRegistry {
    entries: BTreeMap<SubsystemKey, RegistryEntry>,
}

impl SubsystemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a registry from disk. A missing or malformed file yields an empty registry.
    pub fn load(path: &Path) -> Self {
        let body = match std::fs::read_to_string(path) {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no registry at {}, starting empty", path.display());
                return Self::new();
            }
            Err(e) => {
                warn!("failed to read registry {}: {e}; starting empty", path.display());
                return Self::new();
            }
        };
        match Self::parse(&body) {
            Ok(registry) => registry,
            Err(e) => {
                warn!("registry {} is not valid JSON ({e}); starting empty", path.display());
                Self::new()
            }
        }
    }

    pub fn parse(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    /// Append every name whose canonical key is not registered yet.
    ///
    /// Names are processed in sorted order so the ids handed out in one merge do not
    /// depend on discovery order. Returns the keys that were added.
    pub fn merge<'n, I>(&mut self, names: I) -> Vec<SubsystemKey>
    where
        I: IntoIterator<Item = &'n SubsystemName>,
    {
        let mut names: Vec<&SubsystemName> = names.into_iter().collect();
        names.sort();

        let mut added = Vec::new();
        for name in names {
            let key = name.key();
            if key.is_empty() || self.entries.contains_key(&key) {
                continue;
            }
            let entry = RegistryEntry {
                id: self.next_id(),
                long_name: name.long_name(),
                short_name: key.as_str().to_string(),
            };
            debug!("registering subsystem {key} as {}", entry.id);
            self.entries.insert(key.clone(), entry);
            added.push(key);
        }
        added
    }

    /// Write the registry, replacing `path` only once the new content is complete.
    pub fn save(&self, path: &Path) -> Result<(), RegistryError> {
        let json = self.to_json_pretty()?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let write_err = |source| RegistryError::Write { path: path.to_path_buf(), source };
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(json.as_bytes()).and_then(|_| tmp.flush()).map_err(write_err)?;
        tmp.persist(path).map_err(|e| write_err(e.error))?;
        Ok(())
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.entries)
    }

    pub fn get(&self, key: &SubsystemKey) -> Option<&RegistryEntry> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &SubsystemKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&SubsystemKey, &RegistryEntry)> {
        self.entries.iter()
    }

    /// Entries ordered by id.
    pub fn by_id(&self) -> Vec<(&SubsystemKey, &RegistryEntry)> {
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_by_key(|(_, e)| e.id);
        entries
    }

    fn next_id(&self) -> u32 {
        self.entries.values().map(|e| e.id + 1).max().unwrap_or(0)
    }
}
