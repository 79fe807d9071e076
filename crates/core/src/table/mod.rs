//! Probe table handed to the external emitter.
//!
//! One block per subsystem, ordered by registry id, each listing the probe sites
//! in discovery order. The emitter renders every block as a zero-terminated address
//! array plus entry/exit handlers that report the subsystem id.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::CrossingKind;
use crate::registry::SubsystemRegistry;
use crate::services::BoundaryAccumulator;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("Subsystem {0} is not in the registry; merge it before building the probe table")]
    UnregisteredSubsystem(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeEntry {
    /// Canonical 16-digit hex address.
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub kind: CrossingKind,
    pub probe_code: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsystemProbes {
    pub id: u32,
    pub key: String,
    pub short_name: String,
    pub long_name: String,
    pub entries: Vec<ProbeEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeTable {
    pub num_probes: usize,
    pub subsystems: Vec<SubsystemProbes>,
}

impl ProbeTable {
    /// Pair every accumulated subsystem with its registry id.
    pub fn build(
        boundaries: &BoundaryAccumulator,
        registry: &SubsystemRegistry,
    ) -> Result<Self, TableError> {
        let mut subsystems = Vec::with_capacity(boundaries.len());
        for bucket in boundaries.iter() {
            let entry = registry
                .get(bucket.key())
                .ok_or_else(|| TableError::UnregisteredSubsystem(bucket.key().to_string()))?;
            subsystems.push(SubsystemProbes {
                id: entry.id,
                key: bucket.key().to_string(),
                short_name: entry.short_name.clone(),
                long_name: entry.long_name.clone(),
                entries: bucket
                    .entries()
                    .iter()
                    .map(|e| ProbeEntry {
                        address: e.address.to_hex(),
                        name: e.name.clone(),
                        kind: e.kind,
                        probe_code: e.kind.probe_code(),
                    })
                    .collect(),
            });
        }
        subsystems.sort_by_key(|s| s.id);
        let num_probes = subsystems.iter().map(|s| s.entries.len()).sum();
        Ok(Self { num_probes, subsystems })
    }

    pub fn is_empty(&self) -> bool {
        self.subsystems.is_empty()
    }
}
