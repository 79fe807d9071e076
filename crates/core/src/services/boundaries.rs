use std::collections::{HashMap, HashSet};

use log::debug;

use crate::model::{Address, BoundaryEntry, CrossingKind, SubsystemKey, SubsystemName};

/// Deduplicated, first-seen-ordered boundary entries of one subsystem.
#[derive(Debug, Clone)]
pub struct SubsystemBoundaries {
    key: SubsystemKey,
    name: SubsystemName,
    entries: Vec<BoundaryEntry>,
    seen: HashSet<BoundaryEntry>,
}

impl SubsystemBoundaries {
    fn new(name: SubsystemName) -> Self {
        Self { key: name.key(), name, entries: Vec::new(), seen: HashSet::new() }
    }

    pub fn key(&self) -> &SubsystemKey {
        &self.key
    }

    /// Name as first reported by the ownership oracle.
    pub fn name(&self) -> &SubsystemName {
        &self.name
    }

    pub fn entries(&self) -> &[BoundaryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-subsystem collection of boundary entries, shared by both discovery passes.
///
/// Subsystems are grouped by canonical key and kept in first-seen order; within a
/// subsystem each `(address, name, kind)` triple appears at most once.
#[derive(Debug, Clone, Default)]
pub struct BoundaryAccumulator {
    subsystems: Vec<SubsystemBoundaries>,
    index: HashMap<SubsystemKey, usize>,
}

impl BoundaryAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure `subsystem` is present, even without entries.
    pub fn ensure(&mut self, subsystem: &SubsystemName) -> Option<&mut SubsystemBoundaries> {
        let key = subsystem.key();
        if key.is_empty() {
            debug!("ignoring subsystem {subsystem:?} with an empty canonical key");
            return None;
        }
        let idx = match self.index.get(&key) {
            Some(idx) => *idx,
            None => {
                self.subsystems.push(SubsystemBoundaries::new(subsystem.clone()));
                let idx = self.subsystems.len() - 1;
                self.index.insert(key, idx);
                idx
            }
        };
        self.subsystems.get_mut(idx)
    }

    /// Record a boundary entry. Returns `false` when the triple was already present.
    pub fn add(
        &mut self,
        subsystem: &SubsystemName,
        address: Address,
        name: Option<String>,
        kind: CrossingKind,
    ) -> bool {
        let Some(bucket) = self.ensure(subsystem) else {
            return false;
        };
        let entry = BoundaryEntry::new(address, name, kind);
        if bucket.seen.contains(&entry) {
            return false;
        }
        bucket.seen.insert(entry.clone());
        bucket.entries.push(entry);
        true
    }

    pub fn get(&self, key: &SubsystemKey) -> Option<&SubsystemBoundaries> {
        self.index.get(key).and_then(|idx| self.subsystems.get(*idx))
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubsystemBoundaries> {
        self.subsystems.iter()
    }

    /// Names of every subsystem seen, in first-seen order.
    pub fn names(&self) -> Vec<SubsystemName> {
        self.subsystems.iter().map(|s| s.name.clone()).collect()
    }

    /// Number of subsystems.
    pub fn len(&self) -> usize {
        self.subsystems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subsystems.is_empty()
    }

    pub fn total_entries(&self) -> usize {
        self.subsystems.iter().map(SubsystemBoundaries::len).sum()
    }
}
