use std::io::BufRead;

use log::{info, warn};
use thiserror::Error;

use crate::config::DiscoveryConfig;
use crate::model::{CrossingKind, SubsystemName};
use crate::oracles::OracleError;
use crate::services::boundaries::BoundaryAccumulator;
use crate::services::classifier::AddressClassifier;
use crate::services::disassembly::{DisassemblyScanner, ScanStats};
use crate::services::fn_pointers::{FunctionPointerScan, ScanError};

/// Run-level failure. Per-address and per-file misses never surface here.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Oracle failure: {0}")]
    Oracle(#[from] OracleError),
    #[error("Function-pointer scan failed: {0}")]
    Scan(#[from] ScanError),
    #[error("Failed to read disassembly listing: {0}")]
    Listing(std::io::Error),
}

/// Everything a discovery run produced.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryOutcome {
    pub boundaries: BoundaryAccumulator,
    pub disassembly: ScanStats,
    /// Targets found in `.rodata`, when that pass ran.
    pub function_pointer_targets: Option<usize>,
    /// Targets dropped because no subsystem could be determined for them.
    pub unclassified_targets: usize,
}

/// Drives the disassembly pass and the optional function-pointer pass into one
/// accumulator, in that order, on a single thread.
pub struct DiscoveryRunner<'a, C> {
    config: &'a DiscoveryConfig,
    classifier: C,
}

impl<'a, C: AddressClassifier> DiscoveryRunner<'a, C> {
    pub fn new(config: &'a DiscoveryConfig, classifier: C) -> Self {
        Self { config, classifier }
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    pub fn into_classifier(self) -> C {
        self.classifier
    }

    /// Run discovery over `listing` and, if given, the result of a `.rodata` scan.
    ///
    /// `function_pointers` is ignored when the config disables that pass.
    pub fn run<R: BufRead>(
        &mut self,
        listing: R,
        function_pointers: Option<&FunctionPointerScan>,
    ) -> Result<DiscoveryOutcome, DiscoveryError> {
        let mut outcome = DiscoveryOutcome::default();
        for seed in &self.config.seed_subsystems {
            outcome.boundaries.ensure(&SubsystemName::new(seed.as_str()));
        }

        let mut scanner = DisassemblyScanner::new(self.config);
        outcome.disassembly =
            scanner.scan(listing, &mut self.classifier, &mut outcome.boundaries)?;

        if let Some(scan) = function_pointers.filter(|_| self.config.scan_function_pointers) {
            outcome.function_pointer_targets = Some(scan.targets.len());
            for target in &scan.targets {
                let Some(subsystem) = self.classifier.classify(target.address)? else {
                    warn!("no subsystem for function pointer target {}", target.address);
                    outcome.unclassified_targets += 1;
                    continue;
                };
                let name = target
                    .name
                    .clone()
                    .or_else(|| scanner.function_names().get(&target.address).cloned());
                outcome.boundaries.add(
                    &subsystem,
                    target.address,
                    name,
                    CrossingKind::FunctionPointerTarget,
                );
            }
        }

        info!(
            "discovery done: {} subsystems, {} boundary entries",
            outcome.boundaries.len(),
            outcome.boundaries.total_entries()
        );
        Ok(outcome)
    }
}
