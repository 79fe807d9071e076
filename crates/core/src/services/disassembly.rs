//! Call-graph pass over a textual `objdump -d` listing.
//!
//! The listing is processed strictly in order. A function-entry line resets the
//! blacklist state before any call inside that function is looked at.

use std::collections::HashMap;
use std::io::BufRead;
use std::sync::OnceLock;

use log::{debug, info};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::{DiscoveryConfig, RecordSite};
use crate::model::{Address, CrossingKind, SubsystemKey, SubsystemName};
use crate::oracles::OracleError;
use crate::services::boundaries::BoundaryAccumulator;
use crate::services::classifier::AddressClassifier;
use crate::services::discovery::DiscoveryError;

fn fn_entry_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([0-9a-f]{16}) <(.+)>:$").expect("valid function entry regex"))
}

fn call_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([0-9a-f]{16}):?.*\bcallq?\s+([0-9a-f]{16}) <(.+)>$")
            .expect("valid call regex")
    })
}

/// Classification of one listing line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingLine<'a> {
    FunctionEntry { address: Address, name: &'a str },
    Call { caller: Address, callee: Address, callee_name: &'a str },
    Other,
}

/// Classify a single listing line. Function entries are checked before calls.
pub fn parse_line(line: &str) -> ListingLine<'_> {
    let line = line.trim_end_matches(['\r', '\n']);
    if let Some(caps) = fn_entry_re().captures(line) {
        if let (Some(address), Some(name)) = (caps.get(1), caps.get(2)) {
            if let Some(address) = Address::from_hex(address.as_str()) {
                return ListingLine::FunctionEntry { address, name: name.as_str() };
            }
        }
    }
    if let Some(caps) = call_re().captures(line) {
        if let (Some(caller), Some(callee), Some(name)) = (caps.get(1), caps.get(2), caps.get(3)) {
            if let (Some(caller), Some(callee)) =
                (Address::from_hex(caller.as_str()), Address::from_hex(callee.as_str()))
            {
                return ListingLine::Call { caller, callee, callee_name: name.as_str() };
            }
        }
    }
    ListingLine::Other
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    OutsideFunction,
    InsideFunction,
    SkippingBlacklisted,
}

/// Counters reported at the end of a pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    pub lines: usize,
    pub functions: usize,
    pub blacklisted_functions: usize,
    pub calls: usize,
    pub skipped_calls: usize,
    pub boundaries_added: usize,
}

#[derive(Debug, Clone)]
struct CurrentFunction {
    name: String,
    subsystem: Option<SubsystemKey>,
}

pub struct DisassemblyScanner<'c> {
    config: &'c DiscoveryConfig,
    state: ScanState,
    current: Option<CurrentFunction>,
    function_names: HashMap<Address, String>,
    stats: ScanStats,
}

impl<'c> DisassemblyScanner<'c> {
    pub fn new(config: &'c DiscoveryConfig) -> Self {
        Self {
            config,
            state: ScanState::OutsideFunction,
            current: None,
            function_names: HashMap::new(),
            stats: ScanStats::default(),
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    /// Entry address -> name of every non-blacklisted function seen so far.
    pub fn function_names(&self) -> &HashMap<Address, String> {
        &self.function_names
    }

    /// Consume a whole listing.
    pub fn scan<R, C>(
        &mut self,
        listing: R,
        classifier: &mut C,
        boundaries: &mut BoundaryAccumulator,
    ) -> Result<ScanStats, DiscoveryError>
    where
        R: BufRead,
        C: AddressClassifier + ?Sized,
    {
        info!("scanning disassembly for cross-subsystem calls");
        for line in listing.lines() {
            let line = line.map_err(DiscoveryError::Listing)?;
            self.feed_line(&line, classifier, boundaries)?;
        }
        info!(
            "disassembly pass done: {} lines, {} functions, {} calls, {} boundary entries",
            self.stats.lines, self.stats.functions, self.stats.calls, self.stats.boundaries_added
        );
        Ok(self.stats)
    }

    /// Advance the state machine by one listing line.
    pub fn feed_line<C>(
        &mut self,
        line: &str,
        classifier: &mut C,
        boundaries: &mut BoundaryAccumulator,
    ) -> Result<(), OracleError>
    where
        C: AddressClassifier + ?Sized,
    {
        self.stats.lines += 1;
        match parse_line(line) {
            ListingLine::FunctionEntry { address, name } => {
                self.enter_function(address, name, classifier, boundaries)
            }
            ListingLine::Call { caller, callee, callee_name } => {
                self.on_call(caller, callee, callee_name, classifier, boundaries)
            }
            ListingLine::Other => Ok(()),
        }
    }

    fn enter_function<C>(
        &mut self,
        address: Address,
        name: &str,
        classifier: &mut C,
        boundaries: &mut BoundaryAccumulator,
    ) -> Result<(), OracleError>
    where
        C: AddressClassifier + ?Sized,
    {
        self.stats.functions += 1;
        if self.config.is_blacklisted(name) {
            debug!("skipping blacklisted function {name}");
            self.stats.blacklisted_functions += 1;
            self.state = ScanState::SkippingBlacklisted;
            self.current = None;
            return Ok(());
        }

        self.function_names.insert(address, name.to_string());
        let subsystem = classifier.classify(address)?;
        if self.config.is_syscall(name) {
            if let Some(subsystem) = &subsystem {
                self.record(
                    boundaries,
                    subsystem,
                    address,
                    name,
                    CrossingKind::UserSyscallEntry,
                );
            }
        }
        self.current = Some(CurrentFunction {
            name: name.to_string(),
            subsystem: subsystem.as_ref().map(SubsystemName::key),
        });
        self.state = ScanState::InsideFunction;
        Ok(())
    }

    fn on_call<C>(
        &mut self,
        caller: Address,
        callee: Address,
        callee_name: &str,
        classifier: &mut C,
        boundaries: &mut BoundaryAccumulator,
    ) -> Result<(), OracleError>
    where
        C: AddressClassifier + ?Sized,
    {
        self.stats.calls += 1;
        let current = match (&self.state, &self.current) {
            (ScanState::InsideFunction, Some(current)) => current.clone(),
            _ => {
                self.stats.skipped_calls += 1;
                return Ok(());
            }
        };
        if self.config.is_trampoline(callee_name) {
            self.stats.skipped_calls += 1;
            return Ok(());
        }

        if let Some(pinned) = self.config.pinned_subsystem(&current.name, callee_name) {
            let pinned = SubsystemName::new(pinned);
            self.record(boundaries, &pinned, caller, callee_name, CrossingKind::DirectCall);
        }

        if self.config.is_blacklisted(callee_name) {
            self.stats.skipped_calls += 1;
            return Ok(());
        }

        let Some(callee_subsystem) = classifier.classify(callee)? else {
            return Ok(());
        };
        if current.subsystem.as_ref() == Some(&callee_subsystem.key()) {
            return Ok(());
        }

        let kind = if self.config.is_syscall(callee_name) {
            CrossingKind::KernelSyscallEntry
        } else {
            CrossingKind::DirectCall
        };
        let site = match self.config.record_site {
            RecordSite::Callee => callee,
            RecordSite::Caller => caller,
        };
        self.record(boundaries, &callee_subsystem, site, callee_name, kind);
        Ok(())
    }

    fn record(
        &mut self,
        boundaries: &mut BoundaryAccumulator,
        subsystem: &SubsystemName,
        address: Address,
        name: &str,
        kind: CrossingKind,
    ) {
        if boundaries.add(subsystem, address, Some(name.to_string()), kind) {
            self.stats.boundaries_added += 1;
            debug!("{address} {name} -> {subsystem} ({})", kind.as_str());
        }
    }
}
