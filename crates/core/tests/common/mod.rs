#![allow(dead_code)]

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use subsys_core::config::DEFAULT_MAINTAINER_SENTINEL;
use subsys_core::model::{Address, SourceFile};
use subsys_core::oracles::{LineOracle, OracleError, OwnershipOracle};
use subsys_core::services::{AddressResolver, SubsystemClassifier, SubsystemOracleClient};

pub const BUILD_DIR: &str = "/build/linux-stable";

/// In-memory addr2line: unknown addresses answer `??:0`.
pub struct FakeAddr2Line {
    pub answers: HashMap<Address, String>,
    pub calls: Rc<Cell<usize>>,
}

impl LineOracle for FakeAddr2Line {
    fn lookup(&mut self, address: Address) -> Result<String, OracleError> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.answers.get(&address).cloned().unwrap_or_else(|| "??:0".to_string()))
    }

    fn name(&self) -> &'static str {
        "addr2line"
    }
}

/// In-memory get_maintainer: unknown files produce output without the sentinel.
pub struct FakeMaintainers {
    pub listings: HashMap<String, String>,
    pub calls: Rc<Cell<usize>>,
}

impl OwnershipOracle for FakeMaintainers {
    fn maintainers(&mut self, file: &SourceFile) -> Result<String, OracleError> {
        self.calls.set(self.calls.get() + 1);
        Ok(self
            .listings
            .get(file.as_str())
            .cloned()
            .unwrap_or_else(|| "Some Maintainer (maintainer:SOMETHING)\n".to_string()))
    }

    fn name(&self) -> &'static str {
        "get_maintainer"
    }
}

/// An addr2line that has died.
pub struct DeadAddr2Line;

impl LineOracle for DeadAddr2Line {
    fn lookup(&mut self, _address: Address) -> Result<String, OracleError> {
        Err(OracleError::Closed { oracle: "addr2line" })
    }

    fn name(&self) -> &'static str {
        "addr2line"
    }
}

/// get_maintainer output naming `subsystem` as the most specific owner.
pub fn maintainer_listing(subsystem: &str) -> String {
    format!(
        "Jane Hacker (maintainer:{subsystem})\n\
         {DEFAULT_MAINTAINER_SENTINEL}\n{subsystem}\nTHE REST\n"
    )
}

/// Builder for a fake kernel: which address lives in which file, owned by whom.
#[derive(Default)]
pub struct FakeKernel {
    addresses: HashMap<Address, String>,
    owners: HashMap<String, String>,
    pub addr2line_calls: Rc<Cell<usize>>,
    pub maintainer_calls: Rc<Cell<usize>>,
}

impl FakeKernel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place `address` in `file` (build-relative) owned by `subsystem`.
    pub fn place(mut self, address: u64, file: &str, subsystem: &str) -> Self {
        self.addresses.insert(Address(address), file.to_string());
        self.owners.insert(file.to_string(), subsystem.to_string());
        self
    }

    /// Place `address` in a file whose ownership cannot be decoded.
    pub fn place_unowned(mut self, address: u64, file: &str) -> Self {
        self.addresses.insert(Address(address), file.to_string());
        self
    }

    pub fn addr2line(&self) -> FakeAddr2Line {
        FakeAddr2Line {
            answers: self
                .addresses
                .iter()
                .map(|(addr, file)| (*addr, format!("{BUILD_DIR}/{file}:42")))
                .collect(),
            calls: self.addr2line_calls.clone(),
        }
    }

    pub fn maintainers(&self) -> FakeMaintainers {
        FakeMaintainers {
            listings: self
                .owners
                .iter()
                .map(|(file, subsystem)| (file.clone(), maintainer_listing(subsystem)))
                .collect(),
            calls: self.maintainer_calls.clone(),
        }
    }

    pub fn classifier(&self) -> SubsystemClassifier<FakeAddr2Line, FakeMaintainers> {
        SubsystemClassifier::new(
            AddressResolver::new(self.addr2line(), Some(BUILD_DIR)),
            SubsystemOracleClient::new(self.maintainers(), DEFAULT_MAINTAINER_SENTINEL),
        )
    }
}

pub fn fn_entry(address: u64, name: &str) -> String {
    format!("{address:016x} <{name}>:")
}

pub fn call(caller: u64, callee: u64, callee_name: &str) -> String {
    format!("{caller:016x}:\te8 00 00 00 00       \tcallq  {callee:016x} <{callee_name}>")
}
