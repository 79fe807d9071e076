//! Core data model for boundary discovery.
//!
//! - `Address`: a virtual address inside the analyzed binary.
//! - `SourceFile`: a build-relative path returned by the address oracle.
//! - `SubsystemName` / `SubsystemKey`: display name and lookup identity.
//! - `CrossingKind` / `BoundaryEntry`: what gets probed, and why.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Virtual address inside the analyzed (64-bit) binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub u64);

impl Address {
    /// Number of hex digits in the canonical textual form.
    pub const HEX_WIDTH: usize = 16;

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }

    /// Lowercase, zero-padded hex without a `0x` prefix (e.g. `ffffffff81000000`).
    pub fn to_hex(self) -> String {
        format!("{:016x}", self.0)
    }

    /// Parse a hex string, with or without a `0x` prefix.
    pub fn from_hex(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if digits.is_empty() {
            return None;
        }
        u64::from_str_radix(digits, 16).ok().map(Self)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl FromStr for Address {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s).ok_or_else(|| format!("invalid hex address: {s}"))
    }
}

/// Build-relative source file path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceFile(pub String);

impl SourceFile {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Free-text subsystem label as returned by the ownership oracle.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubsystemName(pub String);

impl SubsystemName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn key(&self) -> SubsystemKey {
        SubsystemKey::from_name(&self.0)
    }

    /// Display form stored in the registry: first character upper-cased, the rest lower.
    pub fn long_name(&self) -> String {
        let mut chars = self.0.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
            None => String::new(),
        }
    }
}

impl fmt::Display for SubsystemName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical subsystem identity: ASCII letters only, upper-cased.
///
/// `"Block layer"` and `"BLOCK-LAYER"` both map to `BLOCKLAYER`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubsystemKey(String);

impl SubsystemKey {
    pub fn from_name(name: &str) -> Self {
        Self(
            name.chars()
                .filter(char::is_ascii_alphabetic)
                .map(|c| c.to_ascii_uppercase())
                .collect(),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SubsystemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why an address sits on a subsystem boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossingKind {
    Invalid,
    DirectCall,
    UserSyscallEntry,
    KernelSyscallEntry,
    FunctionPointerTarget,
}

impl CrossingKind {
    /// Numeric code understood by the in-kernel probe registration.
    ///
    /// Function-pointer targets are function entries, not call sites; the consumer
    /// inspects the instruction at the address and expects the generic code.
    pub fn probe_code(self) -> u8 {
        match self {
            CrossingKind::Invalid | CrossingKind::FunctionPointerTarget => 0,
            CrossingKind::DirectCall => 1,
            CrossingKind::UserSyscallEntry => 2,
            CrossingKind::KernelSyscallEntry => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CrossingKind::Invalid => "invalid",
            CrossingKind::DirectCall => "direct_call",
            CrossingKind::UserSyscallEntry => "user_syscall_entry",
            CrossingKind::KernelSyscallEntry => "kernel_syscall_entry",
            CrossingKind::FunctionPointerTarget => "function_pointer_target",
        }
    }
}

/// One probe site inside a subsystem's entry list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundaryEntry {
    pub address: Address,
    pub name: Option<String>,
    pub kind: CrossingKind,
}

impl BoundaryEntry {
    pub fn new(address: Address, name: Option<String>, kind: CrossingKind) -> Self {
        Self { address, name, kind }
    }
}
