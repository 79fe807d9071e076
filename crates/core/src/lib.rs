//! subsys-core
//!
//! Core library for discovering, offline, every address at which control flow in a
//! compiled kernel crosses from one maintained subsystem into another.
//!
//! The crate defines the data model, adapters for the external oracles
//! (`addr2line`, `get_maintainer.pl`, `objdump`), the two discovery passes
//! (call instructions from a disassembly listing, function pointers from
//! `.rodata`), the boundary accumulator, the persisted subsystem registry and the
//! probe table handed to the emitter.
//!
//! All substantive logic lives here so it is fully testable with fake oracles and
//! reusable from multiple frontends.

pub mod config;
pub mod model;
pub mod oracles;
pub mod registry;
pub mod services;
pub mod table;

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
