//! Discovery services: oracle clients with caching, the two scanning passes, the
//! boundary accumulator, and the driver tying them together.

pub mod boundaries;
pub mod classifier;
pub mod discovery;
pub mod disassembly;
pub mod fn_pointers;
pub mod ownership;
pub mod resolver;

pub use boundaries::{BoundaryAccumulator, SubsystemBoundaries};
pub use classifier::{AddressClassifier, SubsystemClassifier};
pub use discovery::{DiscoveryError, DiscoveryOutcome, DiscoveryRunner};
pub use disassembly::{DisassemblyScanner, ListingLine, ScanState, ScanStats};
pub use fn_pointers::{FunctionPointerScan, FunctionPointerTarget, ScanError};
pub use ownership::{Ownership, SubsystemOracleClient};
pub use resolver::AddressResolver;
