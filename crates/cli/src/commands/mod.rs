pub mod discover;
pub mod fn_pointers;
pub mod registry;

pub use discover::*;
pub use fn_pointers::*;
pub use registry::*;
