// Library surface of the colmatch CLI: the capability table and the exit code
// registry, shared by the binary and its tests.

pub mod bindings;
pub mod exit_codes;

pub use bindings::{BindingError, Bindings};
