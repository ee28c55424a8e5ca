//! Pure data types for crisp: runtime values, addresses, actions and
//! source locations.
//!
//! This crate is a leaf dependency with no async runtime, no parser and no
//! I/O. Hosts that only consume the actions an interpreter pass produces can
//! depend on it without pulling in the kernel.

pub mod action;
pub mod address;
pub mod location;
pub mod value;

pub use action::*;
pub use address::*;
pub use location::*;
pub use value::*;
