//! Abstract syntax tree for crisp scripts.

mod render;
mod types;

pub use types::*;
