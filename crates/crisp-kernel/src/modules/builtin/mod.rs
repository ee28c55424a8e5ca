//! The baseline `std` module.
//!
//! Always registered by [`ModuleRegistry::with_builtins`](super::ModuleRegistry::with_builtins)
//! and resolved for every command without a `module:` prefix.

mod exec;
mod helpers;
mod load;
mod print;
mod set;

use super::Module;

pub(crate) use load::module_reference;

/// Build the `std` module.
pub fn module() -> Module {
    Module::new("std", "Variables, module loading and raw calls")
        .with_command(set::Set)
        .with_command(load::Load)
        .with_command(exec::Exec)
        .with_command(print::Print)
        .with_helper(helpers::Me)
        .with_helper(helpers::Date)
        .with_helper(helpers::Get)
}
