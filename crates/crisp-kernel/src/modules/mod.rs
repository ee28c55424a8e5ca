//! Module system for crisp.
//!
//! Every command and helper belongs to a module. Hosts assemble a
//! [`ModuleRegistry`] at startup and hand it to the engine; scripts bring
//! modules into scope with `load`, optionally under an alias.
//!
//! # Architecture
//!
//! ```text
//! ModuleRegistry
//! ├── std (baseline: set, load, exec, print, @me, @date, @get)
//! └── domain modules registered by the host
//! ```
//!
//! Command names resolve relative to a current module that changes across
//! nested blocks; see [`ModuleRegistry::resolve_command`].

mod context;
mod registry;
pub mod builtin;
mod traits;

pub use context::{BlockOptions, CompletionContext, EagerContext, ExecContext, HelperContext};
pub use registry::{Module, ModuleContext, ModuleRegistry};
pub use traits::{
    ArgSpec, ArgType, ArgValue, Arity, BindingResolver, BlockModule, Command, CommandArgs,
    CommandSchema, Helper, OptSpec,
};
