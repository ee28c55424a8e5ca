//! crisp-kernel: parsing, interpretation and completion for crisp scripts.
//!
//! This crate provides:
//!
//! - **Lexer**: Tokenizes crisp source code using logos
//! - **Parser**: Builds the AST from tokens using chumsky
//! - **AST**: Commands, expression nodes and their source locations
//! - **Bindings**: Scoped, namespaced bindings with a tri-state lookup
//! - **Modules**: Command and helper traits, the registry, builtin `std`
//! - **Interpreter**: Full execution producing ordered actions
//! - **Eager**: Speculative binding resolution and editor completion
//! - **Engine**: The embedding surface tying it together

pub mod ast;
pub mod bindings;
pub mod config;
pub mod eager;
pub mod engine;
pub mod error;
pub mod host;
pub mod interpreter;
pub mod lexer;
pub mod modules;
pub mod parser;

pub use bindings::{Binding, BindingSpace, BindingsFilter, BindingsManager, Memo};
pub use config::EngineConfig;
pub use eager::{Caret, CompletionCategory, CompletionItem, EagerOutcome};
pub use engine::Engine;
pub use error::{Error, Result};
pub use host::{Host, NoopHost};
pub use interpreter::Interpreter;
pub use parser::{ParseError, parse};

// Value types shared with hosts
pub use crisp_types::{Action, Address, Location, Position, Value};
