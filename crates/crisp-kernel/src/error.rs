//! Engine error taxonomy.
//!
//! Command and helper bodies return `anyhow::Result`; the interpreter
//! passes engine errors raised inside them through unchanged and wraps
//! anything else as [`Error::Command`] with the command name attached.

use std::fmt;

use crisp_types::Location;

use crate::bindings::BindingError;
use crate::modules::Arity;
use crate::parser::ParseError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// What kind of name failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionKind {
    Module,
    Command,
    Helper,
    Variable,
}

impl fmt::Display for ResolutionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionKind::Module => write!(f, "module"),
            ResolutionKind::Command => write!(f, "command"),
            ResolutionKind::Helper => write!(f, "helper"),
            ResolutionKind::Variable => write!(f, "variable"),
        }
    }
}

/// Argument shape mismatches detected before a command runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArityError {
    Args { expected: Arity, actual: usize },
    UnknownOption(String),
}

impl fmt::Display for ArityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArityError::Args { expected, actual } => {
                write!(f, "expected {} argument(s), got {}", expected, actual)
            }
            ArityError::UnknownOption(name) => write!(f, "unknown option --{}", name),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("parse error: {}", join_parse_errors(.0))]
    Parse(Vec<ParseError>),

    #[error("{command}: {error}{}", at(.location))]
    Binding {
        command: String,
        #[source]
        error: BindingError,
        location: Option<Location>,
    },

    #[error("{kind} not found: {name}{}", at(.location))]
    Resolution {
        kind: ResolutionKind,
        name: String,
        location: Option<Location>,
    },

    #[error("{command}: {error}{}", at(.location))]
    Arity {
        command: String,
        error: ArityError,
        location: Option<Location>,
    },

    #[error("{message}{}", at(.location))]
    Type {
        message: String,
        location: Option<Location>,
    },

    #[error("{message}{}", at(.location))]
    Expression {
        message: String,
        location: Option<Location>,
    },

    #[error("{command}: {source:#}")]
    Command {
        command: String,
        source: anyhow::Error,
    },

    #[error("block nesting exceeds the limit of {limit}{}", at(.location))]
    Limit {
        limit: usize,
        location: Option<Location>,
    },
}

fn at(location: &Option<Location>) -> String {
    match location {
        Some(loc) => format!(" at {}", loc.start),
        None => String::new(),
    }
}

fn join_parse_errors(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    pub fn resolution(
        kind: ResolutionKind,
        name: impl Into<String>,
        location: Option<Location>,
    ) -> Self {
        Error::Resolution {
            kind,
            name: name.into(),
            location,
        }
    }

    pub fn binding(
        command: impl Into<String>,
        error: BindingError,
        location: Option<Location>,
    ) -> Self {
        Error::Binding {
            command: command.into(),
            error,
            location,
        }
    }

    pub fn type_mismatch(message: impl Into<String>, location: Option<Location>) -> Self {
        Error::Type {
            message: message.into(),
            location,
        }
    }

    pub fn expression(message: impl Into<String>, location: Option<Location>) -> Self {
        Error::Expression {
            message: message.into(),
            location,
        }
    }

    /// Source location the error points at, when known.
    pub fn location(&self) -> Option<Location> {
        match self {
            Error::Binding { location, .. }
            | Error::Resolution { location, .. }
            | Error::Arity { location, .. }
            | Error::Type { location, .. }
            | Error::Expression { location, .. }
            | Error::Limit { location, .. } => *location,
            Error::Parse(_) | Error::Command { .. } => None,
        }
    }
}
