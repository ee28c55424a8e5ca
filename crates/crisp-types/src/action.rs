//! Opaque effect units produced by commands.

use serde::{Deserialize, Serialize};

/// One effect a command wants the host to perform.
///
/// The interpreter never looks inside an action: it only collects them in
/// source order. `kind` is a short tag chosen by the command that produced
/// it (for example `call`), `data` is whatever payload that kind needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub kind: String,
    pub data: serde_json::Value,
}

impl Action {
    pub fn new(kind: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }

    /// Read a field out of an object payload.
    pub fn field(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }
}
