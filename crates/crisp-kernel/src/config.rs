//! Engine configuration.
//!
//! Hosts build an [`EngineConfig`] however they like (it is plain serde
//! data) and hand it to [`crate::Engine::new`]. Module settings are looked
//! up by the module's contextual name first, so two aliases of the same
//! module can be configured independently.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Name of the module every engine falls back to.
pub const DEFAULT_BASELINE_MODULE: &str = "std";

/// Default limit on nested block depth.
pub const DEFAULT_MAX_BLOCK_DEPTH: usize = 64;

/// Configuration for engine initialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Name of this engine (for identification in logs).
    pub name: String,

    /// Module used when a command has no explicit or inherited module, and
    /// as the fallback when the current module lacks a command.
    pub baseline_module: String,

    /// Per-module settings: contextual module name → key → value.
    pub module_settings: BTreeMap<String, BTreeMap<String, serde_json::Value>>,

    /// Deepest block nesting interpretation will enter.
    pub max_block_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            baseline_module: DEFAULT_BASELINE_MODULE.to_string(),
            module_settings: BTreeMap::new(),
            max_block_depth: DEFAULT_MAX_BLOCK_DEPTH,
        }
    }
}

impl EngineConfig {
    /// Create a config with the given name.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Config for editor sessions: eager passes run on every keystroke, so
    /// nesting is capped lower.
    pub fn editor() -> Self {
        Self {
            name: "editor".to_string(),
            max_block_depth: 16,
            ..Self::default()
        }
    }

    pub fn with_baseline_module(mut self, module: impl Into<String>) -> Self {
        self.baseline_module = module.into();
        self
    }

    pub fn with_max_block_depth(mut self, depth: usize) -> Self {
        self.max_block_depth = depth;
        self
    }

    /// Set one module setting.
    pub fn with_setting(
        mut self,
        module: impl Into<String>,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        self.module_settings
            .entry(module.into())
            .or_default()
            .insert(key.into(), value);
        self
    }

    /// Look up a setting under the contextual name, then the canonical one.
    pub fn module_setting(
        &self,
        contextual_name: &str,
        module_name: &str,
        key: &str,
    ) -> Option<&serde_json::Value> {
        [contextual_name, module_name]
            .into_iter()
            .find_map(|name| self.module_settings.get(name)?.get(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn alias_setting_wins_over_module_setting() {
        let config = EngineConfig::default()
            .with_setting("dao", "network", json!("mainnet"))
            .with_setting("staging", "network", json!("sepolia"));
        assert_eq!(
            config.module_setting("staging", "dao", "network"),
            Some(&json!("sepolia"))
        );
        assert_eq!(
            config.module_setting("dao", "dao", "network"),
            Some(&json!("mainnet"))
        );
        assert_eq!(config.module_setting("other", "dao", "network"), Some(&json!("mainnet")));
        assert_eq!(config.module_setting("dao", "dao", "missing"), None);
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: EngineConfig = serde_json::from_value(json!({ "name": "ci" })).unwrap();
        assert_eq!(config.name, "ci");
        assert_eq!(config.baseline_module, DEFAULT_BASELINE_MODULE);
        assert_eq!(config.max_block_depth, DEFAULT_MAX_BLOCK_DEPTH);
    }
}
