//! Module descriptors and the registry the engine resolves names against.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crisp_types::Value;

use crate::ast::CommandExpression;
use crate::bindings::{BindingSpace, BindingsFilter, BindingsManager, Memo};
use crate::error::{Error, ResolutionKind, Result};

use super::traits::{Command, Helper};

/// A named bundle of commands and helpers.
pub struct Module {
    name: String,
    description: String,
    commands: BTreeMap<String, Arc<dyn Command>>,
    helpers: BTreeMap<String, Arc<dyn Helper>>,
}

impl Module {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            commands: BTreeMap::new(),
            helpers: BTreeMap::new(),
        }
    }

    /// Add a command. A later command with the same name replaces it.
    pub fn with_command(mut self, command: impl Command + 'static) -> Self {
        self.commands
            .insert(command.name().to_string(), Arc::new(command));
        self
    }

    pub fn with_helper(mut self, helper: impl Helper + 'static) -> Self {
        self.helpers.insert(helper.name().to_string(), Arc::new(helper));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn command(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands.get(name).cloned()
    }

    pub fn helper(&self, name: &str) -> Option<Arc<dyn Helper>> {
        self.helpers.get(name).cloned()
    }

    pub fn command_names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    pub fn helper_names(&self) -> impl Iterator<Item = &str> {
        self.helpers.keys().map(String::as_str)
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("commands", &self.commands.keys().collect::<Vec<_>>())
            .field("helpers", &self.helpers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A module as seen from a script: the module plus the alias it was
/// loaded under, if any.
#[derive(Clone)]
pub struct ModuleContext {
    pub module: Arc<Module>,
    pub alias: Option<String>,
}

impl ModuleContext {
    pub fn new(module: Arc<Module>) -> Self {
        Self {
            module,
            alias: None,
        }
    }

    pub fn aliased(module: Arc<Module>, alias: impl Into<String>) -> Self {
        Self {
            module,
            alias: Some(alias.into()),
        }
    }

    pub fn name(&self) -> &str {
        self.module.name()
    }

    /// Alias if any, else the module name. Keys namespaced settings.
    pub fn contextual_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(self.module.name())
    }
}

impl fmt::Debug for ModuleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleContext")
            .field("module", &self.module.name())
            .field("alias", &self.alias)
            .finish()
    }
}

/// Registration arena of module descriptors, indexed by name.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: Vec<Arc<Module>>,
    index: HashMap<String, usize>,
}

impl ModuleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the builtin `std` module.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(super::builtin::module());
        registry
    }

    /// Register a module, replacing any module of the same name.
    pub fn register(&mut self, module: Module) {
        let module = Arc::new(module);
        match self.index.get(module.name()) {
            Some(&slot) => self.modules[slot] = module,
            None => {
                self.index
                    .insert(module.name().to_string(), self.modules.len());
                self.modules.push(module);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<Module>> {
        self.index.get(name).map(|&slot| self.modules[slot].clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Module names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|m| m.name())
    }

    /// Resolve a `module:` prefix through what the bindings say is loaded:
    /// an alias first, then a loaded module name, then the baseline.
    pub fn lookup_loaded(
        &self,
        prefix: &str,
        bindings: &BindingsManager,
        baseline: &ModuleContext,
    ) -> Option<ModuleContext> {
        if let Memo::Present(Value::String(target)) =
            bindings.get_binding_value(prefix, BindingSpace::Alias)
        {
            return self
                .get(target)
                .map(|module| ModuleContext::aliased(module, prefix));
        }
        if bindings.has_binding(prefix, BindingSpace::Module) {
            return self.get(prefix).map(ModuleContext::new);
        }
        (prefix == baseline.name()).then(|| baseline.clone())
    }

    /// Find the module and command a command node refers to.
    ///
    /// An explicit prefix is resolved with `lookup` and must contain the
    /// command. Without one the inherited module context is tried, then
    /// the baseline module.
    pub fn resolve_command<F>(
        &self,
        command: &CommandExpression,
        inherited: Option<&ModuleContext>,
        baseline: &ModuleContext,
        lookup: F,
    ) -> Result<(ModuleContext, Arc<dyn Command>)>
    where
        F: Fn(&str) -> Option<ModuleContext>,
    {
        let location = command.name_loc;

        if let Some(prefix) = &command.module {
            let context = lookup(prefix)
                .ok_or_else(|| Error::resolution(ResolutionKind::Module, prefix, location))?;
            let found = context.module.command(&command.name).ok_or_else(|| {
                Error::resolution(ResolutionKind::Command, command.full_name(), location)
            })?;
            return Ok((context, found));
        }

        if let Some(context) = inherited
            && let Some(found) = context.module.command(&command.name)
        {
            return Ok((context.clone(), found));
        }

        baseline
            .module
            .command(&command.name)
            .map(|found| (baseline.clone(), found))
            .ok_or_else(|| Error::resolution(ResolutionKind::Command, &command.name, location))
    }

    /// Find a helper: the current module, then the baseline, then every
    /// module loaded into scope.
    pub fn find_helper(
        &self,
        name: &str,
        current: &ModuleContext,
        baseline: &ModuleContext,
        bindings: &BindingsManager,
    ) -> Option<Arc<dyn Helper>> {
        current
            .module
            .helper(name)
            .or_else(|| baseline.module.helper(name))
            .or_else(|| {
                self.loaded_modules(bindings)
                    .into_iter()
                    .find_map(|module| module.helper(name))
            })
    }

    /// Modules bound in the Module space, in name order.
    pub fn loaded_modules(&self, bindings: &BindingsManager) -> Vec<Arc<Module>> {
        bindings
            .get_all_bindings(&BindingsFilter::default().space(BindingSpace::Module))
            .iter()
            .filter_map(|b| self.get(&b.identifier))
            .collect()
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::CommandExpression;

    fn registry() -> ModuleRegistry {
        let mut registry = ModuleRegistry::with_builtins();
        registry.register(Module::new("empty", "A module without commands"));
        registry
    }

    fn baseline(registry: &ModuleRegistry) -> ModuleContext {
        ModuleContext::new(registry.get("std").unwrap())
    }

    #[test]
    fn register_replaces_same_name() {
        let mut registry = registry();
        registry.register(Module::new("empty", "Replaced"));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["std", "empty"]);
        assert_eq!(registry.get("empty").unwrap().description(), "Replaced");
    }

    #[test]
    fn unprefixed_command_falls_back_to_baseline() {
        let registry = registry();
        let base = baseline(&registry);
        let inherited = ModuleContext::new(registry.get("empty").unwrap());
        let (context, command) = registry
            .resolve_command(&CommandExpression::new("set"), Some(&inherited), &base, |_| None)
            .unwrap();
        assert_eq!(context.name(), "std");
        assert_eq!(command.name(), "set");
    }

    #[test]
    fn unknown_prefix_is_a_module_resolution_error() {
        let registry = registry();
        let base = baseline(&registry);
        let cmd = CommandExpression::new("set").with_module("nope");
        let err = registry
            .resolve_command(&cmd, None, &base, |_| None)
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "module not found: nope");
    }

    #[test]
    fn prefixed_command_must_exist_in_module() {
        let registry = registry();
        let base = baseline(&registry);
        let cmd = CommandExpression::new("set").with_module("empty");
        let err = registry
            .resolve_command(&cmd, None, &base, |name| registry.get(name).map(ModuleContext::new))
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "command not found: empty:set");
    }

    #[test]
    fn lookup_loaded_prefers_alias() {
        let registry = registry();
        let base = baseline(&registry);
        let mut bindings = BindingsManager::new();
        bindings
            .set_binding("e", Some(Value::from("empty")), BindingSpace::Alias, false)
            .unwrap();

        let context = registry.lookup_loaded("e", &bindings, &base).unwrap();
        assert_eq!(context.name(), "empty");
        assert_eq!(context.contextual_name(), "e");

        assert!(registry.lookup_loaded("empty", &bindings, &base).is_none());
        assert_eq!(registry.lookup_loaded("std", &bindings, &base).unwrap().name(), "std");
    }
}
