//! Contexts handed to commands and helpers.
//!
//! - [`ExecContext`]: full interpretation; gives commands the bindings, the
//!   host and callbacks into the interpreter for nested nodes and blocks.
//! - [`EagerContext`]: speculative evaluation for the editor; read-only.
//! - [`CompletionContext`]: argument suggestions.
//! - [`HelperContext`]: what a `@helper` may touch.

use std::sync::Arc;

use crisp_types::{Action, Location, Value};

use crate::ast::{CommandExpression, Node};
use crate::bindings::{BindingError, BindingSpace, BindingsManager};
use crate::config::EngineConfig;
use crate::eager::Caret;
use crate::error::{Error, Result};
use crate::host::Host;
use crate::interpreter::Interpreter;

use super::registry::{ModuleContext, ModuleRegistry};
use super::traits::BindingResolver;

/// How a command wants its block argument run.
#[derive(Default)]
pub struct BlockOptions {
    /// Module the body runs under; defaults to the command's block policy.
    pub module: Option<ModuleContext>,
    /// Applied to the block's fresh scope before its first command.
    pub initializer: Option<BindingResolver>,
}

impl BlockOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(mut self, module: ModuleContext) -> Self {
        self.module = Some(module);
        self
    }

    pub fn with_initializer(
        mut self,
        initializer: impl FnOnce(&mut BindingsManager) -> anyhow::Result<()> + Send + 'static,
    ) -> Self {
        self.initializer = Some(Box::new(initializer));
        self
    }
}

/// Execution context passed to [`Command::run`](super::Command::run).
pub struct ExecContext<'a> {
    interpreter: &'a mut Interpreter,
    command: String,
    module: ModuleContext,
    location: Option<Location>,
    block: Option<&'a [CommandExpression]>,
    block_module: ModuleContext,
    block_consumed: bool,
}

impl<'a> ExecContext<'a> {
    pub(crate) fn new(
        interpreter: &'a mut Interpreter,
        command: &'a CommandExpression,
        module: ModuleContext,
        block_module: ModuleContext,
    ) -> Self {
        Self {
            interpreter,
            command: command.full_name(),
            module,
            location: command.loc,
            block: command.block(),
            block_module,
            block_consumed: false,
        }
    }

    pub fn bindings(&self) -> &BindingsManager {
        &self.interpreter.bindings
    }

    pub fn bindings_mut(&mut self) -> &mut BindingsManager {
        &mut self.interpreter.bindings
    }

    /// Bind a name in the current scope (or the root when `is_global`).
    pub fn set_binding(
        &mut self,
        identifier: impl Into<String>,
        value: Option<Value>,
        space: BindingSpace,
        is_global: bool,
    ) -> Result<()> {
        self.interpreter
            .bindings
            .set_binding(identifier, value, space, is_global)
            .map_err(|err| self.binding_error(err))
    }

    /// Attach the running command and its location to a binding failure.
    pub fn binding_error(&self, error: BindingError) -> Error {
        Error::binding(self.command.clone(), error, self.location)
    }

    /// The module the running command belongs to.
    pub fn module(&self) -> &ModuleContext {
        &self.module
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.interpreter.modules
    }

    pub fn host(&self) -> Arc<dyn Host> {
        self.interpreter.host.clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.interpreter.config
    }

    /// Setting for the running command's module.
    pub fn setting(&self, key: &str) -> Option<&serde_json::Value> {
        self.interpreter.config.module_setting(
            self.module.contextual_name(),
            self.module.name(),
            key,
        )
    }

    pub fn location(&self) -> Option<Location> {
        self.location
    }

    pub fn has_block(&self) -> bool {
        self.block.is_some()
    }

    /// Interpret a node under the running command's module.
    pub async fn interpret_node(&mut self, node: &Node) -> Result<Value> {
        let module = self.module.clone();
        self.interpreter.interpret_node(node, &module).await
    }

    /// Run the command's block argument now, in a fresh scope.
    ///
    /// Once called, the interpreter does not run the block again after
    /// the command returns.
    pub async fn interpret_block(&mut self, options: BlockOptions) -> Result<Vec<Action>> {
        let body = self.block.ok_or_else(|| {
            Error::type_mismatch(
                format!("{}: expected a block argument", self.command),
                self.location,
            )
        })?;
        self.block_consumed = true;
        let module = options
            .module
            .unwrap_or_else(|| self.block_module.clone());
        self.interpreter
            .interpret_block(body, &module, options.initializer, &self.command)
            .await
    }

    pub fn log(&self, message: &str) {
        self.interpreter.host.log(message);
    }

    pub(crate) fn block_consumed(&self) -> bool {
        self.block_consumed
    }
}

/// Context passed to [`Helper::run`](super::Helper::run).
#[derive(Clone)]
pub struct HelperContext {
    pub host: Arc<dyn Host>,
    pub config: Arc<EngineConfig>,
    pub module: ModuleContext,
}

impl HelperContext {
    pub fn setting(&self, key: &str) -> Option<&serde_json::Value> {
        self.config
            .module_setting(self.module.contextual_name(), self.module.name(), key)
    }
}

/// Context passed to [`Command::run_eager`](super::Command::run_eager).
///
/// Hooks run concurrently, so they only get shared references; the
/// speculative bindings are reachable only through the returned resolver.
pub struct EagerContext<'a> {
    /// Bindings the host carried over from earlier passes.
    pub cache: &'a BindingsManager,
    pub module: ModuleContext,
    pub registry: &'a ModuleRegistry,
    pub host: Arc<dyn Host>,
    pub config: &'a EngineConfig,
    /// True only for the occurrence of this (module, command) nearest the
    /// caret. Hooks use it to do expensive lookups once.
    pub is_closest_command_to_caret: bool,
    pub caret: Caret,
}

impl EagerContext<'_> {
    pub fn setting(&self, key: &str) -> Option<&serde_json::Value> {
        self.config
            .module_setting(self.module.contextual_name(), self.module.name(), key)
    }
}

/// Context passed to
/// [`Command::completion_items_for_arg`](super::Command::completion_items_for_arg).
pub struct CompletionContext<'a> {
    /// Speculative bindings at the caret.
    pub bindings: &'a BindingsManager,
    pub registry: &'a ModuleRegistry,
    pub module: &'a ModuleContext,
    pub config: &'a EngineConfig,
}
