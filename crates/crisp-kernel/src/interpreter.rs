//! Full interpretation of a parsed program.
//!
//! # Architecture
//!
//! - Commands run strictly in source order; each may emit actions and
//!   mutate bindings for the commands after it.
//! - Arguments are interpreted before the command runs, except raw types
//!   and blocks, which reach the command as nodes.
//! - A block runs in a fresh scope. The command may run it itself through
//!   [`ExecContext::interpret_block`]; otherwise the interpreter runs it
//!   right after the command returns.
//! - Errors from command and helper bodies are `anyhow` errors; engine
//!   errors pass through them unchanged.

mod eval;

use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::Instrument;

use crisp_types::{Action, Value};

use crate::ast::{CommandExpression, Node, NodeKind, Program};
use crate::bindings::{BindingSpace, BindingsManager, Memo};
use crate::config::EngineConfig;
use crate::error::{ArityError, Error, ResolutionKind, Result};
use crate::host::Host;
use crate::modules::{
    ArgSpec, ArgType, ArgValue, BindingResolver, BlockModule, CommandArgs, CommandSchema,
    ExecContext, HelperContext, ModuleContext, ModuleRegistry,
};

pub use eval::{EvalError, EvalResult, binary, eval_pure, number_literal};

/// Executes programs against a module registry and a host.
///
/// One interpreter carries one binding scope stack; create a fresh one for
/// each full pass.
pub struct Interpreter {
    pub(crate) modules: Arc<ModuleRegistry>,
    pub(crate) config: Arc<EngineConfig>,
    pub(crate) host: Arc<dyn Host>,
    pub(crate) bindings: BindingsManager,
    baseline: ModuleContext,
}

impl Interpreter {
    /// Create an interpreter. Fails if the configured baseline module is
    /// not registered.
    pub fn new(
        modules: Arc<ModuleRegistry>,
        config: Arc<EngineConfig>,
        host: Arc<dyn Host>,
    ) -> Result<Self> {
        let baseline = modules
            .get(&config.baseline_module)
            .map(ModuleContext::new)
            .ok_or_else(|| {
                Error::resolution(ResolutionKind::Module, &config.baseline_module, None)
            })?;
        Ok(Self {
            modules,
            config,
            host,
            bindings: BindingsManager::new(),
            baseline,
        })
    }

    /// Start from existing bindings instead of an empty root scope.
    pub fn with_bindings(mut self, bindings: BindingsManager) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn bindings(&self) -> &BindingsManager {
        &self.bindings
    }

    pub fn into_bindings(self) -> BindingsManager {
        self.bindings
    }

    pub fn baseline(&self) -> &ModuleContext {
        &self.baseline
    }

    /// Run every top-level command and collect their actions in order.
    #[tracing::instrument(level = "debug", skip_all, fields(commands = program.body.len()))]
    pub async fn interpret(&mut self, program: &Program) -> Result<Vec<Action>> {
        self.interpret_commands(&program.body, None).await
    }

    fn interpret_commands<'a>(
        &'a mut self,
        body: &'a [CommandExpression],
        module: Option<&'a ModuleContext>,
    ) -> BoxFuture<'a, Result<Vec<Action>>> {
        Box::pin(async move {
            let mut actions = Vec::new();
            for command in body {
                actions.extend(self.interpret_command(command, module).await?);
            }
            Ok(actions)
        })
    }

    fn interpret_command<'a>(
        &'a mut self,
        cmd: &'a CommandExpression,
        inherited: Option<&'a ModuleContext>,
    ) -> BoxFuture<'a, Result<Vec<Action>>> {
        let span = tracing::debug_span!("command", name = %cmd.full_name());
        Box::pin(
            async move {
                let modules = self.modules.clone();
                let (module, command) =
                    modules.resolve_command(cmd, inherited, &self.baseline, |prefix| {
                        modules.lookup_loaded(prefix, &self.bindings, &self.baseline)
                    })?;
                let schema = command.schema();
                check_shape(cmd, &schema)?;

                let mut args = CommandArgs {
                    location: cmd.loc,
                    ..CommandArgs::default()
                };
                for (index, node) in cmd.args.iter().enumerate() {
                    let Some(spec) = schema.arg_at(index) else {
                        continue;
                    };
                    args.positional
                        .push(self.interpret_arg(cmd, spec, node, &module).await?);
                }
                for opt in &cmd.opts {
                    let Some(spec) = schema.opt_named(&opt.name) else {
                        continue;
                    };
                    let value = self.interpret_node(&opt.value, &module).await?;
                    if !spec.ty.accepts(&value) {
                        return Err(Error::type_mismatch(
                            format!(
                                "{}: option --{} expects {}, got {}",
                                cmd.full_name(),
                                opt.name,
                                spec.ty,
                                value.type_name()
                            ),
                            opt.value.loc.or(opt.loc),
                        ));
                    }
                    args.opts.insert(opt.name.clone(), value);
                }

                let block_module = match schema.block_module {
                    BlockModule::Own => module.clone(),
                    BlockModule::Inherit => inherited.unwrap_or(&self.baseline).clone(),
                };

                tracing::trace!(module = module.name(), "running command");
                let (actions, block_consumed) = {
                    let mut ctx = ExecContext::new(self, cmd, module, block_module.clone());
                    let result = command.run(args, &mut ctx).await;
                    (result, ctx.block_consumed())
                };
                let mut actions =
                    actions.map_err(|err| into_engine_error(err, cmd.full_name()))?;

                if !block_consumed && let Some(body) = cmd.block() {
                    let name = cmd.full_name();
                    actions.extend(
                        self.interpret_block(body, &block_module, None, &name)
                            .await?,
                    );
                }
                Ok(actions)
            }
            .instrument(span),
        )
    }

    async fn interpret_arg(
        &self,
        cmd: &CommandExpression,
        spec: &ArgSpec,
        node: &Node,
        module: &ModuleContext,
    ) -> Result<ArgValue> {
        if spec.is_raw() || node.is_block() {
            if !raw_node_fits(spec, node) {
                return Err(arg_mismatch(cmd, spec, node.kind.describe(), node));
            }
            return Ok(ArgValue::Raw(node.clone()));
        }
        let value = self.interpret_node(node, module).await?;
        if !spec.ty.accepts(&value) {
            return Err(arg_mismatch(cmd, spec, value.type_name(), node));
        }
        Ok(ArgValue::Value(value))
    }

    /// Run a block body in a fresh scope under `module`.
    ///
    /// The scope is exited whether or not the body succeeds.
    pub(crate) fn interpret_block<'a>(
        &'a mut self,
        body: &'a [CommandExpression],
        module: &'a ModuleContext,
        initializer: Option<BindingResolver>,
        command: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Action>>> {
        Box::pin(async move {
            let depth = self.bindings.depth();
            if depth >= self.config.max_block_depth {
                return Err(Error::Limit {
                    limit: self.config.max_block_depth,
                    location: body.first().and_then(|c| c.loc),
                });
            }
            tracing::debug!(command, module = module.name(), depth = depth + 1, "entering block");

            self.bindings.enter_scope();
            let result = match initializer {
                Some(init) => {
                    init(&mut self.bindings).map_err(|err| into_engine_error(err, command))
                }
                None => Ok(()),
            };
            let result = match result {
                Ok(()) => self.interpret_commands(body, Some(module)).await,
                Err(err) => Err(err),
            };
            self.bindings.exit_scope();
            result
        })
    }

    /// Evaluate an expression node to a value.
    pub(crate) fn interpret_node<'a>(
        &'a self,
        node: &'a Node,
        module: &'a ModuleContext,
    ) -> BoxFuture<'a, Result<Value>> {
        Box::pin(async move {
            match &node.kind {
                NodeKind::Address(a) => Ok(Value::Address(*a)),
                NodeKind::Bool(b) => Ok(Value::Bool(*b)),
                NodeKind::Bytes(b) => Ok(Value::Bytes(b.clone())),
                NodeKind::String(s) => Ok(Value::String(s.clone())),
                NodeKind::Number(n) => number_literal(n)
                    .map(Value::Number)
                    .map_err(|e| Error::expression(e.to_string(), node.loc)),
                NodeKind::Array(items) => {
                    let mut values = Vec::with_capacity(items.len());
                    for item in items {
                        values.push(self.interpret_node(item, module).await?);
                    }
                    Ok(Value::Array(values))
                }
                NodeKind::Binary { op, left, right } => {
                    let l = self.interpret_node(left, module).await?;
                    let r = self.interpret_node(right, module).await?;
                    binary(*op, &l, &r)
                        .map(Value::Number)
                        .map_err(|e| Error::expression(e.to_string(), node.loc))
                }
                NodeKind::Block(_) => Err(Error::type_mismatch(
                    "a block cannot be used as a value",
                    node.loc,
                )),
                NodeKind::Call {
                    target,
                    method,
                    args,
                } => {
                    let target_value = self.interpret_node(target, module).await?;
                    let Some(address) = target_value.as_address() else {
                        return Err(Error::type_mismatch(
                            format!(
                                "call target of ::{} must be an address, got {}",
                                method,
                                target_value.type_name()
                            ),
                            target.loc,
                        ));
                    };
                    let mut values = Vec::with_capacity(args.len());
                    for arg in args {
                        values.push(self.interpret_node(arg, module).await?);
                    }
                    tracing::debug!(%address, method, "host call");
                    self.host
                        .call(address, method, &values)
                        .await
                        .map_err(|err| into_engine_error(err, format!("{address}::{method}")))
                }
                NodeKind::Helper { name, args } => {
                    let helper = self
                        .modules
                        .find_helper(name, module, &self.baseline, &self.bindings)
                        .ok_or_else(|| {
                            Error::resolution(ResolutionKind::Helper, format!("@{name}"), node.loc)
                        })?;
                    let mut values = Vec::with_capacity(args.len());
                    for arg in args {
                        values.push(self.interpret_node(arg, module).await?);
                    }
                    let ctx = HelperContext {
                        host: self.host.clone(),
                        config: self.config.clone(),
                        module: module.clone(),
                    };
                    helper
                        .run(values, &ctx)
                        .await
                        .map_err(|err| into_engine_error(err, format!("@{name}")))
                }
                NodeKind::As { left, .. } => self.interpret_node(left, module).await,
                NodeKind::Identifier(id) => {
                    match self.bindings.get_binding_value(id, BindingSpace::Address) {
                        Memo::Present(value) => Ok(value.clone()),
                        Memo::Absent => Ok(Value::Null),
                        Memo::Unset => Ok(Value::String(id.clone())),
                    }
                }
                NodeKind::Variable(name) => {
                    match self.bindings.get_binding_value(name, BindingSpace::User) {
                        Memo::Present(value) => Ok(value.clone()),
                        Memo::Absent => Ok(Value::Null),
                        Memo::Unset => Err(Error::resolution(
                            ResolutionKind::Variable,
                            name,
                            node.loc,
                        )),
                    }
                }
            }
        })
    }
}

/// Arity and option names are checked before anything is interpreted.
fn check_shape(cmd: &CommandExpression, schema: &CommandSchema) -> Result<()> {
    let arity = schema.arity();
    if !arity.accepts(cmd.args.len()) {
        return Err(Error::Arity {
            command: cmd.full_name(),
            error: ArityError::Args {
                expected: arity,
                actual: cmd.args.len(),
            },
            location: cmd.loc,
        });
    }
    if let Some(opt) = cmd.opts.iter().find(|o| schema.opt_named(&o.name).is_none()) {
        return Err(Error::Arity {
            command: cmd.full_name(),
            error: ArityError::UnknownOption(opt.name.clone()),
            location: opt.loc.or(cmd.loc),
        });
    }
    Ok(())
}

fn raw_node_fits(spec: &ArgSpec, node: &Node) -> bool {
    match spec.ty {
        ArgType::Variable => matches!(node.kind, NodeKind::Variable(_)),
        ArgType::Identifier | ArgType::Module => {
            matches!(node.kind, NodeKind::Identifier(_) | NodeKind::As { .. })
        }
        ArgType::Block => node.is_block(),
        ArgType::Any => true,
        _ => !node.is_block(),
    }
}

fn arg_mismatch(cmd: &CommandExpression, spec: &ArgSpec, got: &str, node: &Node) -> Error {
    Error::type_mismatch(
        format!(
            "{}: argument {} expects {}, got {}",
            cmd.full_name(),
            spec.name,
            spec.ty,
            got
        ),
        node.loc,
    )
}

/// Pass engine errors through; attribute anything else to `command`.
pub(crate) fn into_engine_error(err: anyhow::Error, command: impl Into<String>) -> Error {
    match err.downcast::<Error>() {
        Ok(err) => err,
        Err(source) => Error::Command {
            command: command.into(),
            source,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryOp;
    use crate::host::NoopHost;
    use crisp_types::Address;

    fn interpreter() -> Interpreter {
        Interpreter::new(
            Arc::new(ModuleRegistry::with_builtins()),
            Arc::new(EngineConfig::default()),
            Arc::new(NoopHost),
        )
        .unwrap()
    }

    #[test]
    fn missing_baseline_module() {
        let err = Interpreter::new(
            Arc::new(ModuleRegistry::new()),
            Arc::new(EngineConfig::default()),
            Arc::new(NoopHost),
        )
        .err()
        .unwrap();
        assert_eq!(err.to_string(), "module not found: std");
    }

    #[tokio::test]
    async fn unbound_identifier_evaluates_to_its_name() {
        let interp = interpreter();
        let base = interp.baseline().clone();
        let value = interp.interpret_node(&Node::ident("voting"), &base).await.unwrap();
        assert_eq!(value, Value::from("voting"));
    }

    #[tokio::test]
    async fn address_bound_identifier_evaluates_to_address() {
        let mut interp = interpreter();
        let addr = Address::new([7; 20]);
        interp
            .bindings
            .set_binding("vault", Some(Value::Address(addr)), BindingSpace::Address, false)
            .unwrap();
        let base = interp.baseline().clone();
        let value = interp.interpret_node(&Node::ident("vault"), &base).await.unwrap();
        assert_eq!(value, Value::Address(addr));
    }

    #[tokio::test]
    async fn unbound_variable_is_a_resolution_error() {
        let interp = interpreter();
        let base = interp.baseline().clone();
        let err = interp
            .interpret_node(&Node::variable("$nope"), &base)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "variable not found: $nope");
    }

    #[tokio::test]
    async fn arithmetic_error_is_an_expression_error() {
        let interp = interpreter();
        let base = interp.baseline().clone();
        let node = Node::bare(NodeKind::Binary {
            op: BinaryOp::Div,
            left: Box::new(Node::number("1")),
            right: Box::new(Node::number("0")),
        });
        let err = interp.interpret_node(&node, &base).await.unwrap_err();
        assert!(matches!(err, Error::Expression { .. }));
        assert_eq!(err.to_string(), "division by zero");
    }

    #[tokio::test]
    async fn call_on_non_address_is_a_type_error() {
        let interp = interpreter();
        let base = interp.baseline().clone();
        let node = Node::bare(NodeKind::Call {
            target: Box::new(Node::string("x")),
            method: "balanceOf".into(),
            args: vec![],
        });
        let err = interp.interpret_node(&node, &base).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "call target of ::balanceOf must be an address, got string"
        );
    }

    #[test]
    fn engine_errors_pass_through_anyhow() {
        let inner = Error::type_mismatch("bad", None);
        let err = into_engine_error(anyhow::Error::new(inner), "cmd");
        assert!(matches!(err, Error::Type { .. }));

        let err = into_engine_error(anyhow::anyhow!("boom"), "cmd");
        assert_eq!(err.to_string(), "cmd: boom");
    }
}
