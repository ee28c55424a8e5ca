//! Core command and helper traits and their schemas.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use crisp_types::{Action, Address, Location, Value};

use crate::ast::{CommandExpression, Node};
use crate::bindings::{BindingSpace, BindingsFilter, BindingsManager};

use super::context::{CompletionContext, EagerContext, ExecContext, HelperContext};

/// Semantic type of a command argument or option.
///
/// Value types are checked after the argument is interpreted. The raw
/// types (`Identifier`, `Variable`, `Module`, `Block`) are never
/// interpreted: the command receives the node itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    Any,
    Address,
    Bool,
    Bytes,
    Number,
    String,
    Array,
    Identifier,
    Variable,
    Module,
    Block,
}

impl ArgType {
    pub fn is_raw(&self) -> bool {
        matches!(
            self,
            ArgType::Identifier | ArgType::Variable | ArgType::Module | ArgType::Block
        )
    }

    /// Whether an interpreted value fits this type. Null fits anything.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (ArgType::Any, _) | (_, Value::Null) => true,
            (ArgType::Address, Value::Address(_))
            | (ArgType::Bool, Value::Bool(_))
            | (ArgType::Bytes, Value::Bytes(_))
            | (ArgType::Number, Value::Number(_))
            | (ArgType::String, Value::String(_))
            | (ArgType::Array, Value::Array(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArgType::Any => "any",
            ArgType::Address => "address",
            ArgType::Bool => "bool",
            ArgType::Bytes => "bytes",
            ArgType::Number => "number",
            ArgType::String => "string",
            ArgType::Array => "array",
            ArgType::Identifier => "identifier",
            ArgType::Variable => "variable",
            ArgType::Module => "module",
            ArgType::Block => "block",
        };
        f.write_str(name)
    }
}

/// Schema for a positional argument.
#[derive(Debug, Clone)]
pub struct ArgSpec {
    pub name: String,
    pub ty: ArgType,
    pub optional: bool,
    /// Absorbs every remaining positional argument. Only valid last.
    pub rest: bool,
    /// Hand the raw node to the command even for value types.
    pub skip_interpret: bool,
}

impl ArgSpec {
    pub fn required(name: impl Into<String>, ty: ArgType) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: false,
            rest: false,
            skip_interpret: false,
        }
    }

    pub fn optional(name: impl Into<String>, ty: ArgType) -> Self {
        Self {
            optional: true,
            ..Self::required(name, ty)
        }
    }

    pub fn rest(name: impl Into<String>, ty: ArgType) -> Self {
        Self {
            optional: true,
            rest: true,
            ..Self::required(name, ty)
        }
    }

    pub fn raw(mut self) -> Self {
        self.skip_interpret = true;
        self
    }

    pub fn is_raw(&self) -> bool {
        self.skip_interpret || self.ty.is_raw()
    }
}

/// Schema for a named `--option value`.
#[derive(Debug, Clone)]
pub struct OptSpec {
    pub name: String,
    pub ty: ArgType,
    pub description: String,
}

impl OptSpec {
    pub fn new(name: impl Into<String>, ty: ArgType, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty,
            description: description.into(),
        }
    }
}

/// Module a command's block body runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockModule {
    /// Keep the module context the command itself appeared in.
    #[default]
    Inherit,
    /// Switch to the module the command belongs to.
    Own,
}

/// Accepted positional argument counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    Between(usize, usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
            Arity::Between(min, max) => (min..=max).contains(&count),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "exactly {}", n),
            Arity::AtLeast(n) => write!(f, "at least {}", n),
            Arity::Between(min, max) => write!(f, "between {} and {}", min, max),
        }
    }
}

/// Schema describing a command's interface.
#[derive(Debug, Clone)]
pub struct CommandSchema {
    pub name: String,
    pub description: String,
    pub args: Vec<ArgSpec>,
    pub opts: Vec<OptSpec>,
    pub block_module: BlockModule,
}

impl CommandSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            args: Vec::new(),
            opts: Vec::new(),
            block_module: BlockModule::Inherit,
        }
    }

    pub fn arg(mut self, arg: ArgSpec) -> Self {
        self.args.push(arg);
        self
    }

    pub fn opt(mut self, opt: OptSpec) -> Self {
        self.opts.push(opt);
        self
    }

    pub fn block_module(mut self, policy: BlockModule) -> Self {
        self.block_module = policy;
        self
    }

    /// Spec for the positional argument at `index`, following a trailing
    /// rest argument past the end of the list.
    pub fn arg_at(&self, index: usize) -> Option<&ArgSpec> {
        self.args
            .get(index)
            .or_else(|| self.args.last().filter(|a| a.rest))
    }

    pub fn opt_named(&self, name: &str) -> Option<&OptSpec> {
        self.opts.iter().find(|o| o.name == name)
    }

    pub fn arity(&self) -> Arity {
        let min = self.args.iter().filter(|a| !a.optional).count();
        if self.args.iter().any(|a| a.rest) {
            Arity::AtLeast(min)
        } else if min == self.args.len() {
            Arity::Exact(min)
        } else {
            Arity::Between(min, self.args.len())
        }
    }

    /// Commands shaped like `set <$var> ...` declare their first argument.
    pub fn declares_variable(&self) -> bool {
        self.args.first().is_some_and(|a| a.ty == ArgType::Variable)
    }
}

/// A positional argument as handed to a command.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Value(Value),
    /// Uninterpreted node for raw argument types and blocks.
    Raw(Node),
}

/// Arguments ready for command execution.
#[derive(Debug, Clone, Default)]
pub struct CommandArgs {
    pub positional: Vec<ArgValue>,
    pub opts: BTreeMap<String, Value>,
    /// Location of the whole command.
    pub location: Option<Location>,
}

impl CommandArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.positional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty()
    }

    /// Interpreted value at `index`; `None` for raw or missing arguments.
    pub fn value(&self, index: usize) -> Option<&Value> {
        match self.positional.get(index)? {
            ArgValue::Value(v) => Some(v),
            ArgValue::Raw(_) => None,
        }
    }

    pub fn raw(&self, index: usize) -> Option<&Node> {
        match self.positional.get(index)? {
            ArgValue::Raw(n) => Some(n),
            ArgValue::Value(_) => None,
        }
    }

    /// Interpreted values from `index` on.
    pub fn values_from(&self, index: usize) -> Vec<Value> {
        (index..self.positional.len())
            .filter_map(|i| self.value(i).cloned())
            .collect()
    }

    pub fn opt(&self, name: &str) -> Option<&Value> {
        self.opts.get(name)
    }

    pub fn address(&self, index: usize) -> anyhow::Result<Address> {
        self.value(index)
            .and_then(Value::as_address)
            .ok_or_else(|| anyhow::anyhow!("argument {} must be an address", index + 1))
    }

    pub fn string(&self, index: usize) -> anyhow::Result<&str> {
        self.value(index)
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("argument {} must be a string", index + 1))
    }
}

/// Deferred binding update produced by an eager hook.
///
/// Hooks run concurrently and may finish in any order; their resolvers are
/// applied afterwards, one at a time in source order, against a single
/// speculative [`BindingsManager`].
pub type BindingResolver = Box<dyn FnOnce(&mut BindingsManager) -> anyhow::Result<()> + Send>;

/// A command that can be executed.
#[async_trait]
pub trait Command: Send + Sync {
    /// The command's name (used for lookup).
    fn name(&self) -> &str;

    fn schema(&self) -> CommandSchema;

    /// Execute the command, returning the actions it produces.
    async fn run(
        &self,
        args: CommandArgs,
        ctx: &mut ExecContext<'_>,
    ) -> anyhow::Result<Vec<Action>>;

    /// Speculatively resolve bindings this command would create, without
    /// side effects. Used only for editor completion.
    async fn run_eager(
        &self,
        _node: &CommandExpression,
        _ctx: &EagerContext<'_>,
    ) -> anyhow::Result<Option<BindingResolver>> {
        Ok(None)
    }

    /// Suggestions for the positional argument at `arg_index`.
    fn completion_items_for_arg(
        &self,
        arg_index: usize,
        _args: &[Node],
        ctx: &CompletionContext<'_>,
    ) -> Vec<String> {
        let schema = self.schema();
        match schema.arg_at(arg_index).map(|a| a.ty) {
            Some(ArgType::Module) => ctx
                .registry
                .names()
                .filter(|name| *name != ctx.config.baseline_module)
                .map(String::from)
                .collect(),
            Some(ArgType::Address) => ctx
                .bindings
                .get_all_bindings(&BindingsFilter::default().space(BindingSpace::Address))
                .into_iter()
                .map(|b| b.identifier)
                .collect(),
            Some(ArgType::Bool) => vec!["true".to_string(), "false".to_string()],
            _ => Vec::new(),
        }
    }
}

/// A helper callable from expressions as `@name(args)`.
#[async_trait]
pub trait Helper: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    async fn run(&self, args: Vec<Value>, ctx: &HelperContext) -> anyhow::Result<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exec_schema() -> CommandSchema {
        CommandSchema::new("exec", "Call a contract")
            .arg(ArgSpec::required("target", ArgType::Address))
            .arg(ArgSpec::required("signature", ArgType::String))
            .arg(ArgSpec::rest("args", ArgType::Any))
    }

    #[test]
    fn arity_from_schema() {
        assert_eq!(exec_schema().arity(), Arity::AtLeast(2));

        let exact = CommandSchema::new("set", "")
            .arg(ArgSpec::required("var", ArgType::Variable))
            .arg(ArgSpec::required("value", ArgType::Any));
        assert_eq!(exact.arity(), Arity::Exact(2));

        let between = CommandSchema::new("x", "")
            .arg(ArgSpec::required("a", ArgType::Any))
            .arg(ArgSpec::optional("b", ArgType::Any));
        assert_eq!(between.arity(), Arity::Between(1, 2));
        assert!(between.arity().accepts(2));
        assert!(!between.arity().accepts(3));
    }

    #[test]
    fn rest_arg_covers_trailing_indices() {
        let schema = exec_schema();
        assert_eq!(schema.arg_at(1).map(|a| a.name.as_str()), Some("signature"));
        assert_eq!(schema.arg_at(7).map(|a| a.name.as_str()), Some("args"));
    }

    #[test]
    fn arg_types_accept_matching_values() {
        assert!(ArgType::Number.accepts(&Value::from(1)));
        assert!(!ArgType::Number.accepts(&Value::from("1")));
        assert!(ArgType::Address.accepts(&Value::Null));
        assert!(ArgType::Any.accepts(&Value::Bytes(vec![])));
    }

    #[test]
    fn command_args_accessors() {
        let args = CommandArgs {
            positional: vec![
                ArgValue::Value(Value::Address(Address::ZERO)),
                ArgValue::Raw(Node::ident("vault")),
                ArgValue::Value(Value::from("x")),
            ],
            ..CommandArgs::default()
        };
        assert_eq!(args.address(0).unwrap(), Address::ZERO);
        assert!(args.value(1).is_none());
        assert_eq!(args.raw(1), Some(&Node::ident("vault")));
        assert_eq!(args.values_from(1), vec![Value::from("x")]);
        assert!(args.string(0).is_err());
    }
}
