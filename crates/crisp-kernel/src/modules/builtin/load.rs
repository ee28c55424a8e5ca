//! load: Bring a module into scope, optionally under an alias.

use async_trait::async_trait;

use crisp_types::{Action, Value};

use crate::ast::{CommandExpression, Node, NodeKind};
use crate::bindings::{BindingError, BindingSpace, BindingsManager};
use crate::error::{Error, ResolutionKind};
use crate::modules::{
    ArgSpec, ArgType, BindingResolver, Command, CommandArgs, CommandSchema, EagerContext,
    ExecContext,
};

/// Load command: `load voting` or `load voting as v`.
pub struct Load;

/// Split a module argument into module name and alias.
pub(crate) fn module_reference(node: &Node) -> Option<(&str, Option<&str>)> {
    match &node.kind {
        NodeKind::Identifier(name) => Some((name.as_str(), None)),
        NodeKind::As { left, right } => Some((left.identifier()?, Some(right.as_str()))),
        _ => None,
    }
}

fn bind_module(
    bindings: &mut BindingsManager,
    module: &str,
    alias: Option<&str>,
) -> Result<(), BindingError> {
    if !bindings.has_binding(module, BindingSpace::Module) {
        bindings.set_binding(module, Some(Value::from(module)), BindingSpace::Module, false)?;
    }
    if let Some(alias) = alias {
        bindings.set_binding(alias, Some(Value::from(module)), BindingSpace::Alias, false)?;
    }
    Ok(())
}

#[async_trait]
impl Command for Load {
    fn name(&self) -> &str {
        "load"
    }

    fn schema(&self) -> CommandSchema {
        CommandSchema::new("load", "Load a module, optionally under an alias")
            .arg(ArgSpec::required("module", ArgType::Module))
    }

    async fn run(
        &self,
        args: CommandArgs,
        ctx: &mut ExecContext<'_>,
    ) -> anyhow::Result<Vec<Action>> {
        let node = args
            .raw(0)
            .ok_or_else(|| anyhow::anyhow!("missing module argument"))?;
        let (module, alias) = module_reference(node)
            .ok_or_else(|| anyhow::anyhow!("expected `name` or `name as alias`"))?;
        if !ctx.registry().contains(module) {
            return Err(Error::resolution(ResolutionKind::Module, module, node.loc).into());
        }
        tracing::debug!(module, alias, "loading module");
        if let Err(err) = bind_module(ctx.bindings_mut(), module, alias) {
            return Err(ctx.binding_error(err).into());
        }
        Ok(Vec::new())
    }

    async fn run_eager(
        &self,
        node: &CommandExpression,
        ctx: &EagerContext<'_>,
    ) -> anyhow::Result<Option<BindingResolver>> {
        let Some((module, alias)) = node.args.first().and_then(module_reference) else {
            return Ok(None);
        };
        if !ctx.registry.contains(module) {
            return Ok(None);
        }
        let module = module.to_string();
        let alias = alias.map(String::from);
        Ok(Some(Box::new(move |bindings: &mut BindingsManager| {
            bind_module(bindings, &module, alias.as_deref())?;
            Ok(())
        })))
    }
}
