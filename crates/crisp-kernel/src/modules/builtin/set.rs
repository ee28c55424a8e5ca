//! set: Declare a variable in the current scope.

use async_trait::async_trait;

use crisp_types::Action;

use crate::ast::{CommandExpression, NodeKind};
use crate::bindings::{BindingSpace, BindingsManager};
use crate::interpreter::eval_pure;
use crate::modules::{
    ArgSpec, ArgType, BindingResolver, Command, CommandArgs, CommandSchema, EagerContext,
    ExecContext,
};

/// Set command: `set $name value`.
pub struct Set;

#[async_trait]
impl Command for Set {
    fn name(&self) -> &str {
        "set"
    }

    fn schema(&self) -> CommandSchema {
        CommandSchema::new("set", "Declare a variable in the current scope")
            .arg(ArgSpec::required("var", ArgType::Variable))
            .arg(ArgSpec::required("value", ArgType::Any))
    }

    async fn run(
        &self,
        args: CommandArgs,
        ctx: &mut ExecContext<'_>,
    ) -> anyhow::Result<Vec<Action>> {
        let Some(NodeKind::Variable(name)) = args.raw(0).map(|n| &n.kind) else {
            anyhow::bail!("first argument must be a variable");
        };
        let value = args.value(1).cloned().filter(|v| !v.is_null());
        ctx.set_binding(name.clone(), value, BindingSpace::User, false)?;
        Ok(Vec::new())
    }

    async fn run_eager(
        &self,
        node: &CommandExpression,
        _ctx: &EagerContext<'_>,
    ) -> anyhow::Result<Option<BindingResolver>> {
        let Some(NodeKind::Variable(name)) = node.args.first().map(|n| &n.kind) else {
            return Ok(None);
        };
        let name = name.clone();
        let value = node.args.get(1).cloned();

        // Evaluated at application time so earlier resolvers are visible.
        Ok(Some(Box::new(move |bindings: &mut BindingsManager| {
            let value = value.and_then(|v| eval_pure(&v, bindings));
            bindings.set_binding(name, value, BindingSpace::User, false)?;
            Ok(())
        })))
    }
}
