//! Demo `dao` module.
//!
//! `dao:connect <dao> ( ... )` runs its block under the `dao` module with
//! the organization's apps bound as address identifiers, and wraps the
//! block's actions in a single `forward` action.

use async_trait::async_trait;
use serde_json::json;

use crisp_kernel::ast::CommandExpression;
use crisp_kernel::modules::{
    ArgSpec, ArgType, BindingResolver, BlockModule, BlockOptions, Command, CommandArgs,
    CommandSchema, CompletionContext, EagerContext, ExecContext, Module,
};
use crisp_kernel::{BindingSpace, BindingsManager, Host};
use crisp_types::{Action, Address, Value};

/// Apps offered by `install` completion.
pub const CATALOG: &[&str] = &["agent", "finance", "vault", "voting"];

/// Method the host answers with `[[name, address], ...]`.
pub const APPS_METHOD: &str = "getApps";

pub fn module() -> Module {
    Module::new("dao", "Organization management")
        .with_command(Connect)
        .with_command(Install)
        .with_command(Grant)
}

/// Resolve a DAO argument: an address, or a name from the `daos` setting.
fn dao_address(value: &Value, setting: Option<&serde_json::Value>) -> anyhow::Result<Address> {
    match value {
        Value::Address(a) => Ok(*a),
        Value::String(name) => setting
            .and_then(|daos| daos.get(name))
            .and_then(|a| a.as_str())
            .ok_or_else(|| anyhow::anyhow!("unknown dao '{}'", name))?
            .parse()
            .map_err(|e| anyhow::anyhow!("dao '{}': {}", name, e)),
        other => anyhow::bail!("expected a dao address, got {}", other.type_name()),
    }
}

async fn fetch_apps(host: &dyn Host, dao: Address) -> anyhow::Result<Vec<(String, Address)>> {
    let apps = host.call(dao, APPS_METHOD, &[]).await?;
    let apps = apps
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("{} returned {}", APPS_METHOD, apps.type_name()))?;
    apps.iter()
        .map(|entry| match entry.as_array() {
            Some([Value::String(name), Value::Address(address)]) => Ok((name.clone(), *address)),
            _ => anyhow::bail!("malformed app entry {}", entry),
        })
        .collect()
}

fn bind_apps(
    bindings: &mut BindingsManager,
    dao: &str,
    apps: &[(String, Address)],
) -> anyhow::Result<()> {
    for (name, address) in apps {
        if !bindings.has_binding(name, BindingSpace::Address) {
            bindings.set_binding_with_parent(
                name.clone(),
                Some(Value::Address(*address)),
                BindingSpace::Address,
                dao,
                false,
            )?;
        }
    }
    Ok(())
}

pub struct Connect;

#[async_trait]
impl Command for Connect {
    fn name(&self) -> &str {
        "connect"
    }

    fn schema(&self) -> CommandSchema {
        CommandSchema::new("connect", "Run commands against an organization")
            .arg(ArgSpec::required("dao", ArgType::Any))
            .arg(ArgSpec::required("body", ArgType::Block))
            .block_module(BlockModule::Own)
    }

    async fn run(
        &self,
        args: CommandArgs,
        ctx: &mut ExecContext<'_>,
    ) -> anyhow::Result<Vec<Action>> {
        let dao_value = args
            .value(0)
            .ok_or_else(|| anyhow::anyhow!("missing dao"))?
            .clone();
        let dao = dao_address(&dao_value, ctx.setting("daos"))?;
        let apps = fetch_apps(ctx.host().as_ref(), dao).await?;
        let label = dao_value.to_string();

        let actions = ctx
            .interpret_block(
                BlockOptions::new()
                    .with_initializer(move |bindings| bind_apps(bindings, &label, &apps)),
            )
            .await?;

        Ok(vec![Action::new(
            "forward",
            json!({ "dao": dao, "actions": actions }),
        )])
    }

    async fn run_eager(
        &self,
        node: &CommandExpression,
        ctx: &EagerContext<'_>,
    ) -> anyhow::Result<Option<BindingResolver>> {
        // Farther occurrences rely on the cache filled by earlier passes.
        if !ctx.is_closest_command_to_caret {
            return Ok(None);
        }
        let Some(arg) = node.args.first() else {
            return Ok(None);
        };
        let dao_value = match arg.kind.clone() {
            crisp_kernel::ast::NodeKind::Address(a) => Value::Address(a),
            crisp_kernel::ast::NodeKind::Identifier(name) => Value::String(name),
            _ => return Ok(None),
        };
        let dao = dao_address(&dao_value, ctx.setting("daos"))?;
        let apps = fetch_apps(ctx.host.as_ref(), dao).await?;
        let label = dao_value.to_string();
        Ok(Some(Box::new(move |bindings: &mut BindingsManager| {
            bind_apps(bindings, &label, &apps)
        })))
    }
}

pub struct Install;

#[async_trait]
impl Command for Install {
    fn name(&self) -> &str {
        "install"
    }

    fn schema(&self) -> CommandSchema {
        CommandSchema::new("install", "Install an app from the catalog")
            .arg(ArgSpec::required("app", ArgType::Identifier))
    }

    async fn run(
        &self,
        args: CommandArgs,
        _ctx: &mut ExecContext<'_>,
    ) -> anyhow::Result<Vec<Action>> {
        let app = args
            .raw(0)
            .and_then(|n| n.identifier())
            .ok_or_else(|| anyhow::anyhow!("expected an app name"))?;
        if !CATALOG.contains(&app) {
            anyhow::bail!("unknown app '{}'", app);
        }
        Ok(vec![Action::new("install", json!({ "app": app }))])
    }

    fn completion_items_for_arg(
        &self,
        arg_index: usize,
        _args: &[crisp_kernel::ast::Node],
        _ctx: &CompletionContext<'_>,
    ) -> Vec<String> {
        match arg_index {
            0 => CATALOG.iter().map(|s| s.to_string()).collect(),
            _ => Vec::new(),
        }
    }
}

pub struct Grant;

#[async_trait]
impl Command for Grant {
    fn name(&self) -> &str {
        "grant"
    }

    fn schema(&self) -> CommandSchema {
        CommandSchema::new("grant", "Grant a role on an app")
            .arg(ArgSpec::required("entity", ArgType::Address))
            .arg(ArgSpec::required("app", ArgType::Address))
            .arg(ArgSpec::required("role", ArgType::String))
    }

    async fn run(
        &self,
        args: CommandArgs,
        _ctx: &mut ExecContext<'_>,
    ) -> anyhow::Result<Vec<Action>> {
        Ok(vec![Action::new(
            "grant",
            json!({
                "entity": args.address(0)?,
                "app": args.address(1)?,
                "role": args.string(2)?,
            }),
        )])
    }
}
