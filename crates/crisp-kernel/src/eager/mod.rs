//! Eager execution: speculative binding resolution for the editor.
//!
//! # Architecture
//!
//! - [`source`] recovers the commands above the caret and the command on
//!   the caret line from a script that is usually mid-edit.
//! - Only commands that can affect the caret are visited: top-level ones,
//!   those in blocks enclosing the caret, and the caret line's own.
//! - Every visible command's `run_eager` hook runs concurrently. The
//!   resolvers they return are then applied one at a time in source order.
//! - Nothing here fails: an unparseable line, an unknown command or an
//!   erroring hook only means fewer bindings.

mod completion;
mod source;

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;

use crisp_types::Value;

use crate::ast::{CommandExpression, NodeKind, Program};
use crate::bindings::{BindingSpace, BindingsManager, Memo};
use crate::config::EngineConfig;
use crate::host::Host;
use crate::modules::builtin::module_reference;
use crate::modules::{BlockModule, Command, EagerContext, ModuleContext, ModuleRegistry};

pub use completion::{CompletionCategory, CompletionItem};
pub(crate) use completion::complete;

/// Editor caret: 1-based line, 0-based byte column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Caret {
    pub line: usize,
    pub col: usize,
}

impl Caret {
    pub fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

/// The command on the caret line and what it resolved to.
#[derive(Clone)]
pub struct CurrentCommand {
    pub node: CommandExpression,
    pub resolved: Option<(ModuleContext, Arc<dyn Command>)>,
}

/// Result of an eager pass.
pub struct EagerOutcome {
    /// Speculative bindings visible at the caret, seeded from the cache.
    pub bindings: BindingsManager,
    pub caret: Caret,
    /// Module context commands at the caret inherit; `None` at top level.
    pub module: Option<ModuleContext>,
    pub current: Option<CurrentCommand>,
    /// Text of the caret line.
    pub line: String,
}

/// A command reachable from the caret.
struct Visible<'p> {
    node: &'p CommandExpression,
    depth: usize,
    /// Index of the command whose block contains this one.
    parent: Option<usize>,
}

/// Push visible commands of `body` in source order and return the index
/// of the innermost command whose block encloses the caret.
fn collect_visible<'p>(
    body: &'p [CommandExpression],
    caret: Caret,
    depth: usize,
    parent: Option<usize>,
    out: &mut Vec<Visible<'p>>,
) -> Option<usize> {
    let mut enclosing = parent;
    for command in body {
        if command.loc.is_some_and(|l| l.start.line >= caret.line) {
            continue;
        }
        let index = out.len();
        out.push(Visible {
            node: command,
            depth,
            parent,
        });
        for arg in &command.args {
            if let NodeKind::Block(inner) = &arg.kind
                && arg
                    .loc
                    .is_some_and(|l| l.start.line < caret.line && l.end.line >= caret.line)
            {
                enclosing = collect_visible(inner, caret, depth + 1, Some(index), out);
            }
        }
    }
    enclosing
}

/// `alias → module` pairs introduced by `name as alias` arguments.
fn discover_aliases(
    visible: &[Visible<'_>],
    registry: &ModuleRegistry,
) -> BTreeMap<String, String> {
    visible
        .iter()
        .flat_map(|v| v.node.args.iter())
        .filter(|arg| matches!(arg.kind, NodeKind::As { .. }))
        .filter_map(module_reference)
        .filter_map(|(module, alias)| Some((alias?.to_string(), module.to_string())))
        .filter(|(_, module)| registry.contains(module))
        .collect()
}

/// Run the eager pass for `source` with the caret at `caret`.
#[tracing::instrument(level = "debug", skip(registry, config, host, source, ast, cache))]
pub(crate) async fn run(
    registry: &ModuleRegistry,
    config: &EngineConfig,
    host: Arc<dyn Host>,
    source: &str,
    caret: Caret,
    ast: Option<&Program>,
    cache: &BindingsManager,
) -> EagerOutcome {
    let prepared = source::prepare(source, caret, ast);
    let mut bindings = BindingsManager::new();
    bindings.merge_bindings(cache);

    let mut outcome = EagerOutcome {
        bindings: BindingsManager::new(),
        caret,
        module: None,
        current: None,
        line: prepared.line.clone(),
    };
    let Some(baseline) = registry.get(&config.baseline_module).map(ModuleContext::new) else {
        tracing::debug!(baseline = %config.baseline_module, "baseline module not registered");
        outcome.bindings = bindings;
        return outcome;
    };

    let mut visible = Vec::new();
    let enclosing = collect_visible(&prepared.commands, caret, 0, None, &mut visible);
    let caret_depth = enclosing.map(|i| visible[i].depth + 1).unwrap_or(0);
    if let Some(current) = &prepared.current {
        visible.push(Visible {
            node: current,
            depth: caret_depth,
            parent: enclosing,
        });
    }

    let aliases = discover_aliases(&visible, registry);
    let lookup = |prefix: &str| -> Option<ModuleContext> {
        if let Some(module) = aliases.get(prefix).and_then(|m| registry.get(m)) {
            return Some(ModuleContext::aliased(module, prefix));
        }
        if let Memo::Present(Value::String(target)) =
            cache.get_binding_value(prefix, BindingSpace::Alias)
            && let Some(module) = registry.get(target)
        {
            return Some(ModuleContext::aliased(module, prefix));
        }
        registry.get(prefix).map(ModuleContext::new)
    };

    // Resolve in source order; a block's commands inherit from their parent.
    let mut resolved: Vec<Option<(ModuleContext, Arc<dyn Command>)>> = Vec::new();
    let mut block_modules: Vec<Option<ModuleContext>> = Vec::new();
    for item in &visible {
        let inherited = item.parent.and_then(|p| block_modules[p].clone());
        let found = registry
            .resolve_command(item.node, inherited.as_ref(), &baseline, &lookup)
            .map_err(|err| tracing::debug!(%err, "eager resolution failed"))
            .ok();
        let block_module = match &found {
            Some((module, command)) if command.schema().block_module == BlockModule::Own => {
                Some(module.clone())
            }
            _ => inherited,
        };
        resolved.push(found);
        block_modules.push(block_module);
    }

    // Closest occurrence first, so the flag lands on the one nearest the caret.
    let mut seen = HashSet::new();
    let mut jobs = Vec::new();
    for (index, found) in resolved.iter().enumerate().rev() {
        let Some((module, command)) = found else {
            continue;
        };
        let closest = seen.insert((module.name().to_string(), command.name().to_string()));
        let ctx = EagerContext {
            cache,
            module: module.clone(),
            registry,
            host: host.clone(),
            config,
            is_closest_command_to_caret: closest,
            caret,
        };
        jobs.push((index, command.clone(), ctx));
    }

    let results = join_all(
        jobs.iter()
            .map(|(index, command, ctx)| command.run_eager(visible[*index].node, ctx)),
    )
    .await;

    for ((index, command, _), result) in jobs.iter().zip(results).rev() {
        let item = &visible[*index];
        while bindings.depth() < item.depth {
            bindings.enter_scope();
        }
        match result {
            Ok(Some(resolver)) => {
                if let Err(err) = resolver(&mut bindings) {
                    tracing::debug!(command = command.name(), %err, "eager resolver failed");
                }
            }
            Ok(None) => {}
            Err(err) => tracing::debug!(command = command.name(), %err, "eager hook failed"),
        }
    }
    while bindings.depth() < caret_depth {
        bindings.enter_scope();
    }

    outcome.bindings = bindings;
    outcome.module = enclosing.and_then(|i| block_modules[i].clone());
    outcome.current = prepared.current.as_ref().map(|node| CurrentCommand {
        node: node.clone(),
        resolved: resolved.last().cloned().flatten(),
    });
    outcome
}
