//! Completion suggestions at the caret.

use serde::Serialize;

use crate::bindings::{BindingSpace, BindingsFilter};
use crate::config::EngineConfig;
use crate::modules::{CompletionContext, ModuleRegistry};

use super::EagerOutcome;
use super::source::{clamp_col, word_before};

/// What a suggestion stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionCategory {
    Command,
    Variable,
    ArgumentValue,
    Helper,
}

/// One editor suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionItem {
    pub label: String,
    pub insert_text: String,
    pub category: CompletionCategory,
}

impl CompletionItem {
    pub fn new(label: impl Into<String>, category: CompletionCategory) -> Self {
        let label = label.into();
        Self {
            insert_text: label.clone(),
            label,
            category,
        }
    }

    pub fn with_insert_text(mut self, text: impl Into<String>) -> Self {
        self.insert_text = text.into();
        self
    }
}

/// Suggestions for the caret of an eager pass, filtered by the word
/// being typed.
pub(crate) fn complete(
    outcome: &EagerOutcome,
    registry: &ModuleRegistry,
    config: &EngineConfig,
) -> Vec<CompletionItem> {
    let col = clamp_col(&outcome.line, outcome.caret.col);
    let word = word_before(&outcome.line, col);
    // Still on the first token of the line: nothing but the name typed so far.
    let on_name = !outcome.line[..col].trim_start().contains(char::is_whitespace);

    let mut items = if word.starts_with('@') {
        helper_items(outcome, registry, config)
    } else if word.starts_with("--") {
        option_items(outcome)
    } else if on_name {
        command_items(outcome, registry, config)
    } else {
        argument_items(outcome, registry, config)
    };

    items.retain(|item| item.label.starts_with(word));
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(item.label.clone()));
    items
}

fn command_items(
    outcome: &EagerOutcome,
    registry: &ModuleRegistry,
    config: &EngineConfig,
) -> Vec<CompletionItem> {
    let command = |label: String| {
        let insert = format!("{label} ");
        CompletionItem::new(label, CompletionCategory::Command).with_insert_text(insert)
    };

    let mut items = Vec::new();
    let unprefixed = outcome
        .module
        .iter()
        .map(|m| m.module.clone())
        .chain(registry.get(&config.baseline_module));
    for module in unprefixed {
        items.extend(module.command_names().map(|name| command(name.to_string())));
    }

    let aliases = outcome
        .bindings
        .get_all_bindings(&BindingsFilter::default().space(BindingSpace::Alias));
    let prefixed = aliases
        .iter()
        .filter_map(|b| {
            let module = registry.get(b.value.as_ref()?.as_str()?)?;
            Some((b.identifier.clone(), module))
        })
        .chain(
            registry
                .loaded_modules(&outcome.bindings)
                .into_iter()
                .map(|m| (m.name().to_string(), m)),
        );
    for (prefix, module) in prefixed {
        items.extend(
            module
                .command_names()
                .map(|name| command(format!("{prefix}:{name}"))),
        );
    }
    items
}

fn helper_items(
    outcome: &EagerOutcome,
    registry: &ModuleRegistry,
    config: &EngineConfig,
) -> Vec<CompletionItem> {
    let current = outcome
        .current
        .as_ref()
        .and_then(|c| c.resolved.as_ref())
        .map(|(module, _)| module.module.clone());
    current
        .into_iter()
        .chain(outcome.module.iter().map(|m| m.module.clone()))
        .chain(registry.get(&config.baseline_module))
        .chain(registry.loaded_modules(&outcome.bindings))
        .flat_map(|module| {
            module
                .helper_names()
                .map(|name| CompletionItem::new(format!("@{name}"), CompletionCategory::Helper))
                .collect::<Vec<_>>()
        })
        .collect()
}

fn option_items(outcome: &EagerOutcome) -> Vec<CompletionItem> {
    let Some((_, command)) = outcome.current.as_ref().and_then(|c| c.resolved.as_ref()) else {
        return Vec::new();
    };
    command
        .schema()
        .opts
        .iter()
        .map(|opt| {
            let label = format!("--{}", opt.name);
            let insert = format!("{label} ");
            CompletionItem::new(label, CompletionCategory::ArgumentValue).with_insert_text(insert)
        })
        .collect()
}

fn argument_items(
    outcome: &EagerOutcome,
    registry: &ModuleRegistry,
    config: &EngineConfig,
) -> Vec<CompletionItem> {
    let resolved = outcome
        .current
        .as_ref()
        .and_then(|current| Some((current, current.resolved.as_ref()?)));

    // An unparseable or unknown command still gets the variables in scope.
    let mut items = Vec::new();
    let mut declared = None;
    if let Some((current, (module, command))) = resolved {
        let caret = outcome.caret;
        let args = &current.node.args;
        let arg_index = args
            .iter()
            .filter(|arg| {
                arg.loc
                    .is_some_and(|l| l.end.line < caret.line || l.end.col < caret.col)
            })
            .count();

        let ctx = CompletionContext {
            bindings: &outcome.bindings,
            registry,
            module,
            config,
        };
        items.extend(
            command
                .completion_items_for_arg(arg_index, args, &ctx)
                .into_iter()
                .map(|label| CompletionItem::new(label, CompletionCategory::ArgumentValue)),
        );
        declared = command
            .schema()
            .declares_variable()
            .then(|| args.first().and_then(|a| a.identifier()))
            .flatten();
    }

    items.extend(
        outcome
            .bindings
            .get_all_bindings(&BindingsFilter::default().space(BindingSpace::User))
            .into_iter()
            .filter(|b| Some(b.identifier.as_str()) != declared)
            .map(|b| CompletionItem::new(b.identifier, CompletionCategory::Variable)),
    );
    items
}
