//! Eager execution and completion tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crisp_kernel::ast::CommandExpression;
use crisp_kernel::modules::{
    ArgSpec, ArgType, BindingResolver, Command, CommandArgs, CommandSchema, EagerContext,
    ExecContext, Module, ModuleRegistry,
};
use crisp_kernel::{
    Action, BindingSpace, BindingsManager, Caret, CompletionCategory, CompletionItem,
    Engine, EngineConfig, Memo, Value, parse,
};
use crisp_testutil::{MemoryHost, dao, engine, init_tracing};
use rstest::rstest;

const DAO: &str = "0x1111111111111111111111111111111111111111";
const VOTING: &str = "0x2222222222222222222222222222222222222222";

fn dao_host() -> MemoryHost {
    MemoryHost::new().with_response(
        DAO.parse().unwrap(),
        dao::APPS_METHOD,
        Value::Array(vec![Value::Array(vec![
            Value::from("voting"),
            Value::Address(VOTING.parse().unwrap()),
        ])]),
    )
}

fn labels(items: &[CompletionItem]) -> Vec<&str> {
    items.iter().map(|i| i.label.as_str()).collect()
}

/// Caret at the end of the last line of `source`.
fn end_of(source: &str) -> Caret {
    let line = source.split('\n').count();
    let col = source.rsplit('\n').next().map(str::len).unwrap_or(0);
    Caret::new(line, col)
}

async fn complete(engine: &Engine, source: &str) -> Vec<CompletionItem> {
    engine
        .complete(source, end_of(source), None, &BindingsManager::new())
        .await
}

// =============================================================================
// VARIABLES
// =============================================================================

#[tokio::test]
async fn completes_earlier_variables_but_not_the_one_being_declared() {
    let engine = engine(Arc::new(MemoryHost::new()));
    let items = complete(&engine, "set $a 1\nset $b ").await;
    assert_eq!(
        items,
        vec![CompletionItem::new("$a", CompletionCategory::Variable)]
    );
}

#[tokio::test]
async fn declared_variable_is_excluded_at_both_argument_positions() {
    let engine = engine(Arc::new(MemoryHost::new()));
    let mut cache = BindingsManager::new();
    cache
        .set_binding("$b", Some(Value::from(1)), BindingSpace::User, false)
        .unwrap();
    cache
        .set_binding("$bb", Some(Value::from(2)), BindingSpace::User, false)
        .unwrap();

    let source = "set $b";
    let items = engine.complete(source, end_of(source), None, &cache).await;
    assert_eq!(labels(&items), vec!["$bb"]);

    let source = "set $b $";
    let items = engine.complete(source, end_of(source), None, &cache).await;
    assert_eq!(labels(&items), vec!["$bb"]);
}

#[rstest]
#[case::open_array("set $a 1\nset $b [1, ")]
#[case::open_group("set $a 1\nset $b ($a + ")]
#[tokio::test]
async fn unparseable_argument_position_offers_variables(#[case] source: &str) {
    let engine = engine(Arc::new(MemoryHost::new()));
    let items = complete(&engine, source).await;
    assert_eq!(
        items,
        vec![CompletionItem::new("$a", CompletionCategory::Variable)]
    );
}

#[tokio::test]
async fn helpers_complete_inside_an_open_group() {
    let engine = engine(Arc::new(MemoryHost::new()));
    let items = complete(&engine, "set $y (@da").await;
    assert_eq!(
        items,
        vec![CompletionItem::new("@date", CompletionCategory::Helper)]
    );
}

#[tokio::test]
async fn oversized_literal_does_not_stall_completion() {
    let engine = engine(Arc::new(MemoryHost::new()));
    let source = "set $x 1e30000000\nset $q (10 ^ 30000000)\nset $y ";
    let items = tokio::time::timeout(std::time::Duration::from_secs(5), complete(&engine, source))
        .await
        .unwrap();
    assert_eq!(labels(&items), vec!["$q", "$x"]);
}

#[tokio::test]
async fn eager_bindings_evaluate_static_arithmetic() {
    let engine = engine(Arc::new(MemoryHost::new()));
    let source = "set $x 5\nset $y ($x + 3)\nset $z @me\n";
    let outcome = engine
        .eager(source, Caret::new(4, 0), None, &BindingsManager::new())
        .await;
    assert_eq!(
        outcome.bindings.get_binding_value("$y", BindingSpace::User),
        Memo::Present(&Value::from(8))
    );
    // Helpers need the host, so the value stays unknown.
    assert_eq!(
        outcome.bindings.get_binding_value("$z", BindingSpace::User),
        Memo::Absent
    );
}

#[tokio::test]
async fn cached_bindings_are_offered() {
    let engine = engine(Arc::new(MemoryHost::new()));
    let mut cache = BindingsManager::new();
    cache
        .set_binding("$cached", Some(Value::from(1)), BindingSpace::User, false)
        .unwrap();
    let items = engine
        .complete("print ", Caret::new(1, 6), None, &cache)
        .await;
    assert_eq!(labels(&items), vec!["$cached"]);
}

#[tokio::test]
async fn partial_word_filters_suggestions() {
    let engine = engine(Arc::new(MemoryHost::new()));
    let items = complete(&engine, "set $apple 1\nset $avocado 2\nset $berry 3\nprint $a").await;
    assert_eq!(labels(&items), vec!["$apple", "$avocado"]);
}

// =============================================================================
// BLOCKS
// =============================================================================

#[tokio::test]
async fn open_block_is_auto_closed_and_its_bindings_visible() {
    let engine = engine(Arc::new(MemoryHost::new()));
    let source = format!("load dao\ndao:connect {DAO} (\n  set $inside 1\n  print ");
    let items = complete(&engine, &source).await;
    assert!(labels(&items).contains(&"$inside"), "got {items:?}");
}

#[tokio::test]
async fn closed_block_bindings_are_invisible() {
    let engine = engine(Arc::new(MemoryHost::new()));
    let source = format!("load dao\ndao:connect {DAO} (\n  set $hidden 1\n)\nset $outer 2\nprint ");
    let items = complete(&engine, &source).await;
    assert_eq!(labels(&items), vec!["$outer"]);
}

#[tokio::test]
async fn apps_of_the_enclosing_dao_complete_address_arguments() {
    let engine = engine(Arc::new(dao_host()));
    let source = format!("load dao\ndao:connect {DAO} (\n  grant @me ");
    let items = complete(&engine, &source).await;
    assert!(
        items.contains(&CompletionItem::new("voting", CompletionCategory::ArgumentValue)),
        "got {items:?}"
    );
}

#[tokio::test]
async fn falls_back_to_last_good_ast() {
    let engine = engine(Arc::new(MemoryHost::new()));
    let good = parse("set $kept 1\nset $other 2").unwrap();
    let source = "set $kept 1\nset $other [1,\nprint ";
    let items = engine
        .complete(source, end_of(source), Some(&good), &BindingsManager::new())
        .await;
    assert_eq!(labels(&items), vec!["$kept", "$other"]);
}

// =============================================================================
// COMMANDS, HELPERS, OPTIONS
// =============================================================================

#[tokio::test]
async fn empty_line_offers_commands() {
    let engine = engine(Arc::new(MemoryHost::new()));
    let items = complete(&engine, "set $a 1\n").await;
    assert_eq!(labels(&items), vec!["exec", "load", "print", "set"]);
    assert!(items.iter().all(|i| i.category == CompletionCategory::Command));
    assert_eq!(items[0].insert_text, "exec ");
}

#[tokio::test]
async fn loaded_modules_offer_prefixed_commands() {
    let engine = engine(Arc::new(MemoryHost::new()));
    let items = complete(&engine, "load dao as org\nor").await;
    assert_eq!(
        labels(&items),
        vec!["org:connect", "org:grant", "org:install"]
    );
}

#[tokio::test]
async fn inside_a_block_the_block_module_commands_come_first() {
    let engine = engine(Arc::new(MemoryHost::new()));
    let source = format!("load dao\ndao:connect {DAO} (\n  ");
    let items = complete(&engine, &source).await;
    let labels = labels(&items);
    assert_eq!(&labels[..3], &["connect", "grant", "install"]);
    assert!(labels.contains(&"set"));
    assert!(labels.contains(&"dao:install"));
}

#[tokio::test]
async fn helpers_after_at_sign() {
    let engine = engine(Arc::new(MemoryHost::new()));
    let items = complete(&engine, "print @").await;
    assert_eq!(labels(&items), vec!["@date", "@get", "@me"]);
    assert!(items.iter().all(|i| i.category == CompletionCategory::Helper));
}

#[tokio::test]
async fn options_after_double_dash() {
    let engine = engine(Arc::new(MemoryHost::new()));
    let items = complete(&engine, &format!("exec {VOTING} \"f()\" --")).await;
    assert_eq!(labels(&items), vec!["--value", "--from"]);
}

#[tokio::test]
async fn module_arguments_list_registered_modules() {
    let engine = engine(Arc::new(MemoryHost::new()));
    let items = complete(&engine, "load ").await;
    assert_eq!(
        items,
        vec![CompletionItem::new("dao", CompletionCategory::ArgumentValue)]
    );
}

#[tokio::test]
async fn command_specific_argument_values() {
    let engine = engine(Arc::new(MemoryHost::new()));
    let items = complete(&engine, "load dao\ndao:install v").await;
    assert_eq!(labels(&items), vec!["vault", "voting"]);
}

// =============================================================================
// HOOK SCHEDULING
// =============================================================================

type Log = Arc<Mutex<Vec<String>>>;

/// `mark <label>`: records when its hook runs and when its resolver is
/// applied.
struct Mark {
    hooks: Log,
    applied: Log,
}

fn label_of(node: &CommandExpression) -> String {
    node.args
        .first()
        .and_then(|a| a.identifier())
        .unwrap_or("-")
        .to_string()
}

#[async_trait]
impl Command for Mark {
    fn name(&self) -> &str {
        "mark"
    }

    fn schema(&self) -> CommandSchema {
        CommandSchema::new("mark", "Record eager scheduling")
            .arg(ArgSpec::optional("label", ArgType::Identifier))
    }

    async fn run(
        &self,
        _args: CommandArgs,
        _ctx: &mut ExecContext<'_>,
    ) -> anyhow::Result<Vec<Action>> {
        Ok(Vec::new())
    }

    async fn run_eager(
        &self,
        node: &CommandExpression,
        ctx: &EagerContext<'_>,
    ) -> anyhow::Result<Option<BindingResolver>> {
        let label = label_of(node);
        self.hooks
            .lock()
            .unwrap()
            .push(format!("{}:{}", label, ctx.is_closest_command_to_caret));
        let applied = self.applied.clone();
        Ok(Some(Box::new(move |_: &mut BindingsManager| {
            applied.lock().unwrap().push(label);
            Ok(())
        })))
    }
}

#[tokio::test]
async fn only_the_closest_hook_is_flagged_and_resolvers_apply_in_order() {
    init_tracing();
    let hooks: Log = Arc::default();
    let applied: Log = Arc::default();
    let mut registry = ModuleRegistry::with_builtins();
    registry.register(Module::new("rec", "Recorder").with_command(Mark {
        hooks: hooks.clone(),
        applied: applied.clone(),
    }));
    let engine =
        Engine::new(registry, EngineConfig::editor(), Arc::new(MemoryHost::new())).unwrap();

    let source = "rec:mark a\nrec:mark b\nrec:mark ";
    engine
        .eager(source, end_of(source), None, &BindingsManager::new())
        .await;

    let mut hooks = hooks.lock().unwrap().clone();
    hooks.sort();
    assert_eq!(hooks, vec!["-:true", "a:false", "b:false"]);
    assert_eq!(*applied.lock().unwrap(), vec!["a", "b", "-"]);
}

#[tokio::test]
async fn failing_hooks_are_swallowed() {
    // No getApps response: the connect hook errors, completion still works.
    let engine = engine(Arc::new(MemoryHost::new()));
    let source = format!("set $a 1\nload dao\ndao:connect {DAO} (\n  grant $");
    let items = complete(&engine, &source).await;
    assert_eq!(labels(&items), vec!["$a"]);
}

#[tokio::test]
async fn outcome_bindings_can_refill_the_cache() {
    let engine = engine(Arc::new(MemoryHost::new()));
    let mut cache = BindingsManager::new();
    let outcome = engine
        .eager("load dao as org\nset $n 3\n", Caret::new(3, 0), None, &cache)
        .await;
    cache.merge_bindings(&outcome.bindings);
    assert!(cache.has_binding("org", BindingSpace::Alias));
    assert_eq!(
        cache.get_binding_value("$n", BindingSpace::User),
        Memo::Present(&Value::from(3))
    );
}
