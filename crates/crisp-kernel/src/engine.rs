//! The embedding surface: one engine per module registry and host.

use std::sync::Arc;

use crisp_types::Action;

use crate::ast::Program;
use crate::bindings::BindingsManager;
use crate::config::EngineConfig;
use crate::eager::{self, Caret, CompletionItem, EagerOutcome};
use crate::error::{Error, ResolutionKind, Result};
use crate::host::{Host, NoopHost};
use crate::interpreter::Interpreter;
use crate::modules::ModuleRegistry;
use crate::parser::parse;

/// Parses, interprets and completes scripts.
///
/// The engine holds no per-script state: every call starts from fresh
/// bindings, apart from the cache a caller hands to the eager calls.
#[derive(Clone)]
pub struct Engine {
    modules: Arc<ModuleRegistry>,
    config: Arc<EngineConfig>,
    host: Arc<dyn Host>,
}

impl Engine {
    /// Create an engine. Fails if the configured baseline module is not
    /// registered.
    pub fn new(modules: ModuleRegistry, config: EngineConfig, host: Arc<dyn Host>) -> Result<Self> {
        if !modules.contains(&config.baseline_module) {
            return Err(Error::resolution(
                ResolutionKind::Module,
                &config.baseline_module,
                None,
            ));
        }
        tracing::debug!(
            name = %config.name,
            modules = ?modules.names().collect::<Vec<_>>(),
            "engine created"
        );
        Ok(Self {
            modules: Arc::new(modules),
            config: Arc::new(config),
            host,
        })
    }

    /// Engine with only the builtin module and no host I/O.
    pub fn transient() -> Result<Self> {
        Self::new(
            ModuleRegistry::with_builtins(),
            EngineConfig::default(),
            Arc::new(NoopHost),
        )
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.modules
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn host(&self) -> Arc<dyn Host> {
        self.host.clone()
    }

    /// Fresh interpreter sharing this engine's registry, config and host.
    pub fn interpreter(&self) -> Result<Interpreter> {
        Interpreter::new(self.modules.clone(), self.config.clone(), self.host.clone())
    }

    /// Parse and fully interpret `source`, returning its actions in order.
    #[tracing::instrument(level = "info", skip(self, source), fields(source_len = source.len()))]
    pub async fn interpret(&self, source: &str) -> Result<Vec<Action>> {
        let program = parse(source).map_err(Error::Parse)?;
        self.interpret_program(&program).await
    }

    pub async fn interpret_program(&self, program: &Program) -> Result<Vec<Action>> {
        let mut interpreter = self.interpreter()?;
        let actions = interpreter.interpret(program).await?;
        tracing::debug!(actions = actions.len(), "interpretation finished");
        Ok(actions)
    }

    /// Speculatively resolve the bindings visible at `caret`.
    ///
    /// `ast` is the last program that parsed cleanly; it is used when the
    /// text above the caret does not. Never fails.
    pub async fn eager(
        &self,
        source: &str,
        caret: Caret,
        ast: Option<&Program>,
        cache: &BindingsManager,
    ) -> EagerOutcome {
        eager::run(
            &self.modules,
            &self.config,
            self.host.clone(),
            source,
            caret,
            ast,
            cache,
        )
        .await
    }

    /// Completion suggestions at `caret`.
    pub async fn complete(
        &self,
        source: &str,
        caret: Caret,
        ast: Option<&Program>,
        cache: &BindingsManager,
    ) -> Vec<CompletionItem> {
        let outcome = self.eager(source, caret, ast, cache).await;
        eager::complete(&outcome, &self.modules, &self.config)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("modules", &self.modules)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
