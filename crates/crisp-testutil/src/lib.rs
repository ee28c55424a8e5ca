//! Test fixtures for crisp.
//!
//! - [`MemoryHost`]: a [`Host`](crisp_kernel::Host) with canned call
//!   responses and captured log lines
//! - [`dao`]: a small organization module exercising blocks, module
//!   switching and eager hooks
//! - [`sexpr`]: compact AST rendering for snapshot tests

pub mod dao;
pub mod host;
pub mod sexpr;

use std::sync::Arc;

use crisp_kernel::{Engine, EngineConfig};

pub use host::MemoryHost;

/// Install a tracing subscriber honouring `RUST_LOG`. Safe to call from
/// every test.
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer())
        .with(EnvFilter::from_default_env())
        .try_init();
}

/// Engine with the builtin and `dao` modules over `host`.
pub fn engine(host: Arc<MemoryHost>) -> Engine {
    engine_with_config(host, EngineConfig::named("test"))
}

pub fn engine_with_config(host: Arc<MemoryHost>, config: EngineConfig) -> Engine {
    init_tracing();
    let mut registry = crisp_kernel::modules::ModuleRegistry::with_builtins();
    registry.register(dao::module());
    match Engine::new(registry, config, host) {
        Ok(engine) => engine,
        Err(err) => panic!("test engine: {err}"),
    }
}
