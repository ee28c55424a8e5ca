//! The embedder-supplied provider surface.
//!
//! The engine itself performs no I/O. Anything that needs the outside
//! world (the connected account, read-only contract calls, user-visible
//! output) goes through a [`Host`].

use async_trait::async_trait;
use crisp_types::{Address, Value};

#[async_trait]
pub trait Host: Send + Sync {
    /// The account scripts act as.
    async fn connected_account(&self) -> anyhow::Result<Address>;

    /// Read-only call: `target::method(args)`.
    async fn call(&self, target: Address, method: &str, args: &[Value]) -> anyhow::Result<Value>;

    /// Sink for `print` and command log output.
    fn log(&self, message: &str) {
        tracing::info!(target: "crisp::script", "{}", message);
    }
}

/// Host with no account and no provider; logs go to tracing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHost;

#[async_trait]
impl Host for NoopHost {
    async fn connected_account(&self) -> anyhow::Result<Address> {
        anyhow::bail!("no account connected")
    }

    async fn call(&self, target: Address, method: &str, _args: &[Value]) -> anyhow::Result<Value> {
        anyhow::bail!("no provider available for {}::{}", target, method)
    }
}
