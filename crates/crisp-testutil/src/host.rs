//! In-memory host.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crisp_kernel::Host;
use crisp_types::{Address, Value};

/// Host answering calls from a fixed table and recording log lines.
#[derive(Debug, Default)]
pub struct MemoryHost {
    account: Option<Address>,
    responses: HashMap<(Address, String), Value>,
    logs: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(mut self, account: Address) -> Self {
        self.account = Some(account);
        self
    }

    /// Answer `target::method(..)` with `value`, whatever the arguments.
    pub fn with_response(mut self, target: Address, method: &str, value: Value) -> Self {
        self.responses.insert((target, method.to_string()), value);
        self
    }

    pub fn logs(&self) -> Vec<String> {
        self.logs.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Number of `call`s answered or refused so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Host for MemoryHost {
    async fn connected_account(&self) -> anyhow::Result<Address> {
        self.account
            .ok_or_else(|| anyhow::anyhow!("no account connected"))
    }

    async fn call(&self, target: Address, method: &str, _args: &[Value]) -> anyhow::Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .get(&(target, method.to_string()))
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("{} has no method {}", target, method))
    }

    fn log(&self, message: &str) {
        tracing::info!(target: "crisp::script", "{}", message);
        if let Ok(mut logs) = self.logs.lock() {
            logs.push(message.to_string());
        }
    }
}
