//! Worker configuration.

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::handle::ContextClient;

/// Hook run exactly once per spawn, against the fresh context, before any
/// caller operation is serviced. Typical use is warming the engine with a
/// first call so later invocations hit a loaded pipeline.
pub type InitHook =
    Arc<dyn Fn(ContextClient) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Policy for one worker handle. Immutable for the handle's lifetime.
#[derive(Clone)]
pub struct WorkerConfig {
    /// Keep the worker warm across calls. When false the context is torn
    /// down after every call (one-shot worker).
    pub persist: bool,
    /// Per-call deadline in milliseconds. Zero means no deadline: the
    /// operation is awaited to completion.
    pub timeout_ms: u64,
    /// Optional per-spawn initialization hook.
    pub init: Option<InitHook>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            persist: false,
            timeout_ms: 10_000,
            init: None,
        }
    }
}

impl fmt::Debug for WorkerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerConfig")
            .field("persist", &self.persist)
            .field("timeout_ms", &self.timeout_ms)
            .field("init", &self.init.as_ref().map(|_| "<hook>"))
            .finish()
    }
}
