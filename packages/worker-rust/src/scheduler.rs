//! Invocation scheduling: the deadline race and the recovery policy.
//!
//! Invocations sharing one handle are serialized through a single async
//! mutex. The alternative (reference-counted teardown) was considered and
//! rejected: the usage pattern is one persistent worker with occasional
//! calls, where serialization is simpler and removes the restart-vs-pending
//! race entirely.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::WorkerError;
use crate::handle::WorkerHandle;
use crate::operation::{WorkerRequest, WorkerResponse};

/// Runs operations against a [`WorkerHandle`] under the handle's policy.
pub struct InvocationScheduler {
    handle: Arc<WorkerHandle>,
    /// Serializes invocations so a timeout-triggered teardown can never
    /// yank the context out from under another in-flight call.
    invoke_lock: Mutex<()>,
}

impl InvocationScheduler {
    #[must_use]
    pub fn new(handle: Arc<WorkerHandle>) -> Self {
        Self {
            handle,
            invoke_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn handle(&self) -> &Arc<WorkerHandle> {
        &self.handle
    }

    /// Run one operation: ensure the worker is ready, race the call against
    /// the configured deadline, and apply the recovery policy.
    ///
    /// The outcome discriminator is the race itself, never the payload: an
    /// empty buffer or empty list is a success. On timeout the recovery
    /// action (restart when `persist`, terminate otherwise) completes before
    /// the error is returned, so callers never observe a handle mid-recovery.
    ///
    /// # Errors
    ///
    /// Propagates [`WorkerError::Spawn`] and [`WorkerError::Init`] from
    /// `ensure_ready` unchanged; returns [`WorkerError::Timeout`] when the
    /// deadline elapses first; [`WorkerError::ContextClosed`] if the context
    /// died mid-call.
    pub async fn invoke(&self, request: WorkerRequest) -> Result<WorkerResponse, WorkerError> {
        let _serialized = self.invoke_lock.lock().await;

        let client = self.handle.client().await?;
        let persist = self.handle.config().persist;
        let timeout_ms = self.handle.config().timeout_ms;
        let operation = request.name();

        debug!(worker = %self.handle.name(), operation, "dispatching operation");
        let pending = client.call(request);

        let settled = if timeout_ms > 0 {
            match tokio::time::timeout(Duration::from_millis(timeout_ms), pending).await {
                Ok(settled) => settled,
                Err(_elapsed) => {
                    warn!(
                        worker = %self.handle.name(),
                        operation,
                        timeout_ms,
                        "operation timed out"
                    );
                    if persist {
                        if let Err(error) = self.handle.restart().await {
                            // Recovery failed; the handle is uninitialized
                            // and the next invoke will retry the spawn.
                            warn!(
                                worker = %self.handle.name(),
                                %error,
                                "restart after timeout failed"
                            );
                        }
                    } else {
                        self.handle.terminate().await;
                    }
                    return Err(WorkerError::Timeout { timeout_ms });
                }
            }
        } else {
            pending.await
        };

        match settled {
            Ok(response) => {
                if !persist {
                    self.handle.terminate().await;
                }
                Ok(response)
            }
            Err(error) => {
                // The context died mid-call; clear the dead slot so the
                // next invoke respawns.
                self.handle.terminate().await;
                Err(error)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
