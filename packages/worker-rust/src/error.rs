//! Error taxonomy for the worker runtime.
//!
//! No error here is fatal to the process; every failure is scoped to one
//! invocation. Spawn and init failures leave the handle uninitialized so a
//! later call may retry; a timeout is reported only after the configured
//! recovery action (terminate or restart) has been applied.

use inkmill_core::CodecError;

/// Errors surfaced by `WorkerHandle` and `InvocationScheduler`.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// The execution context failed to start (engine construction failed).
    #[error("execution context failed to spawn: {0}")]
    Spawn(#[source] anyhow::Error),

    /// The per-spawn init hook failed.
    #[error("init hook failed: {0}")]
    Init(#[source] anyhow::Error),

    /// The deadline elapsed before the operation settled.
    #[error("operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The execution context went away before replying. Seen when a call
    /// races a teardown triggered elsewhere.
    #[error("execution context closed before replying")]
    ContextClosed,

    /// The context replied with a response shape the operation does not
    /// produce. Indicates a dispatch bug, not a caller mistake.
    #[error("unexpected response shape for `{operation}`")]
    UnexpectedResponse { operation: &'static str },

    /// Transfer codec failure. Local and synchronous; never triggers
    /// worker teardown.
    #[error(transparent)]
    Codec(#[from] CodecError),
}
