//! Inkmill Worker — lazily spawned background execution contexts for
//! wikitext processing, with per-call deadlines and policy-driven recovery.
//!
//! The pieces, leaf-first:
//!
//! 1. **Operations** (`operation`): typed request/response variants for the
//!    RPC surface
//! 2. **Engine** (`engine`): the interchangeable pipeline seam behind the
//!    forwarded operations
//! 3. **Handle** (`handle`): lifecycle owner of one execution context, with
//!    single-flight spawning
//! 4. **Scheduler** (`scheduler`): the deadline race and recovery policy
//! 5. **Proxy** (`proxy`): the typed client facade

pub mod config;
pub mod engine;
pub mod error;
pub mod handle;
pub mod operation;
pub mod proxy;
pub mod scheduler;

// Re-export key types for convenient access.
pub use config::{InitHook, WorkerConfig};
pub use engine::{PlainEngine, Rendered, WikitextEngine};
pub use error::WorkerError;
pub use handle::{ContextClient, EngineFactory, WorkerHandle, WorkerState};
pub use operation::{
    ParseOutcome, ParseWarning, RenderTrace, Span, SyntaxNode, SyntaxTree, TokenSpan,
    WorkerRequest, WorkerResponse,
};
pub use proxy::WikitextProxy;
pub use scheduler::InvocationScheduler;
