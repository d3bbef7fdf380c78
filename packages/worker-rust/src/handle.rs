//! Worker handle: lifecycle owner of one background execution context.
//!
//! The execution context is a spawned tokio task holding the engine and
//! servicing calls from an mpsc channel. The handle owns at most one live
//! context at a time; contexts are never reused after termination. Spawning
//! is single-flight: concurrent `ensure_ready` callers serialize on the
//! context slot, so exactly one engine construction and one init-hook run
//! happen per spawn, and every waiter observes the same Ready state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use inkmill_core::{extract, transfer, TransferValue, WikitextGrammar};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::WorkerConfig;
use crate::engine::WikitextEngine;
use crate::error::WorkerError;
use crate::operation::{WorkerRequest, WorkerResponse};

/// Creates the engine for a fresh execution context. Failure here is the
/// `Spawn` error case.
pub type EngineFactory = Arc<dyn Fn() -> anyhow::Result<Arc<dyn WikitextEngine>> + Send + Sync>;

/// Calls queued per context before senders block.
const CALL_CHANNEL_CAPACITY: usize = 16;

// ---------------------------------------------------------------------------
// Worker state
// ---------------------------------------------------------------------------

/// Lifecycle state of a worker handle.
///
/// State machine: `Uninitialized -> Spawning -> Ready`, back to
/// `Uninitialized` on spawn failure or termination. `Terminated` is only
/// observable transiently while a context is being torn down; the handle is
/// designed to cycle indefinitely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Uninitialized,
    Spawning,
    Ready,
    Terminated,
}

// ---------------------------------------------------------------------------
// Execution context
// ---------------------------------------------------------------------------

struct WorkerCall {
    request: WorkerRequest,
    reply: oneshot::Sender<WorkerResponse>,
}

/// Cheap handle for sending calls into a live execution context.
#[derive(Clone)]
pub struct ContextClient {
    calls: mpsc::Sender<WorkerCall>,
}

impl ContextClient {
    /// Send one request and await its reply.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::ContextClosed`] if the context was torn down
    /// before replying.
    pub async fn call(&self, request: WorkerRequest) -> Result<WorkerResponse, WorkerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.calls
            .send(WorkerCall {
                request,
                reply: reply_tx,
            })
            .await
            .map_err(|_| WorkerError::ContextClosed)?;
        reply_rx.await.map_err(|_| WorkerError::ContextClosed)
    }
}

/// The background execution unit: one task, one engine, one call channel.
struct ExecutionContext {
    calls: mpsc::Sender<WorkerCall>,
    join: JoinHandle<()>,
}

impl ExecutionContext {
    fn spawn(name: &str, engine: Arc<dyn WikitextEngine>) -> Self {
        let (calls, mut inbox) = mpsc::channel::<WorkerCall>(CALL_CHANNEL_CAPACITY);
        let worker_name = name.to_owned();

        let join = tokio::spawn(async move {
            let grammar = WikitextGrammar::new();
            while let Some(call) = inbox.recv().await {
                let response = execute(engine.as_ref(), &grammar, call.request).await;
                // The caller may have timed out and dropped its receiver.
                let _ = call.reply.send(response);
            }
            debug!(worker = %worker_name, "execution context drained");
        });

        Self { calls, join }
    }

    fn client(&self) -> ContextClient {
        ContextClient {
            calls: self.calls.clone(),
        }
    }

    /// Tear down the context. Aborts the task rather than draining it: an
    /// operation hung inside the engine must not be able to deliver a stale
    /// reply into a later call.
    async fn shutdown(self) {
        drop(self.calls);
        self.join.abort();
        let _ = self.join.await;
    }
}

/// Execute one request against the context's engine. The content-extraction
/// operations are serviced directly from `inkmill-core`; everything else
/// forwards to the engine. Outbound text is transfer-encoded.
async fn execute(
    engine: &dyn WikitextEngine,
    grammar: &WikitextGrammar,
    request: WorkerRequest,
) -> WorkerResponse {
    match request {
        WorkerRequest::Version => {
            WorkerResponse::Buffer(TransferValue::Text(engine.version().await).encode())
        }
        WorkerRequest::Preprocess { text } => {
            let document = transfer::decode(&text);
            WorkerResponse::Buffer(
                TransferValue::Text(engine.preprocess(&document).await).encode(),
            )
        }
        WorkerRequest::Tokenize { text } => {
            WorkerResponse::Tokens(engine.tokenize(&transfer::decode(&text)).await)
        }
        WorkerRequest::Parse { text } => {
            WorkerResponse::Parse(engine.parse(&transfer::decode(&text)).await)
        }
        WorkerRequest::Render { text } => {
            let rendered = engine.render(&transfer::decode(&text)).await;
            WorkerResponse::Render {
                html: TransferValue::Text(rendered.html).encode(),
                style: TransferValue::Text(rendered.style).encode(),
            }
        }
        WorkerRequest::RenderText { text } => {
            WorkerResponse::Buffer(
                TransferValue::Text(engine.render_text(&transfer::decode(&text)).await).encode(),
            )
        }
        WorkerRequest::DetailedRender { text } => {
            WorkerResponse::Trace(engine.detailed_render(&transfer::decode(&text)).await)
        }
        WorkerRequest::Warnings { text } => {
            WorkerResponse::Warnings(engine.warnings(&transfer::decode(&text)).await)
        }
        WorkerRequest::InspectTokens { text } => {
            WorkerResponse::Buffer(
                TransferValue::Text(engine.inspect_tokens(&transfer::decode(&text)).await)
                    .encode(),
            )
        }
        WorkerRequest::Extract { raw } => {
            let document = transfer::decode(&raw);
            WorkerResponse::Buffer(
                TransferValue::Text(extract::extract(&document, grammar)).encode(),
            )
        }
        WorkerRequest::Stats { raw } => WorkerResponse::Stats(extract::stats(&raw, grammar)),
    }
}

// ---------------------------------------------------------------------------
// WorkerHandle
// ---------------------------------------------------------------------------

/// Owns the lifecycle of one execution context.
pub struct WorkerHandle {
    name: String,
    factory: EngineFactory,
    config: WorkerConfig,
    /// The single context slot. The async mutex doubles as the single-flight
    /// spawn guard: whoever holds it while the slot is empty does the spawn.
    slot: Mutex<Option<ExecutionContext>>,
    state: ArcSwap<WorkerState>,
    spawn_count: AtomicU64,
}

impl WorkerHandle {
    #[must_use]
    pub fn new(name: impl Into<String>, factory: EngineFactory, config: WorkerConfig) -> Self {
        Self {
            name: name.into(),
            factory,
            config,
            slot: Mutex::new(None),
            state: ArcSwap::from_pointee(WorkerState::Uninitialized),
            spawn_count: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Current lifecycle state, lock-free.
    #[must_use]
    pub fn state(&self) -> WorkerState {
        **self.state.load()
    }

    /// How many contexts this handle has spawned over its lifetime.
    #[must_use]
    pub fn spawn_count(&self) -> u64 {
        self.spawn_count.load(Ordering::Relaxed)
    }

    /// Ensure a live, initialized context exists. Idempotent; concurrent
    /// callers collapse into one spawn.
    ///
    /// # Errors
    ///
    /// [`WorkerError::Spawn`] if the engine factory fails, or
    /// [`WorkerError::Init`] if the init hook fails. Either failure leaves
    /// the handle uninitialized so a later call may retry.
    pub async fn ensure_ready(&self) -> Result<(), WorkerError> {
        let mut slot = self.slot.lock().await;
        if slot.is_some() {
            return Ok(());
        }
        self.spawn_locked(&mut slot).await
    }

    /// Like [`Self::ensure_ready`], but hands back a client for the live
    /// context.
    ///
    /// # Errors
    ///
    /// Same as [`Self::ensure_ready`].
    pub async fn client(&self) -> Result<ContextClient, WorkerError> {
        let mut slot = self.slot.lock().await;
        if slot.is_none() {
            self.spawn_locked(&mut slot).await?;
        }
        slot.as_ref()
            .map(ExecutionContext::client)
            .ok_or(WorkerError::ContextClosed)
    }

    /// Release the execution context unconditionally. No-op when already
    /// uninitialized.
    pub async fn terminate(&self) {
        let mut slot = self.slot.lock().await;
        if let Some(context) = slot.take() {
            self.state.store(Arc::new(WorkerState::Terminated));
            debug!(worker = %self.name, "terminating execution context");
            context.shutdown().await;
        }
        self.state.store(Arc::new(WorkerState::Uninitialized));
    }

    /// Terminate and respawn as one logical step: callers inspecting state
    /// during a restart never observe an uninitialized gap.
    ///
    /// # Errors
    ///
    /// Same as [`Self::ensure_ready`] for the respawn half.
    pub async fn restart(&self) -> Result<(), WorkerError> {
        let mut slot = self.slot.lock().await;
        if let Some(context) = slot.take() {
            self.state.store(Arc::new(WorkerState::Spawning));
            debug!(worker = %self.name, "restarting execution context");
            context.shutdown().await;
        }
        self.spawn_locked(&mut slot).await
    }

    /// Spawn a fresh context into the (empty) slot. Caller holds the lock.
    async fn spawn_locked(
        &self,
        slot: &mut Option<ExecutionContext>,
    ) -> Result<(), WorkerError> {
        self.state.store(Arc::new(WorkerState::Spawning));
        debug!(worker = %self.name, "spawning execution context");

        let engine = match (self.factory)() {
            Ok(engine) => engine,
            Err(error) => {
                self.state.store(Arc::new(WorkerState::Uninitialized));
                warn!(worker = %self.name, %error, "engine factory failed");
                return Err(WorkerError::Spawn(error));
            }
        };

        let context = ExecutionContext::spawn(&self.name, engine);
        self.spawn_count.fetch_add(1, Ordering::Relaxed);

        if let Some(init) = &self.config.init {
            if let Err(error) = init(context.client()).await {
                context.shutdown().await;
                self.state.store(Arc::new(WorkerState::Uninitialized));
                warn!(worker = %self.name, %error, "init hook failed");
                return Err(WorkerError::Init(error));
            }
        }

        *slot = Some(context);
        self.state.store(Arc::new(WorkerState::Ready));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;

    use super::*;
    use crate::engine::PlainEngine;

    fn counting_factory(counter: Arc<AtomicU32>) -> EngineFactory {
        Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(PlainEngine::new()) as Arc<dyn WikitextEngine>)
        })
    }

    fn plain_factory() -> EngineFactory {
        counting_factory(Arc::new(AtomicU32::new(0)))
    }

    #[tokio::test]
    async fn ensure_ready_is_idempotent() {
        let factory_calls = Arc::new(AtomicU32::new(0));
        let handle = WorkerHandle::new(
            "w",
            counting_factory(factory_calls.clone()),
            WorkerConfig::default(),
        );

        handle.ensure_ready().await.unwrap();
        handle.ensure_ready().await.unwrap();
        handle.ensure_ready().await.unwrap();

        assert_eq!(factory_calls.load(Ordering::SeqCst), 1);
        assert_eq!(handle.spawn_count(), 1);
        assert_eq!(handle.state(), WorkerState::Ready);
    }

    #[tokio::test]
    async fn concurrent_ensure_ready_spawns_once() {
        let factory_calls = Arc::new(AtomicU32::new(0));
        let init_calls = Arc::new(AtomicU32::new(0));

        let init_counter = init_calls.clone();
        let config = WorkerConfig {
            init: Some(Arc::new(move |client: ContextClient| {
                let init_counter = init_counter.clone();
                Box::pin(async move {
                    init_counter.fetch_add(1, Ordering::SeqCst);
                    client.call(WorkerRequest::Version).await?;
                    Ok(())
                })
            })),
            ..WorkerConfig::default()
        };

        let handle = Arc::new(WorkerHandle::new(
            "w",
            counting_factory(factory_calls.clone()),
            config,
        ));

        let mut joins = Vec::new();
        for _ in 0..8 {
            let handle = handle.clone();
            joins.push(tokio::spawn(async move { handle.ensure_ready().await }));
        }
        for join in joins {
            join.await.unwrap().unwrap();
        }

        assert_eq!(factory_calls.load(Ordering::SeqCst), 1);
        assert_eq!(init_calls.load(Ordering::SeqCst), 1);
        assert_eq!(handle.state(), WorkerState::Ready);
    }

    #[tokio::test]
    async fn terminate_when_uninitialized_is_noop() {
        let handle = WorkerHandle::new("w", plain_factory(), WorkerConfig::default());
        handle.terminate().await;
        assert_eq!(handle.state(), WorkerState::Uninitialized);
        assert_eq!(handle.spawn_count(), 0);
    }

    #[tokio::test]
    async fn terminate_releases_context_for_lazy_respawn() {
        let handle = WorkerHandle::new("w", plain_factory(), WorkerConfig::default());
        handle.ensure_ready().await.unwrap();
        handle.terminate().await;
        assert_eq!(handle.state(), WorkerState::Uninitialized);

        handle.ensure_ready().await.unwrap();
        assert_eq!(handle.state(), WorkerState::Ready);
        assert_eq!(handle.spawn_count(), 2);
    }

    #[tokio::test]
    async fn restart_spawns_a_fresh_context() {
        let handle = WorkerHandle::new("w", plain_factory(), WorkerConfig::default());
        handle.ensure_ready().await.unwrap();
        handle.restart().await.unwrap();
        assert_eq!(handle.state(), WorkerState::Ready);
        assert_eq!(handle.spawn_count(), 2);
    }

    #[tokio::test]
    async fn spawn_failure_leaves_handle_retryable() {
        let attempts = Arc::new(AtomicU32::new(0));
        let factory_attempts = attempts.clone();
        let factory: EngineFactory = Arc::new(move || {
            if factory_attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                anyhow::bail!("engine binary missing");
            }
            Ok(Arc::new(PlainEngine::new()) as Arc<dyn WikitextEngine>)
        });
        let handle = WorkerHandle::new("w", factory, WorkerConfig::default());

        let err = handle.ensure_ready().await.unwrap_err();
        assert!(matches!(err, WorkerError::Spawn(_)));
        assert_eq!(handle.state(), WorkerState::Uninitialized);

        handle.ensure_ready().await.unwrap();
        assert_eq!(handle.state(), WorkerState::Ready);
    }

    #[tokio::test]
    async fn init_failure_tears_down_and_allows_retry() {
        let attempts = Arc::new(AtomicU32::new(0));
        let hook_attempts = attempts.clone();
        let config = WorkerConfig {
            init: Some(Arc::new(move |_client: ContextClient| {
                let hook_attempts = hook_attempts.clone();
                Box::pin(async move {
                    if hook_attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                        anyhow::bail!("warmup failed");
                    }
                    Ok(())
                })
            })),
            ..WorkerConfig::default()
        };
        let handle = WorkerHandle::new("w", plain_factory(), config);

        let err = handle.ensure_ready().await.unwrap_err();
        assert!(matches!(err, WorkerError::Init(_)));
        assert_eq!(handle.state(), WorkerState::Uninitialized);

        handle.ensure_ready().await.unwrap();
        assert_eq!(handle.state(), WorkerState::Ready);
        // Each attempt spawned its own context; the failed one was torn down.
        assert_eq!(handle.spawn_count(), 2);
    }

    #[tokio::test]
    async fn client_executes_calls_against_the_context() {
        let handle = WorkerHandle::new("w", plain_factory(), WorkerConfig::default());
        let client = handle.client().await.unwrap();
        let response = client.call(WorkerRequest::Version).await.unwrap();
        match response {
            WorkerResponse::Buffer(buffer) => assert!(!buffer.is_empty()),
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn stale_client_fails_after_terminate() {
        let handle = WorkerHandle::new("w", plain_factory(), WorkerConfig::default());
        let client = handle.client().await.unwrap();
        handle.terminate().await;
        let err = client.call(WorkerRequest::Version).await.unwrap_err();
        assert!(matches!(err, WorkerError::ContextClosed));
    }
}
