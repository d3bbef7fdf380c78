//! Typed facade over the worker RPC surface.
//!
//! Document text is transfer-encoded on the way in and buffer-typed
//! responses are decoded on the way out; structured responses pass through
//! as typed values. One proxy owns one scheduler owns one handle.

use std::sync::Arc;

use bytes::Bytes;
use inkmill_core::{transfer, TextStats, TransferValue};

use crate::config::WorkerConfig;
use crate::engine::{PlainEngine, Rendered, WikitextEngine};
use crate::error::WorkerError;
use crate::handle::{EngineFactory, WorkerHandle};
use crate::operation::{ParseOutcome, ParseWarning, RenderTrace, TokenSpan, WorkerRequest, WorkerResponse};
use crate::scheduler::InvocationScheduler;

/// Client-side handle to one wikitext worker.
pub struct WikitextProxy {
    scheduler: InvocationScheduler,
}

impl WikitextProxy {
    /// Build a proxy over the given engine factory and policy.
    #[must_use]
    pub fn new(name: impl Into<String>, factory: EngineFactory, config: WorkerConfig) -> Self {
        Self {
            scheduler: InvocationScheduler::new(Arc::new(WorkerHandle::new(
                name, factory, config,
            ))),
        }
    }

    /// Build a proxy over the built-in [`PlainEngine`].
    #[must_use]
    pub fn plain(name: impl Into<String>, config: WorkerConfig) -> Self {
        let factory: EngineFactory =
            Arc::new(|| Ok(Arc::new(PlainEngine::new()) as Arc<dyn WikitextEngine>));
        Self::new(name, factory, config)
    }

    #[must_use]
    pub fn scheduler(&self) -> &InvocationScheduler {
        &self.scheduler
    }

    fn encode(text: &str) -> Bytes {
        TransferValue::Text(text.to_owned()).encode()
    }

    async fn invoke_text(
        &self,
        request: WorkerRequest,
        operation: &'static str,
    ) -> Result<String, WorkerError> {
        match self.scheduler.invoke(request).await? {
            WorkerResponse::Buffer(buffer) => Ok(transfer::decode(&buffer)),
            _ => Err(WorkerError::UnexpectedResponse { operation }),
        }
    }

    /// Engine version string.
    ///
    /// # Errors
    ///
    /// Any [`WorkerError`] from the invocation.
    pub async fn version(&self) -> Result<String, WorkerError> {
        self.invoke_text(WorkerRequest::Version, "version").await
    }

    /// Preprocess a document (text normalization pass).
    ///
    /// # Errors
    ///
    /// Any [`WorkerError`] from the invocation.
    pub async fn preprocess(&self, text: &str) -> Result<String, WorkerError> {
        self.invoke_text(
            WorkerRequest::Preprocess {
                text: Self::encode(text),
            },
            "preprocess",
        )
        .await
    }

    /// Tokenize a document into classified spans.
    ///
    /// # Errors
    ///
    /// Any [`WorkerError`] from the invocation.
    pub async fn tokenize(&self, text: &str) -> Result<Vec<TokenSpan>, WorkerError> {
        match self
            .scheduler
            .invoke(WorkerRequest::Tokenize {
                text: Self::encode(text),
            })
            .await?
        {
            WorkerResponse::Tokens(tokens) => Ok(tokens),
            _ => Err(WorkerError::UnexpectedResponse {
                operation: "tokenize",
            }),
        }
    }

    /// Parse a document into a syntax tree plus warnings.
    ///
    /// # Errors
    ///
    /// Any [`WorkerError`] from the invocation.
    pub async fn parse(&self, text: &str) -> Result<ParseOutcome, WorkerError> {
        match self
            .scheduler
            .invoke(WorkerRequest::Parse {
                text: Self::encode(text),
            })
            .await?
        {
            WorkerResponse::Parse(outcome) => Ok(outcome),
            _ => Err(WorkerError::UnexpectedResponse { operation: "parse" }),
        }
    }

    /// Render a document to HTML plus collected styles.
    ///
    /// # Errors
    ///
    /// Any [`WorkerError`] from the invocation.
    pub async fn render(&self, text: &str) -> Result<Rendered, WorkerError> {
        match self
            .scheduler
            .invoke(WorkerRequest::Render {
                text: Self::encode(text),
            })
            .await?
        {
            WorkerResponse::Render { html, style } => Ok(Rendered {
                html: transfer::decode(&html),
                style: transfer::decode(&style),
            }),
            _ => Err(WorkerError::UnexpectedResponse { operation: "render" }),
        }
    }

    /// Render a document to plain text.
    ///
    /// # Errors
    ///
    /// Any [`WorkerError`] from the invocation.
    pub async fn render_text(&self, text: &str) -> Result<String, WorkerError> {
        self.invoke_text(
            WorkerRequest::RenderText {
                text: Self::encode(text),
            },
            "renderText",
        )
        .await
    }

    /// Render a document and report every intermediate pipeline step.
    ///
    /// # Errors
    ///
    /// Any [`WorkerError`] from the invocation.
    pub async fn detailed_render(&self, text: &str) -> Result<RenderTrace, WorkerError> {
        match self
            .scheduler
            .invoke(WorkerRequest::DetailedRender {
                text: Self::encode(text),
            })
            .await?
        {
            WorkerResponse::Trace(trace) => Ok(trace),
            _ => Err(WorkerError::UnexpectedResponse {
                operation: "detailedRender",
            }),
        }
    }

    /// Warnings emitted when parsing a document.
    ///
    /// # Errors
    ///
    /// Any [`WorkerError`] from the invocation.
    pub async fn warnings(&self, text: &str) -> Result<Vec<ParseWarning>, WorkerError> {
        match self
            .scheduler
            .invoke(WorkerRequest::Warnings {
                text: Self::encode(text),
            })
            .await?
        {
            WorkerResponse::Warnings(warnings) => Ok(warnings),
            _ => Err(WorkerError::UnexpectedResponse {
                operation: "warnings",
            }),
        }
    }

    /// Pretty-printed token dump of a document.
    ///
    /// # Errors
    ///
    /// Any [`WorkerError`] from the invocation.
    pub async fn inspect_tokens(&self, text: &str) -> Result<String, WorkerError> {
        self.invoke_text(
            WorkerRequest::InspectTokens {
                text: Self::encode(text),
            },
            "inspectTokens",
        )
        .await
    }

    /// Length-preserving content projection of a raw document. The buffer
    /// is transferred, not copied.
    ///
    /// # Errors
    ///
    /// Any [`WorkerError`] from the invocation.
    pub async fn extract(&self, raw: Bytes) -> Result<String, WorkerError> {
        self.invoke_text(WorkerRequest::Extract { raw }, "extract")
            .await
    }

    /// Word and byte statistics for a raw document.
    ///
    /// # Errors
    ///
    /// Any [`WorkerError`] from the invocation.
    pub async fn stats(&self, raw: Bytes) -> Result<TextStats, WorkerError> {
        match self.scheduler.invoke(WorkerRequest::Stats { raw }).await? {
            WorkerResponse::Stats(stats) => Ok(stats),
            _ => Err(WorkerError::UnexpectedResponse { operation: "stats" }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use inkmill_core::TokenKind;

    use super::*;
    use crate::handle::WorkerState;

    fn warm_proxy() -> WikitextProxy {
        WikitextProxy::plain(
            "test-worker",
            WorkerConfig {
                persist: true,
                timeout_ms: 1000,
                init: None,
            },
        )
    }

    #[tokio::test]
    async fn version_round_trips() {
        let proxy = warm_proxy();
        assert_eq!(proxy.version().await.unwrap(), env!("CARGO_PKG_VERSION"));
        assert_eq!(proxy.scheduler().handle().state(), WorkerState::Ready);
    }

    #[tokio::test]
    async fn preprocess_normalizes_text() {
        let proxy = warm_proxy();
        let out = proxy.preprocess("a\r\nb").await.unwrap();
        assert_eq!(out, "a\nb");
    }

    #[tokio::test]
    async fn extract_preserves_length_through_the_boundary() {
        let proxy = warm_proxy();
        let doc = "a [[b]] c";
        let out = proxy.extract(Bytes::from(doc.as_bytes().to_vec())).await.unwrap();
        assert_eq!(out, "a       c");
        assert_eq!(out.chars().count(), doc.chars().count());
    }

    #[tokio::test]
    async fn stats_reports_projection_words_and_raw_bytes() {
        let proxy = warm_proxy();
        let stats = proxy
            .stats(Bytes::from_static(b"a [[b]] c"))
            .await
            .unwrap();
        assert_eq!(stats.words, 2);
        assert_eq!(stats.bytes, 9);
    }

    #[tokio::test]
    async fn tokenize_returns_ordered_spans() {
        let proxy = warm_proxy();
        let tokens = proxy.tokenize("a [[b]] c").await.unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].kind, TokenKind::Markup);
        assert_eq!(tokens[1].slice, "[[b]]");
    }

    #[tokio::test]
    async fn render_decodes_both_buffers() {
        let proxy = warm_proxy();
        let rendered = proxy.render("**hi**").await.unwrap();
        assert!(rendered.html.contains("hi"));
        // No style blocks collected: empty, and still a success.
        assert!(rendered.style.is_empty());
    }

    #[tokio::test]
    async fn detailed_render_traces_every_step() {
        let proxy = warm_proxy();
        let trace = proxy.detailed_render("a [[b]] c").await.unwrap();
        assert_eq!(trace.preprocessed, "a [[b]] c");
        assert_eq!(trace.tokens.len(), 3);
        assert_eq!(trace.tree.nodes.len(), 3);
        assert!(trace.warnings.is_empty());
        assert!(!trace.html.is_empty());
        assert_eq!(trace.text, "a c");
    }

    #[tokio::test]
    async fn warnings_flow_through_typed() {
        let proxy = warm_proxy();
        let warnings = proxy.warnings("x [!-- open").await.unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].rule, "comment");
    }

    #[tokio::test]
    async fn inspect_tokens_is_human_readable() {
        let proxy = warm_proxy();
        let dump = proxy.inspect_tokens("a [[b]] c").await.unwrap();
        assert!(dump.contains("markup"));
        assert!(dump.contains("content"));
    }

    #[tokio::test]
    async fn one_shot_proxy_respawns_per_call() {
        let proxy = WikitextProxy::plain("one-shot", WorkerConfig::default());
        proxy.version().await.unwrap();
        assert_eq!(
            proxy.scheduler().handle().state(),
            WorkerState::Uninitialized
        );
        proxy.version().await.unwrap();
        assert_eq!(proxy.scheduler().handle().spawn_count(), 2);
    }
}
