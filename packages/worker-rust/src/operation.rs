//! Typed operation variants crossing the execution-context boundary.
//!
//! Document text travels as transfer-encoded buffers (see
//! `inkmill_core::transfer`); structured results (token lists, parse
//! outcomes, stats) travel as typed values with serde derives so host
//! applications can forward them across process boundaries.

use bytes::Bytes;
use inkmill_core::{TextStats, TokenKind};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// One operation request sent into the worker.
#[derive(Debug, Clone)]
pub enum WorkerRequest {
    Version,
    Preprocess { text: Bytes },
    Tokenize { text: Bytes },
    Parse { text: Bytes },
    Render { text: Bytes },
    RenderText { text: Bytes },
    DetailedRender { text: Bytes },
    Warnings { text: Bytes },
    InspectTokens { text: Bytes },
    Extract { raw: Bytes },
    Stats { raw: Bytes },
}

impl WorkerRequest {
    /// Operation name for logs and error messages.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Version => "version",
            Self::Preprocess { .. } => "preprocess",
            Self::Tokenize { .. } => "tokenize",
            Self::Parse { .. } => "parse",
            Self::Render { .. } => "render",
            Self::RenderText { .. } => "renderText",
            Self::DetailedRender { .. } => "detailedRender",
            Self::Warnings { .. } => "warnings",
            Self::InspectTokens { .. } => "inspectTokens",
            Self::Extract { .. } => "extract",
            Self::Stats { .. } => "stats",
        }
    }
}

// ---------------------------------------------------------------------------
// Structured payloads
// ---------------------------------------------------------------------------

/// Half-open span in Unicode scalar values over the source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// A classified token with its source position and slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSpan {
    pub kind: TokenKind,
    pub span: Span,
    pub slice: String,
}

/// A warning emitted while parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseWarning {
    pub rule: String,
    pub span: Span,
    pub kind: String,
}

/// A node of the (flat or nested) syntax tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SyntaxNode {
    Text { slice: String },
    Element { name: String, children: Vec<SyntaxNode> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxTree {
    pub nodes: Vec<SyntaxNode>,
}

/// Result of `parse`: the tree plus any warnings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseOutcome {
    pub tree: SyntaxTree,
    pub warnings: Vec<ParseWarning>,
}

/// Every intermediate step of the rendering pipeline, for `detailedRender`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderTrace {
    pub preprocessed: String,
    pub tokens: Vec<TokenSpan>,
    pub tree: SyntaxTree,
    pub warnings: Vec<ParseWarning>,
    pub html: String,
    pub style: String,
    pub text: String,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// One operation response coming back out of the worker.
#[derive(Debug, Clone)]
pub enum WorkerResponse {
    /// Transfer-encoded text (version, preprocess, renderText,
    /// inspectTokens, extract).
    Buffer(Bytes),
    /// Ordered token list (tokenize).
    Tokens(Vec<TokenSpan>),
    /// Syntax tree plus warnings (parse).
    Parse(ParseOutcome),
    /// Rendered output as two transfer-encoded buffers (render).
    Render { html: Bytes, style: Bytes },
    /// Full pipeline trace (detailedRender).
    Trace(RenderTrace),
    /// Warning list (warnings).
    Warnings(Vec<ParseWarning>),
    /// Word/byte statistics (stats).
    Stats(TextStats),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
