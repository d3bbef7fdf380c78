//! The wikitext pipeline seam.
//!
//! `WikitextEngine` is the interchangeable remote pipeline behind the nine
//! forwarded operations. Real deployments implement it over an actual
//! renderer; this crate ships [`PlainEngine`], a grammar-backed stand-in
//! that makes the worker exercisable end to end without a rendering
//! pipeline.

use async_trait::async_trait;
use inkmill_core::{extract, token, TokenKind, Tokenize, WikitextGrammar};

use crate::operation::{
    ParseOutcome, ParseWarning, RenderTrace, Span, SyntaxNode, SyntaxTree, TokenSpan,
};

// ---------------------------------------------------------------------------
// WikitextEngine trait
// ---------------------------------------------------------------------------

/// Rendered output of the `render` operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub html: String,
    pub style: String,
}

/// The document pipeline an execution context runs operations against.
///
/// Methods are infallible by design: a pipeline that hangs or dies is
/// handled by the scheduler's deadline race and worker teardown, not by a
/// per-method error channel.
#[async_trait]
pub trait WikitextEngine: Send + Sync {
    async fn version(&self) -> String;
    async fn preprocess(&self, text: &str) -> String;
    async fn tokenize(&self, text: &str) -> Vec<TokenSpan>;
    async fn parse(&self, text: &str) -> ParseOutcome;
    async fn render(&self, text: &str) -> Rendered;
    async fn render_text(&self, text: &str) -> String;
    async fn detailed_render(&self, text: &str) -> RenderTrace;
    async fn warnings(&self, text: &str) -> Vec<ParseWarning>;
    async fn inspect_tokens(&self, text: &str) -> String;
}

// ---------------------------------------------------------------------------
// PlainEngine
// ---------------------------------------------------------------------------

/// Minimal grammar-backed engine.
///
/// Preprocessing follows the Wikidot text normalization rules (line-ending
/// normalization, null stripping, trailing-backslash line continuation).
/// Rendering produces an escaped content projection; no style blocks are
/// collected, so the style half of `render` is always empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainEngine {
    grammar: WikitextGrammar,
}

impl PlainEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            grammar: WikitextGrammar::new(),
        }
    }

    fn token_spans(&self, text: &str) -> Vec<TokenSpan> {
        let tokens = self.grammar.tokenize(text);
        let mut offset = 0;
        token::spans(text, &tokens)
            .into_iter()
            .map(|resolved| {
                let len = resolved.slice.chars().count();
                let span = Span {
                    start: offset,
                    end: offset + len,
                };
                offset += len;
                TokenSpan {
                    kind: resolved.kind,
                    span,
                    slice: resolved.slice.to_owned(),
                }
            })
            .collect()
    }

    fn scan_warnings(text: &str) -> Vec<ParseWarning> {
        let mut warnings = Vec::new();
        // Unterminated comments swallow the rest of the document in real
        // renderers; flag them.
        let mut search = 0;
        while let Some(found) = text[search..].find("[!--") {
            let start = search + found;
            match text[start..].find("--]") {
                Some(close) => search = start + close + 3,
                None => {
                    warnings.push(ParseWarning {
                        rule: "comment".to_owned(),
                        span: Span {
                            start: text[..start].chars().count(),
                            end: text.chars().count(),
                        },
                        kind: "no-end".to_owned(),
                    });
                    break;
                }
            }
        }
        warnings
    }

    fn escape_html(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for ch in text.chars() {
            match ch {
                '&' => out.push_str("&amp;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                '"' => out.push_str("&quot;"),
                _ => out.push(ch),
            }
        }
        out
    }
}

#[async_trait]
impl WikitextEngine for PlainEngine {
    async fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_owned()
    }

    async fn preprocess(&self, text: &str) -> String {
        text.replace("\r\n", "\n")
            .replace('\r', "\n")
            .replace('\0', "")
            .replace("\\\n", "")
    }

    async fn tokenize(&self, text: &str) -> Vec<TokenSpan> {
        self.token_spans(text)
    }

    async fn parse(&self, text: &str) -> ParseOutcome {
        let nodes = self
            .token_spans(text)
            .into_iter()
            .map(|token| match token.kind {
                TokenKind::Content => SyntaxNode::Text { slice: token.slice },
                TokenKind::Markup => SyntaxNode::Element {
                    name: "markup".to_owned(),
                    children: Vec::new(),
                },
            })
            .collect();
        ParseOutcome {
            tree: SyntaxTree { nodes },
            warnings: Self::scan_warnings(text),
        }
    }

    async fn render(&self, text: &str) -> Rendered {
        let content = self.render_text(text).await;
        Rendered {
            html: format!("<div class=\"wikitext\">{}</div>", Self::escape_html(&content)),
            style: String::new(),
        }
    }

    async fn render_text(&self, text: &str) -> String {
        let preprocessed = self.preprocess(text).await;
        let projection = extract(&preprocessed, &self.grammar);
        projection
            .lines()
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    async fn detailed_render(&self, text: &str) -> RenderTrace {
        let preprocessed = self.preprocess(text).await;
        let tokens = self.token_spans(&preprocessed);
        let outcome = self.parse(&preprocessed).await;
        let rendered = self.render(text).await;
        let rendered_text = self.render_text(text).await;
        RenderTrace {
            preprocessed,
            tokens,
            tree: outcome.tree,
            warnings: outcome.warnings,
            html: rendered.html,
            style: rendered.style,
            text: rendered_text,
        }
    }

    async fn warnings(&self, text: &str) -> Vec<ParseWarning> {
        Self::scan_warnings(text)
    }

    async fn inspect_tokens(&self, text: &str) -> String {
        let mut out = String::new();
        for token in self.token_spans(text) {
            out.push_str(&format!(
                "[{:>4}..{:<4}] {:7} => {:?}\n",
                token.span.start,
                token.span.end,
                match token.kind {
                    TokenKind::Content => "content",
                    TokenKind::Markup => "markup",
                },
                token.slice,
            ));
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn version_reports_crate_version() {
        assert_eq!(PlainEngine::new().version().await, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn preprocess_normalizes_line_endings_and_continuations() {
        let engine = PlainEngine::new();
        let out = engine.preprocess("one\r\ntwo\rthree\\\nfour\0").await;
        assert_eq!(out, "one\ntwo\nthreefour");
    }

    #[tokio::test]
    async fn tokenize_spans_tile_the_document() {
        let engine = PlainEngine::new();
        let doc = "a [[b]] c";
        let tokens = engine.tokenize(doc).await;
        assert_eq!(tokens.first().map(|t| t.span.start), Some(0));
        assert_eq!(tokens.last().map(|t| t.span.end), Some(9));
        let rebuilt: String = tokens.iter().map(|t| t.slice.as_str()).collect();
        assert_eq!(rebuilt, doc);
    }

    #[tokio::test]
    async fn parse_maps_tokens_to_nodes() {
        let outcome = PlainEngine::new().parse("a [[b]] c").await;
        assert_eq!(outcome.tree.nodes.len(), 3);
        assert!(matches!(outcome.tree.nodes[1], SyntaxNode::Element { .. }));
        assert!(outcome.warnings.is_empty());
    }

    #[tokio::test]
    async fn unterminated_comment_produces_warning() {
        let warnings = PlainEngine::new().warnings("text [!-- never closed").await;
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].rule, "comment");
        assert_eq!(warnings[0].kind, "no-end");
        assert_eq!(warnings[0].span.start, 5);
    }

    #[tokio::test]
    async fn render_text_drops_markup_and_collapses_blanks() {
        let out = PlainEngine::new().render_text("**bold** [[module]] text").await;
        assert_eq!(out, "bold text");
    }

    #[tokio::test]
    async fn render_escapes_html_and_has_empty_style() {
        let rendered = PlainEngine::new().render("a <b> c").await;
        assert!(rendered.html.contains("&lt;b&gt;"));
        assert!(rendered.style.is_empty());
    }

    #[tokio::test]
    async fn inspect_tokens_prints_one_line_per_token() {
        let dump = PlainEngine::new().inspect_tokens("a [[b]] c").await;
        assert_eq!(dump.lines().count(), 3);
        assert!(dump.contains("markup"));
        assert!(dump.contains("\"[[b]]\""));
    }
}
