//! Token classification over an external markup grammar.
//!
//! A grammar splits a document into an ordered run of [`Token`]s, each either
//! literal text (`Content`) or markup. Lengths are counted in Unicode scalar
//! values, the unit every downstream consumer (extraction, span reporting)
//! operates in.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Token types
// ---------------------------------------------------------------------------

/// Classification of a document span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Literal text, copied verbatim into the content projection.
    Content,
    /// Markup syntax, blanked out of the content projection.
    Markup,
}

/// A classified span of a document. `len` counts Unicode scalar values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub len: usize,
}

impl Token {
    /// A content token covering `len` scalar values.
    #[must_use]
    pub fn content(len: usize) -> Self {
        Self {
            kind: TokenKind::Content,
            len,
        }
    }

    /// A markup token covering `len` scalar values.
    #[must_use]
    pub fn markup(len: usize) -> Self {
        Self {
            kind: TokenKind::Markup,
            len,
        }
    }
}

// ---------------------------------------------------------------------------
// Tokenize trait
// ---------------------------------------------------------------------------

/// The grammar seam: anything that can classify a document into tokens.
///
/// Contract: tokens are emitted in document order and cover the document with
/// no gaps and no overlaps -- the sum of token lengths equals the document's
/// length in scalar values. Consumers in this crate tolerate an
/// under-covering grammar (the uncovered tail is treated as content), but a
/// conforming implementation should never rely on that.
pub trait Tokenize {
    fn tokenize(&self, text: &str) -> Vec<Token>;
}

impl<T: Tokenize + ?Sized> Tokenize for &T {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        (**self).tokenize(text)
    }
}

// ---------------------------------------------------------------------------
// Span resolution
// ---------------------------------------------------------------------------

/// A token paired with the source text it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSlice<'a> {
    pub kind: TokenKind,
    pub slice: &'a str,
}

/// Resolve a token run back onto the source text.
///
/// Walks the document left to right, pairing each token with the slice its
/// length claims. Tokens past the end of the document are clamped; any
/// uncovered tail is appended as a final content slice so the result always
/// covers the whole document.
#[must_use]
pub fn spans<'a>(text: &'a str, tokens: &[Token]) -> Vec<TokenSlice<'a>> {
    let mut out = Vec::with_capacity(tokens.len() + 1);
    let mut rest = text;

    for token in tokens {
        if rest.is_empty() {
            break;
        }
        let split = rest
            .char_indices()
            .nth(token.len)
            .map_or(rest.len(), |(i, _)| i);
        let (slice, tail) = rest.split_at(split);
        out.push(TokenSlice {
            kind: token.kind,
            slice,
        });
        rest = tail;
    }

    if !rest.is_empty() {
        tracing::debug!(
            uncovered = rest.chars().count(),
            "token run under-covers document, keeping tail as content"
        );
        out.push(TokenSlice {
            kind: TokenKind::Content,
            slice: rest,
        });
    }

    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
