//! Length-preserving content extraction.
//!
//! Produces a projection of a document that keeps literal text exactly where
//! it was and blanks every markup span with an equal run of spaces, so
//! character offsets computed against the projection remain valid against
//! the original document.

use serde::{Deserialize, Serialize};

use crate::token::{self, TokenKind, Tokenize};

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Extract the content-only projection of `document`.
///
/// Content tokens are copied verbatim; markup tokens are replaced by one
/// space per scalar value. The projection always has the same length (in
/// scalar values) as the input: a markup-free document comes back unchanged,
/// an all-markup document comes back fully blank, and an empty document
/// comes back empty.
pub fn extract<T: Tokenize>(document: &str, grammar: &T) -> String {
    let tokens = grammar.tokenize(document);
    let mut out = String::with_capacity(document.len());

    for resolved in token::spans(document, &tokens) {
        match resolved.kind {
            TokenKind::Content => out.push_str(resolved.slice),
            TokenKind::Markup => {
                for _ in resolved.slice.chars() {
                    out.push(' ');
                }
            }
        }
    }

    out
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Word and byte statistics for a raw document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextStats {
    /// Whitespace-delimited fields in the trimmed content projection.
    pub words: usize,
    /// Raw byte length of the original document, not the projection.
    pub bytes: usize,
}

/// Compute [`TextStats`] for a raw byte document.
///
/// The byte count reports the original input size; the word count is taken
/// from the content projection so markup never inflates it.
pub fn stats<T: Tokenize>(raw: &[u8], grammar: &T) -> TextStats {
    let document = String::from_utf8_lossy(raw);
    let content = extract(&document, grammar);
    TextStats {
        words: content.split_whitespace().count(),
        bytes: raw.len(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
