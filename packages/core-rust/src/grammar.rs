//! Built-in wikitext markup classifier.
//!
//! A single regex alternation of markup patterns is scanned left to right;
//! every match becomes a markup token and every gap between matches becomes a
//! content token. This is a classifier, not a parser: it recognizes the
//! surface syntax of the common Wikidot constructs (bracket elements,
//! comments, headings, rules, list markers, inline formatting delimiters)
//! well enough to separate prose from markup, and no further.

use std::sync::LazyLock;

use regex::Regex;

use crate::token::{Token, Tokenize};

/// Markup patterns, earliest-alternative-wins. Order is significant:
/// comments before bracket elements, triple brackets before double, and the
/// horizontal rule before the `--` strikethrough delimiter.
static MARKUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)\[!--(?s:.)*?--\]|\[\[\[[^\[\]\n]*\]\]\]|\[\[[^\[\]\n]*\]\]|\[[^\s\[\]][^\[\]\n]*\]|^\+{1,6} |^-{4,}[ \t]*$|^[ \t]*[*#]+ |@@(?s:.)*?@@|\{\{|\}\}|\*\*|//|__|\^\^|,,|--",
    )
    .expect("markup pattern is valid")
});

/// Wikitext grammar backed by the [`MARKUP`] alternation.
#[derive(Debug, Clone, Copy, Default)]
pub struct WikitextGrammar;

impl WikitextGrammar {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Tokenize for WikitextGrammar {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut cursor = 0;

        for found in MARKUP.find_iter(text) {
            if found.start() > cursor {
                tokens.push(Token::content(text[cursor..found.start()].chars().count()));
            }
            tokens.push(Token::markup(found.as_str().chars().count()));
            cursor = found.end();
        }

        if cursor < text.len() {
            tokens.push(Token::content(text[cursor..].chars().count()));
        }

        tokens
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
