//! Inkmill Core — token classification, content extraction, and the transfer
//! codec shared by the worker runtime.

pub mod extract;
pub mod grammar;
pub mod token;
pub mod transfer;

pub use extract::{extract, stats, TextStats};
pub use grammar::WikitextGrammar;
pub use token::{Token, TokenKind, Tokenize};
pub use transfer::{decode, CodecError, TransferValue};
