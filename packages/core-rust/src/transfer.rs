//! Transfer codec for values crossing the execution-context boundary.
//!
//! Text is immutable source data and is always copied into a fresh buffer;
//! byte buffers hand over their underlying storage without copying. Because
//! [`TransferValue`] is an exhaustive enum, there is no runtime "unknown
//! type" branch on the typed path -- the only dynamic edge left is
//! [`TransferValue::from_json`] for payloads arriving untyped.

use bytes::Bytes;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors local to the codec. Never triggers worker teardown.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("cannot transfer value of type {kind}")]
    UnsupportedTransferType { kind: &'static str },
    /// Reserved for malformed structured payloads; the permissive text
    /// decode itself cannot fail.
    #[error("malformed structured payload: {0}")]
    Decode(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// TransferValue
// ---------------------------------------------------------------------------

/// A value that can cross the execution-context boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferValue {
    /// UTF-8 text, copied on encode.
    Text(String),
    /// An owned byte buffer, transferred on encode. `encode` consumes the
    /// value, so the sender cannot read the buffer afterward.
    Buffer(Bytes),
}

impl TransferValue {
    /// Encode into the wire buffer. Text copies; `Buffer` moves its storage.
    #[must_use]
    pub fn encode(self) -> Bytes {
        match self {
            Self::Text(text) => Bytes::from(text.into_bytes()),
            Self::Buffer(buffer) => buffer,
        }
    }

    /// Convert an untyped JSON value. Only strings are transferable this
    /// way; everything else stays on the structured path.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnsupportedTransferType`] for non-string values.
    pub fn from_json(value: serde_json::Value) -> Result<Self, CodecError> {
        match value {
            serde_json::Value::String(text) => Ok(Self::Text(text)),
            serde_json::Value::Null => Err(CodecError::UnsupportedTransferType { kind: "null" }),
            serde_json::Value::Bool(_) => Err(CodecError::UnsupportedTransferType { kind: "bool" }),
            serde_json::Value::Number(_) => {
                Err(CodecError::UnsupportedTransferType { kind: "number" })
            }
            serde_json::Value::Array(_) => {
                Err(CodecError::UnsupportedTransferType { kind: "array" })
            }
            serde_json::Value::Object(_) => {
                Err(CodecError::UnsupportedTransferType { kind: "object" })
            }
        }
    }
}

/// Decode a wire buffer back into text. Invalid UTF-8 sequences become
/// replacement characters; this never fails.
#[must_use]
pub fn decode(buffer: &[u8]) -> String {
    String::from_utf8_lossy(buffer).into_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
