//! Error types for the protocol layer.
//!
//! Each crate in Accord defines its own error enum. A `ProtocolError`
//! always means a serialization problem, never a networking or session
//! one.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a frame into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a frame).
    ///
    /// Common causes: malformed JSON, missing required fields, or a
    /// truncated message.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame parsed but is invalid at the protocol level — e.g. a
    /// dispatch with no event name, or a payload missing a field the
    /// handshake depends on.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}
