//! Codec trait and the JSON implementation used on both websockets.
//!
//! A codec converts between envelope types and the raw payload of a
//! websocket frame. The gateway speaks JSON text frames, so [`JsonCodec`]
//! is the only implementation today; keeping the [`Codec`] seam means an
//! ETF or compressed codec can be added without touching the session
//! layer.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// A codec that can encode envelope types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because one codec instance is shared by the
/// listener, heartbeat, and handshake tasks for the life of the process.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into the payload of an outgoing frame.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes an inbound frame payload.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the bytes are malformed,
    /// incomplete, or don't match the expected shape.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use accord_protocol::{Codec, GatewayFrame, JsonCodec};
///
/// let codec = JsonCodec;
///
/// let frame = GatewayFrame::heartbeat(Some(42));
/// let bytes = codec.encode(&frame).unwrap();
/// let decoded: GatewayFrame = codec.decode(&bytes).unwrap();
/// assert_eq!(frame, decoded);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
