//! Error types for the voice layer.

use accord_gateway::GatewayError;
use accord_protocol::ProtocolError;
use accord_transport::TransportError;

/// Errors that can occur while bringing up or using a voice session.
#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    /// A main-gateway error while signaling the voice join.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// A voice-socket transport error.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A voice-frame encode/decode error.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// UDP socket I/O failed.
    #[error("udp error: {0}")]
    Udp(#[from] std::io::Error),

    /// The voice handshake went off-script.
    #[error("voice handshake failed: {0}")]
    Handshake(String),

    /// IP discovery got no (or a malformed) answer.
    #[error("ip discovery failed: {0}")]
    Discovery(String),

    /// The server offers none of the encryption modes we implement.
    #[error("server offers no supported encryption mode")]
    UnsupportedMode,

    /// The session description carried a key of the wrong size.
    #[error("secret key must be 32 bytes, got {0}")]
    InvalidKey(usize),

    /// Sealing an audio frame failed.
    #[error("audio packet encryption failed")]
    Encrypt,

    /// The voice signaling socket is gone.
    #[error("voice connection closed")]
    Closed,

    /// The audio source could not produce its next frame.
    #[error("audio source failed: {0}")]
    Source(#[source] std::io::Error),
}
