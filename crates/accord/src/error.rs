//! Unified error type for the Accord client.

use accord_gateway::GatewayError;
use accord_protocol::ProtocolError;
use accord_transport::TransportError;
use accord_voice::VoiceError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `accord` meta-crate, you deal with this single error
/// type instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant auto-generates `From` impls, so the `?`
/// operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum AccordError {
    /// A transport-level error (connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid frame).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A gateway session error (handshake, REST, queue).
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// A voice session error (signaling, discovery, media).
    #[error(transparent)]
    Voice(#[from] VoiceError),

    /// The server closed the gateway socket and no reconnect was
    /// directed.
    #[error("gateway connection closed")]
    ConnectionClosed,

    /// The reconnect budget ran out without a connection sticking.
    #[error("reconnect attempts exhausted after {0} attempts")]
    ReconnectExhausted(u32),
}
