//! Error types for the gateway session layer.

use accord_protocol::ProtocolError;
use accord_transport::TransportError;

/// Errors from the REST collaborator.
///
/// The original design logged REST failures and moved on; here every
/// failure is an explicit value so callers can decide what to do with
/// a failed sync or a dead queue entry.
#[derive(Debug, thiserror::Error)]
pub enum RestError {
    /// The request never completed (connection, TLS, body, decode).
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("{url} returned status {code}")]
    Status { code: u16, url: String },

    /// A well-formed response was missing a field we depend on.
    #[error("response missing field `{0}`")]
    MissingField(&'static str),
}

/// Errors that can occur in the gateway session layer.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// A transport-level error (connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid frame).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A REST-call error (gateway URL fetch, command sync, queue drain).
    #[error(transparent)]
    Rest(#[from] RestError),

    /// A frame was handed to the gateway while no connection is
    /// attached (e.g. mid-reconnect).
    #[error("gateway is not connected")]
    NotConnected,

    /// The outbound queue's consumer is gone.
    #[error("outbound queue is closed")]
    QueueClosed,
}
