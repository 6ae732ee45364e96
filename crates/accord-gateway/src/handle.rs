//! Outbound half of the gateway socket.
//!
//! Every task that needs to emit a frame — the heartbeat coordinator,
//! the identify step, the listener's out-of-band heartbeat answer, the
//! voice layer's state update — holds a clonable [`GatewayHandle`]. The
//! handle feeds one writer task that owns the socket's write half, so
//! frames are serialized onto the wire in send order without any task
//! touching the connection directly.
//!
//! Across a reconnect the handle stays valid: the run loop attaches a
//! fresh channel for the new connection and sends made in the gap fail
//! with [`GatewayError::NotConnected`] instead of landing on a dead
//! socket.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use accord_protocol::{Codec, GatewayFrame, JsonCodec, ProtocolError};
use accord_transport::{Connection, TransportError};

use crate::GatewayError;

/// Clonable sender for outbound gateway frames.
#[derive(Clone, Default)]
pub struct GatewayHandle {
    tx: Arc<Mutex<Option<mpsc::UnboundedSender<GatewayFrame>>>>,
}

impl GatewayHandle {
    /// Creates a handle with no connection attached. Sends fail with
    /// [`GatewayError::NotConnected`] until [`attach`](Self::attach).
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a fresh outbound channel and returns its receiving end
    /// for a writer task. Any previously attached channel is dropped.
    pub fn attach(&self) -> mpsc::UnboundedReceiver<GatewayFrame> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.tx.lock() = Some(tx);
        rx
    }

    /// Drops the outbound channel; subsequent sends fail until the next
    /// [`attach`](Self::attach).
    pub fn detach(&self) {
        *self.tx.lock() = None;
    }

    /// Queues a frame for the writer task.
    ///
    /// # Errors
    /// Returns [`GatewayError::NotConnected`] when no connection is
    /// attached or the writer has already exited.
    pub fn send(&self, frame: GatewayFrame) -> Result<(), GatewayError> {
        let guard = self.tx.lock();
        match guard.as_ref() {
            Some(tx) => tx
                .send(frame)
                .map_err(|_| GatewayError::NotConnected),
            None => Err(GatewayError::NotConnected),
        }
    }
}

/// Drains the outbound channel onto the connection, one frame at a
/// time. Runs until the channel is dropped (reconnect) or a send fails.
pub async fn run_writer<C>(
    conn: Arc<C>,
    codec: JsonCodec,
    mut rx: mpsc::UnboundedReceiver<GatewayFrame>,
) -> Result<(), GatewayError>
where
    C: Connection<Error = TransportError>,
{
    while let Some(frame) = rx.recv().await {
        let bytes = codec.encode(&frame)?;
        let text = String::from_utf8(bytes).map_err(|_| {
            ProtocolError::InvalidFrame("encoded frame was not UTF-8".into())
        })?;
        conn.send(&text).await?;
    }
    tracing::debug!(id = %conn.id(), "outbound channel closed, writer exiting");
    Ok(())
}
