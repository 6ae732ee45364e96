//! Inbound half of the gateway socket: the frame demultiplexer.
//!
//! One listener runs per connection, owns the receive side, and branches
//! on opcode. It is the single writer of the session's captured state
//! (sequence, hello interval, ack flags, readiness, voice handoff); the
//! other tasks only read or wait on it.
//!
//! Error taxonomy honored here: a close or socket error is logged at
//! high severity and ends the listener with a [`Disconnect`] the run
//! loop decides about — the listener itself never retries. A frame that
//! fails to decode, an unknown opcode, or a malformed payload is logged
//! and ignored, never fatal.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use accord_protocol::{event, Codec, GatewayFrame, GatewayOpcode, JsonCodec};
use accord_transport::{Connection, TransportError};

use crate::dispatch::Router;
use crate::queue::OutboundQueue;
use crate::rest::RestClient;
use crate::{GatewayHandle, Session};

/// Why the listener stopped.
#[derive(Debug)]
pub enum Disconnect {
    /// The server closed the socket cleanly.
    Closed,
    /// The socket failed.
    Failed(TransportError),
    /// The server asked for a reconnect (op 7).
    ReconnectRequested,
}

#[derive(Deserialize)]
struct ReadyPayload {
    resume_gateway_url: String,
    session_id: String,
}

#[derive(Deserialize)]
struct VoiceStatePayload {
    session_id: String,
    user_id: String,
}

#[derive(Deserialize)]
struct VoiceServerPayload {
    token: String,
    guild_id: String,
    endpoint: String,
}

/// Runs the demux loop for one connection until it disconnects.
pub async fn run_listener<C>(
    conn: Arc<C>,
    codec: JsonCodec,
    session: Arc<Session>,
    router: Arc<Router>,
    gateway: GatewayHandle,
    queue: OutboundQueue,
    rest: RestClient,
) -> Disconnect
where
    C: Connection<Error = TransportError>,
{
    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                error!(id = %conn.id(), "gateway connection closed by server");
                return Disconnect::Closed;
            }
            Err(e) => {
                error!(id = %conn.id(), error = %e, "gateway connection failed");
                return Disconnect::Failed(e);
            }
        };

        let frame: GatewayFrame = match codec.decode(&data) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "undecodable gateway frame — ignoring");
                continue;
            }
        };

        // Every non-null sequence feeds the counter the next heartbeat
        // echoes, whatever the opcode turns out to be.
        if let Some(s) = frame.s {
            session.observe_sequence(s);
        }

        match frame.opcode() {
            Some(GatewayOpcode::Dispatch) => {
                handle_dispatch(frame, &session, &router, &queue, &rest);
            }
            Some(GatewayOpcode::Heartbeat) => {
                // Answered immediately, out of band of the coordinator's
                // timer.
                match gateway.send(GatewayFrame::heartbeat(session.last_sequence())) {
                    Ok(()) => {
                        session.note_heartbeat_sent();
                        info!("heartbeat requested by server and sent");
                    }
                    Err(e) => {
                        warn!(error = %e, "could not answer heartbeat request");
                    }
                }
            }
            Some(GatewayOpcode::Reconnect) => {
                info!("server requested reconnect");
                return Disconnect::ReconnectRequested;
            }
            Some(GatewayOpcode::Hello) => {
                match frame.d.get("heartbeat_interval").and_then(Value::as_u64) {
                    Some(interval) => {
                        info!(interval_ms = interval, "hello received");
                        session.set_heartbeat_interval(interval);
                    }
                    None => warn!("hello frame without heartbeat_interval — ignoring"),
                }
            }
            Some(GatewayOpcode::HeartbeatAck) => {
                debug!("heartbeat acknowledged");
                session.note_heartbeat_ack();
            }
            Some(other) => {
                debug!(opcode = ?other, "frame with no client-side handling");
            }
            None => warn!(op = frame.op, "unknown opcode — ignoring"),
        }
    }
}

fn handle_dispatch(
    frame: GatewayFrame,
    session: &Session,
    router: &Router,
    queue: &OutboundQueue,
    rest: &RestClient,
) {
    let Some(name) = frame.t.as_deref() else {
        warn!("dispatch without an event name — ignoring");
        return;
    };

    match name {
        event::READY => match serde_json::from_value::<ReadyPayload>(frame.d) {
            Ok(ready) => {
                info!(session_id = %ready.session_id, "session ready");
                session.set_resume_gateway_url(ready.resume_gateway_url);
                session.set_session_id(ready.session_id);
                session.set_ready();
            }
            Err(e) => warn!(error = %e, "malformed READY payload — ignoring"),
        },
        event::INTERACTION_CREATE => router.dispatch(frame.d, queue, rest),
        event::VOICE_STATE_UPDATE => {
            match serde_json::from_value::<VoiceStatePayload>(frame.d) {
                Ok(state) => {
                    debug!("voice state captured");
                    session.observe_voice_state(state.session_id, state.user_id);
                }
                Err(e) => warn!(error = %e, "malformed VOICE_STATE_UPDATE — ignoring"),
            }
        }
        event::VOICE_SERVER_UPDATE => {
            match serde_json::from_value::<VoiceServerPayload>(frame.d) {
                Ok(server) => {
                    debug!(endpoint = %server.endpoint, "voice server captured");
                    session.observe_voice_server(
                        server.endpoint,
                        server.token,
                        server.guild_id,
                    );
                }
                Err(e) => warn!(error = %e, "malformed VOICE_SERVER_UPDATE — ignoring"),
            }
        }
        other => debug!(event = other, "unhandled dispatch event"),
    }
}
