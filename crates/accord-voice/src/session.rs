//! Voice session bring-up and lifecycle.
//!
//! Joining a voice channel chains three network handshakes before any
//! audio can flow:
//!
//! 1. **Signal phase** — a voice-state update on the *main* gateway,
//!    then a wait for the endpoint/token/session handoff the server
//!    delivers via two dispatch events.
//! 2. **Voice-socket phase** — a second websocket to the captured
//!    endpoint: identify, then a nested listener for the voice opcodes
//!    (ready, session description, hello), with its own
//!    jitter-then-steady heartbeat.
//! 3. **UDP phase** — connect to the media address from the ready
//!    payload, run IP discovery, and select the UDP protocol with the
//!    discovered external address. Only then is the session ready for
//!    playback.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, error, info, warn};

use accord_gateway::{GatewayHandle, Session};
use accord_protocol::{
    Codec, GatewayFrame, JsonCodec, ProtocolError, SessionDescription,
    VoiceFrame, VoiceHello, VoiceOpcode, VoiceReady, XSALSA20_POLY1305,
};
use accord_transport::{Connection, TransportError, WebSocketConnection};

use crate::discovery;
use crate::player::run_playback;
use crate::rtp::RtpPacketizer;
use crate::source::AudioSource;
use crate::VoiceError;

// ---------------------------------------------------------------------------
// Shared voice state
// ---------------------------------------------------------------------------

/// State written by the voice listener and waited on by bring-up and
/// playback.
struct VoiceShared {
    /// Payload of voice op 2, once received.
    ready: watch::Sender<Option<VoiceReady>>,
    /// Secret key from voice op 4, once received.
    secret_key: watch::Sender<Option<Vec<u8>>>,
    /// True once select-protocol has been sent — the playback gate.
    connected: watch::Sender<bool>,
}

impl VoiceShared {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            ready: watch::channel(None).0,
            secret_key: watch::channel(None).0,
            connected: watch::channel(false).0,
        })
    }

    async fn wait_ready(&self) -> VoiceReady {
        let mut rx = self.ready.subscribe();
        let guard = rx
            .wait_for(|v| v.is_some())
            .await
            .expect("ready sender lives in self");
        guard.as_ref().cloned().expect("checked some")
    }

    async fn wait_secret_key(&self) -> Vec<u8> {
        let mut rx = self.secret_key.subscribe();
        let guard = rx
            .wait_for(|v| v.is_some())
            .await
            .expect("secret_key sender lives in self");
        guard.as_ref().cloned().expect("checked some")
    }

    async fn wait_connected(&self) {
        let mut rx = self.connected.subscribe();
        let _ = rx
            .wait_for(|connected| *connected)
            .await
            .expect("connected sender lives in self");
    }
}

// ---------------------------------------------------------------------------
// VoiceSession
// ---------------------------------------------------------------------------

/// One guild's voice connection: signaling socket plus media socket.
///
/// At most one of these per guild; dropping it aborts the session's
/// tasks. Leaving the channel has no wire protocol modeled here.
pub struct VoiceSession {
    guild_id: String,
    ssrc: u32,
    udp: Arc<UdpSocket>,
    signaling: mpsc::UnboundedSender<VoiceFrame>,
    shared: Arc<VoiceShared>,
    /// Packet counters live for the session, not per playback; the
    /// lock also serializes playbacks.
    media: Mutex<Option<RtpPacketizer>>,
    tasks: Vec<tokio::task::AbortHandle>,
}

impl VoiceSession {
    /// Joins a voice channel and runs the full bring-up described in
    /// the module docs. Returns once playback is possible (the secret
    /// key may still be in flight; [`play`](Self::play) waits for it).
    pub async fn connect(
        gateway: &GatewayHandle,
        session: &Session,
        guild_id: &str,
        channel_id: &str,
        self_mute: bool,
        self_deaf: bool,
    ) -> Result<Self, VoiceError> {
        // Phase 1: signal on the main gateway, wait for the handoff.
        gateway.send(GatewayFrame::voice_state_update(
            guild_id, channel_id, self_mute, self_deaf,
        ))?;
        debug!(guild_id, channel_id, "voice state update sent — waiting for handoff");

        let handoff = session.take_voice_handoff().await;
        let (
            Some(endpoint),
            Some(token),
            Some(server_id),
            Some(voice_session_id),
            Some(user_id),
        ) = (
            handoff.endpoint,
            handoff.token,
            handoff.guild_id,
            handoff.session_id,
            handoff.user_id,
        )
        else {
            return Err(VoiceError::Handshake("incomplete voice handoff".into()));
        };

        // Phase 2: voice socket, identify, nested listener.
        let url = voice_socket_url(&endpoint);
        info!(%url, "connecting voice socket");
        let conn = Arc::new(WebSocketConnection::connect(&url).await?);

        let (signaling, signaling_rx) = mpsc::unbounded_channel();
        let mut tasks = Vec::new();
        tasks.push(
            tokio::spawn(run_voice_writer(
                Arc::clone(&conn),
                JsonCodec,
                signaling_rx,
            ))
            .abort_handle(),
        );

        // The identify frame consumes each handoff value exactly once;
        // the explicit drop clears them so nothing can reuse stale
        // credentials.
        signaling
            .send(VoiceFrame::identify(
                &server_id,
                &user_id,
                &voice_session_id,
                &token,
            ))
            .map_err(|_| VoiceError::Closed)?;
        drop((server_id, user_id, voice_session_id, token));

        let shared = VoiceShared::new();
        tasks.push(
            tokio::spawn(run_voice_listener(
                Arc::clone(&conn),
                JsonCodec,
                Arc::clone(&shared),
                signaling.clone(),
            ))
            .abort_handle(),
        );

        // Phase 3: ready → UDP connect → discovery → select protocol.
        let negotiated = async {
            let ready = shared.wait_ready().await;
            if !ready.supports_secretbox() {
                return Err(VoiceError::UnsupportedMode);
            }

            let udp = UdpSocket::bind("0.0.0.0:0").await?;
            udp.connect((ready.ip.as_str(), ready.port)).await?;
            let external =
                discovery::discover_external_address(&udp, ready.ssrc).await?;
            info!(ip = %external.ip, port = external.port, "external address discovered");

            signaling
                .send(VoiceFrame::select_protocol(
                    &external.ip,
                    external.port,
                    XSALSA20_POLY1305,
                ))
                .map_err(|_| VoiceError::Closed)?;
            Ok((udp, ready.ssrc))
        }
        .await;

        let (udp, ssrc) = match negotiated {
            Ok(negotiated) => negotiated,
            Err(e) => {
                for task in &tasks {
                    task.abort();
                }
                return Err(e);
            }
        };

        shared.connected.send_replace(true);
        debug!("select protocol sent — voice session ready");

        Ok(Self {
            guild_id: guild_id.to_owned(),
            ssrc,
            udp: Arc::new(udp),
            signaling,
            shared,
            media: Mutex::new(None),
            tasks,
        })
    }

    /// The guild this session belongs to.
    pub fn guild_id(&self) -> &str {
        &self.guild_id
    }

    /// The synchronization source id the server assigned.
    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    /// Whether the protocol selection has completed.
    pub fn is_ready(&self) -> bool {
        *self.shared.connected.borrow()
    }

    /// Plays a source to completion, returning the number of frames
    /// sent.
    ///
    /// Blocks until the session is ready and the secret key has
    /// arrived. One playback at a time per session; counters carry over
    /// between playbacks.
    pub async fn play<S: AudioSource>(&self, source: S) -> Result<u64, VoiceError> {
        self.shared.wait_connected().await;

        let mut media = self.media.lock().await;
        if media.is_none() {
            let key = self.shared.wait_secret_key().await;
            *media = Some(RtpPacketizer::new(self.ssrc, &key)?);
        }
        let packetizer = media.as_mut().expect("initialized above");

        run_playback(&self.udp, &self.signaling, packetizer, source).await
    }
}

impl Drop for VoiceSession {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

fn voice_socket_url(endpoint: &str) -> String {
    if endpoint.starts_with("ws://") || endpoint.starts_with("wss://") {
        format!("{endpoint}?v=4")
    } else {
        format!("wss://{endpoint}?v=4")
    }
}

// ---------------------------------------------------------------------------
// Voice socket tasks
// ---------------------------------------------------------------------------

/// Drains signaling frames onto the voice socket in send order.
async fn run_voice_writer<C>(
    conn: Arc<C>,
    codec: JsonCodec,
    mut rx: mpsc::UnboundedReceiver<VoiceFrame>,
) -> Result<(), VoiceError>
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
    Ok(())
}

/// Demultiplexes inbound voice frames by opcode.
async fn run_voice_listener<C>(
    conn: Arc<C>,
    codec: JsonCodec,
    shared: Arc<VoiceShared>,
    signaling: mpsc::UnboundedSender<VoiceFrame>,
) where
    C: Connection<Error = TransportError>,
{
    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                error!("voice connection closed by server");
                return;
            }
            Err(e) => {
                error!(error = %e, "voice connection failed");
                return;
            }
        };

        let frame: VoiceFrame = match codec.decode(&data) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "undecodable voice frame — ignoring");
                continue;
            }
        };

        match frame.opcode() {
            Some(VoiceOpcode::Ready) => {
                match serde_json::from_value::<VoiceReady>(frame.d) {
                    Ok(ready) => {
                        info!(
                            ssrc = ready.ssrc,
                            ip = %ready.ip,
                            port = ready.port,
                            "voice ready"
                        );
                        shared.ready.send_replace(Some(ready));
                    }
                    Err(e) => warn!(error = %e, "malformed voice ready — ignoring"),
                }
            }
            Some(VoiceOpcode::Heartbeat) => {
                warn!("inbound heartbeat opcode — wrong voice protocol version?");
            }
            Some(VoiceOpcode::SessionDescription) => {
                match serde_json::from_value::<SessionDescription>(frame.d) {
                    Ok(description) => {
                        debug!(mode = %description.mode, "encryption key received");
                        shared
                            .secret_key
                            .send_replace(Some(description.secret_key));
                    }
                    Err(e) => {
                        warn!(error = %e, "malformed session description — ignoring");
                    }
                }
            }
            Some(VoiceOpcode::HeartbeatAck) => {
                debug!("voice heartbeat acknowledged");
            }
            Some(VoiceOpcode::Hello) => {
                match serde_json::from_value::<VoiceHello>(frame.d) {
                    Ok(hello) => {
                        let interval = Duration::from_secs_f64(
                            hello.heartbeat_interval / 1000.0,
                        );
                        debug!(
                            interval_ms = hello.heartbeat_interval,
                            "voice hello received"
                        );
                        tokio::spawn(run_voice_heartbeat(
                            signaling.clone(),
                            interval,
                        ));
                    }
                    Err(e) => warn!(error = %e, "malformed voice hello — ignoring"),
                }
            }
            Some(other) => {
                debug!(opcode = ?other, "voice frame with no client-side handling");
            }
            None => warn!(op = frame.op, "unknown voice opcode — ignoring"),
        }
    }
}

/// Voice keep-alive: the same jitter-then-steady shape as the main
/// gateway's coordinator, carrying a random nonce instead of a
/// sequence number.
async fn run_voice_heartbeat(
    signaling: mpsc::UnboundedSender<VoiceFrame>,
    interval: Duration,
) {
    let delay = interval.mul_f64(rand::rng().random::<f64>());
    debug!(delay_ms = delay.as_millis() as u64, "first voice heartbeat scheduled");
    tokio::time::sleep(delay).await;

    loop {
        let nonce: u64 = rand::rng().random_range(0..10_000_000);
        if signaling.send(VoiceFrame::heartbeat(nonce)).is_err() {
            debug!("voice writer gone — heartbeat stopping");
            return;
        }
        tokio::time::sleep(interval).await;
    }
}

// =========================================================================
// Tests
// =========================================================================
