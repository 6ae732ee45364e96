//! Voice signaling frames and handshake payloads.
//!
//! The per-guild voice websocket speaks a smaller `{op, d}` envelope
//! with its own opcode table. The client produces identify (0),
//! select-protocol (1), heartbeat (3), and speaking (5); it consumes
//! ready (2), session-description (4), heartbeat-ack (6), and hello (8).

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// The only transport encryption mode this client implements: the
/// 24-byte-nonce secretbox construction applied to every audio packet.
pub const XSALSA20_POLY1305: &str = "xsalsa20_poly1305";

// ---------------------------------------------------------------------------
// VoiceOpcode
// ---------------------------------------------------------------------------

/// Operation codes of the voice signaling protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceOpcode {
    /// Begins the voice session (client → server).
    Identify,
    /// Selects the UDP transport and encryption mode (client → server).
    SelectProtocol,
    /// Carries ssrc, ip, port, and offered modes (server → client).
    Ready,
    /// Keep-alive with a random nonce payload (client → server).
    Heartbeat,
    /// Carries the secret key once the protocol is selected (server → client).
    SessionDescription,
    /// Marks the start/stop of audio transmission (client → server).
    Speaking,
    /// The server saw our heartbeat.
    HeartbeatAck,
    /// Resumes a dropped voice session (client → server).
    Resume,
    /// First frame on the socket; carries the heartbeat interval.
    Hello,
    /// Acknowledges a resume (server → client).
    Resumed,
    /// A user disconnected from the channel (server → client).
    ClientDisconnect,
}

impl VoiceOpcode {
    /// Maps a wire opcode to its variant; unknown opcodes return `None`.
    pub fn from_op(op: u8) -> Option<Self> {
        Some(match op {
            0 => Self::Identify,
            1 => Self::SelectProtocol,
            2 => Self::Ready,
            3 => Self::Heartbeat,
            4 => Self::SessionDescription,
            5 => Self::Speaking,
            6 => Self::HeartbeatAck,
            7 => Self::Resume,
            8 => Self::Hello,
            9 => Self::Resumed,
            13 => Self::ClientDisconnect,
            _ => return None,
        })
    }

    /// The wire value of this opcode.
    pub fn op(self) -> u8 {
        match self {
            Self::Identify => 0,
            Self::SelectProtocol => 1,
            Self::Ready => 2,
            Self::Heartbeat => 3,
            Self::SessionDescription => 4,
            Self::Speaking => 5,
            Self::HeartbeatAck => 6,
            Self::Resume => 7,
            Self::Hello => 8,
            Self::Resumed => 9,
            Self::ClientDisconnect => 13,
        }
    }
}

// ---------------------------------------------------------------------------
// VoiceFrame
// ---------------------------------------------------------------------------

/// The `{op, d}` envelope of the voice signaling socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceFrame {
    /// Operation code — see [`VoiceOpcode`].
    pub op: u8,

    /// Opaque payload; shape depends on `op`.
    #[serde(default)]
    pub d: Value,
}

impl VoiceFrame {
    /// Builds an outgoing frame with just an opcode and payload.
    pub fn new(op: VoiceOpcode, d: Value) -> Self {
        Self { op: op.op(), d }
    }

    /// A voice identify (op 0). Each field of the gateway handoff is
    /// consumed exactly once to build this frame.
    pub fn identify(
        server_id: &str,
        user_id: &str,
        session_id: &str,
        token: &str,
    ) -> Self {
        Self::new(
            VoiceOpcode::Identify,
            json!({
                "server_id": server_id,
                "user_id": user_id,
                "session_id": session_id,
                "token": token,
            }),
        )
    }

    /// A select-protocol (op 1) naming UDP and the externally-visible
    /// address learned from IP discovery.
    pub fn select_protocol(address: &str, port: u16, mode: &str) -> Self {
        Self::new(
            VoiceOpcode::SelectProtocol,
            json!({
                "protocol": "udp",
                "data": {
                    "address": address,
                    "port": port,
                    "mode": mode,
                },
            }),
        )
    }

    /// A voice heartbeat (op 3) carrying a random nonce.
    pub fn heartbeat(nonce: u64) -> Self {
        Self::new(VoiceOpcode::Heartbeat, json!(nonce))
    }

    /// A speaking frame (op 5). Sent with `true` before transmission
    /// starts and `false` once it ends.
    pub fn speaking(speaking: bool, ssrc: u32) -> Self {
        Self::new(
            VoiceOpcode::Speaking,
            json!({
                "speaking": if speaking { 1 } else { 0 },
                "delay": 0,
                "ssrc": ssrc,
            }),
        )
    }

    /// The opcode, if it is one this protocol names.
    pub fn opcode(&self) -> Option<VoiceOpcode> {
        VoiceOpcode::from_op(self.op)
    }
}

// ---------------------------------------------------------------------------
// Decoded handshake payloads
// ---------------------------------------------------------------------------

/// Payload of voice op 2 (ready).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VoiceReady {
    /// Synchronization source id assigned to our audio stream.
    pub ssrc: u32,
    /// Media server address for the UDP channel.
    pub ip: String,
    /// Media server port for the UDP channel.
    pub port: u16,
    /// Encryption modes the server offers.
    #[serde(default)]
    pub modes: Vec<String>,
}

impl VoiceReady {
    /// Whether the server offers the one mode we implement.
    pub fn supports_secretbox(&self) -> bool {
        self.modes.iter().any(|m| m == XSALSA20_POLY1305)
    }
}

/// Payload of voice op 4 (session description).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionDescription {
    /// Negotiated encryption mode.
    #[serde(default)]
    pub mode: String,
    /// 32-byte symmetric key for audio packet encryption.
    pub secret_key: Vec<u8>,
}

/// Payload of voice op 8 (hello).
///
/// Unlike the main gateway, the voice server reports its interval as a
/// fractional number of milliseconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VoiceHello {
    /// Heartbeat interval in milliseconds.
    pub heartbeat_interval: f64,
}

// =========================================================================
// Tests
// =========================================================================
