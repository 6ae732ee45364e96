//! Gateway frame envelope and opcodes.
//!
//! Every message on the main gateway socket is one JSON object:
//!
//! ```text
//! ┌──────────────────────────────────┐
//! │ op: 0                            │  ← what kind of frame this is
//! │ s:  42            (nullable)     │  ← server sequence number
//! │ t:  "READY"       (nullable)     │  ← event name, dispatches only
//! │ ┌──────────────────────────────┐ │
//! │ │ d: { ... }                   │ │  ← opaque payload
//! │ └──────────────────────────────┘ │
//! └──────────────────────────────────┘
//! ```
//!
//! The payload stays a [`serde_json::Value`] at this layer: only the
//! session layer knows which dispatches it cares about, and unknown
//! events must pass through undisturbed rather than fail decoding.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Dispatch event names
// ---------------------------------------------------------------------------

/// Event names (`t` field) the session layer consumes.
pub mod event {
    /// First dispatch after identify; carries the resume URL and session id.
    pub const READY: &str = "READY";
    /// A command or component interaction was triggered.
    pub const INTERACTION_CREATE: &str = "INTERACTION_CREATE";
    /// First half of the voice handoff: our voice session id.
    pub const VOICE_STATE_UPDATE: &str = "VOICE_STATE_UPDATE";
    /// Second half of the voice handoff: endpoint, token, guild.
    pub const VOICE_SERVER_UPDATE: &str = "VOICE_SERVER_UPDATE";
}

// ---------------------------------------------------------------------------
// GatewayOpcode
// ---------------------------------------------------------------------------

/// Operation codes of the main gateway protocol.
///
/// The client consumes `Dispatch`, `Heartbeat` (a server-initiated
/// request for one), `Reconnect`, `Hello`, and `HeartbeatAck`, and
/// produces `Heartbeat`, `Identify`, and `VoiceStateUpdate`. The rest
/// are part of the protocol surface and are named so that a frame the
/// listener does not handle can still be logged meaningfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayOpcode {
    /// An event dispatch (server → client).
    Dispatch,
    /// Keep-alive; also sent by the server as an immediate-beat request.
    Heartbeat,
    /// Starts a new session (client → server).
    Identify,
    /// Presence update (client → server).
    PresenceUpdate,
    /// Joins, moves, or leaves a voice channel (client → server).
    VoiceStateUpdate,
    /// Resumes a dropped session (client → server).
    Resume,
    /// The server wants us to reconnect (server → client).
    Reconnect,
    /// Guild member chunk request (client → server).
    RequestGuildMembers,
    /// The session is invalid; re-identify (server → client).
    InvalidSession,
    /// First frame on the socket; carries the heartbeat interval.
    Hello,
    /// The server saw our heartbeat.
    HeartbeatAck,
}

impl GatewayOpcode {
    /// Maps a wire opcode to its variant. Unknown opcodes return `None`
    /// — they are logged and ignored, never an error.
    pub fn from_op(op: u8) -> Option<Self> {
        Some(match op {
            0 => Self::Dispatch,
            1 => Self::Heartbeat,
            2 => Self::Identify,
            3 => Self::PresenceUpdate,
            4 => Self::VoiceStateUpdate,
            6 => Self::Resume,
            7 => Self::Reconnect,
            8 => Self::RequestGuildMembers,
            9 => Self::InvalidSession,
            10 => Self::Hello,
            11 => Self::HeartbeatAck,
            _ => return None,
        })
    }

    /// The wire value of this opcode.
    pub fn op(self) -> u8 {
        match self {
            Self::Dispatch => 0,
            Self::Heartbeat => 1,
            Self::Identify => 2,
            Self::PresenceUpdate => 3,
            Self::VoiceStateUpdate => 4,
            Self::Resume => 6,
            Self::Reconnect => 7,
            Self::RequestGuildMembers => 8,
            Self::InvalidSession => 9,
            Self::Hello => 10,
            Self::HeartbeatAck => 11,
        }
    }
}

// ---------------------------------------------------------------------------
// GatewayFrame
// ---------------------------------------------------------------------------

/// The `{op, d, s, t}` envelope of the main gateway socket.
///
/// `s` and `t` are only present on dispatches; `#[serde(default)]` lets
/// frames without them decode, and outgoing frames omit them entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayFrame {
    /// Operation code — see [`GatewayOpcode`].
    pub op: u8,

    /// Opaque payload; shape depends on `op` (and `t` for dispatches).
    #[serde(default)]
    pub d: Value,

    /// Server sequence number. Non-null only on dispatches; every
    /// non-null value must be folded into the session's `last_sequence`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,

    /// Event name. Non-null only on dispatches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

impl GatewayFrame {
    /// Builds an outgoing frame with just an opcode and payload.
    pub fn new(op: GatewayOpcode, d: Value) -> Self {
        Self {
            op: op.op(),
            d,
            s: None,
            t: None,
        }
    }

    /// A heartbeat (op 1) echoing the last sequence number seen, or
    /// `null` before the first dispatch.
    pub fn heartbeat(last_sequence: Option<u64>) -> Self {
        Self::new(GatewayOpcode::Heartbeat, json!(last_sequence))
    }

    /// An identify (op 2) with zero intents and minimal client
    /// properties.
    pub fn identify(token: &str) -> Self {
        Self::new(
            GatewayOpcode::Identify,
            json!({
                "token": token,
                "intents": 0,
                "properties": {
                    "os": std::env::consts::OS,
                    "browser": "accord",
                    "device": "accord",
                },
            }),
        )
    }

    /// A voice-state update (op 4) asking the server to move us into the
    /// given voice channel.
    pub fn voice_state_update(
        guild_id: &str,
        channel_id: &str,
        self_mute: bool,
        self_deaf: bool,
    ) -> Self {
        Self::new(
            GatewayOpcode::VoiceStateUpdate,
            json!({
                "guild_id": guild_id,
                "channel_id": channel_id,
                "self_mute": self_mute,
                "self_deaf": self_deaf,
            }),
        )
    }

    /// The opcode, if it is one this protocol names.
    pub fn opcode(&self) -> Option<GatewayOpcode> {
        GatewayOpcode::from_op(self.op)
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The server defines exact JSON shapes for these envelopes; these
    //! tests pin our serde attributes to them.

    use super::*;

    #[test]
    fn test_opcode_round_trip() {
        for op in [0u8, 1, 2, 3, 4, 6, 7, 8, 9, 10, 11] {
            let code = GatewayOpcode::from_op(op).expect("known opcode");
            assert_eq!(code.op(), op);
        }
    }

    #[test]
    fn test_unknown_opcode_is_none() {
        assert_eq!(GatewayOpcode::from_op(5), None);
        assert_eq!(GatewayOpcode::from_op(12), None);
        assert_eq!(GatewayOpcode::from_op(255), None);
    }

    #[test]
    fn test_heartbeat_json_shape() {
        let json = serde_json::to_value(GatewayFrame::heartbeat(Some(41))).unwrap();
        assert_eq!(json, serde_json::json!({"op": 1, "d": 41}));
    }

    #[test]
    fn test_heartbeat_with_no_sequence_sends_null() {
        let json = serde_json::to_value(GatewayFrame::heartbeat(None)).unwrap();
        assert_eq!(json["op"], 1);
        assert!(json["d"].is_null());
        // s/t must be absent on outgoing frames, not null.
        assert!(json.get("s").is_none());
        assert!(json.get("t").is_none());
    }

    #[test]
    fn test_identify_json_shape() {
        let json = serde_json::to_value(GatewayFrame::identify("tok-123")).unwrap();
        assert_eq!(json["op"], 2);
        assert_eq!(json["d"]["token"], "tok-123");
        assert_eq!(json["d"]["intents"], 0);
        assert!(json["d"]["properties"]["os"].is_string());
        assert_eq!(json["d"]["properties"]["browser"], "accord");
        assert_eq!(json["d"]["properties"]["device"], "accord");
    }

    #[test]
    fn test_voice_state_update_json_shape() {
        let frame = GatewayFrame::voice_state_update("g-1", "c-2", false, true);
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["op"], 4);
        assert_eq!(json["d"]["guild_id"], "g-1");
        assert_eq!(json["d"]["channel_id"], "c-2");
        assert_eq!(json["d"]["self_mute"], false);
        assert_eq!(json["d"]["self_deaf"], true);
    }

    #[test]
    fn test_dispatch_decodes_with_sequence_and_event() {
        let raw = r#"{"op":0,"d":{"session_id":"abc"},"s":7,"t":"READY"}"#;
        let frame: GatewayFrame = serde_json::from_str(raw).unwrap();
        assert_eq!(frame.opcode(), Some(GatewayOpcode::Dispatch));
        assert_eq!(frame.s, Some(7));
        assert_eq!(frame.t.as_deref(), Some(event::READY));
        assert_eq!(frame.d["session_id"], "abc");
    }

    #[test]
    fn test_hello_decodes_without_sequence_or_event() {
        let raw = r#"{"op":10,"d":{"heartbeat_interval":41250}}"#;
        let frame: GatewayFrame = serde_json::from_str(raw).unwrap();
        assert_eq!(frame.opcode(), Some(GatewayOpcode::Hello));
        assert_eq!(frame.s, None);
        assert_eq!(frame.t, None);
    }

    #[test]
    fn test_heartbeat_ack_with_null_fields() {
        // Servers send explicit nulls for s/t on non-dispatch frames.
        let raw = r#"{"op":11,"d":null,"s":null,"t":null}"#;
        let frame: GatewayFrame = serde_json::from_str(raw).unwrap();
        assert_eq!(frame.opcode(), Some(GatewayOpcode::HeartbeatAck));
        assert!(frame.d.is_null());
    }

    #[test]
    fn test_decode_garbage_is_an_error() {
        let result: Result<GatewayFrame, _> = serde_json::from_slice(b"not json");
        assert!(result.is_err());
    }
}
