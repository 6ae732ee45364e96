//! Wire protocol for Accord.
//!
//! This crate defines the "language" spoken over the two websockets and
//! the datagrams the client deals with:
//!
//! - **Gateway frames** ([`GatewayFrame`], [`GatewayOpcode`]) — the
//!   `{op, d, s, t}` envelopes of the main event-streaming socket.
//! - **Voice frames** ([`VoiceFrame`], [`VoiceOpcode`]) — the `{op, d}`
//!   envelopes of the per-guild voice signaling socket, plus the decoded
//!   payloads the voice handshake consumes.
//! - **Interaction constants** ([`InteractionKind`],
//!   [`InteractionCallbackType`], [`CommandKind`], [`OptionKind`]) and
//!   the closed [`Component`] set attached to outgoing responses.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how envelopes are
//!   converted to/from the bytes a connection carries.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while encoding
//!   or decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw frames) and the
//! session layer (connection state). It doesn't know about sockets,
//! heartbeats, or queues — it only knows the shapes that travel on the
//! wire.
//!
//! ```text
//! Transport (bytes) → Protocol (GatewayFrame) → Session (client state)
//! ```

mod codec;
mod error;
mod frame;
mod interaction;
mod voice;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use frame::{event, GatewayFrame, GatewayOpcode};
pub use interaction::{
    action_row, ButtonStyle, CommandKind, Component, InteractionCallbackType,
    InteractionKind, MenuKind, OptionKind, SelectOption, TextInputStyle,
};
pub use voice::{
    SessionDescription, VoiceFrame, VoiceHello, VoiceOpcode, VoiceReady,
    XSALSA20_POLY1305,
};
