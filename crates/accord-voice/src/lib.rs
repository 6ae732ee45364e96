//! Voice subsystem for Accord.
//!
//! A voice session is a second, per-guild connection pair next to the
//! main gateway: a signaling websocket (identify, protocol selection,
//! heartbeats, speaking markers) and a raw UDP channel carrying
//! encrypted audio.
//!
//! - [`VoiceSession`] — bring-up and lifecycle: gateway signal phase,
//!   voice-socket phase, UDP discovery, protocol selection.
//! - [`RtpPacketizer`] — packet framing and secretbox encryption, with
//!   wrapping sequence/timestamp counters.
//! - [`FrameScheduler`] — the absolute-deadline 20 ms send cadence.
//! - [`AudioSource`] — the frame-iterator boundary to the external
//!   audio process, with [`OggPacketReader`] and [`FfmpegOpusSource`]
//!   as the shipped implementations.

mod discovery;
mod error;
mod player;
mod rtp;
mod session;
mod source;

pub use discovery::{
    discover_external_address, encode_discovery_request,
    parse_discovery_response, ExternalAddress, DISCOVERY_LEN,
};
pub use error::VoiceError;
pub use player::FrameScheduler;
pub use rtp::{
    rtp_header, RtpPacketizer, FRAME_DURATION, RTP_HEADER_LEN,
    SAMPLES_PER_FRAME, SAMPLE_RATE,
};
pub use session::VoiceSession;
pub use source::{AudioSource, FfmpegOpusSource, OggPacketReader};
