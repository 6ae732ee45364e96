//! RTP-style packet framing and encryption.
//!
//! Every audio datagram is a fixed 12-byte header followed by the
//! secretbox ciphertext of one audio frame:
//!
//! ```text
//! 0x80 0x78 | sequence (2 BE) | timestamp (4 BE) | ssrc (4 BE) | ciphertext…
//! ```
//!
//! The 24-byte encryption nonce is the header itself, zero-padded. The
//! sequence counter wraps at 2^16; the timestamp advances by the fixed
//! 960 samples per frame (20 ms at 48 kHz) and wraps at 2^32.

use std::time::Duration;

use crypto_secretbox::aead::{Aead, KeyInit};
use crypto_secretbox::{Key, Nonce, XSalsa20Poly1305};

use crate::VoiceError;

/// Audio sample rate the voice transport expects.
pub const SAMPLE_RATE: u32 = 48_000;

/// Samples carried by each 20 ms frame.
pub const SAMPLES_PER_FRAME: u32 = 960;

/// Wall-clock cadence of the send loop.
pub const FRAME_DURATION: Duration = Duration::from_millis(20);

/// Size of the packet header (and the meaningful prefix of the nonce).
pub const RTP_HEADER_LEN: usize = 12;

/// Size of a secretbox nonce.
const NONCE_LEN: usize = 24;

/// Builds the 12-byte packet header.
pub fn rtp_header(sequence: u16, timestamp: u32, ssrc: u32) -> [u8; RTP_HEADER_LEN] {
    let mut header = [0u8; RTP_HEADER_LEN];
    header[0] = 0x80;
    header[1] = 0x78;
    header[2..4].copy_from_slice(&sequence.to_be_bytes());
    header[4..8].copy_from_slice(&timestamp.to_be_bytes());
    header[8..12].copy_from_slice(&ssrc.to_be_bytes());
    header
}

/// The per-packet nonce: header in the first 12 bytes, zeros after.
fn packet_nonce(header: &[u8; RTP_HEADER_LEN]) -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    nonce[..RTP_HEADER_LEN].copy_from_slice(header);
    nonce
}

/// Stateful packet builder for one voice session's audio stream.
pub struct RtpPacketizer {
    cipher: XSalsa20Poly1305,
    ssrc: u32,
    sequence: u16,
    timestamp: u32,
}

impl RtpPacketizer {
    /// Creates a packetizer from the session's secret key.
    ///
    /// # Errors
    /// Returns [`VoiceError::InvalidKey`] unless the key is exactly
    /// 32 bytes.
    pub fn new(ssrc: u32, secret_key: &[u8]) -> Result<Self, VoiceError> {
        if secret_key.len() != 32 {
            return Err(VoiceError::InvalidKey(secret_key.len()));
        }
        Ok(Self {
            cipher: XSalsa20Poly1305::new(Key::from_slice(secret_key)),
            ssrc,
            sequence: 0,
            timestamp: 0,
        })
    }

    /// Seals one audio frame into a ready-to-send datagram and advances
    /// the counters.
    pub fn seal(&mut self, frame: &[u8]) -> Result<Vec<u8>, VoiceError> {
        let header = rtp_header(self.sequence, self.timestamp, self.ssrc);
        let nonce = packet_nonce(&header);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), frame)
            .map_err(|_| VoiceError::Encrypt)?;

        let mut packet = Vec::with_capacity(RTP_HEADER_LEN + ciphertext.len());
        packet.extend_from_slice(&header);
        packet.extend_from_slice(&ciphertext);

        self.sequence = self.sequence.wrapping_add(1);
        self.timestamp = self.timestamp.wrapping_add(SAMPLES_PER_FRAME);

        Ok(packet)
    }

    /// Sequence number the next packet will carry.
    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    /// Timestamp the next packet will carry.
    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    /// The stream's synchronization source id.
    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }
}

// =========================================================================
// Tests
// =========================================================================
