//! Playback pacing and the audio send loop.

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::info;

use accord_protocol::VoiceFrame;

use crate::rtp::{RtpPacketizer, FRAME_DURATION};
use crate::source::AudioSource;
use crate::VoiceError;

// ---------------------------------------------------------------------------
// FrameScheduler
// ---------------------------------------------------------------------------

/// Absolute-deadline scheduler for the 20 ms send cadence.
///
/// Deadlines are `start + 20ms × n`, computed from the start instant
/// rather than from the previous send, so per-iteration processing
/// latency never accumulates into drift.
pub struct FrameScheduler {
    start: Instant,
    iteration: u32,
}

impl FrameScheduler {
    /// Starts the schedule at the current instant; the first frame is
    /// sent immediately and the first wait targets `start + 20ms`.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            iteration: 0,
        }
    }

    /// Sleeps until the next deadline.
    pub async fn wait_next_frame(&mut self) {
        self.iteration += 1;
        tokio::time::sleep_until(self.start + FRAME_DURATION * self.iteration)
            .await;
    }

    /// Deadlines waited for so far.
    pub fn iterations(&self) -> u32 {
        self.iteration
    }
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Send loop
// ---------------------------------------------------------------------------

/// Transmits every frame of `source` as one sealed datagram per 20 ms,
/// bracketed by speaking frames on the signaling socket.
pub(crate) async fn run_playback<S: AudioSource>(
    udp: &UdpSocket,
    signaling: &mpsc::UnboundedSender<VoiceFrame>,
    packetizer: &mut RtpPacketizer,
    mut source: S,
) -> Result<u64, VoiceError> {
    signaling
        .send(VoiceFrame::speaking(true, packetizer.ssrc()))
        .map_err(|_| VoiceError::Closed)?;
    info!("audio transmission started");

    let mut scheduler = FrameScheduler::new();
    let mut frames_sent: u64 = 0;
    let outcome = loop {
        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break Ok(frames_sent),
            Err(e) => break Err(VoiceError::Source(e)),
        };
        let packet = match packetizer.seal(&frame) {
            Ok(packet) => packet,
            Err(e) => break Err(e),
        };
        if let Err(e) = udp.send(&packet).await {
            break Err(VoiceError::Udp(e));
        }
        frames_sent += 1;
        scheduler.wait_next_frame().await;
    };

    // The stop marker goes out even when the loop ended early.
    let _ = signaling.send(VoiceFrame::speaking(false, packetizer.ssrc()));
    if let Ok(frames) = &outcome {
        info!(frames = *frames, "audio transmission finished");
    }
    outcome
}

// =========================================================================
// Tests
// =========================================================================
