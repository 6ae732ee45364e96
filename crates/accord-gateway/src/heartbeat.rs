//! Heartbeat coordinator: jittered first beat, exact steady cadence.
//!
//! State machine: waiting-for-interval → first beat → steady. No beat
//! goes out before the hello frame delivers the interval; the first
//! beat is delayed by `U(0,1) × interval` so a fleet of clients
//! restarting together doesn't beat in phase; every later beat sleeps
//! exactly one interval. Each beat echoes the latest sequence number
//! the listener has recorded.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use accord_protocol::GatewayFrame;

use crate::{GatewayError, GatewayHandle, Session};

/// Delay before the first beat: the jitter fraction applied to the
/// interval. Fractions outside `[0, 1]` are clamped.
pub(crate) fn first_beat_delay(interval: Duration, fraction: f64) -> Duration {
    interval.mul_f64(fraction.clamp(0.0, 1.0))
}

/// Runs the heartbeat loop for one connection.
///
/// Returns only on error; the run loop aborts this task when the
/// connection goes away.
pub async fn run_heartbeat(
    session: Arc<Session>,
    gateway: GatewayHandle,
) -> Result<(), GatewayError> {
    let interval =
        Duration::from_millis(session.wait_heartbeat_interval().await);

    let fraction: f64 = rand::rng().random();
    let delay = first_beat_delay(interval, fraction);
    debug!(
        delay_ms = delay.as_millis() as u64,
        interval_ms = interval.as_millis() as u64,
        "first heartbeat scheduled"
    );
    tokio::time::sleep(delay).await;

    loop {
        gateway.send(GatewayFrame::heartbeat(session.last_sequence()))?;
        session.note_heartbeat_sent();
        debug!(sequence = ?session.last_sequence(), "heartbeat sent");

        tokio::time::sleep(interval).await;

        if !session.heartbeat_acknowledged() {
            // Observability only: a missed ack does not tear the
            // connection down here.
            warn!("previous heartbeat was never acknowledged");
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
