//! Shared session state: the one record of "where this connection is".
//!
//! A [`Session`] is created once per process run, before any socket
//! exists, and is shared (via `Arc`) by every task the client spawns:
//! the listener writes to it, the heartbeat and handshake tasks gate on
//! it, the voice layer consumes its captured handoff.
//!
//! The original design kept these as bare flags polled from a single
//! cooperative thread. Under real parallelism each field gets explicit
//! synchronization: atomics for counters and per-beat flags, `watch`
//! channels for the predicates other tasks block on, and a mutex +
//! [`Notify`] pair for the voice handoff capture. Nothing here busy-waits.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::{watch, Notify};

// ---------------------------------------------------------------------------
// VoiceHandoff
// ---------------------------------------------------------------------------

/// The endpoint/token/session triple (plus ids) the server delivers via
/// two separate dispatch events before a voice socket can be opened.
///
/// Each field is captured by the listener and consumed exactly once by
/// the voice layer; [`Session::take_voice_handoff`] clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceHandoff {
    /// Voice server host, from VOICE_SERVER_UPDATE.
    pub endpoint: Option<String>,
    /// Voice auth token, from VOICE_SERVER_UPDATE.
    pub token: Option<String>,
    /// Guild the voice session belongs to, from VOICE_SERVER_UPDATE.
    pub guild_id: Option<String>,
    /// Our voice session id, from VOICE_STATE_UPDATE.
    pub session_id: Option<String>,
    /// Our user id, from VOICE_STATE_UPDATE.
    pub user_id: Option<String>,
}

impl VoiceHandoff {
    /// Whether both dispatch halves have arrived.
    pub fn is_complete(&self) -> bool {
        self.endpoint.is_some()
            && self.token.is_some()
            && self.guild_id.is_some()
            && self.session_id.is_some()
            && self.user_id.is_some()
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Connection-lifetime state of the main gateway session.
pub struct Session {
    /// Latest non-null sequence number seen, or -1 before the first
    /// dispatch. Updated with `fetch_max` so it can only grow.
    last_sequence: AtomicI64,

    /// Heartbeats sent on the current connection.
    heartbeats_sent: AtomicU64,

    /// Whether the most recent heartbeat has been acknowledged.
    /// Cleared on every send; a beat that leaves this false past the
    /// interval is observable but not fatal.
    heartbeat_acknowledged: AtomicBool,

    /// Heartbeat interval from the hello frame. `None` until op 10.
    hello: watch::Sender<Option<u64>>,

    /// Latched true on the first heartbeat acknowledgement of the
    /// current connection; the identify gate.
    first_ack: watch::Sender<bool>,

    /// True once the READY dispatch has been processed.
    ready: watch::Sender<bool>,

    /// Where to reconnect; starts as the plain gateway URL, replaced by
    /// READY's `resume_gateway_url`.
    resume_gateway_url: Mutex<Option<String>>,

    /// Session id from READY.
    session_id: Mutex<Option<String>>,

    /// Voice handoff capture, see [`VoiceHandoff`].
    voice: Mutex<VoiceHandoff>,
    voice_notify: Notify,
}

impl Session {
    /// Creates the pre-connection state: no sequence, no interval, not
    /// ready.
    pub fn new() -> Self {
        Self {
            last_sequence: AtomicI64::new(-1),
            heartbeats_sent: AtomicU64::new(0),
            heartbeat_acknowledged: AtomicBool::new(false),
            hello: watch::channel(None).0,
            first_ack: watch::channel(false).0,
            ready: watch::channel(false).0,
            resume_gateway_url: Mutex::new(None),
            session_id: Mutex::new(None),
            voice: Mutex::new(VoiceHandoff::default()),
            voice_notify: Notify::new(),
        }
    }

    // -- Sequence tracking --

    /// Folds a dispatch sequence number in. The stored value only ever
    /// grows, so the next heartbeat always echoes the maximum seen.
    pub fn observe_sequence(&self, sequence: u64) {
        self.last_sequence
            .fetch_max(sequence as i64, Ordering::SeqCst);
    }

    /// The latest sequence number, or `None` before the first dispatch.
    pub fn last_sequence(&self) -> Option<u64> {
        match self.last_sequence.load(Ordering::SeqCst) {
            s if s < 0 => None,
            s => Some(s as u64),
        }
    }

    // -- Heartbeat bookkeeping --

    /// Stores the interval from the hello frame and wakes the
    /// heartbeat task.
    pub fn set_heartbeat_interval(&self, interval_ms: u64) {
        self.hello.send_replace(Some(interval_ms));
    }

    /// The heartbeat interval, if hello has arrived.
    pub fn heartbeat_interval(&self) -> Option<u64> {
        *self.hello.borrow()
    }

    /// Blocks until the hello frame has delivered the interval.
    pub async fn wait_heartbeat_interval(&self) -> u64 {
        let mut rx = self.hello.subscribe();
        let value = rx
            .wait_for(|v| v.is_some())
            .await
            .expect("hello sender lives in self");
        (*value).expect("checked some")
    }

    /// Records that a heartbeat went out; clears the per-beat ack flag.
    pub fn note_heartbeat_sent(&self) {
        self.heartbeats_sent.fetch_add(1, Ordering::SeqCst);
        self.heartbeat_acknowledged.store(false, Ordering::SeqCst);
    }

    /// Records a heartbeat acknowledgement (op 11).
    pub fn note_heartbeat_ack(&self) {
        self.heartbeat_acknowledged.store(true, Ordering::SeqCst);
        self.first_ack.send_replace(true);
    }

    /// Heartbeats sent on the current connection.
    pub fn heartbeats_sent(&self) -> u64 {
        self.heartbeats_sent.load(Ordering::SeqCst)
    }

    /// Whether the most recent heartbeat has been acknowledged.
    pub fn heartbeat_acknowledged(&self) -> bool {
        self.heartbeat_acknowledged.load(Ordering::SeqCst)
    }

    /// Blocks until at least one heartbeat has been sent *and*
    /// acknowledged on this connection — the identify precondition.
    pub async fn wait_first_heartbeat_ack(&self) {
        let mut rx = self.first_ack.subscribe();
        let _ = rx
            .wait_for(|acked| *acked)
            .await
            .expect("first_ack sender lives in self");
    }

    // -- Readiness --

    /// Marks the READY dispatch as processed.
    pub fn set_ready(&self) {
        self.ready.send_replace(true);
    }

    /// Whether READY has been processed.
    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Blocks until READY has been processed.
    pub async fn wait_ready(&self) {
        let mut rx = self.ready.subscribe();
        let _ = rx
            .wait_for(|ready| *ready)
            .await
            .expect("ready sender lives in self");
    }

    // -- Resume bookkeeping --

    /// Stores the URL reconnects should target.
    pub fn set_resume_gateway_url(&self, url: String) {
        *self.resume_gateway_url.lock() = Some(url);
    }

    /// The URL reconnects should target, if known.
    pub fn resume_gateway_url(&self) -> Option<String> {
        self.resume_gateway_url.lock().clone()
    }

    /// Stores the session id from READY.
    pub fn set_session_id(&self, id: String) {
        *self.session_id.lock() = Some(id);
    }

    /// The session id from READY, if received.
    pub fn session_id(&self) -> Option<String> {
        self.session_id.lock().clone()
    }

    // -- Voice handoff capture --

    /// Records the VOICE_STATE_UPDATE half of the handoff.
    pub fn observe_voice_state(&self, session_id: String, user_id: String) {
        {
            let mut voice = self.voice.lock();
            voice.session_id = Some(session_id);
            voice.user_id = Some(user_id);
        }
        self.voice_notify.notify_waiters();
    }

    /// Records the VOICE_SERVER_UPDATE half of the handoff.
    pub fn observe_voice_server(
        &self,
        endpoint: String,
        token: String,
        guild_id: String,
    ) {
        {
            let mut voice = self.voice.lock();
            voice.endpoint = Some(endpoint);
            voice.token = Some(token);
            voice.guild_id = Some(guild_id);
        }
        self.voice_notify.notify_waiters();
    }

    /// Blocks until both handoff halves have arrived, then consumes
    /// them. Each captured value is handed out exactly once.
    pub async fn take_voice_handoff(&self) -> VoiceHandoff {
        loop {
            let notified = self.voice_notify.notified();
            {
                let mut voice = self.voice.lock();
                if voice.is_complete() {
                    return std::mem::take(&mut *voice);
                }
            }
            notified.await;
        }
    }

    // -- Reconnection --

    /// Resets the per-connection handshake gates so a fresh connection
    /// performs a full heartbeat → identify → ready sequence. The
    /// sequence counter survives; the next heartbeat still echoes the
    /// latest value seen.
    pub fn reset_for_reconnect(&self) {
        self.hello.send_replace(None);
        self.first_ack.send_replace(false);
        self.ready.send_replace(false);
        self.heartbeats_sent.store(0, Ordering::SeqCst);
        self.heartbeat_acknowledged.store(false, Ordering::SeqCst);
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Tests
// =========================================================================
