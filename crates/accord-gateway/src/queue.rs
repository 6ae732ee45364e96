//! Outbound request queue: strict FIFO, one request in flight.
//!
//! Handlers answer interactions by enqueueing [`OutboundRequest`]s; a
//! single drain task performs them against the REST collaborator. The
//! drain is gated until the session is ready, pops the oldest entry,
//! awaits its completion, and only then looks at the next — trading
//! throughput for strict ordering. Failures are logged and the entry is
//! considered consumed; there is no retry.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{GatewayError, RestError, Session};

// ---------------------------------------------------------------------------
// OutboundRequest
// ---------------------------------------------------------------------------

/// One queued REST side effect: method, target URL, JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    /// HTTP method to perform.
    pub method: reqwest::Method,
    /// Absolute target URL.
    pub url: String,
    /// JSON body sent with the request.
    pub body: Value,
}

impl OutboundRequest {
    /// Builds a request with an arbitrary method.
    pub fn new(method: reqwest::Method, url: impl Into<String>, body: Value) -> Self {
        Self {
            method,
            url: url.into(),
            body,
        }
    }

    /// Builds a POST — the common case for interaction callbacks.
    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self::new(reqwest::Method::POST, url, body)
    }
}

// ---------------------------------------------------------------------------
// RequestExecutor
// ---------------------------------------------------------------------------

/// Performs one queued request to completion.
///
/// The REST client is the production implementation; tests substitute
/// recording executors to observe ordering without a network.
pub trait RequestExecutor: Send + Sync + 'static {
    /// Performs the request, resolving once the remote end has
    /// answered (or the attempt has definitively failed).
    fn execute(
        &self,
        request: OutboundRequest,
    ) -> impl std::future::Future<Output = Result<(), RestError>> + Send;
}

// ---------------------------------------------------------------------------
// OutboundQueue
// ---------------------------------------------------------------------------

/// Clonable producer side of the queue. Unbounded: enqueueing never
/// blocks a handler.
#[derive(Clone)]
pub struct OutboundQueue {
    tx: mpsc::UnboundedSender<OutboundRequest>,
}

impl OutboundQueue {
    /// Creates the queue, returning the producer handle and the
    /// receiver the drain task consumes.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OutboundRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Appends a request. Submission order is delivery order.
    ///
    /// # Errors
    /// Returns [`GatewayError::QueueClosed`] if the drain task is gone.
    pub fn enqueue(&self, request: OutboundRequest) -> Result<(), GatewayError> {
        self.tx
            .send(request)
            .map_err(|_| GatewayError::QueueClosed)
    }
}

/// Drains the queue: waits for readiness, then performs requests
/// one at a time in submission order, forever.
pub async fn run_queue<E: RequestExecutor>(
    mut rx: mpsc::UnboundedReceiver<OutboundRequest>,
    executor: E,
    session: Arc<Session>,
) {
    session.wait_ready().await;
    debug!("session ready — outbound queue draining");

    while let Some(request) = rx.recv().await {
        debug!(method = %request.method, url = %request.url, "performing outbound request");
        if let Err(e) = executor.execute(request).await {
            // Consumed regardless: no retry, no re-queue.
            warn!(error = %e, "outbound request failed — dropping");
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::time::Duration;

    /// Records `start`/`end` markers for each request, with a delay in
    /// between so overlap would be visible.
    struct RecordingExecutor {
        events: Arc<Mutex<Vec<String>>>,
        delay: Duration,
        fail: bool,
    }

    impl RequestExecutor for RecordingExecutor {
        async fn execute(&self, request: OutboundRequest) -> Result<(), RestError> {
            self.events.lock().push(format!("start {}", request.url));
            tokio::time::sleep(self.delay).await;
            self.events.lock().push(format!("end {}", request.url));
            if self.fail {
                Err(RestError::Status {
                    code: 500,
                    url: request.url,
                })
            } else {
                Ok(())
            }
        }
    }

    fn ready_session() -> Arc<Session> {
        let session = Arc::new(Session::new());
        session.set_ready();
        session
    }

    #[tokio::test(start_paused = true)]
    async fn test_requests_complete_in_fifo_order_one_in_flight() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let (queue, rx) = OutboundQueue::channel();
        let executor = RecordingExecutor {
            events: Arc::clone(&events),
            delay: Duration::from_millis(50),
            fail: false,
        };

        let _drain = tokio::spawn(run_queue(rx, executor, ready_session()));

        queue
            .enqueue(OutboundRequest::post("a", serde_json::json!({})))
            .unwrap();
        queue
            .enqueue(OutboundRequest::post("b", serde_json::json!({})))
            .unwrap();
        queue
            .enqueue(OutboundRequest::post("c", serde_json::json!({})))
            .unwrap();

        // Let all three drain under paused time.
        tokio::time::sleep(Duration::from_millis(500)).await;

        let events = events.lock().clone();
        assert_eq!(
            events,
            vec![
                "start a", "end a", "start b", "end b", "start c", "end c",
            ],
            "A must complete strictly before B begins"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_waits_for_ready() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let (queue, rx) = OutboundQueue::channel();
        let session = Arc::new(Session::new());
        let executor = RecordingExecutor {
            events: Arc::clone(&events),
            delay: Duration::ZERO,
            fail: false,
        };

        let _drain = tokio::spawn(run_queue(rx, executor, Arc::clone(&session)));
        queue
            .enqueue(OutboundRequest::post("early", serde_json::json!({})))
            .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(events.lock().is_empty(), "nothing may drain before ready");

        session.set_ready();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(events.lock().len(), 2, "queued entry drains after ready");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_request_is_consumed_not_retried() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let (queue, rx) = OutboundQueue::channel();
        let executor = RecordingExecutor {
            events: Arc::clone(&events),
            delay: Duration::ZERO,
            fail: true,
        };

        let _drain = tokio::spawn(run_queue(rx, executor, ready_session()));
        queue
            .enqueue(OutboundRequest::post("doomed", serde_json::json!({})))
            .unwrap();
        queue
            .enqueue(OutboundRequest::post("next", serde_json::json!({})))
            .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;

        let events = events.lock().clone();
        // "doomed" ran exactly once and "next" still ran after it.
        assert_eq!(
            events,
            vec!["start doomed", "end doomed", "start next", "end next"]
        );
    }

    #[tokio::test]
    async fn test_enqueue_after_drain_dropped_errors() {
        let (queue, rx) = OutboundQueue::channel();
        drop(rx);
        let result = queue.enqueue(OutboundRequest::post("x", serde_json::json!({})));
        assert!(matches!(result, Err(GatewayError::QueueClosed)));
    }
}
