//! Handshake ordering: identify after first ack, sync after ready.
//!
//! The ordering contract is enforced by blocking each stage on a
//! session predicate, not by chaining callbacks: identify waits for a
//! heartbeat to have been sent *and* acknowledged; command sync waits
//! for the READY dispatch.

use std::sync::Arc;

use tracing::{info, warn};

use accord_protocol::GatewayFrame;

use crate::dispatch::Router;
use crate::rest::RestClient;
use crate::{GatewayError, GatewayHandle, Session};

/// Outcome of one command-sync pass.
///
/// Uploads are independent: one failure doesn't abort the rest, and
/// there is no rollback. The report says how much of the pass stuck.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Commands whose upload was attempted.
    pub attempted: usize,
    /// Uploads that failed (logged individually).
    pub failed: usize,
}

/// Sends identify exactly once, after the first heartbeat round-trip.
pub async fn run_identify(
    session: Arc<Session>,
    gateway: GatewayHandle,
    token: String,
) -> Result<(), GatewayError> {
    session.wait_first_heartbeat_ack().await;
    gateway.send(GatewayFrame::identify(&token))?;
    info!("identify sent");
    Ok(())
}

/// Uploads every registered command, in registration order, once the
/// session is ready.
///
/// The application id is fetched lazily (and cached) if the REST client
/// doesn't have it yet; failure to obtain it aborts the pass, since no
/// upload can be addressed without it.
pub async fn run_command_sync(
    session: Arc<Session>,
    rest: RestClient,
    router: Arc<Router>,
) -> Result<SyncReport, GatewayError> {
    session.wait_ready().await;
    info!(commands = router.command_count(), "syncing application commands");

    let application_id = rest.application_id().await?.to_owned();

    let mut attempted = 0;
    let mut failed = 0;
    for command in router.commands_in_order() {
        attempted += 1;
        let body = command.to_sync_json();
        if let Err(e) = rest.create_command(&application_id, &body).await {
            failed += 1;
            warn!(command = command.name(), error = %e, "command upload failed — continuing");
        }
    }

    info!(attempted, failed, "command sync finished");
    Ok(SyncReport { attempted, failed })
}

// =========================================================================
// Tests
// =========================================================================
