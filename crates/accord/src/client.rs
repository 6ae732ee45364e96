//! `Client` builder and run loop.
//!
//! This is the entry point for running a bot. It ties the layers
//! together: REST lookup → transport connect → per-connection session
//! tasks (writer, listener, heartbeat, identify, optional command
//! sync) → supervised reconnect on the server's directive.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::task::AbortHandle;
use tracing::{info, warn};

use accord_gateway::{
    run_command_sync, run_heartbeat, run_identify, run_listener, run_queue,
    run_writer, Command, Disconnect, GatewayHandle, OutboundQueue, RestClient,
    Router, Session,
};
use accord_protocol::JsonCodec;
use accord_transport::WebSocketConnection;

use crate::{AccordError, ClientConfig};

type UserTask =
    Box<dyn FnOnce(ClientHandle) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

// ---------------------------------------------------------------------------
// ClientHandle
// ---------------------------------------------------------------------------

/// Capabilities handed to user tasks (and available to handlers through
/// their context): everything needed to talk to the service from
/// outside the dispatch path, including joining voice channels.
#[derive(Clone)]
pub struct ClientHandle {
    /// Sender for frames on the main gateway socket.
    pub gateway: GatewayHandle,
    /// Shared session state.
    pub session: Arc<Session>,
    /// The outbound REST queue.
    pub queue: OutboundQueue,
    /// The REST collaborator.
    pub rest: RestClient,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for configuring a [`Client`].
///
/// # Example
///
/// ```rust,no_run
/// use accord::prelude::*;
///
/// # async fn example() -> Result<(), accord::AccordError> {
/// let client = Client::builder()
///     .command(
///         Command::slash("ping", "Check liveness")
///             .handler(|ctx| {
///                 ctx.respond(
///                     InteractionCallbackType::ChannelMessageWithSource,
///                     serde_json::json!({"content": "pong"}),
///                 );
///             }),
///     )
///     .sync_commands(true)
///     .build();
/// client.run("bot-token").await
/// # }
/// ```
pub struct ClientBuilder {
    config: ClientConfig,
    router: Router,
    sync_commands: bool,
    tasks: Vec<UserTask>,
}

impl ClientBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            router: Router::new(),
            sync_commands: false,
            tasks: Vec::new(),
        }
    }

    /// Sets the client configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers an application command. Registration is append-only
    /// and must happen before [`build`](Self::build); duplicate names
    /// keep the first registration.
    pub fn command(mut self, command: Command) -> Self {
        self.router.register(command);
        self
    }

    /// Whether to upload the registered commands once the session is
    /// ready. Off by default: commands dispatch either way, but won't
    /// appear server-side without a sync.
    pub fn sync_commands(mut self, sync: bool) -> Self {
        self.sync_commands = sync;
        self
    }

    /// Registers a long-running task spawned alongside the session
    /// tasks. It receives a [`ClientHandle`] and survives reconnects.
    pub fn task<F, Fut>(mut self, task: F) -> Self
    where
        F: FnOnce(ClientHandle) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.tasks.push(Box::new(move |handle| Box::pin(task(handle))));
        self
    }

    /// Finalizes the builder.
    pub fn build(self) -> Client {
        Client {
            config: self.config,
            router: Arc::new(self.router),
            sync_commands: self.sync_commands,
            tasks: self.tasks,
        }
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// A configured bot client. [`run`](Self::run) connects and blocks for
/// the life of the session.
pub struct Client {
    config: ClientConfig,
    router: Arc<Router>,
    sync_commands: bool,
    tasks: Vec<UserTask>,
}

impl Client {
    /// Creates a new builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Runs the client until the gateway is gone for good.
    ///
    /// Returns `Err(ConnectionClosed)` / `Err(Transport)` when the
    /// socket dies without a reconnect directive, and
    /// `Err(ReconnectExhausted)` when reconnects keep failing. The
    /// server's op 7 directive triggers a fresh handshake against the
    /// resume URL — best effort, no replay guarantee.
    pub async fn run(self, token: impl Into<String>) -> Result<(), AccordError> {
        let token = token.into();
        let rest = RestClient::new(
            &self.config.api_base,
            &self.config.oauth_base,
            &token,
        );
        let session = Arc::new(Session::new());
        let gateway = GatewayHandle::new();
        let (queue, queue_rx) = OutboundQueue::channel();

        let handle = ClientHandle {
            gateway: gateway.clone(),
            session: Arc::clone(&session),
            queue: queue.clone(),
            rest: rest.clone(),
        };

        // Process-lifetime tasks: these survive reconnects.
        let mut process_tasks: Vec<AbortHandle> = Vec::new();
        process_tasks.push(
            tokio::spawn(run_queue(
                queue_rx,
                rest.clone(),
                Arc::clone(&session),
            ))
            .abort_handle(),
        );
        for task in self.tasks {
            process_tasks.push(tokio::spawn(task(handle.clone())).abort_handle());
        }

        let mut url = match &self.config.gateway_url {
            Some(url) => url.clone(),
            None => rest.fetch_gateway_url().await.map_err(|e| {
                AccordError::Gateway(accord_gateway::GatewayError::Rest(e))
            })?,
        };
        // Until READY says otherwise, reconnects target the same URL.
        session.set_resume_gateway_url(url.clone());

        let mut attempt: u32 = 0;
        let result = loop {
            info!(%url, "connecting to gateway");
            let conn = match WebSocketConnection::connect(&url).await {
                Ok(conn) => Arc::new(conn),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.config.max_reconnect_attempts {
                        warn!(error = %e, "gateway connect failed — giving up");
                        break Err(AccordError::ReconnectExhausted(attempt - 1));
                    }
                    let backoff = self.config.backoff_for(attempt);
                    warn!(
                        error = %e,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        "gateway connect failed — backing off"
                    );
                    tokio::time::sleep(backoff).await;
                    continue;
                }
            };
            attempt = 0;

            // Per-connection task set, torn down on disconnect.
            let writer = tokio::spawn(run_writer(
                Arc::clone(&conn),
                JsonCodec,
                gateway.attach(),
            ));
            let heartbeat = tokio::spawn(run_heartbeat(
                Arc::clone(&session),
                gateway.clone(),
            ));
            let identify = tokio::spawn(run_identify(
                Arc::clone(&session),
                gateway.clone(),
                token.clone(),
            ));
            let sync = self.sync_commands.then(|| {
                let session = Arc::clone(&session);
                let rest = rest.clone();
                let router = Arc::clone(&self.router);
                tokio::spawn(async move {
                    match run_command_sync(session, rest, router).await {
                        Ok(report) if report.failed > 0 => warn!(
                            attempted = report.attempted,
                            failed = report.failed,
                            "command sync finished with failures"
                        ),
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "command sync failed"),
                    }
                })
            });

            let disconnect = run_listener(
                conn,
                JsonCodec,
                Arc::clone(&session),
                Arc::clone(&self.router),
                gateway.clone(),
                queue.clone(),
                rest.clone(),
            )
            .await;

            heartbeat.abort();
            identify.abort();
            if let Some(sync) = sync {
                sync.abort();
            }
            gateway.detach();
            writer.abort();

            match disconnect {
                Disconnect::ReconnectRequested => {
                    session.reset_for_reconnect();
                    if let Some(resume) = session.resume_gateway_url() {
                        url = resume;
                    }
                    info!(%url, "reconnecting after server directive");
                }
                Disconnect::Closed => break Err(AccordError::ConnectionClosed),
                Disconnect::Failed(e) => break Err(AccordError::Transport(e)),
            }
        };

        for task in &process_tasks {
            task.abort();
        }
        result
    }
}
