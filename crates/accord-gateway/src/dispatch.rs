//! Dispatch router: inbound interactions → registered handlers.
//!
//! Two lookup tables, both keyed for O(1) dispatch: application
//! commands by name (fixed after registration, first-registered wins)
//! and component callbacks by custom-id (grows for the life of the
//! process as responses attach components). Handlers run fire-and-forget
//! on their own tasks — the listener never awaits them, and one slow or
//! panicking handler cannot stall frame processing for other events.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use rand::Rng;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use accord_protocol::{InteractionCallbackType, InteractionKind};

use crate::commands::Command;
use crate::queue::{OutboundQueue, OutboundRequest};
use crate::rest::RestClient;

/// A registered interaction callback.
///
/// Handlers are synchronous: they inspect the interaction and enqueue
/// their response on the outbound queue. Anything long-running belongs
/// on a task the handler spawns itself.
pub type Handler = Arc<dyn Fn(InteractionContext) + Send + Sync>;

// ---------------------------------------------------------------------------
// Interaction
// ---------------------------------------------------------------------------

/// One inbound interaction, as handed to a handler.
#[derive(Debug, Clone)]
pub struct Interaction {
    /// Interaction id — half of the callback address.
    pub id: String,
    /// Interaction token — the other half.
    pub token: String,
    /// The bot credential, for follow-up REST calls.
    pub credential: String,
    /// Structured option values, when the command declared parameters.
    pub options: Option<Value>,
}

impl Interaction {
    /// The REST endpoint a timely response must be POSTed to.
    pub fn callback_url(&self, api_base: &str) -> String {
        format!("{api_base}/interactions/{}/{}/callback", self.id, self.token)
    }
}

/// Everything a handler needs: the interaction itself plus the
/// capabilities for answering it.
#[derive(Clone)]
pub struct InteractionContext {
    /// The interaction being handled.
    pub interaction: Interaction,
    /// Outbound queue for responses.
    pub queue: OutboundQueue,
    /// Registry for callbacks of components attached to responses.
    pub components: ComponentRegistry,
    /// The REST collaborator (base URLs, credential).
    pub rest: RestClient,
}

impl InteractionContext {
    /// Enqueues an interaction-callback response of the given type.
    ///
    /// The actual HTTP POST happens later, in queue order; a closed
    /// queue is logged and the response dropped, matching the queue's
    /// no-retry discipline.
    pub fn respond(&self, kind: InteractionCallbackType, data: Value) {
        let url = self.interaction.callback_url(self.rest.api_base());
        let body = serde_json::json!({ "type": kind.value(), "data": data });
        if self.queue.enqueue(OutboundRequest::post(url, body)).is_err() {
            warn!(
                interaction = %self.interaction.id,
                "outbound queue closed — response dropped"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// ComponentRegistry
// ---------------------------------------------------------------------------

/// Process-lifetime registry of component callbacks keyed by custom-id.
///
/// Callbacks are never expired; a component attached to a response
/// months ago still resolves.
#[derive(Clone, Default)]
pub struct ComponentRegistry {
    inner: Arc<RwLock<HashMap<String, Handler>>>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a callback to a custom-id. Ids must be unique among live
    /// callbacks: a duplicate keeps the first registration and returns
    /// `false`.
    pub fn register(&self, custom_id: impl Into<String>, handler: Handler) -> bool {
        let custom_id = custom_id.into();
        let mut map = self.inner.write();
        if map.contains_key(&custom_id) {
            warn!(%custom_id, "duplicate component custom-id — keeping first");
            return false;
        }
        map.insert(custom_id, handler);
        true
    }

    /// Looks up the callback for an inbound component interaction.
    pub fn resolve(&self, custom_id: &str) -> Option<Handler> {
        self.inner.read().get(custom_id).cloned()
    }

    /// Number of live callbacks.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether no callbacks are registered.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// A collision-resistant custom-id: 20 random lowercase letters,
    /// an underscore, then the caller's suffix.
    pub fn unique_id(suffix: &str) -> String {
        let mut rng = rand::rng();
        let prefix: String = (0..20)
            .map(|_| rng.random_range(b'a'..=b'z') as char)
            .collect();
        format!("{prefix}_{suffix}")
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Shape of an INTERACTION_CREATE payload, as far as routing cares.
#[derive(Deserialize)]
struct InteractionPayload {
    id: String,
    token: String,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    data: Value,
}

/// Routes inbound interactions to registered handlers.
pub struct Router {
    commands: HashMap<String, Command>,
    /// Registration order, preserved for command sync.
    order: Vec<String>,
    components: ComponentRegistry,
}

impl Router {
    /// Creates a router with no commands registered.
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
            order: Vec::new(),
            components: ComponentRegistry::new(),
        }
    }

    /// Registers a command. Names are expected unique; on a collision
    /// the first registration wins and the newcomer is dropped with a
    /// warning.
    pub fn register(&mut self, command: Command) {
        let name = command.name().to_owned();
        if self.commands.contains_key(&name) {
            warn!(command = %name, "duplicate command name — keeping first registration");
            return;
        }
        self.order.push(name.clone());
        self.commands.insert(name, command);
    }

    /// Registered commands, in registration order (the sync order).
    pub fn commands_in_order(&self) -> impl Iterator<Item = &Command> {
        self.order.iter().filter_map(|name| self.commands.get(name))
    }

    /// Number of registered commands.
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    /// The shared component registry.
    pub fn components(&self) -> ComponentRegistry {
        self.components.clone()
    }

    /// Handles one INTERACTION_CREATE payload.
    ///
    /// Matching is by command name or component custom-id; the matched
    /// handler is invoked on its own task and never awaited here.
    pub fn dispatch(&self, payload: Value, queue: &OutboundQueue, rest: &RestClient) {
        let parsed: InteractionPayload = match serde_json::from_value(payload) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "malformed interaction payload — ignoring");
                return;
            }
        };

        let interaction = Interaction {
            id: parsed.id,
            token: parsed.token,
            credential: rest.token().to_owned(),
            options: parsed
                .data
                .get("options")
                .cloned()
                .filter(|v| !v.is_null()),
        };
        let ctx = InteractionContext {
            interaction,
            queue: queue.clone(),
            components: self.components.clone(),
            rest: rest.clone(),
        };

        match InteractionKind::from_kind(parsed.kind) {
            Some(InteractionKind::ApplicationCommand) => {
                let Some(name) = parsed.data.get("name").and_then(Value::as_str)
                else {
                    warn!("command interaction without a name — ignoring");
                    return;
                };
                match self.commands.get(name).and_then(Command::handler_fn) {
                    Some(handler) => Self::invoke(handler, ctx),
                    None => debug!(command = name, "no handler for command interaction"),
                }
            }
            Some(InteractionKind::MessageComponent) => {
                let Some(custom_id) =
                    parsed.data.get("custom_id").and_then(Value::as_str)
                else {
                    warn!("component interaction without a custom_id — ignoring");
                    return;
                };
                match self.components.resolve(custom_id) {
                    Some(handler) => Self::invoke(handler, ctx),
                    None => debug!(custom_id, "no callback for component interaction"),
                }
            }
            Some(other) => {
                debug!(kind = ?other, "interaction kind without client-side handling");
            }
            None => warn!(kind = parsed.kind, "unknown interaction kind — ignoring"),
        }
    }

    /// Fire-and-forget invocation: a panic here takes down one task,
    /// not the router.
    fn invoke(handler: Handler, ctx: InteractionContext) {
        tokio::spawn(async move { handler(ctx) });
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Tests
// =========================================================================
