//! Gateway session layer for Accord.
//!
//! This crate owns everything that keeps the main gateway connection
//! alive and useful:
//!
//! 1. **Session state** ([`Session`]) — sequence tracking, handshake
//!    gates, captured resume/voice data, shared by every task.
//! 2. **Listener** ([`run_listener`]) — demultiplexes inbound frames by
//!    opcode and routes dispatches.
//! 3. **Heartbeat** ([`run_heartbeat`]) — jittered first beat, exact
//!    steady cadence, sequence echo.
//! 4. **Handshake** ([`run_identify`], [`run_command_sync`]) — the
//!    heartbeat → identify → ready → sync ordering, enforced by
//!    predicates on the session.
//! 5. **Dispatch** ([`Router`]) — command and component callbacks,
//!    invoked fire-and-forget.
//! 6. **Outbound queue** ([`OutboundQueue`], [`run_queue`]) — strict
//!    FIFO REST side effects, one in flight.
//! 7. **REST boundary** ([`RestClient`]) — the narrow HTTP surface the
//!    session needs.
//!
//! # How it fits in the stack
//!
//! ```text
//! accord (run loop, reconnect policy)  ← supervises these tasks
//!     ↕
//! Session layer (this crate)           ← state + per-connection tasks
//!     ↕
//! Protocol / Transport (below)         ← frames and sockets
//! ```

mod commands;
mod dispatch;
mod error;
mod handle;
mod handshake;
mod heartbeat;
mod listener;
mod queue;
mod rest;
mod session;

pub use commands::{Command, CommandOption};
pub use dispatch::{
    ComponentRegistry, Handler, Interaction, InteractionContext, Router,
};
pub use error::{GatewayError, RestError};
pub use handle::{run_writer, GatewayHandle};
pub use handshake::{run_command_sync, run_identify, SyncReport};
pub use heartbeat::run_heartbeat;
pub use listener::{run_listener, Disconnect};
pub use queue::{run_queue, OutboundQueue, OutboundRequest, RequestExecutor};
pub use rest::RestClient;
pub use session::{Session, VoiceHandoff};
