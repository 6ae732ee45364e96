//! # Accord
//!
//! A realtime gateway bot client: one persistent, heartbeated,
//! sequence-tracked websocket session for events and interactions, a
//! FIFO outbound REST queue for responses, and a per-guild voice
//! subsystem (signaling websocket + encrypted UDP media at a fixed
//! 20 ms cadence).
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use accord::prelude::*;
//!
//! # async fn example() -> Result<(), accord::AccordError> {
//! let client = Client::builder()
//!     .command(
//!         Command::slash("ping", "Check liveness").handler(|ctx| {
//!             ctx.respond(
//!                 InteractionCallbackType::ChannelMessageWithSource,
//!                 serde_json::json!({"content": "pong"}),
//!             );
//!         }),
//!     )
//!     .sync_commands(true)
//!     .build();
//!
//! client.run("bot-token").await
//! # }
//! ```

mod client;
mod config;
mod error;

pub use client::{Client, ClientBuilder, ClientHandle};
pub use config::ClientConfig;
pub use error::AccordError;

/// The most commonly used items, re-exported in one place.
pub mod prelude {
    pub use crate::{Client, ClientConfig, ClientHandle};
    pub use accord_gateway::{
        Command, CommandOption, InteractionContext, OutboundRequest,
    };
    pub use accord_protocol::{
        ButtonStyle, CommandKind, Component, InteractionCallbackType,
        MenuKind, OptionKind,
    };
    pub use accord_voice::{FfmpegOpusSource, VoiceSession};
}
