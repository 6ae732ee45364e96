//! Application command definitions.
//!
//! A [`Command`] is what the application registers: a name, a kind, a
//! description, a parameter list, and the handler invoked when the
//! command is used. Registration is append-only — commands are consumed
//! at sync time (uploaded one REST call each, in registration order)
//! and at dispatch-match time, and never mutated afterwards.

use serde_json::{json, Value};

use accord_protocol::{CommandKind, OptionKind};

use crate::dispatch::{Handler, InteractionContext};

// ---------------------------------------------------------------------------
// CommandChoice / CommandOption
// ---------------------------------------------------------------------------

/// A fixed choice offered for an option's value.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CommandChoice {
    name: String,
    value: String,
}

/// One declared parameter of a command.
#[derive(Debug, Clone)]
pub struct CommandOption {
    kind: OptionKind,
    name: String,
    description: String,
    required: bool,
    choices: Vec<CommandChoice>,
}

impl CommandOption {
    /// Declares a parameter.
    pub fn new(
        kind: OptionKind,
        name: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            description: description.into(),
            required,
            choices: Vec::new(),
        }
    }

    /// Adds a fixed choice for this option's value.
    pub fn choice(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.choices.push(CommandChoice {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// This option's slice of the sync payload. The `choices` key is
    /// omitted entirely when no choices are declared.
    fn to_json(&self) -> Value {
        let mut json = json!({
            "name": self.name,
            "description": self.description,
            "type": self.kind.value(),
            "required": self.required,
        });
        if !self.choices.is_empty() {
            json["choices"] = self
                .choices
                .iter()
                .map(|c| json!({ "name": c.name, "value": c.value }))
                .collect();
        }
        json
    }
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// A registered application command bound to a handler.
#[derive(Clone)]
pub struct Command {
    name: String,
    kind: CommandKind,
    description: String,
    options: Vec<CommandOption>,
    handler: Option<Handler>,
}

impl Command {
    /// Declares a command of the given kind.
    pub fn new(
        name: impl Into<String>,
        kind: CommandKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            options: Vec::new(),
            handler: None,
        }
    }

    /// Declares a chat-input ("slash") command.
    pub fn slash(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, CommandKind::Slash, description)
    }

    /// Declares a user context-menu command.
    pub fn user(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, CommandKind::User, description)
    }

    /// Declares a message context-menu command.
    pub fn message(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, CommandKind::Message, description)
    }

    /// Adds a parameter.
    pub fn option(mut self, option: CommandOption) -> Self {
        self.options.push(option);
        self
    }

    /// Binds the handler invoked when the command is used. A command
    /// without a handler still syncs but its interactions are dropped
    /// with a log line.
    pub fn handler(
        mut self,
        f: impl Fn(InteractionContext) + Send + Sync + 'static,
    ) -> Self {
        self.handler = Some(std::sync::Arc::new(f));
        self
    }

    /// The command name — the dispatch key. Case-sensitive.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The command kind.
    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// The handler, if one is bound.
    pub(crate) fn handler_fn(&self) -> Option<Handler> {
        self.handler.clone()
    }

    /// The upload payload for command sync: `{name, type, description}`
    /// plus `options` only when parameters are declared.
    pub fn to_sync_json(&self) -> Value {
        let mut json = json!({
            "name": self.name,
            "type": self.kind.value(),
            "description": self.description,
        });
        if !self.options.is_empty() {
            json["options"] = self.options.iter().map(CommandOption::to_json).collect();
        }
        json
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("options", &self.options.len())
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_json_without_options_omits_key() {
        let cmd = Command::slash("ping", "Check liveness");
        let json = cmd.to_sync_json();
        assert_eq!(json["name"], "ping");
        assert_eq!(json["type"], 1);
        assert_eq!(json["description"], "Check liveness");
        assert!(json.get("options").is_none());
    }

    #[test]
    fn test_sync_json_with_options_and_choices() {
        let cmd = Command::slash("play", "Play a track").option(
            CommandOption::new(OptionKind::String, "source", "Where from", true)
                .choice("Radio", "radio")
                .choice("File", "file"),
        );
        let json = cmd.to_sync_json();

        let option = &json["options"][0];
        assert_eq!(option["name"], "source");
        assert_eq!(option["type"], 3);
        assert_eq!(option["required"], true);
        assert_eq!(option["choices"][0]["name"], "Radio");
        assert_eq!(option["choices"][1]["value"], "file");
    }

    #[test]
    fn test_option_without_choices_omits_key() {
        let option =
            CommandOption::new(OptionKind::Integer, "count", "How many", false);
        let json = option.to_json();
        assert_eq!(json["type"], 4);
        assert_eq!(json["required"], false);
        assert!(json.get("choices").is_none());
    }

    #[test]
    fn test_context_menu_kinds() {
        assert_eq!(Command::user("Profile", "").kind(), CommandKind::User);
        assert_eq!(
            Command::message("Translate", "").to_sync_json()["type"],
            3
        );
    }

    #[test]
    fn test_handler_binding() {
        let bare = Command::slash("a", "b");
        assert!(bare.handler_fn().is_none());
        let bound = bare.handler(|_ctx| {});
        assert!(bound.handler_fn().is_some());
    }
}
