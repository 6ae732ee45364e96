//! Interaction wire constants and the message-component set.
//!
//! Interactions are remote-triggered invocations (a slash command, a
//! button press) that must be answered through the REST callback
//! endpoint. This module carries the integer enumerations those calls
//! are built from, and the closed set of components that can be
//! attached to an outgoing response.
//!
//! Components form a closed set of tagged variants rather than an open
//! trait hierarchy: each variant knows its own serialized form, and the
//! dispatch layer only ever needs the `custom_id` back out.

use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Integer enumerations
// ---------------------------------------------------------------------------

/// What kind of interaction an `INTERACTION_CREATE` dispatch carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    /// Server liveness probe.
    Ping = 1,
    /// An application command was invoked.
    ApplicationCommand = 2,
    /// A message component (button, menu) was used.
    MessageComponent = 3,
    /// An autocomplete query for a command option.
    Autocomplete = 4,
    /// A modal was submitted.
    ModalSubmit = 5,
}

impl InteractionKind {
    /// Maps the wire value; unknown kinds return `None`.
    pub fn from_kind(kind: u8) -> Option<Self> {
        Some(match kind {
            1 => Self::Ping,
            2 => Self::ApplicationCommand,
            3 => Self::MessageComponent,
            4 => Self::Autocomplete,
            5 => Self::ModalSubmit,
            _ => return None,
        })
    }
}

/// The `type` of an interaction-callback REST body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionCallbackType {
    /// Answer to a ping.
    Pong = 1,
    /// Respond with a visible message.
    ChannelMessageWithSource = 4,
    /// Acknowledge now, edit a message in later.
    DeferredChannelMessageWithSource = 5,
    /// Acknowledge a component use; edit later.
    DeferredUpdateMessage = 6,
    /// Edit the message the component was attached to.
    UpdateMessage = 7,
    /// Return autocomplete suggestions.
    AutocompleteResult = 8,
    /// Open a modal.
    Modal = 9,
}

impl InteractionCallbackType {
    /// The wire value of this callback type.
    pub fn value(self) -> u8 {
        self as u8
    }
}

/// What kind of application command is being registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// A chat-input ("slash") command.
    Slash = 1,
    /// A user context-menu command.
    User = 2,
    /// A message context-menu command.
    Message = 3,
}

impl CommandKind {
    /// The wire value of this command kind.
    pub fn value(self) -> u8 {
        self as u8
    }
}

/// The type of a command parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    SubCommand = 1,
    SubCommandGroup = 2,
    String = 3,
    Integer = 4,
    Boolean = 5,
    User = 6,
    Channel = 7,
    Role = 8,
    Mentionable = 9,
    Number = 10,
    Attachment = 11,
}

impl OptionKind {
    /// The wire value of this option kind.
    pub fn value(self) -> u8 {
        self as u8
    }
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

/// Visual style (and behavior, for `Link`) of a button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonStyle {
    Primary = 1,
    Secondary = 2,
    Success = 3,
    Danger = 4,
    /// Opens a URL instead of producing an interaction.
    Link = 5,
}

/// Which population a select menu draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuKind {
    /// Caller-supplied options.
    StringSelect = 3,
    UserSelect = 5,
    RoleSelect = 6,
    MentionableSelect = 7,
    ChannelSelect = 8,
}

/// Single-line vs multi-line text input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextInputStyle {
    Short = 1,
    Paragraph = 2,
}

/// One entry of a string-select menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    /// Text shown to the user.
    pub label: String,
    /// Value delivered back in the interaction.
    pub value: String,
    /// Optional longer description under the label.
    pub description: Option<String>,
}

impl SelectOption {
    fn to_json(&self) -> Value {
        json!({
            "label": self.label,
            "value": self.value,
            "description": self.description,
            "default": false,
        })
    }
}

/// A message component attached to an outgoing response.
///
/// Every interactive variant carries the `custom_id` that inbound
/// component interactions are matched against.
#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    /// A clickable button under a message.
    Button {
        style: ButtonStyle,
        label: String,
        custom_id: String,
        /// Only meaningful for [`ButtonStyle::Link`].
        url: Option<String>,
    },
    /// A dropdown menu under a message.
    SelectMenu {
        kind: MenuKind,
        custom_id: String,
        placeholder: String,
        /// Only serialized for [`MenuKind::StringSelect`].
        options: Vec<SelectOption>,
    },
    /// A text field inside a modal.
    TextInput {
        style: TextInputStyle,
        custom_id: String,
        label: String,
        required: bool,
    },
}

impl Component {
    /// The identifier inbound component interactions carry back.
    pub fn custom_id(&self) -> &str {
        match self {
            Self::Button { custom_id, .. }
            | Self::SelectMenu { custom_id, .. }
            | Self::TextInput { custom_id, .. } => custom_id,
        }
    }

    /// This component's serialized form (not yet wrapped in an action
    /// row — see [`action_row`]).
    pub fn to_json(&self) -> Value {
        match self {
            Self::Button {
                style,
                label,
                custom_id,
                url,
            } => {
                // Link buttons carry a URL and no custom_id; everything
                // else is the other way around.
                if *style == ButtonStyle::Link {
                    json!({
                        "type": 2,
                        "label": label,
                        "style": *style as u8,
                        "url": url,
                    })
                } else {
                    json!({
                        "type": 2,
                        "label": label,
                        "style": *style as u8,
                        "custom_id": custom_id,
                    })
                }
            }
            Self::SelectMenu {
                kind,
                custom_id,
                placeholder,
                options,
            } => {
                if *kind == MenuKind::StringSelect {
                    json!({
                        "type": *kind as u8,
                        "custom_id": custom_id,
                        "options": options.iter().map(SelectOption::to_json).collect::<Vec<_>>(),
                        "placeholder": placeholder,
                        "min_values": 1,
                        "max_values": 1,
                    })
                } else {
                    json!({
                        "type": *kind as u8,
                        "custom_id": custom_id,
                        "placeholder": placeholder,
                        "min_values": 1,
                        "max_values": 1,
                    })
                }
            }
            Self::TextInput {
                style,
                custom_id,
                label,
                required,
            } => json!({
                "type": 4,
                "custom_id": custom_id,
                "style": *style as u8,
                "label": label,
                "required": required,
            }),
        }
    }
}

/// Wraps components in the action-row container the message body
/// expects.
pub fn action_row(components: &[Component]) -> Value {
    json!({
        "type": 1,
        "components": components.iter().map(Component::to_json).collect::<Vec<_>>(),
    })
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interaction_kind_mapping() {
        assert_eq!(InteractionKind::from_kind(2), Some(InteractionKind::ApplicationCommand));
        assert_eq!(InteractionKind::from_kind(3), Some(InteractionKind::MessageComponent));
        assert_eq!(InteractionKind::from_kind(99), None);
    }

    #[test]
    fn test_callback_type_wire_values() {
        assert_eq!(InteractionCallbackType::Pong.value(), 1);
        assert_eq!(InteractionCallbackType::ChannelMessageWithSource.value(), 4);
        assert_eq!(InteractionCallbackType::DeferredChannelMessageWithSource.value(), 5);
        assert_eq!(InteractionCallbackType::DeferredUpdateMessage.value(), 6);
        assert_eq!(InteractionCallbackType::UpdateMessage.value(), 7);
        assert_eq!(InteractionCallbackType::AutocompleteResult.value(), 8);
        assert_eq!(InteractionCallbackType::Modal.value(), 9);
    }

    #[test]
    fn test_command_and_option_kind_values() {
        assert_eq!(CommandKind::Slash.value(), 1);
        assert_eq!(CommandKind::Message.value(), 3);
        assert_eq!(OptionKind::String.value(), 3);
        assert_eq!(OptionKind::Attachment.value(), 11);
    }

    #[test]
    fn test_button_json_carries_custom_id() {
        let button = Component::Button {
            style: ButtonStyle::Primary,
            label: "Play".into(),
            custom_id: "play_button".into(),
            url: None,
        };
        let json = button.to_json();
        assert_eq!(json["type"], 2);
        assert_eq!(json["style"], 1);
        assert_eq!(json["custom_id"], "play_button");
        assert!(json.get("url").is_none());
    }

    #[test]
    fn test_link_button_carries_url_not_custom_id() {
        let button = Component::Button {
            style: ButtonStyle::Link,
            label: "Docs".into(),
            custom_id: "unused".into(),
            url: Some("https://example.com".into()),
        };
        let json = button.to_json();
        assert_eq!(json["style"], 5);
        assert_eq!(json["url"], "https://example.com");
        assert!(json.get("custom_id").is_none());
    }

    #[test]
    fn test_string_select_serializes_options() {
        let menu = Component::SelectMenu {
            kind: MenuKind::StringSelect,
            custom_id: "pick".into(),
            placeholder: "Select option...".into(),
            options: vec![SelectOption {
                label: "One".into(),
                value: "1".into(),
                description: None,
            }],
        };
        let json = menu.to_json();
        assert_eq!(json["type"], 3);
        assert_eq!(json["options"][0]["label"], "One");
        assert_eq!(json["min_values"], 1);
    }

    #[test]
    fn test_entity_select_omits_options() {
        let menu = Component::SelectMenu {
            kind: MenuKind::UserSelect,
            custom_id: "who".into(),
            placeholder: "Pick a user".into(),
            options: vec![],
        };
        let json = menu.to_json();
        assert_eq!(json["type"], 5);
        assert!(json.get("options").is_none());
    }

    #[test]
    fn test_action_row_wraps_components() {
        let row = action_row(&[Component::Button {
            style: ButtonStyle::Danger,
            label: "Stop".into(),
            custom_id: "stop".into(),
            url: None,
        }]);
        assert_eq!(row["type"], 1);
        assert_eq!(row["components"][0]["custom_id"], "stop");
    }

    #[test]
    fn test_custom_id_accessor() {
        let input = Component::TextInput {
            style: TextInputStyle::Short,
            custom_id: "name_field".into(),
            label: "Name".into(),
            required: true,
        };
        assert_eq!(input.custom_id(), "name_field");
        assert_eq!(input.to_json()["type"], 4);
    }
}
