//! Wire types for the slice of the Discord API hexbot talks to.
//!
//! Numeric enums from the API are modelled as transparent newtypes with
//! associated constants so unknown values survive a round trip instead of
//! failing to decode.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Interaction type, `interaction.type` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InteractionType(pub u8);

impl InteractionType {
    pub const PING: InteractionType = InteractionType(1);
    pub const APPLICATION_COMMAND: InteractionType = InteractionType(2);
    pub const MESSAGE_COMPONENT: InteractionType = InteractionType(3);
}

/// Interaction callback type, `type` in the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InteractionResponseType(pub u8);

impl InteractionResponseType {
    pub const PONG: InteractionResponseType = InteractionResponseType(1);
    pub const CHANNEL_MESSAGE_WITH_SOURCE: InteractionResponseType = InteractionResponseType(4);
    pub const UPDATE_MESSAGE: InteractionResponseType = InteractionResponseType(7);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentType(pub u8);

impl ComponentType {
    pub const ACTION_ROW: ComponentType = ComponentType(1);
    pub const BUTTON: ComponentType = ComponentType(2);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ButtonStyle(pub u8);

impl ButtonStyle {
    pub const PRIMARY: ButtonStyle = ButtonStyle(1);
    pub const SECONDARY: ButtonStyle = ButtonStyle(2);
    pub const SUCCESS: ButtonStyle = ButtonStyle(3);
    pub const DANGER: ButtonStyle = ButtonStyle(4);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_name: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nick: Option<String>,
    /// Role ids the member currently holds.
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
    /// RGB color packed as `0xRRGGBB`; zero means no color.
    #[serde(default)]
    pub color: u32,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub permissions: String,
    #[serde(default)]
    pub managed: bool,
    #[serde(default)]
    pub hoist: bool,
    #[serde(default)]
    pub mentionable: bool,
}

/// Body for role create and modify calls. `None` fields are left untouched
/// by Discord, so the same type serves both endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RolePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hoist: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mentionable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedImage {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

/// A row of buttons. Discord wants the row itself tagged as component
/// type 1 with the buttons nested under `components`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRow {
    #[serde(rename = "type")]
    pub kind: ComponentType,
    pub components: Vec<Button>,
}

impl ActionRow {
    pub fn new(components: Vec<Button>) -> Self {
        ActionRow {
            kind: ComponentType::ACTION_ROW,
            components,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    #[serde(rename = "type")]
    pub kind: ComponentType,
    pub style: ButtonStyle,
    pub custom_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<PartialEmoji>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
}

impl Button {
    pub fn new(custom_id: impl Into<String>, style: ButtonStyle) -> Self {
        Button {
            kind: ComponentType::BUTTON,
            style,
            custom_id: custom_id.into(),
            label: None,
            emoji: None,
            disabled: false,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn emoji(mut self, name: impl Into<String>) -> Self {
        self.emoji = Some(PartialEmoji { name: name.into() });
        self
    }
}

/// Unicode emoji reference. Custom emoji would also carry an id, which
/// hexbot never uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialEmoji {
    pub name: String,
}

/// Message fields the bot reads back off an interaction. The preview
/// color rides in `embeds[0].color` between button presses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub embeds: Vec<Embed>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ActionRow>,
}

/// One `data.options` entry on an application command interaction.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionOption {
    pub name: String,
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InteractionData {
    /// Command name for application commands.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub options: Vec<InteractionOption>,
    /// Component id for message components.
    #[serde(default)]
    pub custom_id: Option<String>,
    #[serde(default)]
    pub component_type: Option<ComponentType>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Interaction {
    pub id: String,
    pub application_id: String,
    #[serde(rename = "type")]
    pub kind: InteractionType,
    pub token: String,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    /// Present for guild interactions.
    #[serde(default)]
    pub member: Option<Member>,
    /// Present instead of `member` in DMs.
    #[serde(default)]
    pub user: Option<User>,
    /// The message the component sits on, for button presses.
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: Option<InteractionData>,
}

impl Interaction {
    /// The user behind the interaction, wherever Discord put them.
    pub fn invoking_user(&self) -> Option<&User> {
        self.member
            .as_ref()
            .and_then(|member| member.user.as_ref())
            .or(self.user.as_ref())
    }

    /// String value of a named command option, if the caller supplied it.
    pub fn option_str(&self, name: &str) -> Option<&str> {
        self.data
            .as_ref()?
            .options
            .iter()
            .find(|option| option.name == name)?
            .value
            .as_ref()?
            .as_str()
    }
}

/// `READY` dispatch payload, trimmed to the fields the runner keeps.
#[derive(Debug, Clone, Deserialize)]
pub struct Ready {
    pub user: User,
    pub session_id: String,
    #[serde(default)]
    pub resume_gateway_url: Option<String>,
    #[serde(default)]
    pub guilds: Vec<UnavailableGuild>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnavailableGuild {
    pub id: String,
}

/// Application command definition pushed during registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub name: String,
    pub description: String,
    /// 1 is `CHAT_INPUT`, the only kind hexbot registers.
    #[serde(rename = "type", default = "chat_input")]
    pub kind: u8,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOptionSpec>,
}

fn chat_input() -> u8 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOptionSpec {
    /// Option type; 3 is `STRING`.
    #[serde(rename = "type")]
    pub kind: u8,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

/// Gateway presence sent with identify.
#[derive(Debug, Clone, Serialize)]
pub struct PresenceUpdate {
    pub since: Option<u64>,
    pub activities: Vec<Activity>,
    pub status: String,
    pub afk: bool,
}

impl PresenceUpdate {
    /// "Playing {name}" with the given status string.
    pub fn playing(name: impl Into<String>, status: impl Into<String>) -> Self {
        PresenceUpdate {
            since: None,
            activities: vec![Activity {
                name: name.into(),
                kind: 0,
            }],
            status: status.into(),
            afk: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Activity {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn interaction_decodes_command_with_options() {
        let raw = json!({
            "id": "90001",
            "application_id": "200",
            "type": 2,
            "token": "tok",
            "guild_id": "300",
            "member": {
                "user": { "id": "400", "username": "ada" },
                "roles": ["1", "2"]
            },
            "data": {
                "name": "hex",
                "options": [ { "name": "color", "value": "#ff8800" } ]
            }
        });

        let interaction: Interaction = serde_json::from_value(raw).unwrap();
        assert_eq!(interaction.kind, InteractionType::APPLICATION_COMMAND);
        assert_eq!(interaction.invoking_user().unwrap().id, "400");
        assert_eq!(interaction.option_str("color"), Some("#ff8800"));
        assert_eq!(interaction.option_str("missing"), None);
    }

    #[test]
    fn interaction_decodes_component_with_message_color() {
        let raw = json!({
            "id": "90002",
            "application_id": "200",
            "type": 3,
            "token": "tok",
            "guild_id": "300",
            "member": { "user": { "id": "400", "username": "ada" }, "roles": [] },
            "message": { "id": "500", "embeds": [ { "color": 16744448 } ] },
            "data": { "custom_id": "lighten", "component_type": 2 }
        });

        let interaction: Interaction = serde_json::from_value(raw).unwrap();
        assert_eq!(interaction.kind, InteractionType::MESSAGE_COMPONENT);
        let data = interaction.data.as_ref().unwrap();
        assert_eq!(data.custom_id.as_deref(), Some("lighten"));
        let message = interaction.message.as_ref().unwrap();
        assert_eq!(message.embeds[0].color, Some(16_744_448));
    }

    #[test]
    fn button_serializes_with_wire_tags() {
        let button = Button::new("randomize", ButtonStyle::PRIMARY)
            .label("Randomize")
            .emoji("\u{1F3B2}");
        let value = serde_json::to_value(&button).unwrap();

        assert_eq!(value["type"], 2);
        assert_eq!(value["style"], 1);
        assert_eq!(value["custom_id"], "randomize");
        assert_eq!(value["emoji"]["name"], "\u{1F3B2}");
        // Enabled buttons leave the flag off the wire entirely.
        assert!(value.get("disabled").is_none());
    }

    #[test]
    fn role_payload_skips_unset_fields() {
        let payload = RolePayload {
            name: Some("USER-400".into()),
            color: Some(0x00ff88),
            ..RolePayload::default()
        };
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(value["name"], "USER-400");
        assert_eq!(value["color"], 0x00ff88);
        assert!(value.get("position").is_none());
        assert!(value.get("permissions").is_none());
    }

    #[test]
    fn command_spec_defaults_to_chat_input() {
        let raw = json!({
            "name": "hex",
            "description": "Pick a color",
            "options": [
                { "type": 3, "name": "color", "description": "Color to start from", "required": false }
            ]
        });
        let spec: CommandSpec = serde_json::from_value(raw).unwrap();
        assert_eq!(spec.kind, 1);
        assert_eq!(spec.options[0].kind, 3);
        assert!(!spec.options[0].required);
    }
}
