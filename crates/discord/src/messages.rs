//! Builders for the messages hexbot sends through interaction responses.

use hexbot_client::types::{
    ActionRow, Button, ButtonStyle, Embed, EmbedField, EmbedImage, InteractionResponseType,
};
use hexbot_core::{Color, ColorOps};
use serde_json::{json, Value};

use crate::commands::button_id;

/// Message flag marking a response as visible only to the invoking user.
pub const EPHEMERAL_FLAG: u64 = 1 << 6;

/// Accent color on informational embeds.
const HELP_ACCENT: u32 = 0x5865f2;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageTemplate {
    pub content: String,
    pub embeds: Vec<Embed>,
    pub components: Vec<ActionRow>,
    pub ephemeral: bool,
}

impl MessageTemplate {
    /// The callback `data` object. Embeds and components are always present,
    /// empty or not, so an update response clears whatever the previous
    /// state of the message carried.
    pub fn response_data(&self) -> Value {
        let mut data = json!({
            "content": self.content,
            "embeds": self.embeds,
            "components": self.components,
        });
        if self.ephemeral {
            data["flags"] = json!(EPHEMERAL_FLAG);
        }
        data
    }

    /// Full interaction callback body.
    pub fn to_response(&self, kind: InteractionResponseType) -> Value {
        json!({ "type": kind, "data": self.response_data() })
    }
}

pub struct MessageBuilder {
    content: String,
    embeds: Vec<Embed>,
    components: Vec<ActionRow>,
    ephemeral: bool,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self {
            content: String::new(),
            embeds: Vec::new(),
            components: Vec::new(),
            ephemeral: false,
        }
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    /// Adds one row holding the given buttons.
    pub fn buttons(mut self, buttons: Vec<Button>) -> Self {
        self.components.push(ActionRow::new(buttons));
        self
    }

    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate {
            content: self.content,
            embeds: self.embeds,
            components: self.components,
            ephemeral: self.ephemeral,
        }
    }
}

impl Default for MessageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Swatch image for a color. The background is the color itself, the
/// caption repeats its hex code drawn in the complementary color.
pub fn swatch_url(color: &Color) -> String {
    let hex = color.hex();
    format!(
        "https://dummyimage.com/600x200/{hex}/{complement}&text={hex}",
        complement = color.complement().hex()
    )
}

/// The preview card: swatch embed plus the four adjustment buttons. The
/// embed color doubles as state; button handlers read the current color
/// back from it.
pub fn color_preview_message(color: &Color) -> MessageTemplate {
    MessageBuilder::new()
        .embed(Embed {
            color: Some(color.to_rgb_u32()),
            image: Some(EmbedImage {
                url: swatch_url(color),
            }),
            ..Embed::default()
        })
        .buttons(preview_buttons())
        .ephemeral()
        .build()
}

pub fn preview_buttons() -> Vec<Button> {
    vec![
        Button::new(button_id::RANDOMIZE, ButtonStyle::PRIMARY).label("Randomize").emoji("🎲"),
        Button::new(button_id::LIGHTEN, ButtonStyle::SECONDARY).label("Lighten").emoji("🔆"),
        Button::new(button_id::DARKEN, ButtonStyle::SECONDARY).label("Darken").emoji("🔅"),
        Button::new(button_id::SUBMIT, ButtonStyle::SUCCESS).label("Submit").emoji("✅"),
    ]
}

/// Replaces the preview once the role is in place. Empty embed and
/// component lists strip the interactive parts from the message.
pub fn claim_done_message() -> MessageTemplate {
    MessageBuilder::new().content("Done").build()
}

/// Submit refusal when the member's claimed role outranks the bot.
pub fn hierarchy_denied_message(role_name: &str, bot_top_name: &str) -> MessageTemplate {
    MessageBuilder::new()
        .content(format!("{role_name} is above {bot_top_name}"))
        .build()
}

pub fn help_message() -> MessageTemplate {
    MessageBuilder::new()
        .embed(Embed {
            title: Some("Hex".to_owned()),
            description: Some(
                "Hex allows server members to change their name color. Pick a color, \
                 fine-tune it with the buttons, then submit to claim it."
                    .to_owned(),
            ),
            color: Some(HELP_ACCENT),
            fields: vec![
                EmbedField {
                    name: "/hex".to_owned(),
                    value: "Start a preview from a random color.".to_owned(),
                    inline: false,
                },
                EmbedField {
                    name: "/hex color:<value>".to_owned(),
                    value: "Start from a specific color. Accepts hex (`#ff8800`), \
                            `rgb(255, 136, 0)`, `hsl(32, 100%, 50%)`, `hsv(32, 100%, 100%)` \
                            or bare `255, 136, 0`."
                        .to_owned(),
                    inline: false,
                },
                EmbedField {
                    name: "Buttons".to_owned(),
                    value: "🎲 rerolls the color, 🔆 lightens it, 🔅 darkens it and ✅ \
                            claims it as your `USER-` role."
                        .to_owned(),
                    inline: false,
                },
            ],
            ..Embed::default()
        })
        .ephemeral()
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexbot_core::parse_color;

    #[test]
    fn swatch_url_pairs_color_with_complement() {
        let red = parse_color("#ff0000").unwrap();
        assert_eq!(
            swatch_url(&red),
            "https://dummyimage.com/600x200/ff0000/00ffff&text=ff0000"
        );
    }

    #[test]
    fn preview_is_ephemeral_with_four_buttons() {
        let color = parse_color("#ff8800").unwrap();
        let message = color_preview_message(&color);
        assert!(message.ephemeral);

        let data = message.response_data();
        assert_eq!(data["flags"], EPHEMERAL_FLAG);
        assert_eq!(data["embeds"][0]["color"], 0xff8800);

        let buttons = data["components"][0]["components"].as_array().unwrap();
        let ids: Vec<&str> = buttons
            .iter()
            .map(|button| button["custom_id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["randomize", "lighten", "darken", "submit"]);

        let labels: Vec<&str> = buttons
            .iter()
            .map(|button| button["label"].as_str().unwrap())
            .collect();
        assert_eq!(labels, vec!["Randomize", "Lighten", "Darken", "Submit"]);
    }

    #[test]
    fn preview_response_wraps_callback_type() {
        let color = parse_color("#00ff88").unwrap();
        let response = color_preview_message(&color)
            .to_response(InteractionResponseType::CHANNEL_MESSAGE_WITH_SOURCE);
        assert_eq!(response["type"], 4);
        assert_eq!(response["data"]["embeds"][0]["color"], 0x00ff88);
    }

    #[test]
    fn done_message_clears_embeds_and_components() {
        let data = claim_done_message().response_data();
        assert_eq!(data["content"], "Done");
        assert_eq!(data["embeds"].as_array().unwrap().len(), 0);
        assert_eq!(data["components"].as_array().unwrap().len(), 0);
        // Update responses keep the original message's visibility.
        assert!(data.get("flags").is_none());
    }

    #[test]
    fn hierarchy_message_names_both_roles() {
        let message = hierarchy_denied_message("USER-42", "Hexbot");
        assert_eq!(message.content, "USER-42 is above Hexbot");
        assert!(message.embeds.is_empty());
    }

    #[test]
    fn help_lists_the_color_formats() {
        let message = help_message();
        assert!(message.ephemeral);

        let fields = &message.embeds[0].fields;
        assert_eq!(fields.len(), 3);
        assert!(fields[1].value.contains("hsv"));
        assert!(fields[1].value.contains("rgb"));
    }
}
