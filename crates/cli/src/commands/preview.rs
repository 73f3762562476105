use hexbot_core::{parse_color, random_color, Color, ColorOps};
use hexbot_discord::messages::{color_preview_message, swatch_url};
use serde_json::json;

use super::CommandResult;

/// Renders the preview payload for a color the way the bot would, with no
/// Discord round trip. Unparseable input falls back to a random color,
/// matching the slash command.
pub fn run(color: Option<&str>, json_output: bool) -> CommandResult {
    let (color, requested, fell_back) = resolve(color);
    let message = color_preview_message(&color);

    if json_output {
        let payload = json!({
            "hex": format!("#{}", color.hex()),
            "numeric": color.to_rgb_u32(),
            "swatch_url": swatch_url(&color),
            "requested": requested,
            "fell_back_to_random": fell_back,
            "response": message.response_data(),
        });
        let output = serde_json::to_string_pretty(&payload)
            .unwrap_or_else(|error| format!("preview serialization failed: {error}"));
        return CommandResult::success(output);
    }

    let mut lines = Vec::new();
    if fell_back {
        lines.push(format!(
            "input `{}` was not recognized; using a random color",
            requested.unwrap_or_default()
        ));
    }
    lines.push(format!("color:  #{}", color.hex()));
    lines.push(format!("numeric: {}", color.to_rgb_u32()));
    lines.push(format!("swatch: {}", swatch_url(&color)));
    let buttons: Vec<String> = message
        .components
        .iter()
        .flat_map(|row| row.components.iter())
        .map(|button| button.custom_id.clone())
        .collect();
    lines.push(format!("buttons: {}", buttons.join(", ")));

    CommandResult::success(lines.join("\n"))
}

fn resolve(input: Option<&str>) -> (Color, Option<String>, bool) {
    match input {
        Some(raw) => match parse_color(raw) {
            Ok(color) => (color, Some(raw.to_string()), false),
            Err(_) => (random_color(), Some(raw.to_string()), true),
        },
        None => (random_color(), None, false),
    }
}
