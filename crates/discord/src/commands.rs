//! The application command manifest and the input rules for `/hex`.

use hexbot_client::types::{CommandOptionSpec, CommandSpec};
use hexbot_core::{parse_color, random_color, Color};

pub const HEX_COMMAND: &str = "hex";
pub const HELP_COMMAND: &str = "help";

/// Name of the optional string option on `/hex`.
pub const COLOR_OPTION: &str = "color";

/// `custom_id` values carried by the preview buttons.
pub mod button_id {
    pub const RANDOMIZE: &str = "randomize";
    pub const LIGHTEN: &str = "lighten";
    pub const DARKEN: &str = "darken";
    pub const SUBMIT: &str = "submit";
}

/// Application command option type for strings.
const OPTION_STRING: u8 = 3;

/// Everything the bot registers, globally and in the dev guild.
pub fn command_manifest() -> Vec<CommandSpec> {
    vec![hex_command(), help_command()]
}

pub fn hex_command() -> CommandSpec {
    CommandSpec {
        name: HEX_COMMAND.to_owned(),
        description: "Preview a color and claim it as your name color".to_owned(),
        kind: 1,
        options: vec![CommandOptionSpec {
            kind: OPTION_STRING,
            name: COLOR_OPTION.to_owned(),
            description: "Starting color: hex, rgb(), hsl(), hsv() or r,g,b".to_owned(),
            required: false,
        }],
    }
}

pub fn help_command() -> CommandSpec {
    CommandSpec {
        name: HELP_COMMAND.to_owned(),
        description: "How the hex command works".to_owned(),
        kind: 1,
        options: Vec::new(),
    }
}

/// Starting color for a `/hex` invocation. Unparseable input falls back
/// to a random color instead of an error; the buttons take it from there.
pub fn resolve_initial_color(input: Option<&str>) -> Color {
    input
        .and_then(|raw| parse_color(raw).ok())
        .unwrap_or_else(random_color)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexbot_core::ColorOps;

    #[test]
    fn manifest_registers_hex_and_help() {
        let manifest = command_manifest();
        let names: Vec<&str> = manifest.iter().map(|spec| spec.name.as_str()).collect();
        assert_eq!(names, vec![HEX_COMMAND, HELP_COMMAND]);
    }

    #[test]
    fn hex_takes_one_optional_string_option() {
        let spec = hex_command();
        assert_eq!(spec.options.len(), 1);

        let option = &spec.options[0];
        assert_eq!(option.name, COLOR_OPTION);
        assert_eq!(option.kind, OPTION_STRING);
        assert!(!option.required);
    }

    #[test]
    fn initial_color_honors_parseable_input() {
        let color = resolve_initial_color(Some("#ff8800"));
        assert_eq!(color.to_rgb_u32(), 0xff8800);

        let color = resolve_initial_color(Some("0, 255, 136"));
        assert_eq!(color.to_rgb_u32(), 0x00ff88);
    }

    #[test]
    fn initial_color_falls_back_to_random_silently() {
        // A usable color either way; no error surfaces to the caller.
        assert_eq!(resolve_initial_color(Some("definitely not a color")).hex().len(), 6);
        assert_eq!(resolve_initial_color(None).hex().len(), 6);
    }
}
