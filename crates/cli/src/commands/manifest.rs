use hexbot_discord::commands::command_manifest;

use super::CommandResult;

/// Prints the application command set exactly as startup registers it.
pub fn run() -> CommandResult {
    match serde_json::to_string_pretty(&command_manifest()) {
        Ok(output) => CommandResult::success(output),
        Err(error) => CommandResult::failure(1, format!("manifest serialization failed: {error}")),
    }
}
