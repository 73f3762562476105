use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use hexbot_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

use super::CommandResult;

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return CommandResult::failure(2, format!("config validation failed: {error}")),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "discord.bot_token",
        &redact_token(config.discord.bot_token.expose_secret()),
        source("discord.bot_token", &["HEXBOT_DISCORD_BOT_TOKEN", "DISCORD_TOKEN"]),
    ));
    lines.push(render_line(
        "discord.application_id",
        &config.discord.application_id,
        source("discord.application_id", &["HEXBOT_DISCORD_APPLICATION_ID"]),
    ));
    lines.push(render_line(
        "discord.rest_base_url",
        &config.discord.rest_base_url,
        source("discord.rest_base_url", &["HEXBOT_DISCORD_REST_BASE_URL"]),
    ));
    lines.push(render_line(
        "discord.gateway_url",
        &config.discord.gateway_url,
        source("discord.gateway_url", &["HEXBOT_DISCORD_GATEWAY_URL"]),
    ));
    lines.push(render_line(
        "discord.dev_guild_id",
        config.discord.dev_guild_id.as_deref().unwrap_or("<unset>"),
        source("discord.dev_guild_id", &["HEXBOT_DISCORD_DEV_GUILD_ID"]),
    ));

    lines.push(render_line(
        "presence.activity",
        &config.presence.activity,
        source("presence.activity", &["HEXBOT_PRESENCE_ACTIVITY"]),
    ));
    lines.push(render_line(
        "presence.status",
        config.presence.status.as_str(),
        source("presence.status", &["HEXBOT_PRESENCE_STATUS"]),
    ));

    lines.push(render_line(
        "server.bind_address",
        &config.server.bind_address,
        source("server.bind_address", &["HEXBOT_SERVER_BIND_ADDRESS"]),
    ));
    lines.push(render_line(
        "server.health_check_port",
        &config.server.health_check_port.to_string(),
        source("server.health_check_port", &["HEXBOT_SERVER_HEALTH_CHECK_PORT"]),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", &["HEXBOT_LOGGING_LEVEL", "HEXBOT_LOG_LEVEL"]),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", &["HEXBOT_LOGGING_FORMAT", "HEXBOT_LOG_FORMAT"]),
    ));

    CommandResult::success(lines.join("\n"))
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("hexbot.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/hexbot.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    for env_key in env_keys {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_token(token: &str) -> String {
    if token.trim().is_empty() {
        return "<empty>".to_string();
    }

    "<redacted>".to_string()
}
