use std::env;
use std::sync::{Mutex, OnceLock};

use hexbot_cli::commands::{config, doctor, manifest, preview};
use serde_json::Value;

#[test]
fn preview_renders_the_requested_color() {
    let result = preview::run(Some("#ff8800"), true);
    assert_eq!(result.exit_code, 0, "preview should always succeed");

    let payload = parse_payload(&result.output);
    assert_eq!(payload["hex"], "#ff8800");
    assert_eq!(payload["numeric"], 16_746_496);
    assert_eq!(payload["response"]["embeds"][0]["color"], 16_746_496);
    assert!(payload["swatch_url"].as_str().unwrap().contains("ff8800"));
}

#[test]
fn preview_falls_back_to_random_for_garbage_input() {
    let result = preview::run(Some("definitely not a color"), true);
    assert_eq!(result.exit_code, 0, "malformed input must not fail the command");

    let payload = parse_payload(&result.output);
    assert_eq!(payload["fell_back_to_random"], true);
    assert_eq!(payload["hex"].as_str().unwrap().len(), 7);
}

#[test]
fn manifest_prints_the_registered_commands() {
    let result = manifest::run();
    assert_eq!(result.exit_code, 0);

    let payload = parse_payload(&result.output);
    let names: Vec<&str> = payload
        .as_array()
        .expect("manifest should be an array")
        .iter()
        .map(|spec| spec["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["hex", "help"]);
}

#[test]
fn config_attributes_sources_and_redacts_the_token() {
    with_env(
        &[
            ("HEXBOT_DISCORD_BOT_TOKEN", "super-secret-token"),
            ("HEXBOT_DISCORD_APPLICATION_ID", "600436180864991233"),
        ],
        || {
            let result = config::run();
            assert_eq!(result.exit_code, 0, "valid env should produce a config report");

            assert!(!result.output.contains("super-secret-token"), "token must be redacted");
            assert!(result.output.contains(
                "- discord.bot_token = <redacted> (source: env (HEXBOT_DISCORD_BOT_TOKEN))"
            ));
            assert!(result.output.contains(
                "- discord.application_id = 600436180864991233 (source: env (HEXBOT_DISCORD_APPLICATION_ID))"
            ));
            assert!(result.output.contains("- logging.level = info (source: default)"));
        },
    );
}

#[test]
fn config_fails_with_actionable_error_without_required_values() {
    with_env(&[], || {
        let result = config::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");
        assert!(result.output.contains("discord.bot_token"));
    });
}

#[test]
fn doctor_passes_with_valid_env() {
    with_env(
        &[
            ("HEXBOT_DISCORD_BOT_TOKEN", "valid-token"),
            ("HEXBOT_DISCORD_APPLICATION_ID", "600436180864991233"),
        ],
        || {
            let result = doctor::run(true);
            assert_eq!(result.exit_code, 0, "expected all checks to pass");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["overall_status"], "pass");

            let checks = payload["checks"].as_array().expect("checks array");
            let names: Vec<&str> =
                checks.iter().map(|check| check["name"].as_str().unwrap()).collect();
            assert_eq!(names, vec!["config_validation", "token_readiness", "command_manifest"]);
            assert!(checks.iter().all(|check| check["status"] == "pass"));
        },
    );
}

#[test]
fn doctor_reports_config_failures_and_skips_dependent_checks() {
    with_env(&[], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 1, "expected doctor failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["overall_status"], "fail");

        let checks = payload["checks"].as_array().expect("checks array");
        assert_eq!(checks[0]["name"], "config_validation");
        assert_eq!(checks[0]["status"], "fail");
        assert_eq!(checks[1]["name"], "token_readiness");
        assert_eq!(checks[1]["status"], "skipped");
        // The manifest check needs no config and still runs.
        assert_eq!(checks[2]["name"], "command_manifest");
        assert_eq!(checks[2]["status"], "pass");
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "HEXBOT_DISCORD_BOT_TOKEN",
        "DISCORD_TOKEN",
        "HEXBOT_DISCORD_APPLICATION_ID",
        "HEXBOT_DISCORD_REST_BASE_URL",
        "HEXBOT_DISCORD_GATEWAY_URL",
        "HEXBOT_DISCORD_DEV_GUILD_ID",
        "HEXBOT_PRESENCE_ACTIVITY",
        "HEXBOT_PRESENCE_STATUS",
        "HEXBOT_SERVER_BIND_ADDRESS",
        "HEXBOT_SERVER_HEALTH_CHECK_PORT",
        "HEXBOT_LOGGING_LEVEL",
        "HEXBOT_LOGGING_FORMAT",
        "HEXBOT_LOG_LEVEL",
        "HEXBOT_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
