mod bootstrap;
mod health;

use anyhow::Result;
use hexbot_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use hexbot_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    // Now bootstrap using the same config we already loaded
    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.runner.status(),
    )
    .await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bot_user_id = %app.bot_user.id,
        "hexbot-server started"
    );

    tokio::select! {
        result = app.runner.start() => {
            result?;
            tracing::info!(
                event_name = "system.server.gateway_stopped",
                correlation_id = "shutdown",
                "gateway runner stopped"
            );
        }
        _ = wait_for_shutdown() => {
            tracing::info!(
                event_name = "system.server.stopping",
                correlation_id = "shutdown",
                "hexbot-server stopping"
            );
        }
    }

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
