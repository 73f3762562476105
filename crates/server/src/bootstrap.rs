use std::sync::Arc;

use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::info;

use hexbot_client::types::{PresenceUpdate, User};
use hexbot_client::{intents, ClientError, GatewayClient, GatewayConfig, RestClient};
use hexbot_core::config::{AppConfig, ConfigError, LoadOptions};
use hexbot_discord::claims::{GuildRoleClaimService, RestGuildApi};
use hexbot_discord::commands::command_manifest;
use hexbot_discord::events::{
    EventDispatcher, InteractionHandler, ReadyHandler, RestInteractionResponder,
};
use hexbot_discord::runner::{GatewayRunner, ReconnectPolicy, WsTransport};

pub struct Application {
    pub config: AppConfig,
    pub rest: Arc<RestClient>,
    pub bot_user: User,
    pub runner: GatewayRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("discord client construction failed: {0}")]
    Client(#[source] ClientError),
    #[error("discord identity lookup failed: {0}")]
    Identity(#[source] ClientError),
    #[error("command registration failed: {0}")]
    CommandRegistration(#[source] ClientError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let rest = Arc::new(
        RestClient::new(
            config.discord.bot_token.expose_secret(),
            Some(&config.discord.rest_base_url),
        )
        .map_err(BootstrapError::Client)?,
    );

    let bot_user = rest.current_user().await.map_err(BootstrapError::Identity)?;
    info!(
        event_name = "system.bootstrap.identity_confirmed",
        correlation_id = "bootstrap",
        bot_user_id = %bot_user.id,
        "bot identity confirmed"
    );

    let manifest = command_manifest();
    rest.bulk_overwrite_global_commands(&config.discord.application_id, &manifest)
        .await
        .map_err(BootstrapError::CommandRegistration)?;
    if let Some(guild_id) = &config.discord.dev_guild_id {
        // Guild-scoped copies show up immediately instead of after global
        // command propagation.
        rest.bulk_overwrite_guild_commands(&config.discord.application_id, guild_id, &manifest)
            .await
            .map_err(BootstrapError::CommandRegistration)?;
    }
    info!(
        event_name = "system.bootstrap.commands_registered",
        correlation_id = "bootstrap",
        command_count = manifest.len(),
        dev_guild = config.discord.dev_guild_id.is_some(),
        "slash commands registered"
    );

    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(ReadyHandler);
    dispatcher.register(InteractionHandler::new(
        Arc::new(RestInteractionResponder::new(Arc::clone(&rest))),
        Arc::new(GuildRoleClaimService::new(
            RestGuildApi::new(Arc::clone(&rest)),
            bot_user.id.clone(),
        )),
    ));

    let gateway = GatewayClient::new(GatewayConfig {
        token: config.discord.bot_token.expose_secret().to_string(),
        gateway_url: config.discord.gateway_url.clone(),
        intents: intents::GUILDS,
        presence: PresenceUpdate::playing(
            config.presence.activity.clone(),
            config.presence.status.as_str(),
        ),
    });
    let runner = GatewayRunner::new(
        Arc::new(WsTransport::new(gateway)),
        dispatcher,
        ReconnectPolicy::default(),
    );

    Ok(Application { config, rest, bot_user, runner })
}

#[cfg(test)]
mod tests {
    use hexbot_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::{bootstrap, BootstrapError};

    #[tokio::test]
    async fn bootstrap_fails_fast_on_invalid_config() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                bot_token: Some("valid-token".to_string()),
                application_id: Some("not-a-snowflake".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        let error = result.err().expect("bootstrap should fail before any network call");
        assert!(matches!(error, BootstrapError::Config(_)));
        assert!(error.to_string().contains("discord.application_id"));
    }
}
