use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use hexbot_client::types::{Interaction, InteractionResponseType, InteractionType, Ready};
use hexbot_client::{DispatchEvent, RestClient};
use hexbot_core::{color_from_u32, random_color, Color, ColorOps, LIGHTNESS_STEP};

use crate::claims::{ClaimError, ClaimOutcome, NoopRoleClaimService, RoleClaimService};
use crate::commands::{
    button_id, resolve_initial_color, COLOR_OPTION, HELP_COMMAND, HEX_COMMAND,
};
use crate::messages::{
    claim_done_message, color_preview_message, help_message, hierarchy_denied_message,
    MessageTemplate,
};

#[derive(Clone, Debug)]
pub struct GatewayEnvelope {
    pub correlation_id: String,
    pub event: GatewayEvent,
}

#[derive(Clone, Debug)]
pub enum GatewayEvent {
    Ready(Ready),
    InteractionCreate(Interaction),
    Unsupported { event_type: String },
}

impl GatewayEvent {
    pub fn event_type(&self) -> GatewayEventType {
        match self {
            Self::Ready(_) => GatewayEventType::Ready,
            Self::InteractionCreate(_) => GatewayEventType::InteractionCreate,
            Self::Unsupported { .. } => GatewayEventType::Unsupported,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum GatewayEventType {
    Ready,
    InteractionCreate,
    Unsupported,
}

#[derive(Debug, Error)]
#[error("failed to decode {event_name} dispatch: {source}")]
pub struct DecodeError {
    pub event_name: String,
    #[source]
    pub source: serde_json::Error,
}

/// Typed envelope for a raw gateway dispatch. Interactions use their own
/// id as the correlation id so every log line ties back to Discord's;
/// other events get a fresh one.
pub fn decode_dispatch(dispatch: &DispatchEvent) -> Result<GatewayEnvelope, DecodeError> {
    let event = match dispatch.name.as_str() {
        "READY" => GatewayEvent::Ready(decode_data(dispatch)?),
        "INTERACTION_CREATE" => GatewayEvent::InteractionCreate(decode_data(dispatch)?),
        other => GatewayEvent::Unsupported { event_type: other.to_owned() },
    };
    let correlation_id = match &event {
        GatewayEvent::InteractionCreate(interaction) => interaction.id.clone(),
        _ => uuid::Uuid::new_v4().to_string(),
    };
    Ok(GatewayEnvelope { correlation_id, event })
}

fn decode_data<T: DeserializeOwned>(dispatch: &DispatchEvent) -> Result<T, DecodeError> {
    serde_json::from_value(dispatch.data.clone()).map_err(|source| DecodeError {
        event_name: dispatch.name.clone(),
        source,
    })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    /// A response went back through the interaction callback.
    Responded,
    /// Handled without answering Discord.
    Processed,
    Ignored,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("interaction response failed: {0}")]
pub struct ResponderError(pub String);

#[derive(Debug, Error)]
pub enum EventHandlerError {
    #[error(transparent)]
    Respond(#[from] ResponderError),
    #[error(transparent)]
    Claim(#[from] ClaimError),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

/// Where interaction responses go. The one production implementation
/// posts to the interaction callback endpoint; tests record instead.
#[async_trait]
pub trait InteractionResponder: Send + Sync {
    async fn respond(
        &self,
        interaction: &Interaction,
        response: &Value,
    ) -> Result<(), ResponderError>;
}

pub struct RestInteractionResponder {
    rest: Arc<RestClient>,
}

impl RestInteractionResponder {
    pub fn new(rest: Arc<RestClient>) -> Self {
        Self { rest }
    }
}

#[async_trait]
impl InteractionResponder for RestInteractionResponder {
    async fn respond(
        &self,
        interaction: &Interaction,
        response: &Value,
    ) -> Result<(), ResponderError> {
        self.rest
            .create_interaction_response(&interaction.id, &interaction.token, response)
            .await
            .map_err(|error| ResponderError(error.to_string()))
    }
}

/// Swallows responses. Useful with the default dispatcher in harnesses.
#[derive(Default)]
pub struct NoopInteractionResponder;

#[async_trait]
impl InteractionResponder for NoopInteractionResponder {
    async fn respond(
        &self,
        _interaction: &Interaction,
        _response: &Value,
    ) -> Result<(), ResponderError> {
        Ok(())
    }
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> GatewayEventType;
    async fn handle(
        &self,
        envelope: &GatewayEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<GatewayEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &GatewayEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

pub fn default_dispatcher() -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(ReadyHandler);
    dispatcher.register(InteractionHandler::new(
        Arc::new(NoopInteractionResponder),
        Arc::new(NoopRoleClaimService),
    ));
    dispatcher
}

/// Logs the session identity once the gateway confirms it.
pub struct ReadyHandler;

#[async_trait]
impl EventHandler for ReadyHandler {
    fn event_type(&self) -> GatewayEventType {
        GatewayEventType::Ready
    }

    async fn handle(
        &self,
        envelope: &GatewayEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let GatewayEvent::Ready(ready) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        info!(
            event_name = "discord.gateway.ready",
            correlation_id = %ctx.correlation_id,
            bot_user_id = %ready.user.id,
            guild_count = ready.guilds.len(),
            "gateway session ready"
        );
        Ok(HandlerResult::Processed)
    }
}

/// Handles both halves of the hex workflow: slash commands open a
/// preview, component presses adjust or submit it.
pub struct InteractionHandler {
    responder: Arc<dyn InteractionResponder>,
    claims: Arc<dyn RoleClaimService>,
}

impl InteractionHandler {
    pub fn new(responder: Arc<dyn InteractionResponder>, claims: Arc<dyn RoleClaimService>) -> Self {
        Self { responder, claims }
    }

    async fn handle_command(
        &self,
        interaction: &Interaction,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let name = interaction
            .data
            .as_ref()
            .and_then(|data| data.name.as_deref())
            .unwrap_or_default();

        match name {
            HEX_COMMAND => {
                let color = resolve_initial_color(interaction.option_str(COLOR_OPTION));
                info!(
                    event_name = "hex.preview.opened",
                    correlation_id = %ctx.correlation_id,
                    color = color.to_rgb_u32(),
                    "opening color preview"
                );
                self.respond_new(interaction, &color_preview_message(&color)).await?;
                Ok(HandlerResult::Responded)
            }
            HELP_COMMAND => {
                self.respond_new(interaction, &help_message()).await?;
                Ok(HandlerResult::Responded)
            }
            other => {
                debug!(
                    correlation_id = %ctx.correlation_id,
                    command = other,
                    "unknown command"
                );
                Ok(HandlerResult::Ignored)
            }
        }
    }

    async fn handle_component(
        &self,
        interaction: &Interaction,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let Some(custom_id) =
            interaction.data.as_ref().and_then(|data| data.custom_id.as_deref())
        else {
            return Ok(HandlerResult::Ignored);
        };

        // Buttons carry their state in the preview embed's color. A press
        // on a message without one has nothing to adjust, so drop it.
        let Some(current) = current_color(interaction) else {
            debug!(
                correlation_id = %ctx.correlation_id,
                custom_id,
                "component without a preview embed"
            );
            return Ok(HandlerResult::Ignored);
        };
        let next = match custom_id {
            button_id::RANDOMIZE => random_color(),
            button_id::LIGHTEN => current.lighten(LIGHTNESS_STEP),
            button_id::DARKEN => current.darken(LIGHTNESS_STEP),
            button_id::SUBMIT => return self.handle_submit(interaction, &current, ctx).await,
            other => {
                debug!(
                    correlation_id = %ctx.correlation_id,
                    custom_id = other,
                    "unknown component"
                );
                return Ok(HandlerResult::Ignored);
            }
        };

        info!(
            event_name = "hex.preview.adjusted",
            correlation_id = %ctx.correlation_id,
            button = custom_id,
            color = next.to_rgb_u32(),
            "adjusting color preview"
        );
        self.respond_update(interaction, &color_preview_message(&next)).await?;
        Ok(HandlerResult::Responded)
    }

    async fn handle_submit(
        &self,
        interaction: &Interaction,
        color: &Color,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        // Submit only means something inside a guild with a known member.
        let Some(guild_id) = interaction.guild_id.as_deref() else {
            debug!(correlation_id = %ctx.correlation_id, "submit outside a guild");
            return Ok(HandlerResult::Processed);
        };
        let Some(user) = interaction.invoking_user() else {
            debug!(correlation_id = %ctx.correlation_id, "submit without a member");
            return Ok(HandlerResult::Processed);
        };

        let outcome = self.claims.claim(guild_id, &user.id, color, ctx).await?;
        let message = match outcome {
            ClaimOutcome::Claimed { .. } => claim_done_message(),
            ClaimOutcome::Denied { role_name, bot_top_name } => {
                hierarchy_denied_message(&role_name, &bot_top_name)
            }
        };

        self.respond_update(interaction, &message).await?;
        Ok(HandlerResult::Responded)
    }

    async fn respond_new(
        &self,
        interaction: &Interaction,
        message: &MessageTemplate,
    ) -> Result<(), EventHandlerError> {
        let response = message.to_response(InteractionResponseType::CHANNEL_MESSAGE_WITH_SOURCE);
        self.responder.respond(interaction, &response).await?;
        Ok(())
    }

    async fn respond_update(
        &self,
        interaction: &Interaction,
        message: &MessageTemplate,
    ) -> Result<(), EventHandlerError> {
        let response = message.to_response(InteractionResponseType::UPDATE_MESSAGE);
        self.responder.respond(interaction, &response).await?;
        Ok(())
    }
}

#[async_trait]
impl EventHandler for InteractionHandler {
    fn event_type(&self) -> GatewayEventType {
        GatewayEventType::InteractionCreate
    }

    async fn handle(
        &self,
        envelope: &GatewayEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let GatewayEvent::InteractionCreate(interaction) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        match interaction.kind {
            InteractionType::APPLICATION_COMMAND => self.handle_command(interaction, ctx).await,
            InteractionType::MESSAGE_COMPONENT => self.handle_component(interaction, ctx).await,
            _ => Ok(HandlerResult::Ignored),
        }
    }
}

/// The color a button press starts from, carried in the preview embed
/// between interactions.
fn current_color(interaction: &Interaction) -> Option<Color> {
    interaction
        .message
        .as_ref()
        .and_then(|message| message.embeds.first())
        .and_then(|embed| embed.color)
        .map(color_from_u32)
}
