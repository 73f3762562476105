//! Role claiming: turning a submitted color into the member's personal
//! guild role.
//!
//! The decision of what to do lives in `hexbot_core::claim`; this module
//! gathers the guild state it needs, executes the resulting plan against
//! the Discord API and reports the outcome.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use hexbot_client::types::{Role, RolePayload};
use hexbot_client::{ClientError, RestClient};
use hexbot_core::{
    claim_role_name, plan_role_claim, ClaimInput, ClaimPlan, Color, ColorOps, RoleSnapshot,
    RoleSpec,
};

use crate::events::EventContext;

/// Audit log entry attached to every role write the bot performs.
pub const AUDIT_REASON: &str = "User Changed Name Color";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuildApiError {
    #[error("guild read failed: {0}")]
    Read(String),
    #[error("role write failed: {0}")]
    Write(String),
}

/// The slice of the guild API the claim workflow touches.
#[async_trait]
pub trait GuildApi: Send + Sync {
    async fn guild_roles(&self, guild_id: &str) -> Result<Vec<Role>, GuildApiError>;
    async fn member_role_ids(
        &self,
        guild_id: &str,
        user_id: &str,
    ) -> Result<Vec<String>, GuildApiError>;
    async fn create_role(
        &self,
        guild_id: &str,
        payload: &RolePayload,
        reason: &str,
    ) -> Result<Role, GuildApiError>;
    async fn modify_role(
        &self,
        guild_id: &str,
        role_id: &str,
        payload: &RolePayload,
        reason: &str,
    ) -> Result<Role, GuildApiError>;
    async fn add_member_role(
        &self,
        guild_id: &str,
        user_id: &str,
        role_id: &str,
        reason: &str,
    ) -> Result<(), GuildApiError>;
}

pub struct RestGuildApi {
    rest: Arc<RestClient>,
}

impl RestGuildApi {
    pub fn new(rest: Arc<RestClient>) -> Self {
        Self { rest }
    }
}

#[async_trait]
impl GuildApi for RestGuildApi {
    async fn guild_roles(&self, guild_id: &str) -> Result<Vec<Role>, GuildApiError> {
        self.rest.guild_roles(guild_id).await.map_err(read_error)
    }

    async fn member_role_ids(
        &self,
        guild_id: &str,
        user_id: &str,
    ) -> Result<Vec<String>, GuildApiError> {
        let member = self.rest.guild_member(guild_id, user_id).await.map_err(read_error)?;
        Ok(member.roles)
    }

    async fn create_role(
        &self,
        guild_id: &str,
        payload: &RolePayload,
        reason: &str,
    ) -> Result<Role, GuildApiError> {
        self.rest.create_guild_role(guild_id, payload, Some(reason)).await.map_err(write_error)
    }

    async fn modify_role(
        &self,
        guild_id: &str,
        role_id: &str,
        payload: &RolePayload,
        reason: &str,
    ) -> Result<Role, GuildApiError> {
        self.rest
            .modify_guild_role(guild_id, role_id, payload, Some(reason))
            .await
            .map_err(write_error)
    }

    async fn add_member_role(
        &self,
        guild_id: &str,
        user_id: &str,
        role_id: &str,
        reason: &str,
    ) -> Result<(), GuildApiError> {
        self.rest
            .add_member_role(guild_id, user_id, role_id, Some(reason))
            .await
            .map_err(write_error)
    }
}

fn read_error(error: ClientError) -> GuildApiError {
    GuildApiError::Read(error.to_string())
}

fn write_error(error: ClientError) -> GuildApiError {
    GuildApiError::Write(error.to_string())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The member now holds their color role.
    Claimed { role_name: String, created: bool },
    /// An existing role with the member's name outranks the bot; nothing
    /// was changed.
    Denied { role_name: String, bot_top_name: String },
}

#[derive(Debug, Error)]
pub enum ClaimError {
    #[error(transparent)]
    Api(#[from] GuildApiError),
}

#[async_trait]
pub trait RoleClaimService: Send + Sync {
    async fn claim(
        &self,
        guild_id: &str,
        user_id: &str,
        color: &Color,
        ctx: &EventContext,
    ) -> Result<ClaimOutcome, ClaimError>;
}

/// Claim service backed by a live guild API. Needs the bot's own user id
/// so it can find the bot's roles when planning position and hierarchy.
pub struct GuildRoleClaimService<A> {
    api: A,
    bot_user_id: String,
}

impl<A> GuildRoleClaimService<A>
where
    A: GuildApi,
{
    pub fn new(api: A, bot_user_id: impl Into<String>) -> Self {
        Self { api, bot_user_id: bot_user_id.into() }
    }
}

#[async_trait]
impl<A> RoleClaimService for GuildRoleClaimService<A>
where
    A: GuildApi + 'static,
{
    async fn claim(
        &self,
        guild_id: &str,
        user_id: &str,
        color: &Color,
        ctx: &EventContext,
    ) -> Result<ClaimOutcome, ClaimError> {
        let guild_roles = self.api.guild_roles(guild_id).await?;
        let bot_role_ids = self.api.member_role_ids(guild_id, &self.bot_user_id).await?;
        let member_role_ids = self.api.member_role_ids(guild_id, user_id).await?;

        let input = ClaimInput {
            user_id: user_id.to_owned(),
            color: color.to_rgb_u32(),
            guild_roles: guild_roles.iter().map(snapshot).collect(),
            bot_role_ids,
            member_role_ids,
        };

        match plan_role_claim(&input) {
            ClaimPlan::Denied { role_name, bot_top_name } => {
                info!(
                    event_name = "claims.role.denied",
                    correlation_id = %ctx.correlation_id,
                    guild_id = %guild_id,
                    user_id = %user_id,
                    role_name = %role_name,
                    "existing role outranks the bot"
                );
                Ok(ClaimOutcome::Denied { role_name, bot_top_name })
            }
            ClaimPlan::Create { role } => {
                let created =
                    self.api.create_role(guild_id, &role_payload(&role), AUDIT_REASON).await?;
                self.api
                    .add_member_role(guild_id, user_id, &created.id, AUDIT_REASON)
                    .await?;
                info!(
                    event_name = "claims.role.created",
                    correlation_id = %ctx.correlation_id,
                    guild_id = %guild_id,
                    user_id = %user_id,
                    role_id = %created.id,
                    color = role.color,
                    "created color role"
                );
                Ok(ClaimOutcome::Claimed { role_name: created.name, created: true })
            }
            ClaimPlan::Update { role_id, role, assign } => {
                let updated = self
                    .api
                    .modify_role(guild_id, &role_id, &role_payload(&role), AUDIT_REASON)
                    .await?;
                if assign {
                    self.api
                        .add_member_role(guild_id, user_id, &role_id, AUDIT_REASON)
                        .await?;
                }
                info!(
                    event_name = "claims.role.updated",
                    correlation_id = %ctx.correlation_id,
                    guild_id = %guild_id,
                    user_id = %user_id,
                    role_id = %role_id,
                    color = role.color,
                    assigned = assign,
                    "recolored existing role"
                );
                Ok(ClaimOutcome::Claimed { role_name: updated.name, created: false })
            }
        }
    }
}

/// Claim service that pretends every claim lands. Keeps the dispatcher
/// usable in harnesses with no guild behind it.
#[derive(Default)]
pub struct NoopRoleClaimService;

#[async_trait]
impl RoleClaimService for NoopRoleClaimService {
    async fn claim(
        &self,
        _guild_id: &str,
        user_id: &str,
        _color: &Color,
        _ctx: &EventContext,
    ) -> Result<ClaimOutcome, ClaimError> {
        Ok(ClaimOutcome::Claimed { role_name: claim_role_name(user_id), created: false })
    }
}

fn snapshot(role: &Role) -> RoleSnapshot {
    RoleSnapshot {
        id: role.id.clone(),
        name: role.name.clone(),
        color: role.color,
        position: role.position,
        managed: role.managed,
    }
}

fn role_payload(spec: &RoleSpec) -> RolePayload {
    RolePayload {
        name: Some(spec.name.clone()),
        color: Some(spec.color),
        hoist: Some(spec.hoist),
        mentionable: Some(spec.mentionable),
        permissions: Some(spec.permissions.clone()),
        position: Some(spec.position),
    }
}
