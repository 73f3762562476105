//! Thin REST client for the Discord HTTP API.
//!
//! Only the endpoints hexbot actually calls are wrapped. Everything goes
//! through one generic request path so auth, error extraction and JSON
//! decoding live in a single place.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::types::{CommandSpec, Member, Role, RolePayload, User};

pub const DEFAULT_BASE_URL: &str = "https://discord.com/api/v10";

/// Header Discord reads the audit log entry text from.
const AUDIT_REASON_HEADER: &str = "X-Audit-Log-Reason";

pub struct RestClient {
    client: Client,
    base_url: String,
}

impl RestClient {
    /// Build a client around a bot token. The `Bot ` prefix is added when
    /// missing so callers can pass the token straight from config.
    pub fn new(token: &str, base_url: Option<&str>) -> Result<Self> {
        let token = token.trim();
        let authorization = if token.starts_with("Bot ") {
            token.to_string()
        } else {
            format!("Bot {token}")
        };

        let mut headers = HeaderMap::new();
        let mut auth_value =
            HeaderValue::from_str(&authorization).map_err(|_| ClientError::InvalidToken)?;
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder().default_headers(headers).build()?;
        Ok(RestClient {
            client,
            base_url: base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/').to_string(),
        })
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        audit_reason: Option<&str>,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(event_name = "discord.rest.request", %method, path, "sending request");

        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(body);
        }
        if let Some(reason) = audit_reason {
            request = request.header(AUDIT_REASON_HEADER, reason);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let payload: Value = response.json().await.unwrap_or(Value::Null);
            let message = api_error_message(&payload);
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(serde_json::from_value(Value::Null)?);
        }

        let payload = response.json().await?;
        Ok(payload)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(Method::GET, path, None, None).await
    }

    /// The bot's own user, used once at startup to learn the bot's id.
    pub async fn current_user(&self) -> Result<User> {
        self.get("/users/@me").await
    }

    /// Replace the global command set with `commands`.
    pub async fn bulk_overwrite_global_commands(
        &self,
        application_id: &str,
        commands: &[CommandSpec],
    ) -> Result<Vec<Value>> {
        let body = serde_json::to_value(commands)?;
        self.request(
            Method::PUT,
            &format!("/applications/{application_id}/commands"),
            Some(&body),
            None,
        )
        .await
    }

    /// Replace the command set of a single guild. Guild commands show up
    /// immediately, which is what makes them useful during development.
    pub async fn bulk_overwrite_guild_commands(
        &self,
        application_id: &str,
        guild_id: &str,
        commands: &[CommandSpec],
    ) -> Result<Vec<Value>> {
        let body = serde_json::to_value(commands)?;
        self.request(
            Method::PUT,
            &format!("/applications/{application_id}/guilds/{guild_id}/commands"),
            Some(&body),
            None,
        )
        .await
    }

    /// Answer an interaction within its three second window. `response`
    /// is the full callback body, `{ "type": ..., "data": ... }`.
    pub async fn create_interaction_response(
        &self,
        interaction_id: &str,
        interaction_token: &str,
        response: &Value,
    ) -> Result<()> {
        self.request(
            Method::POST,
            &format!("/interactions/{interaction_id}/{interaction_token}/callback"),
            Some(response),
            None,
        )
        .await
    }

    pub async fn guild_roles(&self, guild_id: &str) -> Result<Vec<Role>> {
        self.get(&format!("/guilds/{guild_id}/roles")).await
    }

    pub async fn guild_member(&self, guild_id: &str, user_id: &str) -> Result<Member> {
        self.get(&format!("/guilds/{guild_id}/members/{user_id}")).await
    }

    pub async fn create_guild_role(
        &self,
        guild_id: &str,
        payload: &RolePayload,
        audit_reason: Option<&str>,
    ) -> Result<Role> {
        let body = serde_json::to_value(payload)?;
        self.request(
            Method::POST,
            &format!("/guilds/{guild_id}/roles"),
            Some(&body),
            audit_reason,
        )
        .await
    }

    pub async fn modify_guild_role(
        &self,
        guild_id: &str,
        role_id: &str,
        payload: &RolePayload,
        audit_reason: Option<&str>,
    ) -> Result<Role> {
        let body = serde_json::to_value(payload)?;
        self.request(
            Method::PATCH,
            &format!("/guilds/{guild_id}/roles/{role_id}"),
            Some(&body),
            audit_reason,
        )
        .await
    }

    /// Grant `role_id` to a member. Succeeds with no body, and is a no-op
    /// on Discord's side when the member already holds the role.
    pub async fn add_member_role(
        &self,
        guild_id: &str,
        user_id: &str,
        role_id: &str,
        audit_reason: Option<&str>,
    ) -> Result<()> {
        self.request(
            Method::PUT,
            &format!("/guilds/{guild_id}/members/{user_id}/roles/{role_id}"),
            None,
            audit_reason,
        )
        .await
    }
}

/// Pull the human-readable message out of a Discord error body, falling
/// back to the raw payload when the shape is unexpected.
fn api_error_message(payload: &Value) -> String {
    payload
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| payload.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_message_prefers_discord_message_field() {
        let payload = json!({ "message": "Missing Permissions", "code": 50013 });
        assert_eq!(api_error_message(&payload), "Missing Permissions");
    }

    #[test]
    fn error_message_falls_back_to_raw_payload() {
        let payload = json!({ "detail": "upstream hiccup" });
        assert_eq!(api_error_message(&payload), r#"{"detail":"upstream hiccup"}"#);

        assert_eq!(api_error_message(&Value::Null), "null");
    }

    #[test]
    fn client_accepts_tokens_with_and_without_prefix() {
        assert!(RestClient::new("abc123", None).is_ok());
        assert!(RestClient::new("Bot abc123", None).is_ok());
        assert!(RestClient::new("line\nbreak", None).is_err());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = RestClient::new("abc", Some("https://discord.test/api/")).unwrap();
        assert_eq!(client.base_url, "https://discord.test/api");
    }
}
