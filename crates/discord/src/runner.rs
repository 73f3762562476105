//! The gateway event loop.
//!
//! `GatewayRunner` drives a `GatewayTransport` with bounded reconnects:
//! transport failures and sessions that deliver nothing burn through the
//! retry budget, while any session that delivered at least one event
//! resets it. A transport with nothing left to give therefore cannot
//! spin the loop forever, and a healthy bot reconnects indefinitely.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use hexbot_client::{GatewayClient, GatewayConnection};

use crate::events::{
    decode_dispatch, default_dispatcher, EventContext, EventDispatcher, GatewayEnvelope,
    GatewayEvent,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

#[async_trait]
pub trait GatewayTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    async fn next_envelope(&self) -> Result<Option<GatewayEnvelope>, TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

#[derive(Default)]
pub struct NoopGatewayTransport;

#[async_trait]
impl GatewayTransport for NoopGatewayTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<GatewayEnvelope>, TransportError> {
        Ok(None)
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Production transport over a live gateway connection. Session and
/// resume state live in the underlying client, so a reconnect after a
/// dropped session resumes where it left off.
pub struct WsTransport {
    client: GatewayClient,
    connection: Mutex<Option<GatewayConnection>>,
}

impl WsTransport {
    pub fn new(client: GatewayClient) -> Self {
        Self { client, connection: Mutex::new(None) }
    }
}

#[async_trait]
impl GatewayTransport for WsTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        let connection = self
            .client
            .connect()
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;
        *self.connection.lock().await = Some(connection);
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<GatewayEnvelope>, TransportError> {
        let mut guard = self.connection.lock().await;
        let Some(connection) = guard.as_mut() else {
            return Ok(None);
        };

        loop {
            let dispatch = connection
                .next_event()
                .await
                .map_err(|error| TransportError::Receive(error.to_string()))?;
            let Some(dispatch) = dispatch else {
                return Ok(None);
            };

            match decode_dispatch(&dispatch) {
                Ok(envelope) => return Ok(Some(envelope)),
                Err(error) => {
                    warn!(
                        event_name = "discord.gateway.decode_failed",
                        dispatch_name = %dispatch.name,
                        error = %error,
                        "skipping undecodable dispatch"
                    );
                }
            }
        }
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        if let Some(connection) = self.connection.lock().await.take() {
            connection.close().await;
        }
        Ok(())
    }
}

/// Connection health shared with the HTTP health endpoint.
#[derive(Debug, Default)]
pub struct GatewayStatus {
    connected: AtomicBool,
    last_event_unix_ms: AtomicU64,
}

impl GatewayStatus {
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub fn record_event(&self) {
        self.last_event_unix_ms.store(now_unix_ms(), Ordering::Relaxed);
    }

    pub fn last_event_unix_ms(&self) -> Option<u64> {
        match self.last_event_unix_ms.load(Ordering::Relaxed) {
            0 => None,
            timestamp => Some(timestamp),
        }
    }
}

fn now_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

/// How one gateway session ended: the events it delivered and the
/// transport error that terminated it, if any.
struct SessionOutcome {
    events_pumped: u64,
    error: Option<TransportError>,
}

pub struct GatewayRunner {
    transport: Arc<dyn GatewayTransport>,
    dispatcher: EventDispatcher,
    reconnect_policy: ReconnectPolicy,
    status: Arc<GatewayStatus>,
}

impl Default for GatewayRunner {
    fn default() -> Self {
        Self {
            transport: Arc::new(NoopGatewayTransport),
            dispatcher: default_dispatcher(),
            reconnect_policy: ReconnectPolicy::default(),
            status: Arc::new(GatewayStatus::default()),
        }
    }
}

impl GatewayRunner {
    pub fn new(
        transport: Arc<dyn GatewayTransport>,
        dispatcher: EventDispatcher,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self {
            transport,
            dispatcher,
            reconnect_policy,
            status: Arc::new(GatewayStatus::default()),
        }
    }

    /// Handle for health reporting; stays valid after `start` returns.
    pub fn status(&self) -> Arc<GatewayStatus> {
        Arc::clone(&self.status)
    }

    pub async fn start(&self) -> Result<()> {
        let mut attempt: u32 = 0;
        loop {
            let session = self.connect_and_pump(attempt).await;
            self.status.set_connected(false);

            match &session.error {
                None if session.events_pumped > 0 => {
                    info!(
                        event_name = "discord.gateway.session_ended",
                        events = session.events_pumped,
                        "gateway session ended; reconnecting"
                    );
                    attempt = 0;
                    let delay = self.reconnect_policy.backoff(0);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    continue;
                }
                None => {
                    warn!(attempt, "gateway session ended without delivering events");
                }
                Some(error) => {
                    // A session that pumped events still restores the full
                    // retry budget, however it ended.
                    if session.events_pumped > 0 {
                        attempt = 0;
                    }
                    warn!(
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        events = session.events_pumped,
                        error = %error,
                        "gateway transport failed"
                    );
                }
            }

            if attempt >= self.reconnect_policy.max_retries {
                warn!(
                    max_retries = self.reconnect_policy.max_retries,
                    "gateway retries exhausted; continuing process without crash"
                );
                return Ok(());
            }

            let delay = self.reconnect_policy.backoff(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            attempt += 1;
        }
    }

    async fn connect_and_pump(&self, attempt: u32) -> SessionOutcome {
        info!(attempt, "opening gateway connection");
        if let Err(error) = self.transport.connect().await {
            return SessionOutcome { events_pumped: 0, error: Some(error) };
        }
        self.status.set_connected(true);
        info!(attempt, "gateway connected");

        let mut events_pumped = 0_u64;
        loop {
            let envelope = match self.transport.next_envelope().await {
                Ok(Some(envelope)) => envelope,
                Ok(None) => {
                    info!(attempt, "gateway stream closed");
                    let error = self.transport.disconnect().await.err();
                    return SessionOutcome { events_pumped, error };
                }
                Err(error) => {
                    return SessionOutcome { events_pumped, error: Some(error) };
                }
            };
            events_pumped += 1;
            self.status.record_event();

            let (guild_id, user_id) = correlation_fields(&envelope);
            info!(
                event_name = "ingress.discord.envelope_received",
                correlation_id = %envelope.correlation_id,
                event_type = ?envelope.event.event_type(),
                guild_id = guild_id.as_deref().unwrap_or("unknown"),
                user_id = user_id.as_deref().unwrap_or("unknown"),
                "received gateway event"
            );

            let context = EventContext { correlation_id: envelope.correlation_id.clone() };
            match self.dispatcher.dispatch(&envelope, &context).await {
                Ok(result) => {
                    debug!(
                        correlation_id = %envelope.correlation_id,
                        result = ?result,
                        "event dispatched"
                    );
                }
                Err(error) => {
                    warn!(
                        correlation_id = %envelope.correlation_id,
                        guild_id = guild_id.as_deref().unwrap_or("unknown"),
                        user_id = user_id.as_deref().unwrap_or("unknown"),
                        error = %error,
                        "event dispatch failed; continuing gateway loop"
                    );
                }
            }
        }
    }
}

fn correlation_fields(envelope: &GatewayEnvelope) -> (Option<String>, Option<String>) {
    match &envelope.event {
        GatewayEvent::InteractionCreate(interaction) => (
            interaction.guild_id.clone(),
            interaction.invoking_user().map(|user| user.id.clone()),
        ),
        GatewayEvent::Ready(ready) => (None, Some(ready.user.id.clone())),
        GatewayEvent::Unsupported { .. } => (None, None),
    }
}
