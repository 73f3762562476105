use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use hexbot_discord::runner::GatewayStatus;
use serde::Serialize;
use tracing::{error, info};

#[derive(Clone)]
pub struct HealthState {
    gateway: Arc<GatewayStatus>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub gateway: HealthCheck,
    pub checked_at: String,
}

pub fn router(gateway: Arc<GatewayStatus>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { gateway })
}

pub async fn spawn(
    bind_address: &str,
    port: u16,
    gateway: Arc<GatewayStatus>,
) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(gateway)).await {
            error!(
                event_name = "system.health.error",
                correlation_id = "bootstrap",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let gateway = gateway_check(&state.gateway);
    let ready = gateway.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "hexbot-server runtime initialized".to_string(),
        },
        gateway,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn gateway_check(status: &GatewayStatus) -> HealthCheck {
    if !status.is_connected() {
        return HealthCheck {
            status: "degraded",
            detail: "gateway disconnected".to_string(),
        };
    }

    let detail = match status.last_event_unix_ms() {
        Some(timestamp) => format!("gateway connected; last event at unix ms {timestamp}"),
        None => "gateway connected; no events yet".to_string(),
    };
    HealthCheck { status: "ready", detail }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{extract::State, http::StatusCode, Json};
    use hexbot_discord::runner::GatewayStatus;

    use crate::health::{health, HealthState};

    #[tokio::test]
    async fn health_returns_ready_when_gateway_is_connected() {
        let gateway = Arc::new(GatewayStatus::default());
        gateway.set_connected(true);
        gateway.record_event();

        let (status, Json(payload)) = health(State(HealthState { gateway })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.gateway.status, "ready");
        assert_eq!(payload.service.status, "ready");
        assert!(payload.gateway.detail.contains("last event"));
    }

    #[tokio::test]
    async fn health_returns_service_unavailable_when_gateway_is_down() {
        let gateway = Arc::new(GatewayStatus::default());

        let (status, Json(payload)) = health(State(HealthState { gateway })).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.gateway.status, "degraded");
        assert_eq!(payload.service.status, "ready");
    }
}
