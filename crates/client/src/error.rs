use thiserror::Error;

/// Errors surfaced by the REST and gateway clients.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Discord rejected the request and returned an error body.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The gateway broke protocol during connection setup.
    #[error("gateway handshake failed: {0}")]
    Handshake(String),

    /// The bot token contains bytes that cannot go into an HTTP header.
    #[error("bot token is not a valid header value")]
    InvalidToken,
}

pub type Result<T> = std::result::Result<T, ClientError>;
