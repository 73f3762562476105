//! Minimal Discord client: a REST wrapper for the handful of HTTP
//! endpoints hexbot calls, and a gateway connection for receiving
//! interactions. No caching, no sharding; one bot on one shard.

pub mod error;
pub mod gateway;
pub mod rest;
pub mod types;

pub use error::{ClientError, Result};
pub use gateway::{intents, DispatchEvent, GatewayClient, GatewayConfig, GatewayConnection};
pub use rest::RestClient;
