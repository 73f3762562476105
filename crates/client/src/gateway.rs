//! Discord gateway connection handling.
//!
//! `GatewayClient` owns the identify settings and the resume state, and
//! hands out one `GatewayConnection` per websocket session. The caller
//! drives `next_event` in a loop; `Ok(None)` means the session ended and
//! a fresh `connect` is needed. Reconnect pacing is the caller's job.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::types::PresenceUpdate;

/// Gateway opcodes, <https://discord.com/developers/docs/topics/opcodes-and-status-codes>.
pub mod op {
    pub const DISPATCH: u8 = 0;
    pub const HEARTBEAT: u8 = 1;
    pub const IDENTIFY: u8 = 2;
    pub const PRESENCE_UPDATE: u8 = 3;
    pub const RESUME: u8 = 6;
    pub const RECONNECT: u8 = 7;
    pub const INVALID_SESSION: u8 = 9;
    pub const HELLO: u8 = 10;
    pub const HEARTBEAT_ACK: u8 = 11;
}

/// Gateway intent bits. Only the ones hexbot subscribes to are listed.
pub mod intents {
    pub const GUILDS: u64 = 1 << 0;
}

/// Fallback when HELLO arrives without an interval, which spec-following
/// servers never do.
const DEFAULT_HEARTBEAT_MS: u64 = 41_250;

#[derive(Clone)]
pub struct GatewayConfig {
    pub token: String,
    pub gateway_url: String,
    pub intents: u64,
    pub presence: PresenceUpdate,
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("token", &"<redacted>")
            .field("gateway_url", &self.gateway_url)
            .field("intents", &self.intents)
            .finish_non_exhaustive()
    }
}

/// One decoded `DISPATCH` frame. `data` stays raw JSON; the bot layer
/// decides which event names it understands.
#[derive(Debug, Clone)]
pub struct DispatchEvent {
    pub sequence: Option<u64>,
    pub name: String,
    pub data: Value,
}

#[derive(Debug, Default, Clone)]
struct SessionState {
    session_id: Option<String>,
    resume_url: Option<String>,
    seq: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct GatewayPayload {
    op: u8,
    #[serde(default)]
    d: Value,
    #[serde(default)]
    s: Option<u64>,
    #[serde(default)]
    t: Option<String>,
}

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

pub struct GatewayClient {
    config: GatewayConfig,
    session: Arc<Mutex<SessionState>>,
}

impl GatewayClient {
    pub fn new(config: GatewayConfig) -> Self {
        GatewayClient {
            config,
            session: Arc::new(Mutex::new(SessionState::default())),
        }
    }

    /// Open a websocket session: wait for HELLO, start heartbeats, then
    /// identify, or resume when a previous session left usable state.
    pub async fn connect(&self) -> Result<GatewayConnection> {
        let (url, resume) = {
            let session = self.session.lock().await;
            match (&session.session_id, session.seq) {
                (Some(session_id), Some(seq)) => (
                    session
                        .resume_url
                        .clone()
                        .unwrap_or_else(|| self.config.gateway_url.clone()),
                    Some((session_id.clone(), seq)),
                ),
                _ => (self.config.gateway_url.clone(), None),
            }
        };

        debug!(
            event_name = "discord.gateway.connect",
            url = %url,
            resuming = resume.is_some(),
            "opening gateway connection"
        );
        let (socket, _) = connect_async(url.as_str()).await?;
        let (mut sink, mut stream) = socket.split();

        // The first frame must be HELLO carrying the heartbeat interval.
        let hello = read_payload(&mut stream)
            .await?
            .ok_or_else(|| ClientError::Handshake("connection closed before HELLO".into()))?;
        if hello.op != op::HELLO {
            return Err(ClientError::Handshake(format!(
                "expected HELLO, got op {}",
                hello.op
            )));
        }
        let heartbeat_interval = hello
            .d
            .get("heartbeat_interval")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_HEARTBEAT_MS);

        let handshake = match &resume {
            Some((session_id, seq)) => resume_payload(&self.config.token, session_id, *seq),
            None => identify_payload(&self.config),
        };
        sink.send(Message::Text(handshake.to_string().into())).await?;

        let sink = Arc::new(Mutex::new(sink));
        let heartbeat = tokio::spawn(heartbeat_loop(
            Arc::clone(&sink),
            Arc::clone(&self.session),
            Duration::from_millis(heartbeat_interval),
        ));

        Ok(GatewayConnection {
            stream,
            sink,
            heartbeat,
            session: Arc::clone(&self.session),
        })
    }
}

pub struct GatewayConnection {
    stream: WsStream,
    sink: Arc<Mutex<WsSink>>,
    heartbeat: JoinHandle<()>,
    session: Arc<Mutex<SessionState>>,
}

impl GatewayConnection {
    /// Next dispatch event on this session. Control frames are handled
    /// inline; `Ok(None)` means the session is over and the caller
    /// should reconnect.
    pub async fn next_event(&mut self) -> Result<Option<DispatchEvent>> {
        while let Some(frame) = self.stream.next().await {
            let text = match frame? {
                Message::Text(text) => text,
                Message::Close(frame) => {
                    debug!(event_name = "discord.gateway.closed", frame = ?frame, "gateway sent close");
                    return Ok(None);
                }
                _ => continue,
            };
            let payload: GatewayPayload = serde_json::from_str(text.as_str())?;

            if let Some(sequence) = payload.s {
                self.session.lock().await.seq = Some(sequence);
            }

            match payload.op {
                op::DISPATCH => {
                    let Some(name) = payload.t else { continue };
                    if name == "READY" {
                        let mut session = self.session.lock().await;
                        session.session_id = payload
                            .d
                            .get("session_id")
                            .and_then(Value::as_str)
                            .map(str::to_string);
                        session.resume_url = payload
                            .d
                            .get("resume_gateway_url")
                            .and_then(Value::as_str)
                            .map(str::to_string);
                    }
                    return Ok(Some(DispatchEvent {
                        sequence: payload.s,
                        name,
                        data: payload.d,
                    }));
                }
                op::HEARTBEAT => {
                    // Server-requested beat, answered outside the timer.
                    let seq = self.session.lock().await.seq;
                    self.send_raw(&heartbeat_payload(seq)).await?;
                }
                op::RECONNECT => {
                    debug!(
                        event_name = "discord.gateway.reconnect_requested",
                        "gateway asked for a reconnect"
                    );
                    return Ok(None);
                }
                op::INVALID_SESSION => {
                    // `d: true` means the session can still be resumed.
                    let resumable = payload.d.as_bool().unwrap_or(false);
                    if !resumable {
                        *self.session.lock().await = SessionState::default();
                    }
                    debug!(
                        event_name = "discord.gateway.invalid_session",
                        resumable, "session invalidated"
                    );
                    return Ok(None);
                }
                op::HEARTBEAT_ACK => {}
                other => {
                    debug!(
                        event_name = "discord.gateway.unknown_op",
                        op = other,
                        "ignoring unknown opcode"
                    );
                }
            }
        }
        Ok(None)
    }

    /// Stop heartbeats and send a close frame. Best effort; the socket
    /// may already be gone.
    pub async fn close(self) {
        self.heartbeat.abort();
        let mut sink = self.sink.lock().await;
        let _ = sink.send(Message::Close(None)).await;
    }

    async fn send_raw(&self, payload: &Value) -> Result<()> {
        let mut sink = self.sink.lock().await;
        sink.send(Message::Text(payload.to_string().into())).await?;
        Ok(())
    }
}

async fn heartbeat_loop(
    sink: Arc<Mutex<WsSink>>,
    session: Arc<Mutex<SessionState>>,
    interval: Duration,
) {
    loop {
        tokio::time::sleep(interval).await;
        let seq = session.lock().await.seq;
        let frame = heartbeat_payload(seq).to_string();
        if sink.lock().await.send(Message::Text(frame.into())).await.is_err() {
            debug!(
                event_name = "discord.gateway.heartbeat_stopped",
                "socket went away, stopping heartbeats"
            );
            break;
        }
    }
}

async fn read_payload(stream: &mut WsStream) -> Result<Option<GatewayPayload>> {
    while let Some(frame) = stream.next().await {
        match frame? {
            Message::Text(text) => return Ok(Some(serde_json::from_str(text.as_str())?)),
            Message::Close(_) => return Ok(None),
            _ => continue,
        }
    }
    Ok(None)
}

fn identify_payload(config: &GatewayConfig) -> Value {
    json!({
        "op": op::IDENTIFY,
        "d": {
            "token": config.token,
            "intents": config.intents,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "hexbot",
                "device": "hexbot",
            },
            "presence": config.presence,
        }
    })
}

fn resume_payload(token: &str, session_id: &str, seq: u64) -> Value {
    json!({
        "op": op::RESUME,
        "d": { "token": token, "session_id": session_id, "seq": seq }
    })
}

fn heartbeat_payload(seq: Option<u64>) -> Value {
    json!({ "op": op::HEARTBEAT, "d": seq })
}
