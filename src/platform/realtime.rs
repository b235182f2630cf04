// Change-feed client for the platform's realtime websocket (Phoenix
// channel protocol). One connection per subscription: the portal only
// opens a feed while an admin has a note panel open, so multiplexing
// topics over a shared socket is not worth its bookkeeping.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use uuid::Uuid;

use crate::config::RealtimeConfig;
use crate::platform::{FeedStatus, PlatformError, Subscription, SubscriptionGuard};
use crate::types::Note;

const NOTES_TABLE: &str = "notes";
const EVENT_BUFFER: usize = 64;

/// Wire frame of the Phoenix channel protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PhoenixMessage {
    topic: String,
    event: String,
    payload: Value,
    #[serde(rename = "ref")]
    reference: Option<String>,
}

/// Connects to `/realtime/v1/websocket` and turns confirmed
/// `postgres_changes` INSERT frames into `Note` events.
pub struct RealtimeClient {
    ws_url: String,
    config: RealtimeConfig,
}

impl RealtimeClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        config: RealtimeConfig,
    ) -> Result<Self, PlatformError> {
        let mut url = url::Url::parse(base_url)
            .map_err(|e| PlatformError::Realtime(format!("invalid platform URL: {}", e)))?;
        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme)
            .map_err(|_| PlatformError::Realtime("cannot derive websocket scheme".to_string()))?;
        url.set_path("/realtime/v1/websocket");
        url.query_pairs_mut()
            .append_pair("apikey", api_key)
            .append_pair("vsn", "1.0.0");

        Ok(Self {
            ws_url: url.to_string(),
            config,
        })
    }

    /// Open a subscription for one document's note inserts. The feed task
    /// reconnects with exponential backoff until the returned subscription
    /// is closed; status transitions are published on the watch channel.
    pub fn subscribe_note_inserts(&self, document_id: Uuid) -> Subscription {
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let (status_tx, status_rx) = watch::channel(FeedStatus::Connecting);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let feed = FeedTask {
            ws_url: self.ws_url.clone(),
            config: self.config.clone(),
            document_id,
            events: event_tx,
            status: status_tx,
        };
        let task = tokio::spawn(feed.run(shutdown_rx));

        Subscription::new(
            event_rx,
            status_rx,
            SubscriptionGuard::new(shutdown_tx, task),
        )
    }
}

struct FeedTask {
    ws_url: String,
    config: RealtimeConfig,
    document_id: Uuid,
    events: mpsc::Sender<Note>,
    status: watch::Sender<FeedStatus>,
}

/// Why a single connection attempt ended.
enum ConnectionEnd {
    /// Session closed on our side; stop for good.
    Shutdown,
    /// Server-initiated drop or transport failure; reconnect.
    Dropped(String),
}

impl FeedTask {
    async fn run(self, mut shutdown: oneshot::Receiver<()>) {
        let mut attempt: u32 = 0;

        loop {
            let _ = self.status.send(FeedStatus::Connecting);

            match self.connect_once(&mut shutdown, &mut attempt).await {
                ConnectionEnd::Shutdown => break,
                ConnectionEnd::Dropped(reason) => {
                    tracing::warn!(
                        document_id = %self.document_id,
                        "realtime feed dropped: {}", reason
                    );
                    let _ = self.status.send(FeedStatus::Disconnected);
                    if self.events.is_closed() {
                        break;
                    }

                    let delay = backoff_delay(&self.config, attempt);
                    attempt = attempt.saturating_add(1);
                    tokio::select! {
                        _ = &mut shutdown => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// One connect/join/stream cycle. `attempt` resets once the join is
    /// confirmed so backoff only grows across consecutive failures.
    async fn connect_once(
        &self,
        shutdown: &mut oneshot::Receiver<()>,
        attempt: &mut u32,
    ) -> ConnectionEnd {
        let (mut socket, _) = match connect_async(&self.ws_url).await {
            Ok(pair) => pair,
            Err(e) => return ConnectionEnd::Dropped(format!("connect failed: {}", e)),
        };

        let topic = topic_for(self.document_id);
        let join = join_message(&topic, self.document_id);
        if let Err(e) = socket.send(Message::Text(join.to_string())).await {
            return ConnectionEnd::Dropped(format!("join send failed: {}", e));
        }

        let mut heartbeat = tokio::time::interval(Duration::from_secs(self.config.heartbeat_secs));
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick fires immediately; skip it, the join just went out
        heartbeat.tick().await;

        loop {
            tokio::select! {
                _ = &mut *shutdown => {
                    // Best-effort leave so the server releases the topic
                    let leave = phoenix(&topic, "phx_leave", json!({}));
                    let _ = socket.send(Message::Text(leave.to_string())).await;
                    let _ = socket.close(None).await;
                    return ConnectionEnd::Shutdown;
                }
                _ = heartbeat.tick() => {
                    let beat = phoenix("phoenix", "heartbeat", json!({}));
                    if let Err(e) = socket.send(Message::Text(beat.to_string())).await {
                        return ConnectionEnd::Dropped(format!("heartbeat failed: {}", e));
                    }
                }
                frame = socket.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            match self.handle_frame(&topic, &text).await {
                                FrameOutcome::Continue => {}
                                FrameOutcome::Confirmed => {
                                    *attempt = 0;
                                    let _ = self.status.send(FeedStatus::Live);
                                }
                                FrameOutcome::ReceiverGone => return ConnectionEnd::Shutdown,
                                FrameOutcome::ServerClosed(reason) => {
                                    return ConnectionEnd::Dropped(reason);
                                }
                            }
                        }
                        Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Binary(_) | Message::Frame(_))) => {}
                        Some(Ok(Message::Close(_))) => {
                            return ConnectionEnd::Dropped("server closed the socket".to_string());
                        }
                        Some(Err(e)) => return ConnectionEnd::Dropped(format!("socket error: {}", e)),
                        None => return ConnectionEnd::Dropped("socket ended".to_string()),
                    }
                }
            }
        }
    }

    async fn handle_frame(&self, topic: &str, text: &str) -> FrameOutcome {
        let msg: PhoenixMessage = match serde_json::from_str(text) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!("ignoring unparseable realtime frame: {}", e);
                return FrameOutcome::Continue;
            }
        };

        if msg.topic != topic {
            return FrameOutcome::Continue;
        }

        match msg.event.as_str() {
            "phx_reply" => {
                let status = msg.payload.get("status").and_then(Value::as_str);
                if status == Some("ok") {
                    FrameOutcome::Confirmed
                } else {
                    FrameOutcome::ServerClosed(format!(
                        "join rejected: {}",
                        msg.payload
                    ))
                }
            }
            "postgres_changes" => {
                if let Some(note) = parse_insert(&msg.payload) {
                    if self.events.send(note).await.is_err() {
                        return FrameOutcome::ReceiverGone;
                    }
                }
                FrameOutcome::Continue
            }
            "phx_close" | "phx_error" => {
                FrameOutcome::ServerClosed(format!("channel {}", msg.event))
            }
            _ => FrameOutcome::Continue,
        }
    }
}

enum FrameOutcome {
    Continue,
    Confirmed,
    ReceiverGone,
    ServerClosed(String),
}

fn topic_for(document_id: Uuid) -> String {
    format!("realtime:notes:{}", document_id)
}

fn phoenix(topic: &str, event: &str, payload: Value) -> Value {
    json!({
        "topic": topic,
        "event": event,
        "payload": payload,
        "ref": null,
    })
}

fn join_message(topic: &str, document_id: Uuid) -> Value {
    phoenix(
        topic,
        "phx_join",
        json!({
            "config": {
                "postgres_changes": [{
                    "event": "INSERT",
                    "schema": "public",
                    "table": NOTES_TABLE,
                    "filter": format!("document_id=eq.{}", document_id),
                }]
            }
        }),
    )
}

/// Extract the inserted row from a `postgres_changes` payload.
fn parse_insert(payload: &Value) -> Option<Note> {
    let data = payload.get("data")?;
    if data.get("type").and_then(Value::as_str) != Some("INSERT") {
        return None;
    }
    let record = data.get("record")?.clone();
    match serde_json::from_value::<Note>(record) {
        Ok(note) => Some(note),
        Err(e) => {
            tracing::warn!("dropping malformed note insert event: {}", e);
            None
        }
    }
}

/// Exponential backoff: base * 2^attempt, capped.
fn backoff_delay(config: &RealtimeConfig, attempt: u32) -> Duration {
    let base = Duration::from_millis(config.reconnect_base_ms);
    let cap = Duration::from_secs(config.reconnect_max_secs);
    let factor = 2u32.saturating_pow(attempt.min(16));
    base.saturating_mul(factor).min(cap)
}
