//! Realtime change feed
//!
//! Connects to the backend's Phoenix-channel websocket and forwards
//! postgres_changes notifications for one filtered table.
//!
//! ## Lifecycle
//!
//! 1. Connect via WebSocket
//! 2. Send `phx_join` with the table filter
//! 3. Forward change events and send a heartbeat every 25 seconds
//! 4. On unsubscribe, send `phx_leave` and close the socket

mod message;

pub use message::{classify, Inbound, PhoenixMessage};

use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::error::RemoteError;
use super::{ChangeEvent, Subscription};

/// Interval between heartbeats
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// What to subscribe to
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Websocket URL including the api key
    pub url: String,
    pub schema: String,
    pub table: String,
    /// Realtime filter, e.g. `user_id=eq.abc`
    pub filter: String,
    /// User token, so the server applies row-level security
    pub access_token: Option<String>,
}

impl ChannelConfig {
    /// Channel topic for this table
    pub fn topic(&self) -> String {
        format!("realtime:{}:{}", self.schema, self.table)
    }
}

/// Monotonic message references
#[derive(Debug, Default)]
struct RefCounter(u64);

impl RefCounter {
    fn next(&mut self) -> String {
        self.0 += 1;
        self.0.to_string()
    }
}

/// Connect, join the channel and start forwarding events
///
/// Connection and join-send failures are returned directly; failures after
/// that end the feed (the returned subscription yields `None`).
pub async fn subscribe(config: ChannelConfig) -> Result<Subscription, RemoteError> {
    let topic = config.topic();
    debug!("Connecting realtime channel {}", topic);

    let (socket, _response) = connect_async(config.url.as_str()).await?;
    let (mut write, read) = socket.split();

    let mut refs = RefCounter::default();
    let join = PhoenixMessage::join(
        &topic,
        &config.schema,
        &config.table,
        &config.filter,
        config.access_token.as_deref(),
        &refs.next(),
    );
    write.send(Message::Text(join.encode()?)).await?;
    info!("Subscribed to {} ({})", topic, config.filter);

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (cancel_tx, cancel_rx) = oneshot::channel();

    tokio::spawn(run_channel(topic, refs, write, read, event_tx, cancel_rx));

    Ok(Subscription::new(event_rx, cancel_tx))
}

/// Socket loop: forwards changes until cancelled or the server goes away
async fn run_channel(
    topic: String,
    mut refs: RefCounter,
    mut write: SplitSink<Socket, Message>,
    mut read: SplitStream<Socket>,
    events: mpsc::UnboundedSender<ChangeEvent>,
    mut cancel: oneshot::Receiver<()>,
) {
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    // First tick completes immediately
    heartbeat.tick().await;

    loop {
        tokio::select! {
            _ = &mut cancel => {
                debug!("Leaving realtime channel {}", topic);
                if let Ok(text) = PhoenixMessage::leave(&topic, &refs.next()).encode() {
                    write.send(Message::Text(text)).await.ok();
                }
                write.close().await.ok();
                break;
            }
            _ = events.closed() => {
                write.close().await.ok();
                break;
            }
            _ = heartbeat.tick() => {
                let Ok(text) = PhoenixMessage::heartbeat(&refs.next()).encode() else {
                    continue;
                };
                if let Err(e) = write.send(Message::Text(text)).await {
                    warn!("Realtime heartbeat failed: {}", e);
                    break;
                }
            }
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if !handle_frame(&text, &events) {
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        write.send(Message::Pong(data)).await.ok();
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Realtime server closed channel {}", topic);
                        break;
                    }
                    Some(Err(e)) => {
                        warn!("Realtime connection error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }
        }
    }
}

/// Handle one text frame; returns false when the feed should stop
fn handle_frame(text: &str, events: &mpsc::UnboundedSender<ChangeEvent>) -> bool {
    let msg = match PhoenixMessage::decode(text) {
        Ok(m) => m,
        Err(e) => {
            warn!("Failed to decode realtime frame: {}", e);
            return true;
        }
    };

    match classify(&msg) {
        Ok(Inbound::Change(event)) => {
            debug!("Realtime {:?} for {}", event, event.id());
            events.send(event).is_ok()
        }
        Ok(Inbound::Ack { reference }) => {
            debug!("Realtime ack ref={:?}", reference);
            true
        }
        Ok(Inbound::Error(reason)) => {
            warn!("Realtime channel error: {}", reason);
            false
        }
        Ok(Inbound::Closed) => false,
        Ok(Inbound::Ignored) => true,
        Err(e) => {
            warn!("Malformed change notification on {}: {}", msg.topic, e);
            true
        }
    }
}
