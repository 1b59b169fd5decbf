//! WebSocket connection handler.
//!
//! Each connection owns a writer task draining an unbounded channel of
//! outbound frames. RPC responses and subscription pushes both go through
//! that channel, so a slow client never blocks a forwarder.

use crate::domain::{codes, ConnectionId, ResponseError, SubscriptionNotification};
use crate::domain::config::WebSocketConfig;
use crate::ports::{SinkClosed, SubscriptionSink};
use crate::rpc::{error_response, RpcModule, Session};
use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Upper bound on flushing queued frames after the connection ends.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Subscription sink writing JSON text frames to a connection.
pub struct WsSink {
    tx: mpsc::UnboundedSender<Message>,
}

impl WsSink {
    pub fn new(tx: mpsc::UnboundedSender<Message>) -> Self {
        Self { tx }
    }
}

impl SubscriptionSink for WsSink {
    fn send(&self, notification: SubscriptionNotification) -> Result<(), SinkClosed> {
        // An unencodable push ends the subscription instead of vanishing
        let text = serde_json::to_string(&notification).map_err(|e| {
            warn!(error = %e, "Failed to encode notification");
            SinkClosed
        })?;
        self.tx.send(Message::Text(text)).map_err(|_| SinkClosed)
    }
}

/// WebSocket connection handler
pub struct WebSocketHandler {
    module: Arc<RpcModule>,
    connection_id: ConnectionId,
    config: WebSocketConfig,
}

impl WebSocketHandler {
    pub fn new(module: Arc<RpcModule>, config: WebSocketConfig) -> Self {
        Self {
            module,
            connection_id: ConnectionId::new(),
            config,
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// A connection with open subscriptions is never idle.
    fn has_live_subscriptions(&self) -> bool {
        !self
            .module
            .context()
            .notifier
            .registry()
            .connection_subscriptions(&self.connection_id)
            .is_empty()
    }

    /// Check message size, returns error response if too large
    fn check_message_size(&self, size: usize) -> Option<String> {
        if size > self.config.max_message_size {
            warn!(
                connection_id = %self.connection_id,
                size = size,
                max = self.config.max_message_size,
                "Message exceeds size limit"
            );
            let error = ResponseError::new(
                codes::INVALID_REQUEST,
                format!(
                    "Message too large: {} bytes (max: {})",
                    size, self.config.max_message_size
                ),
            );
            Some(error_response(Value::Null, error).to_string())
        } else {
            None
        }
    }

    /// Serve a connection until the client leaves or goes idle.
    pub async fn handle(self, socket: WebSocket) {
        info!(connection_id = %self.connection_id, "New WebSocket connection");

        let (mut ws_tx, mut ws_rx) = socket.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();

        let mut writer = tokio::spawn(async move {
            while let Some(message) = out_rx.recv().await {
                if let Err(e) = ws_tx.send(message).await {
                    debug!(error = %e, "WebSocket write failed");
                    break;
                }
            }
        });

        let sink: Arc<dyn SubscriptionSink> = Arc::new(WsSink::new(out_tx.clone()));
        let session = Session::websocket(self.connection_id, sink);

        loop {
            let next = tokio::time::timeout(self.config.idle_timeout, ws_rx.next()).await;
            let message = match next {
                Err(_) if self.has_live_subscriptions() => continue,
                Err(_) => {
                    info!(connection_id = %self.connection_id, "Closing idle WebSocket connection");
                    let _ = out_tx.send(Message::Close(None));
                    break;
                }
                Ok(None) => break,
                Ok(Some(Err(e))) => {
                    warn!(connection_id = %self.connection_id, error = %e, "WebSocket error");
                    break;
                }
                Ok(Some(Ok(message))) => message,
            };

            let text = match message {
                Message::Text(text) => text,
                Message::Binary(data) => match String::from_utf8(data) {
                    Ok(text) => text,
                    Err(_) => {
                        let error = ResponseError::parse_error("binary frame is not UTF-8");
                        let frame = error_response(Value::Null, error).to_string();
                        if out_tx.send(Message::Text(frame)).is_err() {
                            break;
                        }
                        continue;
                    }
                },
                Message::Ping(data) => {
                    if out_tx.send(Message::Pong(data)).is_err() {
                        break;
                    }
                    continue;
                }
                Message::Pong(_) => continue,
                Message::Close(_) => {
                    debug!(connection_id = %self.connection_id, "WebSocket close received");
                    break;
                }
            };

            let response = match self.check_message_size(text.len()) {
                Some(error) => error,
                None => self.module.handle_text(&text, &session).await,
            };
            if out_tx.send(Message::Text(response)).is_err() {
                break;
            }
        }

        let closed = self
            .module
            .context()
            .notifier
            .remove_connection(&self.connection_id);

        // Cancelled records release their sinks; once the last sender is
        // gone the writer drains the queue and exits.
        drop(session);
        drop(out_tx);
        if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer)
            .await
            .is_err()
        {
            warn!(connection_id = %self.connection_id, "WebSocket writer did not drain in time");
            writer.abort();
        }

        info!(
            connection_id = %self.connection_id,
            subscriptions_closed = closed,
            "WebSocket connection closed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryChainState;
    use crate::domain::LimitsConfig;
    use shared_types::HeadTopic;

    fn handler(max_message_size: usize) -> WebSocketHandler {
        let chain = Arc::new(InMemoryChainState::with_genesis());
        let module = Arc::new(RpcModule::new(chain, LimitsConfig::default()));
        WebSocketHandler::new(
            module,
            WebSocketConfig {
                max_message_size,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_ws_sink_writes_text_frames() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = WsSink::new(tx);
        let notif = SubscriptionNotification::new(
            HeadTopic::NewHead,
            "0x1".into(),
            serde_json::json!({ "number": "0x0" }),
        );

        sink.send(notif).unwrap();
        let Message::Text(text) = rx.try_recv().unwrap() else {
            panic!("expected text frame");
        };
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["method"], "chain_newHead");
        assert_eq!(parsed["params"]["subscription"], "0x1");

        drop(rx);
        let notif = SubscriptionNotification::new(HeadTopic::NewHead, "0x1".into(), Value::Null);
        assert_eq!(sink.send(notif), Err(SinkClosed));
    }

    #[test]
    fn test_message_size_limit() {
        let handler = handler(16);
        assert!(handler.check_message_size(16).is_none());

        let error = handler.check_message_size(17).unwrap();
        let parsed: Value = serde_json::from_str(&error).unwrap();
        assert_eq!(parsed["error"]["code"], codes::INVALID_REQUEST);
        assert!(parsed["id"].is_null());
    }
}
