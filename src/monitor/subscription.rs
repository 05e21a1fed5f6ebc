//! WebSocket new-head subscription.
//!
//! # Protocol
//! ```text
//! → {"id":1,"method":"eth_subscribe","params":["newHeads"]}
//! ← {"id":1,"result":"0xabc"}                                   (confirmation)
//! ← {"method":"eth_subscription","params":{"subscription":"0xabc","result":{...}}}
//! ```
//!
//! Pushes for other subscription ids and unparseable frames are skipped.

use std::time::Duration;

use alloy::primitives::{B256, U64};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

const SUBSCRIBE_ID: u64 = 1;
const UNSUBSCRIBE_ID: u64 = 2;
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Errors while opening or reading a subscription.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("subscription not confirmed within {0:?}")]
    Timeout(Duration),

    #[error("subscription rejected: {0}")]
    Rejected(String),

    #[error("connection closed before subscription was confirmed")]
    Closed,

    #[error("unexpected subscription response: {0}")]
    Protocol(String),
}

pub type SubscriptionResult<T> = Result<T, SubscriptionError>;

/// A new block header notification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewHead {
    pub number: Option<u64>,
    pub hash: Option<B256>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<NotificationParams>,
}

#[derive(Debug, Deserialize)]
struct NotificationParams {
    subscription: String,
    #[serde(default)]
    result: Value,
}

#[derive(Debug, Default, Deserialize)]
struct HeadFields {
    #[serde(default)]
    number: Option<U64>,
    #[serde(default)]
    hash: Option<B256>,
}

/// Parse a pushed frame; `None` unless it is a notification for `subscription_id`.
pub fn parse_notification(text: &str, subscription_id: &str) -> Option<NewHead> {
    let envelope: Envelope = match serde_json::from_str(text) {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring malformed subscription frame");
            return None;
        }
    };

    if envelope.method.as_deref() != Some("eth_subscription") {
        return None;
    }
    let params = envelope.params?;
    if params.subscription != subscription_id {
        tracing::debug!(subscription = %params.subscription, "Ignoring notification for another subscription");
        return None;
    }

    let fields: HeadFields = serde_json::from_value(params.result).unwrap_or_default();
    Some(NewHead {
        number: fields.number.map(|n| n.to::<u64>()),
        hash: fields.hash,
    })
}

/// An open `newHeads` subscription.
pub struct HeadSubscription {
    stream: WsStream,
    id: String,
}

impl HeadSubscription {
    /// Connect to `url` and subscribe to new heads.
    ///
    /// `timeout` bounds the connect and, separately, the confirmation.
    pub async fn open(url: &str, timeout: Duration) -> SubscriptionResult<Self> {
        let (mut stream, _) = tokio::time::timeout(timeout, connect_async(url))
            .await
            .map_err(|_| SubscriptionError::Timeout(timeout))??;

        let request = json!({
            "jsonrpc": "2.0",
            "id": SUBSCRIBE_ID,
            "method": "eth_subscribe",
            "params": ["newHeads"],
        });
        stream.send(Message::Text(request.to_string().into())).await?;

        let id = tokio::time::timeout(timeout, await_confirmation(&mut stream))
            .await
            .map_err(|_| SubscriptionError::Timeout(timeout))??;

        Ok(Self { stream, id })
    }

    /// Subscription id assigned by the node.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Next head for this subscription. `None` once the connection closes.
    pub async fn next_head(&mut self) -> Option<SubscriptionResult<NewHead>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(m) => m,
                Err(e) => return Some(Err(e.into())),
            };

            match message {
                Message::Text(text) => {
                    if let Some(head) = parse_notification(&text, &self.id) {
                        return Some(Ok(head));
                    }
                }
                Message::Close(frame) => {
                    tracing::debug!(frame = ?frame, "Node closed subscription connection");
                    return None;
                }
                _ => {}
            }
        }
    }

    /// Unsubscribe and close the connection, best effort.
    pub async fn close(mut self) {
        let request = json!({
            "jsonrpc": "2.0",
            "id": UNSUBSCRIBE_ID,
            "method": "eth_unsubscribe",
            "params": [self.id],
        });

        let shutdown = async {
            let _ = self.stream.send(Message::Text(request.to_string().into())).await;
            let _ = self.stream.close(None).await;
        };
        if tokio::time::timeout(CLOSE_TIMEOUT, shutdown).await.is_err() {
            tracing::debug!("Timed out closing subscription connection");
        }
    }
}

async fn await_confirmation(stream: &mut WsStream) -> SubscriptionResult<String> {
    while let Some(message) = stream.next().await {
        match message? {
            Message::Text(text) => {
                let Ok(value) = serde_json::from_str::<Value>(&text) else {
                    continue;
                };
                if value.get("id").and_then(Value::as_u64) != Some(SUBSCRIBE_ID) {
                    continue;
                }
                if let Some(error) = value.get("error") {
                    return Err(SubscriptionError::Rejected(error.to_string()));
                }
                return value
                    .get("result")
                    .and_then(Value::as_str)
                    .map(String::from)
                    .ok_or_else(|| SubscriptionError::Protocol(value.to_string()));
            }
            Message::Close(_) => return Err(SubscriptionError::Closed),
            _ => {}
        }
    }
    Err(SubscriptionError::Closed)
}
