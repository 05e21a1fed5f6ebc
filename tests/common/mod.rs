//! Shared utilities for integration tests: mock JSON-RPC nodes, a mock
//! WebSocket node, and a mock bridge service, each on an ephemeral port.
#![allow(dead_code)]

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::U256;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;

/// Well-known development key (anvil account 0).
pub const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// A request received by a mock HTTP server.
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl MockRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

/// What a mock HTTP server does with a request.
#[derive(Debug, Clone)]
pub enum Reply {
    Json(u16, Value),
    Status(u16),
    /// Accept the request and never answer.
    Hang,
}

/// What a mock JSON-RPC node does with a call.
#[derive(Debug, Clone)]
pub enum RpcReply {
    Result(Value),
    Error(i64, &'static str),
    Status(u16),
    Hang,
}

/// Handle to a running mock HTTP server.
#[derive(Clone)]
pub struct MockServer {
    pub url: String,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<MockRequest>>>,
}

impl MockServer {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<MockRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// JSON-RPC methods received, in order.
    pub fn methods(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter_map(|r| r.json().get("method").and_then(Value::as_str).map(String::from))
            .collect()
    }
}

/// Start a programmable mock HTTP server. One request per connection.
pub async fn start_http<F>(handler: F) -> MockServer
where
    F: Fn(&MockRequest) -> Reply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = MockServer {
        url: format!("http://{}", addr),
        hits: Arc::new(AtomicUsize::new(0)),
        requests: Arc::new(Mutex::new(Vec::new())),
    };

    let handler = Arc::new(handler);
    let hits = server.hits.clone();
    let requests = server.requests.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let handler = handler.clone();
            let hits = hits.clone();
            let requests = requests.clone();
            tokio::spawn(async move {
                let Some(request) = read_request(&mut socket).await else {
                    return;
                };
                hits.fetch_add(1, Ordering::SeqCst);
                requests.lock().unwrap().push(request.clone());

                let (status, body) = match handler(&request) {
                    Reply::Json(status, body) => (status, body.to_string()),
                    Reply::Status(status) => (status, String::new()),
                    Reply::Hang => {
                        std::future::pending::<()>().await;
                        return;
                    }
                };
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason(status),
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    server
}

/// Start a mock JSON-RPC node. `handler` gets the method and params.
pub async fn start_rpc<F>(handler: F) -> MockServer
where
    F: Fn(&str, &Value) -> RpcReply + Send + Sync + 'static,
{
    start_http(move |request| {
        let call = request.json();
        let id = call.get("id").cloned().unwrap_or(Value::Null);
        let method = call.get("method").and_then(Value::as_str).unwrap_or_default();
        let params = call.get("params").cloned().unwrap_or(Value::Null);

        match handler(method, &params) {
            RpcReply::Result(result) => {
                Reply::Json(200, json!({"jsonrpc": "2.0", "id": id, "result": result}))
            }
            RpcReply::Error(code, message) => Reply::Json(
                200,
                json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message}}),
            ),
            RpcReply::Status(status) => Reply::Status(status),
            RpcReply::Hang => Reply::Hang,
        }
    })
    .await
}

/// A node that answers every call the same way.
pub async fn start_fixed_rpc(reply: RpcReply) -> MockServer {
    start_rpc(move |_, _| reply.clone()).await
}

/// Shared balance served by [`start_balance_rpc`].
#[derive(Clone, Default)]
pub struct Balance(Arc<Mutex<U256>>);

impl Balance {
    pub fn new(wei: U256) -> Self {
        Self(Arc::new(Mutex::new(wei)))
    }

    pub fn set(&self, wei: U256) {
        *self.0.lock().unwrap() = wei;
    }

    pub fn get(&self) -> U256 {
        *self.0.lock().unwrap()
    }
}

/// A node that serves `eth_getBalance` from `balance` and a fixed chain head.
pub async fn start_balance_rpc(balance: Balance) -> MockServer {
    start_rpc(move |method, _| match method {
        "eth_getBalance" => RpcReply::Result(json!(format!("0x{:x}", balance.get()))),
        "eth_blockNumber" => RpcReply::Result(json!("0x10")),
        "eth_chainId" => RpcReply::Result(json!("0xa869")),
        _ => RpcReply::Error(-32601, "method not found"),
    })
    .await
}

async fn read_request(socket: &mut TcpStream) -> Option<MockRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();
    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body_end = buf.len().min(header_end + content_length);
    Some(MockRequest {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&buf[header_end..body_end]).to_string(),
    })
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

#[derive(Debug, Clone, Copy)]
enum NodeCommand {
    Head(u64),
    Close,
}

/// Handle to a running mock WebSocket node.
pub struct MockNode {
    pub url: String,
    connections: Arc<AtomicUsize>,
    unsubscribes: Arc<AtomicUsize>,
    commands: broadcast::Sender<NodeCommand>,
}

impl MockNode {
    /// WebSocket connections accepted so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn unsubscribes(&self) -> usize {
        self.unsubscribes.load(Ordering::SeqCst)
    }

    /// Push a new head to every subscribed connection.
    pub fn push_head(&self, number: u64) {
        let _ = self.commands.send(NodeCommand::Head(number));
    }

    /// Close every open connection.
    pub fn close_all(&self) {
        let _ = self.commands.send(NodeCommand::Close);
    }
}

/// Start a mock node that confirms `eth_subscribe` with `subscription_id`.
pub async fn start_node(subscription_id: &'static str) -> MockNode {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (commands, _) = broadcast::channel(64);

    let node = MockNode {
        url: format!("ws://{}", addr),
        connections: Arc::new(AtomicUsize::new(0)),
        unsubscribes: Arc::new(AtomicUsize::new(0)),
        commands: commands.clone(),
    };
    let connections = node.connections.clone();
    let unsubscribes = node.unsubscribes.clone();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let mut rx = commands.subscribe();
            let unsubscribes = unsubscribes.clone();
            let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                continue;
            };
            connections.fetch_add(1, Ordering::SeqCst);

            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        command = rx.recv() => match command {
                            Ok(NodeCommand::Head(number)) => {
                                let push = json!({
                                    "jsonrpc": "2.0",
                                    "method": "eth_subscription",
                                    "params": {
                                        "subscription": subscription_id,
                                        "result": { "number": format!("{:#x}", number) },
                                    },
                                });
                                if ws.send(Message::Text(push.to_string().into())).await.is_err() {
                                    break;
                                }
                            }
                            Ok(NodeCommand::Close) | Err(_) => {
                                let _ = ws.close(None).await;
                                break;
                            }
                        },
                        message = ws.next() => {
                            let text = match message {
                                Some(Ok(Message::Text(text))) => text,
                                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                                Some(Ok(_)) => continue,
                            };
                            let call: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
                            let id = call.get("id").cloned().unwrap_or(Value::Null);
                            let reply = match call.get("method").and_then(Value::as_str) {
                                Some("eth_subscribe") => {
                                    json!({"jsonrpc": "2.0", "id": id, "result": subscription_id})
                                }
                                Some("eth_unsubscribe") => {
                                    unsubscribes.fetch_add(1, Ordering::SeqCst);
                                    json!({"jsonrpc": "2.0", "id": id, "result": true})
                                }
                                _ => continue,
                            };
                            if ws.send(Message::Text(reply.to_string().into())).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            });
        }
    });

    node
}

/// A local URL that refuses connections.
pub async fn refused_url(scheme: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("{}://{}", scheme, addr)
}

/// Poll `check` until it holds or `timeout` passes. Returns the final result.
pub async fn wait_until<F>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Run `future` with a test deadline.
pub async fn within<F: Future>(timeout: Duration, future: F) -> F::Output {
    tokio::time::timeout(timeout, future)
        .await
        .expect("test deadline exceeded")
}
