//! Balance monitor and registry against a mock node pair (HTTP + WebSocket).

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::utils::parse_ether;
use alloy::primitives::{Address, U256};
use futures_util::future::BoxFuture;
use serde_json::json;

use common::{
    refused_url, start_balance_rpc, start_node, start_rpc, wait_until, Balance, RpcReply, DEV_KEY,
};
use wallet_relay::bridge::{
    BridgeHandle, BridgeReceipt, BridgeRequest, BridgeResult, BridgeTrigger, SigningCredential,
};
use wallet_relay::config::ChainConfig;
use wallet_relay::monitor::{
    BridgePolicy, ChainHandle, ConnectionState, MonitorRegistry, MonitorSettings,
};
use wallet_relay::rpc::ChainClient;

const CHAIN: &str = "avalanche-fuji";
const WAIT: Duration = Duration::from_secs(5);

/// Records every bridge request instead of sending it.
#[derive(Default)]
struct RecordingBridge {
    requests: Mutex<Vec<(String, U256, u64)>>,
}

impl RecordingBridge {
    fn amounts(&self) -> Vec<U256> {
        self.requests.lock().unwrap().iter().map(|r| r.1).collect()
    }
}

impl BridgeTrigger for RecordingBridge {
    fn bridge(&self, request: BridgeRequest) -> BoxFuture<'_, BridgeResult<BridgeReceipt>> {
        Box::pin(async move {
            self.requests
                .lock()
                .unwrap()
                .push((request.source_chain.clone(), request.amount, request.user_id));
            Ok(BridgeReceipt {
                transfer_id: "test".into(),
                source_tx: None,
                destination_tx: None,
            })
        })
    }
}

fn ether(s: &str) -> U256 {
    parse_ether(s).unwrap()
}

fn settings(policy: &str, max_reconnect_attempts: u32) -> MonitorSettings {
    MonitorSettings {
        reconnect_interval_ms: 20,
        reconnect_jitter_ms: 0,
        max_reconnect_attempts,
        min_increase: ether("0.01"),
        policy: policy.parse::<BridgePolicy>().unwrap(),
        subscribe_timeout: Duration::from_secs(2),
    }
}

fn registry(
    rpc_url: &str,
    ws_url: &str,
    settings: MonitorSettings,
    bridge: Arc<RecordingBridge>,
) -> MonitorRegistry {
    let config = ChainConfig {
        name: CHAIN.into(),
        chain_id: None,
        endpoints: vec![rpc_url.to_string()],
        ws_url: Some(ws_url.to_string()),
    };
    let client = ChainClient::from_config(&config, Duration::from_secs(2)).unwrap();
    let credential = Arc::new(SigningCredential::from_private_key(DEV_KEY).unwrap());

    MonitorRegistry::new(
        [ChainHandle::new(client, config.ws_url)],
        settings,
        BridgeHandle::new(bridge, Some(credential), "monad-testnet"),
    )
}

fn watched() -> Address {
    "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".parse().unwrap()
}

#[tokio::test]
async fn test_deposit_triggers_percentage_bridge() {
    let balance = Balance::new(ether("1"));
    let rpc = start_balance_rpc(balance.clone()).await;
    let node = start_node("0xfeed").await;
    let bridge = Arc::new(RecordingBridge::default());
    let registry = registry(&rpc.url, &node.url, settings("50%", 3), bridge.clone());

    let monitor = registry.start_monitoring(CHAIN, watched(), 7).await.unwrap();
    assert_eq!(monitor.last_balance(), ether("1"));
    assert!(wait_until(WAIT, || monitor.state() == ConnectionState::Subscribed).await);
    assert_eq!(monitor.subscription_id().as_deref(), Some("0xfeed"));

    balance.set(ether("3"));
    node.push_head(1);
    assert!(wait_until(WAIT, || bridge.amounts().len() == 1).await);
    assert_eq!(bridge.amounts(), vec![ether("1")]);
    assert_eq!(
        bridge.requests.lock().unwrap()[0],
        (CHAIN.to_string(), ether("1"), 7)
    );
    assert_eq!(monitor.last_balance(), ether("3"));

    registry.stop_all().await;
}

#[tokio::test]
async fn test_decrease_and_threshold_do_not_trigger() {
    let balance = Balance::new(ether("2"));
    let rpc = start_balance_rpc(balance.clone()).await;
    let node = start_node("0x1").await;
    let bridge = Arc::new(RecordingBridge::default());
    let registry = registry(&rpc.url, &node.url, settings("100%", 3), bridge.clone());

    let monitor = registry.start_monitoring(CHAIN, watched(), 1).await.unwrap();
    assert!(wait_until(WAIT, || monitor.state() == ConnectionState::Subscribed).await);

    // Withdrawal: no trigger, balance still tracked.
    balance.set(ether("1.5"));
    node.push_head(1);
    assert!(wait_until(WAIT, || monitor.last_balance() == ether("1.5")).await);

    // Increase exactly equal to the threshold.
    balance.set(ether("1.51"));
    node.push_head(2);
    assert!(wait_until(WAIT, || monitor.last_balance() == ether("1.51")).await);

    // Just above the threshold, measured from the lowered balance.
    balance.set(ether("1.520000000000000001"));
    node.push_head(3);
    assert!(wait_until(WAIT, || bridge.amounts().len() == 1).await);
    assert_eq!(bridge.amounts(), vec![ether("0.010000000000000001")]);

    registry.stop_all().await;
}

#[tokio::test]
async fn test_failed_balance_read_keeps_last_balance() {
    let balance = Balance::new(ether("1"));
    let outage = Arc::new(AtomicUsize::new(0));
    let served_errors = Arc::new(AtomicUsize::new(0));
    let rpc = {
        let (balance, outage, served_errors) = (balance.clone(), outage.clone(), served_errors.clone());
        start_rpc(move |method, _| match method {
            "eth_getBalance" if outage.load(Ordering::SeqCst) > 0 => {
                outage.fetch_sub(1, Ordering::SeqCst);
                served_errors.fetch_add(1, Ordering::SeqCst);
                RpcReply::Status(503)
            }
            "eth_getBalance" => RpcReply::Result(json!(format!("0x{:x}", balance.get()))),
            _ => RpcReply::Error(-32601, "method not found"),
        })
        .await
    };
    let node = start_node("0x4").await;
    let bridge = Arc::new(RecordingBridge::default());
    let registry = registry(&rpc.url, &node.url, settings("100%", 3), bridge.clone());

    let monitor = registry.start_monitoring(CHAIN, watched(), 1).await.unwrap();
    assert!(wait_until(WAIT, || monitor.state() == ConnectionState::Subscribed).await);

    // The read for this head fails; the deposit is not seen yet.
    balance.set(ether("2"));
    outage.store(1, Ordering::SeqCst);
    node.push_head(1);
    assert!(wait_until(WAIT, || served_errors.load(Ordering::SeqCst) == 1).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(monitor.last_balance(), ether("1"));
    assert_eq!(monitor.state(), ConnectionState::Subscribed);
    assert!(bridge.amounts().is_empty());

    // The next head measures the increase from the last good read.
    node.push_head(2);
    assert!(wait_until(WAIT, || bridge.amounts().len() == 1).await);
    assert_eq!(bridge.amounts(), vec![ether("1")]);
    assert_eq!(monitor.last_balance(), ether("2"));
    assert_eq!(node.connections(), 1);

    registry.stop_all().await;
}

#[tokio::test]
async fn test_reconnect_attempts_are_bounded() {
    let rpc = start_balance_rpc(Balance::new(ether("1"))).await;
    let ws = refused_url("ws").await;
    let bridge = Arc::new(RecordingBridge::default());
    let registry = registry(&rpc.url, &ws, settings("100%", 3), bridge);

    let monitor = registry.start_monitoring(CHAIN, watched(), 1).await.unwrap();
    assert!(wait_until(WAIT, || monitor.state() == ConnectionState::Disconnected).await);
    assert_eq!(monitor.reconnect_attempts(), 3);

    // Terminal: nothing more happens without an explicit start.
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(monitor.state(), ConnectionState::Disconnected);
    assert_eq!(monitor.reconnect_attempts(), 3);

    // Still registered, and start() begins a fresh cycle.
    assert!(registry.get(CHAIN, watched()).is_some());
    monitor.start().await.unwrap();
    assert_ne!(monitor.state(), ConnectionState::Subscribed);
    monitor.stop().await;
    assert_eq!(monitor.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_resubscribes_after_node_closes() {
    let rpc = start_balance_rpc(Balance::new(ether("1"))).await;
    let node = start_node("0xabc").await;
    let bridge = Arc::new(RecordingBridge::default());
    let registry = registry(&rpc.url, &node.url, settings("100%", 5), bridge);

    let monitor = registry.start_monitoring(CHAIN, watched(), 1).await.unwrap();
    assert!(wait_until(WAIT, || monitor.state() == ConnectionState::Subscribed).await);

    node.close_all();
    assert!(wait_until(WAIT, || node.connections() == 2).await);
    assert!(wait_until(WAIT, || monitor.state() == ConnectionState::Subscribed).await);
    assert_eq!(monitor.reconnect_attempts(), 0);

    registry.stop_all().await;
}

#[tokio::test]
async fn test_concurrent_start_yields_one_monitor() {
    let rpc = start_balance_rpc(Balance::new(ether("1"))).await;
    let node = start_node("0x2").await;
    let bridge = Arc::new(RecordingBridge::default());
    let registry = registry(&rpc.url, &node.url, settings("100%", 3), bridge);

    let (a, b) = tokio::join!(
        registry.start_monitoring(CHAIN, watched(), 1),
        registry.start_monitoring("AVALANCHE-FUJI", watched(), 1),
    );
    let (a, b) = (a.unwrap(), b.unwrap());
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(registry.len(), 1);

    assert!(wait_until(WAIT, || a.state() == ConnectionState::Subscribed).await);
    let again = registry.start_monitoring(CHAIN, watched(), 1).await.unwrap();
    assert!(Arc::ptr_eq(&a, &again));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(node.connections(), 1);

    registry.stop_all().await;
}

#[tokio::test]
async fn test_stop_is_idempotent_and_unsubscribes() {
    let rpc = start_balance_rpc(Balance::new(ether("1"))).await;
    let node = start_node("0x3").await;
    let bridge = Arc::new(RecordingBridge::default());
    let registry = registry(&rpc.url, &node.url, settings("100%", 3), bridge);

    let monitor = registry.start_monitoring(CHAIN, watched(), 1).await.unwrap();
    assert!(wait_until(WAIT, || monitor.state() == ConnectionState::Subscribed).await);

    assert!(registry.stop_monitoring(CHAIN, watched()).await);
    assert_eq!(monitor.state(), ConnectionState::Disconnected);
    assert!(monitor.subscription_id().is_none());
    assert!(wait_until(WAIT, || node.unsubscribes() == 1).await);

    assert!(!registry.stop_monitoring(CHAIN, watched()).await);
    monitor.stop().await;
    assert_eq!(monitor.state(), ConnectionState::Disconnected);
    assert!(registry.is_empty());
}
