//! Per-address balance monitor.
//!
//! Each running monitor owns two tasks: the connection task keeps the
//! `newHeads` subscription alive and forwards heads over a channel, and the
//! handler task re-reads the balance for each head, one at a time, in
//! arrival order.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use alloy::primitives::utils::format_ether;
use alloy::primitives::{Address, U256};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::bridge::BridgeHandle;
use crate::config::MonitorConfig;
use crate::monitor::policy::{parse_ether_amount, BridgePolicy, PolicyError};
use crate::monitor::state::{AtomicConnectionState, ConnectionState};
use crate::monitor::subscription::{HeadSubscription, NewHead};
use crate::monitor::tracker::{BalanceChange, BalanceTracker};
use crate::observability::metrics;
use crate::resilience::backoff::reconnect_delay;
use crate::rpc::{ChainClient, RpcError};

/// Monitor errors.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("unknown chain '{0}'")]
    UnknownChain(String),

    #[error("chain '{0}' has no WebSocket endpoint")]
    NoSubscriptionEndpoint(String),

    #[error("invalid monitor settings: {0}")]
    InvalidSettings(#[from] PolicyError),
}

pub type MonitorResult<T> = Result<T, MonitorError>;

/// Identity of a monitor: chain name (lowercase) and watched address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonitorKey {
    pub chain: String,
    pub address: Address,
}

impl MonitorKey {
    pub fn new(chain: &str, address: Address) -> Self {
        Self {
            chain: chain.trim().to_ascii_lowercase(),
            address,
        }
    }
}

impl std::fmt::Display for MonitorKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.chain, self.address)
    }
}

/// Parsed monitor behaviour shared by every monitor.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub reconnect_interval_ms: u64,
    pub reconnect_jitter_ms: u64,
    pub max_reconnect_attempts: u32,
    pub min_increase: U256,
    pub policy: BridgePolicy,
    /// Bound on WebSocket connect and on subscribe confirmation.
    pub subscribe_timeout: Duration,
}

impl MonitorSettings {
    pub fn from_config(config: &MonitorConfig, subscribe_timeout: Duration) -> MonitorResult<Self> {
        Ok(Self {
            reconnect_interval_ms: config.reconnect_interval_ms,
            reconnect_jitter_ms: config.reconnect_jitter_ms,
            max_reconnect_attempts: config.max_reconnect_attempts,
            min_increase: parse_ether_amount(&config.min_increase)?,
            policy: config.bridge_amount.parse()?,
            subscribe_timeout,
        })
    }
}

/// A chain's RPC client plus its optional subscription endpoint.
#[derive(Debug, Clone)]
pub struct ChainHandle {
    pub client: ChainClient,
    pub ws_url: Option<String>,
}

impl ChainHandle {
    pub fn new(client: ChainClient, ws_url: Option<String>) -> Self {
        Self { client, ws_url }
    }

    pub fn name(&self) -> &str {
        self.client.name()
    }
}

/// Point-in-time view of a monitor, as served by the admin API.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorSnapshot {
    pub chain: String,
    pub address: Address,
    pub user_id: u64,
    pub state: ConnectionState,
    /// Last known balance in ether.
    pub last_balance: String,
    pub reconnect_attempts: u32,
    pub subscription_id: Option<String>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Resolves once the stop flag is set or its sender is gone.
async fn stopped(stop: &mut watch::Receiver<bool>) {
    loop {
        if *stop.borrow_and_update() {
            return;
        }
        if stop.changed().await.is_err() {
            return;
        }
    }
}

struct Shared {
    key: MonitorKey,
    user_id: u64,
    client: ChainClient,
    ws_url: String,
    settings: MonitorSettings,
    bridge: BridgeHandle,
    state: AtomicConnectionState,
    attempts: AtomicU32,
    subscription_id: Mutex<Option<String>>,
    tracker: Mutex<BalanceTracker>,
}

impl Shared {
    fn set_state(&self, state: ConnectionState) {
        let previous = self.state.swap(state);
        if previous != state {
            tracing::debug!(monitor = %self.key, from = %previous, to = %state, "Monitor state changed");
        }
        metrics::record_monitor_state(&self.key.chain, &self.key.address.to_string(), state as u8);
    }

    fn on_subscribed(&self, id: &str) {
        *lock(&self.subscription_id) = Some(id.to_string());
        self.attempts.store(0, Ordering::Release);
        self.set_state(ConnectionState::Subscribed);
        tracing::info!(monitor = %self.key, subscription = %id, "Subscribed to new heads");
    }

    fn clear_subscription(&self) {
        lock(&self.subscription_id).take();
    }

    async fn on_head(&self, head: NewHead) {
        metrics::record_notification(&self.key.chain);

        let current = match self.client.balance(self.key.address).await {
            Ok(balance) => balance,
            Err(e) => {
                tracing::warn!(
                    monitor = %self.key,
                    block = ?head.number,
                    error = %e,
                    "Balance re-read failed, keeping last known balance"
                );
                return;
            }
        };

        let observation = lock(&self.tracker).observe(current);

        match observation.change {
            BalanceChange::Increase(delta) => tracing::info!(
                monitor = %self.key,
                block = ?head.number,
                previous = %format_ether(observation.previous),
                current = %format_ether(current),
                increase = %format_ether(delta),
                "Balance increased"
            ),
            BalanceChange::Decrease(delta) => tracing::debug!(
                monitor = %self.key,
                block = ?head.number,
                decrease = %format_ether(delta),
                "Balance decreased"
            ),
            BalanceChange::Unchanged => {}
        }

        if let Some(amount) = observation.bridge_amount {
            self.bridge.dispatch(&self.key.chain, amount, self.user_id);
        }
    }
}

struct RunHandle {
    stop_tx: watch::Sender<bool>,
    connection: JoinHandle<()>,
    handler: JoinHandle<()>,
}

impl RunHandle {
    fn is_running(&self) -> bool {
        !self.connection.is_finished()
    }

    async fn shutdown(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.connection.await;
        let _ = self.handler.await;
    }
}

/// Watches one address on one chain and bridges detected deposits.
pub struct BalanceMonitor {
    shared: Arc<Shared>,
    run: tokio::sync::Mutex<Option<RunHandle>>,
}

impl BalanceMonitor {
    pub fn new(
        key: MonitorKey,
        user_id: u64,
        chain: &ChainHandle,
        settings: MonitorSettings,
        bridge: BridgeHandle,
    ) -> MonitorResult<Self> {
        let ws_url = chain
            .ws_url
            .clone()
            .ok_or_else(|| MonitorError::NoSubscriptionEndpoint(key.chain.clone()))?;
        let tracker = BalanceTracker::new(U256::ZERO, settings.min_increase, settings.policy);

        Ok(Self {
            shared: Arc::new(Shared {
                key,
                user_id,
                client: chain.client.clone(),
                ws_url,
                settings,
                bridge,
                state: AtomicConnectionState::default(),
                attempts: AtomicU32::new(0),
                subscription_id: Mutex::new(None),
                tracker: Mutex::new(tracker),
            }),
            run: tokio::sync::Mutex::new(None),
        })
    }

    /// Seed the balance and begin watching. No-op while already running.
    ///
    /// A failed initial balance read is returned and the monitor stays
    /// disconnected. A monitor that gave up reconnecting can be started again.
    pub async fn start(&self) -> MonitorResult<()> {
        let mut run = self.run.lock().await;
        if run.as_ref().is_some_and(RunHandle::is_running) {
            tracing::debug!(monitor = %self.shared.key, "Monitor already running");
            return Ok(());
        }
        if let Some(finished) = run.take() {
            finished.shutdown().await;
        }

        let balance = self.shared.client.balance(self.shared.key.address).await?;
        lock(&self.shared.tracker).reset(balance);
        self.shared.attempts.store(0, Ordering::Release);

        tracing::info!(
            monitor = %self.shared.key,
            user_id = self.shared.user_id,
            balance = %format_ether(balance),
            threshold = %format_ether(self.shared.settings.min_increase),
            policy = %self.shared.settings.policy,
            "Starting balance monitor"
        );

        let (stop_tx, stop_rx) = watch::channel(false);
        let (head_tx, head_rx) = mpsc::unbounded_channel();

        self.shared.set_state(ConnectionState::Connecting);
        let connection = tokio::spawn(run_connection(self.shared.clone(), head_tx, stop_rx.clone()));
        let handler = tokio::spawn(run_handler(self.shared.clone(), head_rx, stop_rx));

        *run = Some(RunHandle {
            stop_tx,
            connection,
            handler,
        });
        Ok(())
    }

    /// Close the subscription, cancel any pending reconnect, and go
    /// `Disconnected`. Idempotent. Bridges already dispatched keep running.
    pub async fn stop(&self) {
        let handle = self.run.lock().await.take();
        if let Some(handle) = handle {
            handle.shutdown().await;
            tracing::info!(monitor = %self.shared.key, "Balance monitor stopped");
        }
        self.shared.clear_subscription();
        self.shared.set_state(ConnectionState::Disconnected);
    }

    pub fn key(&self) -> &MonitorKey {
        &self.shared.key
    }

    pub fn user_id(&self) -> u64 {
        self.shared.user_id
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state.load()
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.attempts.load(Ordering::Acquire)
    }

    pub fn subscription_id(&self) -> Option<String> {
        lock(&self.shared.subscription_id).clone()
    }

    pub fn last_balance(&self) -> U256 {
        lock(&self.shared.tracker).last_balance()
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        MonitorSnapshot {
            chain: self.shared.key.chain.clone(),
            address: self.shared.key.address,
            user_id: self.shared.user_id,
            state: self.state(),
            last_balance: format_ether(self.last_balance()),
            reconnect_attempts: self.reconnect_attempts(),
            subscription_id: self.subscription_id(),
        }
    }
}

impl std::fmt::Debug for BalanceMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BalanceMonitor")
            .field("key", &self.shared.key)
            .field("user_id", &self.shared.user_id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

async fn run_connection(
    shared: Arc<Shared>,
    heads: mpsc::UnboundedSender<NewHead>,
    mut stop: watch::Receiver<bool>,
) {
    let settings = &shared.settings;

    loop {
        shared.set_state(ConnectionState::Connecting);

        let opened = tokio::select! {
            _ = stopped(&mut stop) => return,
            result = HeadSubscription::open(&shared.ws_url, settings.subscribe_timeout) => result,
        };

        match opened {
            Ok(mut subscription) => {
                shared.on_subscribed(subscription.id());

                let stop_requested = loop {
                    let event = tokio::select! {
                        _ = stopped(&mut stop) => None,
                        next = subscription.next_head() => Some(next),
                    };
                    match event {
                        None => break true,
                        Some(Some(Ok(head))) => {
                            if heads.send(head).is_err() {
                                break true;
                            }
                        }
                        Some(Some(Err(e))) => {
                            tracing::warn!(monitor = %shared.key, error = %e, "Subscription read failed");
                            break false;
                        }
                        Some(None) => {
                            tracing::warn!(monitor = %shared.key, "Subscription connection closed");
                            break false;
                        }
                    }
                };

                shared.clear_subscription();
                if stop_requested {
                    subscription.close().await;
                    return;
                }
            }
            Err(e) => {
                tracing::warn!(monitor = %shared.key, url = %shared.ws_url, error = %e, "Subscription failed");
            }
        }

        shared.set_state(ConnectionState::Connecting);
        let attempts = shared.attempts.load(Ordering::Acquire);
        if attempts >= settings.max_reconnect_attempts {
            tracing::error!(
                monitor = %shared.key,
                attempts,
                "Reconnect attempts exhausted, monitor disconnected"
            );
            shared.set_state(ConnectionState::Disconnected);
            return;
        }

        let attempt = shared.attempts.fetch_add(1, Ordering::AcqRel) + 1;
        metrics::record_reconnect(&shared.key.chain);
        let delay = reconnect_delay(settings.reconnect_interval_ms, settings.reconnect_jitter_ms);
        tracing::info!(
            monitor = %shared.key,
            attempt,
            max = settings.max_reconnect_attempts,
            delay_ms = delay.as_millis() as u64,
            "Reconnecting"
        );

        tokio::select! {
            _ = stopped(&mut stop) => return,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

async fn run_handler(
    shared: Arc<Shared>,
    mut heads: mpsc::UnboundedReceiver<NewHead>,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        let head = tokio::select! {
            _ = stopped(&mut stop) => break,
            head = heads.recv() => match head {
                Some(head) => head,
                None => break,
            },
        };

        tokio::select! {
            _ = stopped(&mut stop) => break,
            _ = shared.on_head(head) => {}
        }
    }
}
