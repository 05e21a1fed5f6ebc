//! Wallet relay service.
//!
//! ```text
//!                 ┌───────────────────────────────────────────────────────┐
//!                 │                     WALLET RELAY                      │
//!                 │                                                       │
//!  WS node ───────┼─▶ subscription ──▶ monitor handler ──▶ bridge dispatch ┼──▶ bridge service
//!  (newHeads)     │                        │                              │
//!                 │                        ▼                              │
//!  HTTP nodes ◀───┼──────────── failover transport (A → B → C)            │
//!                 │                                                       │
//!  operator ──────┼─▶ admin API (status, endpoints, monitors)             │
//!                 └───────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use clap::Parser;
use tokio::net::TcpListener;

use wallet_relay::admin::{self, AdminState};
use wallet_relay::bridge::{
    BridgeHandle, BridgeTrigger, DryRunBridge, HttpBridgeTrigger, SigningCredential,
};
use wallet_relay::config::{load_config, RelayConfig};
use wallet_relay::lifecycle::{signals, Shutdown};
use wallet_relay::monitor::{ChainHandle, MonitorRegistry, MonitorSettings};
use wallet_relay::observability::{logging, metrics};
use wallet_relay::rpc::ChainClient;

#[derive(Parser)]
#[command(name = "wallet-relay")]
#[command(about = "Deposit monitor and cross-chain bridge relay", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "relay.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(&args.config)?;

    logging::init_logging(config.observability.log_format);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "wallet-relay starting");
    tracing::info!(
        path = %args.config.display(),
        chains = config.chains.len(),
        watch = config.watch.len(),
        bridge_enabled = config.bridge.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let timeout = Duration::from_millis(config.rpc.timeout_ms);
    let mut chains = Vec::with_capacity(config.chains.len());
    for chain in &config.chains {
        let client = ChainClient::from_config(chain, timeout)?;
        if let Some(expected) = chain.chain_id {
            if let Err(e) = client.verify_chain_id(expected).await {
                tracing::warn!(chain = %client.name(), expected, error = %e, "Chain ID check failed");
            }
        }
        chains.push(ChainHandle::new(client, chain.ws_url.clone()));
    }

    let bridge = build_bridge(&config)?;
    let settings = MonitorSettings::from_config(&config.monitor, timeout)?;
    let registry = Arc::new(MonitorRegistry::new(chains, settings, bridge));

    start_watches(&config, &registry).await;

    let shutdown = Shutdown::new();
    let stopped = shutdown.wait();

    let admin_task = if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        let state = AdminState::new(registry.clone(), &config.admin.api_key);
        Some(tokio::spawn(admin::serve(listener, state, shutdown.wait())))
    } else {
        None
    };

    tokio::spawn(signals::shutdown_on_signal(shutdown.clone()));
    stopped.await;
    tracing::info!("Shutting down");

    registry.stop_all().await;
    if let Some(task) = admin_task {
        match task.await {
            Ok(Err(e)) => tracing::error!(error = %e, "Admin API failed"),
            Err(e) => tracing::error!(error = %e, "Admin API task panicked"),
            Ok(Ok(())) => {}
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Load the signing credential and pick the bridge implementation.
///
/// The credential is mandatory only when bridging is enabled.
fn build_bridge(config: &RelayConfig) -> Result<BridgeHandle, Box<dyn std::error::Error>> {
    let credential = match SigningCredential::from_env(&config.bridge.private_key_env) {
        Ok(credential) => Some(Arc::new(credential)),
        Err(e) if config.bridge.enabled => return Err(e.into()),
        Err(e) => {
            tracing::warn!(error = %e, "No signing credential loaded");
            None
        }
    };

    let trigger: Arc<dyn BridgeTrigger> = if config.bridge.enabled {
        tracing::info!(
            api_url = %config.bridge.api_url,
            destination_chain = %config.bridge.destination_chain,
            "Bridge service enabled"
        );
        Arc::new(HttpBridgeTrigger::new(&config.bridge)?)
    } else {
        tracing::info!("Bridging disabled, triggers are logged only");
        Arc::new(DryRunBridge)
    };

    Ok(BridgeHandle::new(
        trigger,
        credential,
        config.bridge.destination_chain.clone(),
    ))
}

/// Start the monitors listed under `[[watch]]`. Failures are logged, not fatal.
async fn start_watches(config: &RelayConfig, registry: &MonitorRegistry) {
    for watch in &config.watch {
        let address = match &watch.address {
            Some(raw) => match raw.parse::<Address>() {
                Ok(address) => address,
                Err(e) => {
                    tracing::error!(chain = %watch.chain, address = %raw, error = %e, "Invalid watch address");
                    continue;
                }
            },
            None => match registry.default_address() {
                Some(address) => address,
                None => {
                    tracing::error!(chain = %watch.chain, "Watch entry has no address and no credential is loaded");
                    continue;
                }
            },
        };

        if let Err(e) = registry
            .start_monitoring(&watch.chain, address, watch.user_id)
            .await
        {
            tracing::error!(chain = %watch.chain, address = %address, error = %e, "Failed to start watch");
        }
    }
}
