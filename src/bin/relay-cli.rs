use std::path::{Path, PathBuf};
use std::time::Duration;

use alloy::primitives::utils::format_units;
use alloy::primitives::U256;
use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

use wallet_relay::config::load_config;
use wallet_relay::rpc::{ChainClient, RpcError};

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Operator CLI for the wallet relay", long_about = None)]
struct Cli {
    /// Admin API base URL.
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    /// Admin API key.
    #[arg(short, long, default_value = "")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Exercise the failover transport against a chain's configured endpoints
    RpcCheck {
        #[arg(short, long, default_value = "relay.toml")]
        config: PathBuf,
        /// Chain name; defaults to the first configured chain
        #[arg(long)]
        chain: Option<String>,
    },
    /// Show relay status
    Status,
    /// Show endpoint pools and rotation start
    Endpoints,
    /// List balance monitors
    Monitors,
    /// Start monitoring an address
    Start {
        #[arg(long)]
        chain: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        user_id: Option<u64>,
    },
    /// Stop monitoring an address
    Stop {
        #[arg(long)]
        chain: String,
        #[arg(long)]
        address: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let client = reqwest::Client::new();
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );
    let base = cli.url.trim_end_matches('/');

    let request = match cli.command {
        Commands::RpcCheck { config, chain } => return rpc_check(&config, chain.as_deref()).await,
        Commands::Status => client.get(format!("{}/admin/status", base)),
        Commands::Endpoints => client.get(format!("{}/admin/endpoints", base)),
        Commands::Monitors => client.get(format!("{}/admin/monitors", base)),
        Commands::Start {
            chain,
            address,
            user_id,
        } => client
            .post(format!("{}/admin/monitors", base))
            .json(&json!({ "chain": chain, "address": address, "user_id": user_id })),
        Commands::Stop { chain, address } => {
            client.delete(format!("{}/admin/monitors/{}/{}", base, chain, address))
        }
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

/// Run a few reads through the failover transport and report each result.
async fn rpc_check(config: &Path, chain: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config)?;
    let chain_config = match chain {
        Some(name) => config
            .chain(name)
            .ok_or_else(|| format!("unknown chain '{}'", name))?,
        None => config.chains.first().ok_or("no chains configured")?,
    };

    let client = ChainClient::from_config(chain_config, Duration::from_millis(config.rpc.timeout_ms))?;
    println!("Chain: {}", client.name());
    for (i, endpoint) in client.pool().list().iter().enumerate() {
        println!("  [{}] {}", i, endpoint);
    }
    println!();

    report("eth_chainId", client.chain_id().await);
    report("eth_blockNumber", client.block_number().await);
    report(
        "eth_gasPrice",
        client
            .gas_price()
            .await
            .map(|wei| match format_units(U256::from(wei), "gwei") {
                Ok(gwei) => format!("{} gwei", gwei),
                Err(_) => format!("{} wei", wei),
            }),
    );
    report(
        "eth_getBlockByNumber",
        client
            .latest_block()
            .await
            .map(|b| format!("#{} {} (timestamp {})", b.number, b.hash, b.timestamp)),
    );

    // Every endpoint rejects an unknown method, so this shows the aggregated error.
    let invalid = client.transport().execute("eth_notARealMethod", json!([])).await;
    report("eth_notARealMethod", invalid);

    println!();
    println!("Rotation start is now endpoint [{}] {}", client.pool().start_index(), client.pool().current());
    Ok(())
}

fn report<T: std::fmt::Display>(label: &str, result: Result<T, RpcError>) {
    match result {
        Ok(value) => println!("ok    {:<22} {}", label, value),
        Err(RpcError::AllEndpointsFailed(e)) => {
            println!("FAIL  {:<22} {}", label, e);
            for failure in &e.failures {
                println!("        [{}] {}: {}", failure.index, failure.endpoint, failure.error);
            }
        }
        Err(e) => println!("FAIL  {:<22} {}", label, e),
    }
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    if status == reqwest::StatusCode::NO_CONTENT {
        println!("OK");
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
