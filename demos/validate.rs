use std::time::Duration;

use lnd_engine::{config::DEFAULT_RPC_PORT, Direction, EngineConfig, LndEngine, RetryPolicy};
use tracing_subscriber::EnvFilter;

/// Validate an LND node and optionally check channel liquidity toward a peer.
///
/// Usage: cargo run --example validate -- --tls-cert ~/.lnd/tls.cert \
///     [--host 127.0.0.1:10009] [--symbol BTC] [--macaroon admin.macaroon] \
///     [--peer <pubkey> --amount <sats> [--inbound]] [--budget-secs 60]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lnd_engine=info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let host =
        flag_value(&args, "--host").unwrap_or_else(|| format!("127.0.0.1:{DEFAULT_RPC_PORT}"));
    let symbol = flag_value(&args, "--symbol").unwrap_or_else(|| "BTC".to_string());
    let budget = flag_value(&args, "--budget-secs")
        .map(|v| v.parse::<u64>())
        .transpose()?
        .unwrap_or(60);

    let mut config = EngineConfig::new(host, symbol)
        .with_retry(RetryPolicy::default().with_max_elapsed(Duration::from_secs(budget)));
    if let Some(path) = flag_value(&args, "--tls-cert") {
        config = config.with_tls_cert(path);
    }
    if let Some(path) = flag_value(&args, "--macaroon") {
        config = config.with_macaroon(path);
    }

    let engine = LndEngine::new(config)?;
    let status = engine.validate().await?;
    println!("engine status: {status}");

    let info = engine.get_info().await?;
    println!(
        "node {} ({}) at height {}",
        info.alias, info.identity_pubkey, info.block_height
    );

    if let (Some(peer), Some(amount)) = (flag_value(&args, "--peer"), flag_value(&args, "--amount"))
    {
        let direction = if args.iter().any(|a| a == "--inbound") {
            Direction::Inbound
        } else {
            Direction::Outbound
        };
        let sufficient = engine
            .is_balance_sufficient(&peer, amount.parse()?, direction)
            .await?;
        println!("{direction} balance toward {peer} >= {amount}: {sufficient}");
    }
    Ok(())
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.windows(2)
        .find(|pair| pair[0] == flag)
        .map(|pair| pair[1].clone())
}
