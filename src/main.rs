//! Velvet casino API server binary.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use velvet::api::handlers::AppState;
use velvet::api::monitoring::MetricsRegistry;
use velvet::api::security::RateLimiter;
use velvet::api::ApiServer;
use velvet::chain::RpcChainClient;
use velvet::config::VelvetConfig;
use velvet::games::GameRegistry;
use velvet::ledger::BalanceLedger;
use velvet::reconcile::Reconciler;
use velvet::referral::ReferralProgram;
use velvet::storage::Storage;
use velvet::wager::WagerProcessor;

#[derive(Parser, Debug)]
#[command(name = "velvet-api", about = "Velvet casino wager and ledger service")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the storage data directory
    #[arg(long)]
    data_dir: Option<String>,

    /// Override the listen port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "velvet=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => VelvetConfig::load(path)?,
        None => VelvetConfig::default(),
    };
    if let Some(data_dir) = args.data_dir {
        config.storage.data_directory = data_dir;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate()?;

    let storage = Storage::open(&config.storage.data_directory, &config.storage)?;
    info!("Storage open at {}", config.storage.data_directory);

    let ledger = Arc::new(BalanceLedger::new(storage.clone()));
    let referrals = Arc::new(ReferralProgram::new(
        storage.clone(),
        Arc::clone(&ledger),
        config.referral.clone(),
    ));
    let chain = Arc::new(RpcChainClient::new(&config.chain)?);
    let reconciler = Reconciler::new(
        storage.clone(),
        Arc::clone(&ledger),
        chain,
        config.wager.clone(),
    );

    // Settle any withdrawal intents left behind by a crash before taking
    // traffic.
    match reconciler.reconcile().await {
        Ok(resolved) if resolved > 0 => info!("Reconciled {} stale withdrawal intents", resolved),
        Ok(_) => {}
        Err(e) => warn!("Startup reconciliation incomplete: {}", e),
    }

    let processor = WagerProcessor::new(
        storage.clone(),
        Arc::clone(&ledger),
        GameRegistry::new(),
        Arc::clone(&referrals),
        config.wager.clone(),
    );

    let state = Arc::new(AppState {
        processor,
        ledger,
        reconciler,
        referrals,
        metrics: Arc::new(MetricsRegistry::new()),
        limiter: Arc::new(RateLimiter::new(config.rate_limit.clone())),
        version: env!("CARGO_PKG_VERSION").to_string(),
    });

    ApiServer::new(config.server.clone(), state).run().await
}
