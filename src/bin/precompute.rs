//! Batch precompute runner: classify a list of wallets and store the
//! results, so API reads hit a warm cache. Designed to run periodically
//! (e.g. from cron).

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use whalemind::classifier::BehaviorClassifier;
use whalemind::config::Config;
use whalemind::fetch::EtherscanClient;
use whalemind::precompute;

#[derive(Debug, Parser)]
#[command(
    name = "precompute",
    about = "Precompute wallet intelligence for a list of addresses"
)]
struct Args {
    /// Wallet addresses to analyze
    addresses: Vec<String>,

    /// Path to a file with one address per line
    #[arg(short, long)]
    file: Option<String>,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Suppress per-wallet progress output
    #[arg(short, long)]
    quiet: bool,
}

fn resolve_wallets(args: &Args) -> eyre::Result<Vec<String>> {
    if !args.addresses.is_empty() {
        return Ok(precompute::parse_wallet_list(&args.addresses.join(" ")));
    }
    if let Some(path) = &args.file {
        let wallets = precompute::load_wallets_from_file(path)?;
        if wallets.is_empty() {
            return Err(eyre::eyre!("No valid addresses in {}", path));
        }
        return Ok(wallets);
    }

    // Fall back to the WALLETS env, then wallets.txt next to the config
    let wallets = precompute::load_wallets_from_env();
    if !wallets.is_empty() {
        return Ok(wallets);
    }
    precompute::load_wallets_from_file("wallets.txt").or_else(|_| Ok(Vec::new()))
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let args = Args::parse();
    let config = Config::load(&args.config)?;

    let wallets = resolve_wallets(&args)?;
    if wallets.is_empty() {
        tracing::error!("No wallets to process. Provide addresses, --file, or set WALLETS env.");
        std::process::exit(1);
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .map_err(|e| eyre::eyre!("Failed to connect to database: {}", e))?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| eyre::eyre!("Failed to run migrations: {}", e))?;

    let classifier = BehaviorClassifier::new(config.classifier.clone());
    let client = EtherscanClient::new(config.etherscan.clone())?;

    let report = precompute::run(
        &pool,
        &classifier,
        &client,
        config.precompute.tx_limit,
        &wallets,
        args.quiet,
    )
    .await;

    tracing::info!(ok = report.ok, failed = report.failed, "Precompute done");
    if report.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
