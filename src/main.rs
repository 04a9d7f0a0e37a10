// =============================================================================
// Setup Scanner — Main Entry Point
// =============================================================================
//
// Loads the configuration, builds the cached market data provider and
// dispatches to the CLI subcommand. `serve` runs the dashboard API until
// interrupted; every other command runs once and exits.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod catalog;
mod cli;
mod evaluator;
mod export;
mod history;
mod indicators;
mod market_data;
mod mcso_scan;
mod momentum;
mod rules;
mod runtime_config;
mod scanner;
mod snapshot;
mod types;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::evaluator::SetupLabel;
use crate::market_data::{CachedProvider, MarketDataProvider, YahooClient};
use crate::runtime_config::ScannerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & logging ─────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // ── 2. Configuration ─────────────────────────────────────────────────
    let mut config = if cli.config.exists() {
        ScannerConfig::load(&cli.config).unwrap_or_else(|e| {
            warn!(path = %cli.config.display(), error = %format!("{e:#}"), "failed to load config, using defaults");
            ScannerConfig::default()
        })
    } else {
        info!(path = %cli.config.display(), "no config file, using defaults");
        ScannerConfig::default()
    };
    config.apply_env();

    // ── 3. Market data provider ──────────────────────────────────────────
    let yahoo = YahooClient::new(config.provider_url.clone())?;
    let cache = Arc::new(CachedProvider::new(
        Arc::new(yahoo),
        Duration::from_secs(config.cache_ttl_secs),
    ));
    let provider: Arc<dyn MarketDataProvider> = cache.clone();

    // ── 4. Dispatch ──────────────────────────────────────────────────────
    match cli.command {
        Commands::Scan(args) => {
            cli::run_scan(args, config, provider).await?;
            let (hits, misses) = cache.stats();
            debug!(hits, misses, "provider cache");
            Ok(())
        }
        Commands::History {
            days,
            setup,
            all_setups,
        } => {
            let setups = if all_setups { SetupLabel::ALL.to_vec() } else { setup };
            cli::run_history(&config, days, &setups)
        }
        Commands::InitConfig { force } => cli::run_init_config(&cli.config, force),
        Commands::Catalog => {
            cli::run_catalog();
            Ok(())
        }
        Commands::Rules => {
            cli::run_rules();
            Ok(())
        }
        Commands::Serve => {
            info!(bind = %config.bind_addr, "starting dashboard API");
            cli::run_serve(config, provider).await
        }
    }
}
