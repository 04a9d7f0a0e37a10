// =============================================================================
// Command Line — scan, history, catalog, rules, serve
// =============================================================================

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{ensure, Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use crate::app_state::AppState;
use crate::catalog::{self, Selection, TickerRecord};
use crate::evaluator::{SetupLabel, SetupResult};
use crate::export;
use crate::history;
use crate::market_data::MarketDataProvider;
use crate::mcso_scan::{sort_mcso, McsoResult, McsoSort};
use crate::momentum::MomentumResult;
use crate::rules;
use crate::runtime_config::ScannerConfig;
use crate::scanner::{sort_by_value_desc, ScanReport, ScanRow, ScanSummary, Scanner};
use crate::types::{Direction, ScanMode};

#[derive(Parser)]
#[command(name = "setup-scanner")]
#[command(about = "Multi-timeframe technical setup scanner", long_about = None)]
pub struct Cli {
    /// Scanner configuration file
    #[arg(long, global = true, default_value = "scanner_config.json")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a set of tickers and print the results
    Scan(ScanArgs),
    /// Show score trends from saved scan history
    History {
        /// Number of days to look back
        #[arg(long, default_value_t = 7)]
        days: u32,
        /// Keep tickers whose latest setup is one of these labels
        /// (default: Potential and Watch, long and short)
        #[arg(long, value_delimiter = ',')]
        setup: Vec<SetupLabel>,
        /// Keep every ticker regardless of its latest setup
        #[arg(long, conflicts_with = "setup")]
        all_setups: bool,
    },
    /// List the ticker catalog
    Catalog,
    /// List the setup rules with their ids
    Rules,
    /// Write the default configuration to the --config path
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Start the dashboard API
    Serve,
}

#[derive(Args)]
pub struct ScanArgs {
    /// setup, momentum or mcso
    #[arg(long, default_value = "setup")]
    pub mode: ScanMode,
    /// Scan the whole catalog
    #[arg(long, conflicts_with_all = ["category", "symbols"])]
    pub all: bool,
    /// Catalog categories to scan (repeatable)
    #[arg(long)]
    pub category: Vec<String>,
    /// Comma-separated symbols to scan
    #[arg(long, value_delimiter = ',')]
    pub symbols: Vec<String>,
    /// Write results to CSV; without a path a timestamped name is used
    #[arg(long)]
    pub csv: Option<Option<PathBuf>>,
    /// Do not record setup scores to the history directory
    #[arg(long)]
    pub no_history: bool,
    /// Also list tickers labelled None
    #[arg(long)]
    pub include_none: bool,
    /// MCSO table order
    #[arg(long, default_value = "mcso_desc")]
    pub sort: McsoSort,
}

impl ScanArgs {
    /// Catalog categories first, then explicit symbols, without repeats.
    fn tickers(&self) -> Result<Vec<TickerRecord>> {
        if self.all {
            return Ok(catalog::resolve(&Selection::All));
        }
        let mut tickers = catalog::resolve(&Selection::Categories(self.category.clone()));
        for extra in catalog::resolve(&Selection::Symbols(self.symbols.clone())) {
            if !tickers.iter().any(|t| t.symbol == extra.symbol) {
                tickers.push(extra);
            }
        }
        ensure!(
            !tickers.is_empty(),
            "nothing to scan: pass --all, --category NAME or --symbols A,B (categories: {})",
            catalog::categories().join(", ")
        );
        Ok(tickers)
    }
}

// =============================================================================
// Commands
// =============================================================================

pub async fn run_scan(
    args: ScanArgs,
    config: ScannerConfig,
    provider: Arc<dyn MarketDataProvider>,
) -> Result<()> {
    let tickers = args.tickers()?;
    let history_dir = config.history_dir.clone();
    let scanner = Scanner::new(provider, config);

    let report = scanner
        .run(args.mode, &tickers, |p| {
            eprint!("\r[{}/{}] {:<14}", p.done, p.total, p.symbol);
            if p.done == p.total {
                eprintln!();
            }
        })
        .await;

    match &report {
        ScanReport::Setup(rows) => print_setup_table(rows, args.include_none),
        ScanReport::Momentum(rows) => print_momentum_table(rows),
        ScanReport::Mcso(rows) => print_mcso_table(rows, args.sort),
    }
    print_summary(&report.summary());

    if let Some(path) = args.csv {
        let path = path.unwrap_or_else(|| {
            PathBuf::from(export::default_file_name(args.mode, &Local::now()))
        });
        let rows = export::export_to_path(&report, &path)?;
        println!("Wrote {rows} rows to {}", path.display());
    }

    if let (ScanReport::Setup(rows), false) = (&report, args.no_history) {
        let today = Local::now().date_naive();
        match history::save_scan_history(&history_dir, today, rows) {
            Ok(true) => println!("Scores saved to {}", history::day_file(&history_dir, today).display()),
            Ok(false) => println!("No valid results, history not saved"),
            Err(e) => warn!(error = %format!("{e:#}"), "failed to save score history"),
        }
    }

    Ok(())
}

pub fn run_history(config: &ScannerConfig, days: u32, setups: &[SetupLabel]) -> Result<()> {
    let loaded = history::load_history(&config.history_dir, Local::now().date_naive(), days);
    if loaded.is_empty() {
        println!("No history in {} for the last {days} days", config.history_dir.display());
        return Ok(());
    }

    let dates: Vec<_> = loaded.iter().map(|d| d.date).collect();
    let rows = history::filter_by_latest_setup(history::build_trend_rows(&loaded), &loaded, setups);

    print!("{:<10} {:<24}", "Ticker", "Name");
    for d in &dates {
        print!(" {:>6}", d.format("%m-%d"));
    }
    println!("  Trend  Latest");
    for row in &rows {
        print!("{:<10} {:<24}", row.ticker, clip(&row.name, 24));
        for d in &dates {
            match row.points.get(d) {
                Some(p) => print!(" {:>6}", format!("{:+}", p.score)),
                None => print!(" {:>6}", "-"),
            }
        }
        let latest = row.latest_setup().map(|l| l.to_string()).unwrap_or_default();
        println!("  {:<5}  {latest}", row.trend);
    }

    let changes = history::price_changes(&rows, &dates);
    if !changes.is_empty() {
        println!();
        println!("{:<10} {:>12} {:>12} {:>10} {:>8}", "Ticker", "First", "Last", "Change", "%");
        for c in &changes {
            println!(
                "{:<10} {:>12.2} {:>12.2} {:>+10.2} {:>+7.2}%",
                c.ticker, c.first_price, c.last_price, c.change, c.change_pct
            );
        }
    }
    Ok(())
}

pub fn run_init_config(path: &Path, force: bool) -> Result<()> {
    ensure!(
        force || !path.exists(),
        "{} already exists (use --force to overwrite)",
        path.display()
    );
    ScannerConfig::default().save(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

pub fn run_catalog() {
    for category in catalog::all() {
        println!("{} ({})", category.name, category.tickers.len());
        for (symbol, name) in category.tickers {
            println!("  {symbol:<12} {name}");
        }
    }
}

/// One line per rule: tier, long and short ids, description.
fn rule_lines() -> Vec<String> {
    rules::RULES
        .iter()
        .map(|r| {
            format!(
                "{:<7} {:<22} {:<22} {}",
                r.tier.as_str(),
                r.id(Direction::Long),
                r.id(Direction::Short),
                r.description
            )
        })
        .collect()
}

pub fn run_rules() {
    for line in rule_lines() {
        println!("{line}");
    }
}

pub async fn run_serve(config: ScannerConfig, provider: Arc<dyn MarketDataProvider>) -> Result<()> {
    let bind_addr = config.bind_addr.clone();
    let token = std::env::var("SCANNER_API_TOKEN").ok();
    if token.as_deref().map_or(true, str::is_empty) {
        warn!("SCANNER_API_TOKEN is not set; the API is open to anyone who can reach it");
    }

    let state = Arc::new(AppState::new(Scanner::new(provider, config), token));
    let app = crate::api::rest::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server to {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");
    axum::serve(listener, app).await.context("API server failed")?;
    Ok(())
}

// =============================================================================
// Tables
// =============================================================================

fn clip(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

fn fmt_opt(v: Option<f64>, decimals: usize) -> String {
    v.map(|v| format!("{v:.decimals$}")).unwrap_or_else(|| "-".into())
}

fn print_setup_table(rows: &[SetupResult], include_none: bool) {
    let mut shown: Vec<&SetupResult> = rows
        .iter()
        .filter(|r| r.is_actionable() || (include_none && r.label == SetupLabel::None))
        .collect();
    shown.sort_by(|a, b| {
        let key = |r: &SetupResult| r.score.map(f64::from).unwrap_or(f64::NEG_INFINITY);
        key(b).total_cmp(&key(a))
    });

    println!(
        "{:<10} {:<24} {:<14} {:<16} {:>5} {:>12} {:>6} {:>6}  Rules",
        "Ticker", "Name", "Category", "Setup", "Score", "Price", "W:RSI", "D:RSI"
    );
    for r in shown {
        let score = r.score.map(|s| format!("{s:+}")).unwrap_or_else(|| "-".into());
        println!(
            "{:<10} {:<24} {:<14} {:<16} {:>5} {:>12} {:>6} {:>6}  {}",
            r.ticker,
            clip(&r.name, 24),
            clip(&r.category, 14),
            r.label.as_str(),
            score,
            fmt_opt(r.price, 2),
            fmt_opt(r.weekly.as_ref().map(|s| s.rsi), 1),
            fmt_opt(r.daily.as_ref().map(|s| s.rsi), 1),
            r.rules_met.join(", "),
        );
        if !r.red_flags.is_empty() {
            println!("{:>10} ⚠ {}", "", r.red_flags.join("; "));
        }
    }
}

fn print_momentum_table(rows: &[MomentumResult]) {
    let mut shown: Vec<MomentumResult> = rows.iter().filter(|r| r.is_actionable()).cloned().collect();
    sort_by_value_desc(&mut shown);

    println!(
        "{:<10} {:<24} {:<18} {:>8} {:>8} {:>5} {:>7} {:>12}",
        "Ticker", "Name", "Status", "D:RSI", "W:RSI", "EMA", "Score", "Price"
    );
    for r in &shown {
        let aligned = match r.ema_aligned {
            Some(true) => "yes",
            Some(false) => "no",
            None => "-",
        };
        println!(
            "{:<10} {:<24} {:<18} {:>8} {:>8} {:>5} {:>7} {:>12}",
            r.ticker,
            clip(&r.name, 24),
            r.label.as_str(),
            fmt_opt(r.daily_rsi, 1),
            fmt_opt(r.weekly_rsi, 1),
            aligned,
            fmt_opt(r.score, 1),
            fmt_opt(r.price, 2),
        );
    }
}

fn print_mcso_table(rows: &[McsoResult], order: McsoSort) {
    let mut shown: Vec<McsoResult> = rows.iter().filter(|r| r.is_actionable()).cloned().collect();
    sort_mcso(&mut shown, order);

    println!(
        "{:<14} {:<10} {:<24} {:>7} {:>12} {:>12} {:>12}  Status",
        "Category", "Ticker", "Name", "MCSO", "Current", "Low", "High"
    );
    for r in &shown {
        println!(
            "{:<14} {:<10} {:<24} {:>7} {:>12} {:>12} {:>12}  {}",
            clip(&r.category, 14),
            r.ticker,
            clip(&r.name, 24),
            fmt_opt(r.mcso, 2),
            fmt_opt(r.price, 2),
            fmt_opt(r.range_low, 2),
            fmt_opt(r.range_high, 2),
            r.status,
        );
    }
}

fn print_summary(s: &ScanSummary) {
    println!();
    println!(
        "{} scan: {} tickers, {} valid, {} errors | long {} ({:.1}%) | short {} ({:.1}%)",
        s.mode, s.total, s.valid, s.errors, s.long, s.long_pct, s.short, s.short_pct
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_scan_flags() {
        let cli = Cli::try_parse_from([
            "setup-scanner", "scan", "--mode", "mcso", "--symbols", "aapl,MSFT", "--csv",
        ])
        .unwrap();
        let Commands::Scan(args) = cli.command else {
            panic!("expected scan");
        };
        assert_eq!(args.mode, ScanMode::Mcso);
        assert_eq!(args.symbols, vec!["aapl", "MSFT"]);
        assert_eq!(args.csv, Some(None));
        assert_eq!(cli.config, PathBuf::from("scanner_config.json"));
    }

    #[test]
    fn scan_tickers_merge_categories_and_symbols() {
        let cli = Cli::try_parse_from([
            "setup-scanner", "scan", "--category", "forex", "--symbols", "ZZZZ",
        ])
        .unwrap();
        let Commands::Scan(args) = cli.command else {
            panic!("expected scan");
        };
        let tickers = args.tickers().unwrap();
        assert!(tickers.len() > 1);
        assert_eq!(tickers.last().map(|t| t.symbol.as_str()), Some("ZZZZ"));
        assert_eq!(tickers.last().map(|t| t.category.as_str()), Some(catalog::CUSTOM_CATEGORY));
    }

    #[test]
    fn rule_listing_covers_every_rule() {
        let lines = rule_lines();
        assert_eq!(lines.len(), rules::RULES.len());
        assert!(lines[0].starts_with("MUST"));
        assert!(lines[0].contains("W:RSI Bull") && lines[0].contains("W:RSI Bear"));
        assert!(lines[6].starts_with("ENTRY") && lines[6].contains("crossed the midline"));
    }

    #[test]
    fn empty_selection_is_an_error() {
        let cli = Cli::try_parse_from(["setup-scanner", "scan"]).unwrap();
        let Commands::Scan(args) = cli.command else {
            panic!("expected scan");
        };
        assert!(args.tickers().is_err());
    }

    #[test]
    fn history_setup_filter_parses_labels() {
        let cli = Cli::try_parse_from([
            "setup-scanner", "history", "--days", "3", "--setup", "Potential Long,Watch Short",
        ])
        .unwrap();
        let Commands::History { days, setup, .. } = cli.command else {
            panic!("expected history");
        };
        assert_eq!(days, 3);
        assert_eq!(setup, vec![SetupLabel::PotentialLong, SetupLabel::WatchShort]);

        let cli = Cli::try_parse_from(["setup-scanner", "history", "--all-setups"]).unwrap();
        assert!(matches!(cli.command, Commands::History { all_setups: true, .. }));
        assert!(Cli::try_parse_from([
            "setup-scanner", "history", "--all-setups", "--setup", "None",
        ])
        .is_err());
    }

    #[test]
    fn init_config_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scanner_config.json");
        run_init_config(&path, false).unwrap();
        assert!(run_init_config(&path, false).is_err());
        run_init_config(&path, true).unwrap();
        assert_eq!(ScannerConfig::load(&path).unwrap().mcso_window, 20);
    }

    #[test]
    fn clip_keeps_short_names() {
        assert_eq!(clip("Apple", 24), "Apple");
        assert_eq!(clip("abcdef", 4), "abc…");
    }
}
