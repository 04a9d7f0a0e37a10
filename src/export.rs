// =============================================================================
// CSV Export — one file per finished scan
// =============================================================================

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone};
use tracing::info;

use crate::evaluator::SetupResult;
use crate::mcso_scan::McsoResult;
use crate::momentum::MomentumResult;
use crate::scanner::ScanReport;
use crate::snapshot::IndicatorSnapshot;
use crate::types::ScanMode;

const SETUP_HEADER: [&str; 13] = [
    "Ticker", "Name", "Category", "Setup", "Score", "Price", "W:RSI", "W:MACD", "D:RSI",
    "D:MACD", "M:RSI", "Rules Met", "Red Flags",
];

const MOMENTUM_HEADER: [&str; 9] = [
    "Ticker", "Name", "Category", "Status", "Daily RSI", "Weekly RSI", "EMA Aligned", "Score",
    "Price",
];

const MCSO_HEADER: [&str; 8] = [
    "Category", "Ticker", "Name", "MCSO", "Current", "Month Low", "Month High", "Status",
];

/// `<mode>_scan_<YYYYmmdd_HHMMSS>.csv`
pub fn default_file_name<Tz: TimeZone>(mode: ScanMode, at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{mode}_scan_{}.csv", at.format("%Y%m%d_%H%M%S"))
}

fn num(v: Option<f64>, decimals: usize) -> String {
    v.map(|v| format!("{v:.decimals$}")).unwrap_or_default()
}

fn rsi_cell(s: Option<&IndicatorSnapshot>) -> String {
    num(s.map(|s| s.rsi), 1)
}

fn macd_cell(s: Option<&IndicatorSnapshot>) -> String {
    s.map(|s| s.macd_state.short_label().to_string())
        .unwrap_or_default()
}

fn setup_record(r: &SetupResult) -> Vec<String> {
    vec![
        r.ticker.clone(),
        r.name.clone(),
        r.category.clone(),
        r.label.to_string(),
        r.score.map(|s| s.to_string()).unwrap_or_default(),
        num(r.price, 2),
        rsi_cell(r.weekly.as_ref()),
        macd_cell(r.weekly.as_ref()),
        rsi_cell(r.daily.as_ref()),
        macd_cell(r.daily.as_ref()),
        rsi_cell(r.monthly.as_ref()),
        r.rules_met.join("; "),
        r.red_flags.join("; "),
    ]
}

fn momentum_record(r: &MomentumResult) -> Vec<String> {
    vec![
        r.ticker.clone(),
        r.name.clone(),
        r.category.clone(),
        r.label.to_string(),
        num(r.daily_rsi, 1),
        num(r.weekly_rsi, 1),
        r.ema_aligned
            .map(|a| if a { "Yes" } else { "No" }.to_string())
            .unwrap_or_default(),
        num(r.score, 1),
        num(r.price, 2),
    ]
}

fn mcso_record(r: &McsoResult) -> Vec<String> {
    vec![
        r.category.clone(),
        r.ticker.clone(),
        r.name.clone(),
        num(r.mcso, 2),
        num(r.price, 2),
        num(r.range_low, 2),
        num(r.range_high, 2),
        r.status.to_string(),
    ]
}

/// Write every row of `report` as CSV. Returns the number of data rows.
pub fn write_report<W: Write>(report: &ScanReport, out: W) -> Result<usize> {
    let mut writer = csv::Writer::from_writer(out);

    let rows = match report {
        ScanReport::Setup(rows) => {
            writer.write_record(SETUP_HEADER)?;
            for r in rows {
                writer.write_record(setup_record(r))?;
            }
            rows.len()
        }
        ScanReport::Momentum(rows) => {
            writer.write_record(MOMENTUM_HEADER)?;
            for r in rows {
                writer.write_record(momentum_record(r))?;
            }
            rows.len()
        }
        ScanReport::Mcso(rows) => {
            writer.write_record(MCSO_HEADER)?;
            for r in rows {
                writer.write_record(mcso_record(r))?;
            }
            rows.len()
        }
    };

    writer.flush().context("failed to flush CSV writer")?;
    Ok(rows)
}

/// CSV text of `report`, for HTTP downloads.
pub fn to_csv_string(report: &ScanReport) -> Result<String> {
    let mut buf = Vec::new();
    write_report(report, &mut buf)?;
    String::from_utf8(buf).context("CSV output is not valid UTF-8")
}

/// Write `report` to `path`, creating parent directories as needed.
pub fn export_to_path(report: &ScanReport, path: &Path) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let rows = write_report(report, file)
        .with_context(|| format!("failed to write CSV to {}", path.display()))?;

    info!(path = %path.display(), rows, mode = %report.mode(), "scan exported");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TickerRecord;
    use crate::evaluator::SetupLabel;
    use crate::mcso_scan::McsoStatus;
    use chrono::Utc;

    fn t(symbol: &str) -> TickerRecord {
        TickerRecord {
            symbol: symbol.into(),
            name: format!("{symbol}, Inc"),
            category: "US STOCKS".into(),
        }
    }

    #[test]
    fn file_name_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(default_file_name(ScanMode::Setup, &at), "setup_scan_20240309_140507.csv");
        assert_eq!(default_file_name(ScanMode::Mcso, &at), "mcso_scan_20240309_140507.csv");
    }

    #[test]
    fn setup_csv_has_header_and_blank_score_for_errors() {
        let ok = SetupResult {
            score: Some(5),
            price: Some(123.456),
            rules_met: vec!["W:RSI Bull".into(), "D:MACD Bull".into()],
            error: None,
            ..SetupResult::failed(&t("AAPL"), SetupLabel::PotentialLong, "")
        };
        let bad = SetupResult::failed(&t("ZZZ"), SetupLabel::DataError, "short");
        let csv = to_csv_string(&ScanReport::Setup(vec![ok, bad])).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Ticker,Name,Category,Setup,Score,Price,W:RSI"));
        assert_eq!(
            lines[1],
            "AAPL,\"AAPL, Inc\",US STOCKS,Potential Long,5,123.46,,,,,,W:RSI Bull; D:MACD Bull,"
        );
        assert!(lines[2].starts_with("ZZZ,\"ZZZ, Inc\",US STOCKS,Data Error,,"));
    }

    #[test]
    fn mcso_csv_columns() {
        let row = McsoResult {
            status: McsoStatus::Bullish,
            mcso: Some(75.0),
            price: Some(10.0),
            range_low: Some(7.0),
            range_high: Some(11.0),
            error: None,
            ..McsoResult::failed(&t("GC=F"), McsoStatus::DataError, "")
        };
        let csv = to_csv_string(&ScanReport::Mcso(vec![row])).unwrap();
        let second = csv.lines().nth(1).unwrap();
        assert_eq!(second, "US STOCKS,GC=F,\"GC=F, Inc\",75.00,10.00,7.00,11.00,BULLISH");
    }

    #[test]
    fn export_creates_file_and_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("momentum_scan.csv");
        let report = ScanReport::Momentum(Vec::new());
        assert_eq!(export_to_path(&report, &path).unwrap(), 0);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Ticker,Name,Category,Status,Daily RSI"));
    }
}
