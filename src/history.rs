// =============================================================================
// Score History — one JSON file per scan day
// =============================================================================
//
// Layout: `<dir>/scores_<YYYY-MM-DD>.json`
//   { "date": "2024-03-09",
//     "tickers": { "AAPL": { "name": ..., "setup": ..., "score": 5, "price": 1.0 } } }
//
// A second scan on the same day overwrites that day's file. Only valid rows
// are recorded.
// =============================================================================

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::evaluator::{SetupLabel, SetupResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub name: String,
    pub setup: SetupLabel,
    pub score: i32,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryDay {
    pub date: NaiveDate,
    pub tickers: BTreeMap<String, HistoryEntry>,
}

pub fn day_file(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("scores_{}.json", date.format("%Y-%m-%d")))
}

/// Record the valid rows of a setup scan for `date`.
///
/// Returns `false` (and writes nothing) when no row is valid.
pub fn save_scan_history(dir: &Path, date: NaiveDate, results: &[SetupResult]) -> Result<bool> {
    let tickers: BTreeMap<String, HistoryEntry> = results
        .iter()
        .filter(|r| r.label.is_valid())
        .map(|r| {
            let entry = HistoryEntry {
                name: r.name.clone(),
                setup: r.label,
                score: r.score.unwrap_or(0),
                price: r.price,
            };
            (r.ticker.clone(), entry)
        })
        .collect();

    if tickers.is_empty() {
        debug!("no valid rows, history not written");
        return Ok(false);
    }

    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create history dir {}", dir.display()))?;

    let count = tickers.len();
    let day = HistoryDay { date, tickers };
    let path = day_file(dir, date);
    let tmp = path.with_extension("json.tmp");
    let content = serde_json::to_string_pretty(&day).context("failed to serialise history")?;
    std::fs::write(&tmp, content)
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, &path)
        .with_context(|| format!("failed to rename into {}", path.display()))?;

    info!(path = %path.display(), tickers = count, "score history saved");
    Ok(true)
}

/// Days from `today - days_back + 1` through `today` that have a readable
/// file, oldest first.
pub fn load_history(dir: &Path, today: NaiveDate, days_back: u32) -> Vec<HistoryDay> {
    let mut days = Vec::new();

    for back in (0..days_back.max(1)).rev() {
        let Some(date) = today.checked_sub_days(Days::new(u64::from(back))) else {
            continue;
        };
        let path = day_file(dir, date);
        if !path.exists() {
            continue;
        }

        let parsed = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))
            .and_then(|raw| {
                serde_json::from_str::<HistoryDay>(&raw)
                    .with_context(|| format!("failed to parse {}", path.display()))
            });

        match parsed {
            Ok(day) => days.push(day),
            Err(e) => warn!(error = %format!("{e:#}"), "skipping history file"),
        }
    }

    days
}

// =============================================================================
// Trend view
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub score: i32,
    pub setup: SetupLabel,
    pub price: Option<f64>,
}

/// One ticker across the loaded days.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendRow {
    pub ticker: String,
    pub name: String,
    pub points: BTreeMap<NaiveDate, TrendPoint>,
    pub trend: &'static str,
}

impl TrendRow {
    /// Setup on the most recent day the ticker appears.
    pub fn latest_setup(&self) -> Option<SetupLabel> {
        self.points.values().next_back().map(|p| p.setup)
    }

    fn scores(&self) -> Vec<i32> {
        self.points.values().map(|p| p.score).collect()
    }
}

/// Arrow for a score sequence, oldest first.
pub fn trend_arrow(scores: &[i32]) -> &'static str {
    let (Some(&first), Some(&last)) = (scores.first(), scores.last()) else {
        return "—";
    };
    if scores.len() < 2 {
        return "—";
    }

    let delta = f64::from(last - first);
    if delta.abs() < 0.5 {
        "→"
    } else if delta > 0.0 {
        if last > 0 { "↑↑" } else { "↑" }
    } else if last < 0 {
        "↓↓"
    } else {
        "↓"
    }
}

/// Pivot the loaded days into one row per ticker, sorted by symbol.
pub fn build_trend_rows(history: &[HistoryDay]) -> Vec<TrendRow> {
    let mut rows: BTreeMap<&str, TrendRow> = BTreeMap::new();

    for day in history {
        for (ticker, entry) in &day.tickers {
            let row = rows.entry(ticker.as_str()).or_insert_with(|| TrendRow {
                ticker: ticker.clone(),
                name: entry.name.clone(),
                points: BTreeMap::new(),
                trend: "—",
            });
            // Days arrive oldest first, so the last write is the newest name.
            row.name = entry.name.clone();
            row.points.insert(
                day.date,
                TrendPoint {
                    score: entry.score,
                    setup: entry.setup,
                    price: entry.price,
                },
            );
        }
    }

    rows.into_values()
        .map(|mut row| {
            row.trend = trend_arrow(&row.scores());
            row
        })
        .collect()
}

/// Latest-day setups shown when the caller names none.
pub const DEFAULT_SETUP_FILTER: [SetupLabel; 4] = [
    SetupLabel::PotentialLong,
    SetupLabel::WatchLong,
    SetupLabel::PotentialShort,
    SetupLabel::WatchShort,
];

/// Keep rows whose setup on the latest loaded date is one of `setups`.
/// An empty filter means [`DEFAULT_SETUP_FILTER`]; pass `SetupLabel::ALL`
/// to keep every row seen on that date.
pub fn filter_by_latest_setup(
    rows: Vec<TrendRow>,
    history: &[HistoryDay],
    setups: &[SetupLabel],
) -> Vec<TrendRow> {
    let setups: &[SetupLabel] = if setups.is_empty() {
        &DEFAULT_SETUP_FILTER
    } else {
        setups
    };
    let Some(latest) = history.last().map(|d| d.date) else {
        return Vec::new();
    };
    rows.into_iter()
        .filter(|r| {
            r.points
                .get(&latest)
                .is_some_and(|p| setups.contains(&p.setup))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceChange {
    pub ticker: String,
    pub name: String,
    pub first_price: f64,
    pub last_price: f64,
    pub change: f64,
    pub change_pct: f64,
}

/// Price move from the first to the last of `dates`, sorted by percent
/// change descending. Rows without a price on both of those dates are left
/// out, as is everything when fewer than two dates are given.
pub fn price_changes(rows: &[TrendRow], dates: &[NaiveDate]) -> Vec<PriceChange> {
    let (Some(first_date), Some(last_date)) = (dates.first(), dates.last()) else {
        return Vec::new();
    };
    if first_date == last_date {
        return Vec::new();
    }
    let price_on = |row: &TrendRow, d: &NaiveDate| row.points.get(d).and_then(|p| p.price);

    let mut out: Vec<PriceChange> = rows
        .iter()
        .filter_map(|row| {
            let first = price_on(row, first_date)?;
            let last = price_on(row, last_date)?;
            if first == 0.0 {
                return None;
            }
            let change = last - first;
            Some(PriceChange {
                ticker: row.ticker.clone(),
                name: row.name.clone(),
                first_price: first,
                last_price: last,
                change,
                change_pct: change / first * 100.0,
            })
        })
        .collect();

    out.sort_by(|a, b| b.change_pct.total_cmp(&a.change_pct));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TickerRecord;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn row(symbol: &str, name: &str, label: SetupLabel, score: i32, price: f64) -> SetupResult {
        let t = TickerRecord {
            symbol: symbol.into(),
            name: name.into(),
            category: "TEST".into(),
        };
        SetupResult {
            score: Some(score),
            price: Some(price),
            error: None,
            ..SetupResult::failed(&t, label, "")
        }
    }

    #[test]
    fn save_skips_errors_and_empty_sets() {
        let dir = tempfile::tempdir().unwrap();
        let only_errors = vec![SetupResult::failed(
            &TickerRecord {
                symbol: "BAD".into(),
                name: "Bad".into(),
                category: "TEST".into(),
            },
            SetupLabel::DataError,
            "short",
        )];
        assert!(!save_scan_history(dir.path(), date(1), &only_errors).unwrap());
        assert!(!day_file(dir.path(), date(1)).exists());

        let mut rows = only_errors;
        rows.push(row("AAPL", "Apple", SetupLabel::PotentialLong, 5, 170.0));
        assert!(save_scan_history(dir.path(), date(1), &rows).unwrap());

        let loaded = load_history(dir.path(), date(1), 1);
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].tickers.len(), 1);
        assert_eq!(loaded[0].tickers["AAPL"].setup, SetupLabel::PotentialLong);
    }

    #[test]
    fn file_layout_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        save_scan_history(dir.path(), date(9), &[row("MSFT", "Microsoft", SetupLabel::WatchLong, 3, 400.0)])
            .unwrap();
        let raw = std::fs::read_to_string(dir.path().join("scores_2024-03-09.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["date"], "2024-03-09");
        assert_eq!(value["tickers"]["MSFT"]["setup"], "Watch Long");
        assert_eq!(value["tickers"]["MSFT"]["score"], 3);
    }

    #[test]
    fn load_is_oldest_first_and_skips_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        save_scan_history(dir.path(), date(3), &[row("A", "A", SetupLabel::WatchLong, 3, 1.0)]).unwrap();
        save_scan_history(dir.path(), date(5), &[row("A", "A", SetupLabel::PotentialLong, 5, 2.0)]).unwrap();
        std::fs::write(day_file(dir.path(), date(4)), "not json").unwrap();
        save_scan_history(dir.path(), date(1), &[row("A", "A", SetupLabel::None, 0, 1.0)]).unwrap();

        let loaded = load_history(dir.path(), date(5), 3);
        let dates: Vec<NaiveDate> = loaded.iter().map(|d| d.date).collect();
        assert_eq!(dates, vec![date(3), date(5)]);
    }

    #[test]
    fn arrows() {
        assert_eq!(trend_arrow(&[]), "—");
        assert_eq!(trend_arrow(&[4]), "—");
        assert_eq!(trend_arrow(&[3, 3]), "→");
        assert_eq!(trend_arrow(&[-3, 5]), "↑↑");
        assert_eq!(trend_arrow(&[-6, -3]), "↑");
        assert_eq!(trend_arrow(&[3, -5]), "↓↓");
        assert_eq!(trend_arrow(&[6, 3]), "↓");
    }

    #[test]
    fn trend_rows_use_latest_name_and_filter_by_latest_setup() {
        let history = vec![
            HistoryDay {
                date: date(1),
                tickers: BTreeMap::from([
                    ("A".into(), HistoryEntry { name: "Old".into(), setup: SetupLabel::WatchLong, score: 3, price: Some(10.0) }),
                    ("B".into(), HistoryEntry { name: "B".into(), setup: SetupLabel::PotentialShort, score: -5, price: Some(20.0) }),
                ]),
            },
            HistoryDay {
                date: date(2),
                tickers: BTreeMap::from([
                    ("A".into(), HistoryEntry { name: "New".into(), setup: SetupLabel::PotentialLong, score: 5, price: Some(11.0) }),
                    ("B".into(), HistoryEntry { name: "B".into(), setup: SetupLabel::WatchShort, score: -3, price: Some(19.0) }),
                ]),
            },
        ];

        let rows = build_trend_rows(&history);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "New");
        assert_eq!(rows[0].trend, "↑↑");
        assert_eq!(rows[1].trend, "↑");
        assert_eq!(rows[0].latest_setup(), Some(SetupLabel::PotentialLong));

        let longs = filter_by_latest_setup(rows.clone(), &history, &[SetupLabel::PotentialLong]);
        assert_eq!(longs.len(), 1);
        assert_eq!(longs[0].ticker, "A");
        assert_eq!(filter_by_latest_setup(rows.clone(), &history, &[]).len(), 2);

        let changes = price_changes(&rows, &[date(1), date(2)]);
        assert_eq!(changes[0].ticker, "A");
        assert!((changes[0].change_pct - 10.0).abs() < 1e-9);
        assert!((changes[1].change - -1.0).abs() < 1e-9);
    }

    fn entry(setup: SetupLabel, price: Option<f64>) -> HistoryEntry {
        HistoryEntry {
            name: "N".into(),
            setup,
            score: 0,
            price,
        }
    }

    #[test]
    fn default_filter_hides_none_and_caution() {
        let history = vec![HistoryDay {
            date: date(4),
            tickers: BTreeMap::from([
                ("C".into(), entry(SetupLabel::CautionLong, Some(1.0))),
                ("N".into(), entry(SetupLabel::None, Some(1.0))),
                ("W".into(), entry(SetupLabel::WatchShort, Some(1.0))),
            ]),
        }];
        let rows = build_trend_rows(&history);

        let kept: Vec<String> = filter_by_latest_setup(rows.clone(), &history, &[])
            .into_iter()
            .map(|r| r.ticker)
            .collect();
        assert_eq!(kept, vec!["W"]);
        assert_eq!(filter_by_latest_setup(rows, &history, &SetupLabel::ALL).len(), 3);
    }

    #[test]
    fn price_change_needs_both_end_dates() {
        let history = vec![
            HistoryDay {
                date: date(1),
                tickers: BTreeMap::from([
                    ("A".into(), entry(SetupLabel::WatchLong, Some(10.0))),
                    ("B".into(), entry(SetupLabel::WatchLong, Some(10.0))),
                ]),
            },
            HistoryDay {
                date: date(2),
                tickers: BTreeMap::from([
                    ("A".into(), entry(SetupLabel::WatchLong, Some(12.0))),
                    ("B".into(), entry(SetupLabel::WatchLong, Some(15.0))),
                    ("C".into(), entry(SetupLabel::WatchLong, Some(5.0))),
                ]),
            },
            HistoryDay {
                date: date(3),
                tickers: BTreeMap::from([
                    ("A".into(), entry(SetupLabel::WatchLong, None)),
                    ("C".into(), entry(SetupLabel::WatchLong, Some(6.0))),
                ]),
            },
        ];
        let rows = build_trend_rows(&history);

        // A has no price on the last date, B is missing from it, C from the first.
        assert!(price_changes(&rows, &[date(1), date(2), date(3)]).is_empty());

        let two_days = price_changes(&rows, &[date(1), date(2)]);
        let tickers: Vec<&str> = two_days.iter().map(|c| c.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["B", "A"]);
        assert!((two_days[0].change_pct - 50.0).abs() < 1e-9);

        assert!(price_changes(&rows, &[date(2)]).is_empty());
    }
}
