// =============================================================================
// Setup Evaluator — weekly conditions + daily entry classification
// =============================================================================
//
// Decision rule:
//   all weekly MUSTs hold for a direction          → that direction qualifies
//   both directions qualify                         → Conflicting (score 0)
//   neither qualifies                               → None (score 0)
//   qualified and ENTRY count >= min_entry_rules    → Potential (3 + count)
//   qualified otherwise                             → Watch (3)
//   Potential but monthly RSI contradicts           → Caution (3)
//
// Short scores are negated. Failed PREFERs, a monthly contradiction and an
// exhausted weekly RSI are reported as red flags.
// =============================================================================

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::TickerRecord;
use crate::market_data::{fetch_checked, BarRequest, MarketDataProvider};
use crate::rules::{rules_of, Tier};
use crate::runtime_config::{IndicatorParams, ScannerConfig, SetupRules};
use crate::scanner::{ScanRow, Strategy};
use crate::snapshot::IndicatorSnapshot;
use crate::types::{Direction, ScanMode, Timeframe};

// =============================================================================
// Labels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SetupLabel {
    #[serde(rename = "Potential Long")]
    PotentialLong,
    #[serde(rename = "Potential Short")]
    PotentialShort,
    #[serde(rename = "Watch Long")]
    WatchLong,
    #[serde(rename = "Watch Short")]
    WatchShort,
    #[serde(rename = "Caution Long")]
    CautionLong,
    #[serde(rename = "Caution Short")]
    CautionShort,
    Conflicting,
    None,
    #[serde(rename = "Data Error")]
    DataError,
    #[serde(rename = "Calc Error")]
    CalcError,
    Error,
}

impl SetupLabel {
    pub const ALL: [SetupLabel; 11] = [
        Self::PotentialLong,
        Self::PotentialShort,
        Self::WatchLong,
        Self::WatchShort,
        Self::CautionLong,
        Self::CautionShort,
        Self::Conflicting,
        Self::None,
        Self::DataError,
        Self::CalcError,
        Self::Error,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PotentialLong => "Potential Long",
            Self::PotentialShort => "Potential Short",
            Self::WatchLong => "Watch Long",
            Self::WatchShort => "Watch Short",
            Self::CautionLong => "Caution Long",
            Self::CautionShort => "Caution Short",
            Self::Conflicting => "Conflicting",
            Self::None => "None",
            Self::DataError => "Data Error",
            Self::CalcError => "Calc Error",
            Self::Error => "Error",
        }
    }

    /// False for the three failure sentinels.
    pub fn is_valid(self) -> bool {
        !matches!(self, Self::DataError | Self::CalcError | Self::Error)
    }

    pub fn direction(self) -> Option<Direction> {
        match self {
            Self::PotentialLong | Self::WatchLong | Self::CautionLong => Some(Direction::Long),
            Self::PotentialShort | Self::WatchShort | Self::CautionShort => Some(Direction::Short),
            _ => None,
        }
    }

    const fn potential(d: Direction) -> Self {
        match d {
            Direction::Long => Self::PotentialLong,
            Direction::Short => Self::PotentialShort,
        }
    }

    const fn watch(d: Direction) -> Self {
        match d {
            Direction::Long => Self::WatchLong,
            Direction::Short => Self::WatchShort,
        }
    }

    const fn caution(d: Direction) -> Self {
        match d {
            Direction::Long => Self::CautionLong,
            Direction::Short => Self::CautionShort,
        }
    }
}

impl std::fmt::Display for SetupLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SetupLabel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| anyhow::anyhow!("unknown setup label '{wanted}'"))
    }
}

// =============================================================================
// Evaluation
// =============================================================================

/// Outcome of classifying one instrument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetupEvaluation {
    pub label: SetupLabel,
    /// `None` only for failure labels.
    pub score: Option<i32>,
    pub rules_met: Vec<String>,
    pub red_flags: Vec<String>,
}

/// Rule outcome for one direction.
#[derive(Debug, Clone)]
struct DirectionCheck {
    musts_met: Vec<String>,
    musts_total: usize,
    prefers_met: Vec<String>,
    prefers_failed: Vec<String>,
    entries_met: Vec<String>,
    monthly_contradiction: Option<String>,
}

impl DirectionCheck {
    fn run(
        direction: Direction,
        weekly: &IndicatorSnapshot,
        daily: &IndicatorSnapshot,
        monthly: Option<&IndicatorSnapshot>,
        rules: &SetupRules,
    ) -> Self {
        let (mut musts_met, mut musts_total) = (Vec::new(), 0);
        for rule in rules_of(Tier::Must) {
            musts_total += 1;
            if rule.holds(weekly, direction) {
                musts_met.push(rule.id(direction));
            }
        }

        let (prefers_met, prefers_failed) = rules_of(Tier::Prefer)
            .map(|r| (r.id(direction), r.holds(weekly, direction)))
            .fold((Vec::new(), Vec::new()), |(mut ok, mut failed), (id, holds)| {
                if holds {
                    ok.push(id);
                } else {
                    failed.push(id);
                }
                (ok, failed)
            });

        let entries_met = rules_of(Tier::Entry)
            .filter(|r| r.holds(daily, direction))
            .map(|r| r.id(direction))
            .collect();

        let monthly_contradiction = monthly
            .filter(|_| rules.use_monthly_context)
            .and_then(|m| match direction {
                Direction::Long if m.rsi < rules.monthly_long_floor => Some(format!(
                    "M:RSI {:.1} below {:.0}",
                    m.rsi, rules.monthly_long_floor
                )),
                Direction::Short if m.rsi > rules.monthly_short_ceiling => Some(format!(
                    "M:RSI {:.1} above {:.0}",
                    m.rsi, rules.monthly_short_ceiling
                )),
                _ => None,
            });

        Self {
            musts_met,
            musts_total,
            prefers_met,
            prefers_failed,
            entries_met,
            monthly_contradiction,
        }
    }

    fn qualified(&self) -> bool {
        self.musts_total > 0 && self.musts_met.len() == self.musts_total
    }
}

/// Everything the label table looks at.
struct Outcome {
    long: DirectionCheck,
    short: DirectionCheck,
    min_entry_rules: usize,
}

impl Outcome {
    fn side(&self, d: Direction) -> &DirectionCheck {
        match d {
            Direction::Long => &self.long,
            Direction::Short => &self.short,
        }
    }

    fn ready(&self, d: Direction) -> bool {
        let c = self.side(d);
        c.qualified() && c.entries_met.len() >= self.min_entry_rules
    }

    fn cautioned(&self, d: Direction) -> bool {
        self.ready(d) && self.side(d).monthly_contradiction.is_some()
    }
}

type LabelRule = (fn(&Outcome) -> bool, SetupLabel);

/// Label selection, tried top to bottom; the first match wins.
const LABEL_TABLE: &[LabelRule] = &[
    (
        |o| o.long.qualified() && o.short.qualified(),
        SetupLabel::Conflicting,
    ),
    (|o| o.cautioned(Direction::Long), SetupLabel::caution(Direction::Long)),
    (|o| o.ready(Direction::Long), SetupLabel::potential(Direction::Long)),
    (|o| o.long.qualified(), SetupLabel::watch(Direction::Long)),
    (|o| o.cautioned(Direction::Short), SetupLabel::caution(Direction::Short)),
    (|o| o.ready(Direction::Short), SetupLabel::potential(Direction::Short)),
    (|o| o.short.qualified(), SetupLabel::watch(Direction::Short)),
];

/// Classify an instrument from its weekly, daily and optional monthly
/// snapshots.
pub fn evaluate_setup(
    weekly: &IndicatorSnapshot,
    daily: &IndicatorSnapshot,
    monthly: Option<&IndicatorSnapshot>,
    rules: &SetupRules,
    params: &IndicatorParams,
) -> SetupEvaluation {
    let outcome = Outcome {
        long: DirectionCheck::run(Direction::Long, weekly, daily, monthly, rules),
        short: DirectionCheck::run(Direction::Short, weekly, daily, monthly, rules),
        min_entry_rules: rules.min_entry_rules,
    };

    let label = LABEL_TABLE
        .iter()
        .find(|(matches, _)| matches(&outcome))
        .map(|(_, label)| *label)
        .unwrap_or(SetupLabel::None);

    let Some(direction) = label.direction() else {
        return SetupEvaluation {
            label,
            score: Some(0),
            rules_met: Vec::new(),
            red_flags: Vec::new(),
        };
    };

    let check = outcome.side(direction);
    let base = check.musts_met.len() as i32;
    let magnitude = match label {
        SetupLabel::PotentialLong | SetupLabel::PotentialShort => {
            base + check.entries_met.len() as i32
        }
        _ => base,
    };

    let rules_met = check
        .musts_met
        .iter()
        .chain(check.prefers_met.iter())
        .chain(check.entries_met.iter())
        .cloned()
        .collect();

    let mut red_flags: Vec<String> = check
        .prefers_failed
        .iter()
        .map(|id| format!("{id} not met"))
        .collect();
    if let Some(flag) = &check.monthly_contradiction {
        red_flags.push(flag.clone());
    }
    match direction {
        Direction::Long if weekly.rsi > params.rsi_overbought => {
            red_flags.push(format!("W:RSI {:.1} overbought", weekly.rsi));
        }
        Direction::Short if weekly.rsi < params.rsi_oversold => {
            red_flags.push(format!("W:RSI {:.1} oversold", weekly.rsi));
        }
        _ => {}
    }

    SetupEvaluation {
        label,
        score: Some(direction.sign() * magnitude),
        rules_met,
        red_flags,
    }
}

// =============================================================================
// Scan result
// =============================================================================

/// One row of a setup scan.
#[derive(Debug, Clone, Serialize)]
pub struct SetupResult {
    pub ticker: String,
    pub name: String,
    pub category: String,
    pub label: SetupLabel,
    pub score: Option<i32>,
    pub rules_met: Vec<String>,
    pub red_flags: Vec<String>,
    pub price: Option<f64>,
    pub weekly: Option<IndicatorSnapshot>,
    pub daily: Option<IndicatorSnapshot>,
    pub monthly: Option<IndicatorSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SetupResult {
    pub fn failed(ticker: &TickerRecord, label: SetupLabel, reason: impl Into<String>) -> Self {
        Self {
            ticker: ticker.symbol.clone(),
            name: ticker.name.clone(),
            category: ticker.category.clone(),
            label,
            score: None,
            rules_met: Vec::new(),
            red_flags: Vec::new(),
            price: None,
            weekly: None,
            daily: None,
            monthly: None,
            error: Some(reason.into()),
        }
    }

    /// Copy without chart series, for tables and list endpoints.
    pub fn summary(&self) -> Self {
        Self {
            weekly: self.weekly.as_ref().map(IndicatorSnapshot::without_chart),
            daily: self.daily.as_ref().map(IndicatorSnapshot::without_chart),
            monthly: self.monthly.as_ref().map(IndicatorSnapshot::without_chart),
            ..self.clone()
        }
    }
}

impl ScanRow for SetupResult {
    fn is_valid(&self) -> bool {
        self.label.is_valid()
    }

    fn bias(&self) -> Option<Direction> {
        self.label.direction()
    }

    fn sort_value(&self) -> Option<f64> {
        self.score.map(f64::from)
    }

    fn is_actionable(&self) -> bool {
        self.label.is_valid() && self.label != SetupLabel::None
    }
}

// =============================================================================
// Strategy
// =============================================================================

/// Weekly conditions + daily entry + optional monthly context.
pub struct SetupStrategy;

enum Loaded {
    Snapshot(IndicatorSnapshot),
    Failed(SetupLabel, String),
}

async fn load_snapshot(
    provider: &dyn MarketDataProvider,
    symbol: &str,
    request: &BarRequest,
    params: &IndicatorParams,
) -> Loaded {
    match fetch_checked(provider, symbol, request).await {
        Ok(Some(series)) => match IndicatorSnapshot::compute(&series, request.timeframe, params) {
            Some(snapshot) => Loaded::Snapshot(snapshot),
            None => Loaded::Failed(
                SetupLabel::CalcError,
                format!("{} indicators could not be computed", request.timeframe),
            ),
        },
        Ok(None) => Loaded::Failed(
            SetupLabel::DataError,
            format!(
                "{} history shorter than {} bars",
                request.timeframe, request.min_bars
            ),
        ),
        Err(e) => {
            warn!(symbol, timeframe = %request.timeframe, error = %e, "fetch failed");
            Loaded::Failed(SetupLabel::Error, format!("{e:#}"))
        }
    }
}

#[async_trait]
impl Strategy for SetupStrategy {
    type Output = SetupResult;

    fn mode(&self) -> ScanMode {
        ScanMode::Setup
    }

    async fn evaluate(
        &self,
        provider: &dyn MarketDataProvider,
        ticker: &TickerRecord,
        config: &ScannerConfig,
    ) -> SetupResult {
        let params = &config.indicators;
        let symbol = ticker.symbol.as_str();
        let min_bars = params.min_bars();

        let weekly_req = BarRequest::new(Timeframe::Weekly, &config.period_conditions, min_bars);
        let weekly = match load_snapshot(provider, symbol, &weekly_req, params).await {
            Loaded::Snapshot(s) => s,
            Loaded::Failed(label, reason) => return SetupResult::failed(ticker, label, reason),
        };

        let daily_req = BarRequest::new(Timeframe::Daily, &config.period_entry, min_bars);
        let daily = match load_snapshot(provider, symbol, &daily_req, params).await {
            Loaded::Snapshot(s) => s,
            Loaded::Failed(label, reason) => return SetupResult::failed(ticker, label, reason),
        };

        let monthly = if config.rules.use_monthly_context {
            let monthly_req = BarRequest::new(Timeframe::Monthly, &config.period_context, min_bars);
            match load_snapshot(provider, symbol, &monthly_req, params).await {
                Loaded::Snapshot(s) => Some(s),
                Loaded::Failed(label, reason) => {
                    debug!(symbol, %label, reason = %reason, "monthly context unavailable");
                    None
                }
            }
        } else {
            None
        };

        let eval = evaluate_setup(&weekly, &daily, monthly.as_ref(), &config.rules, params);

        debug!(
            symbol,
            label = %eval.label,
            score = ?eval.score,
            flags = eval.red_flags.len(),
            "setup evaluated"
        );

        SetupResult {
            ticker: ticker.symbol.clone(),
            name: ticker.name.clone(),
            category: ticker.category.clone(),
            label: eval.label,
            score: eval.score,
            rules_met: eval.rules_met,
            red_flags: eval.red_flags,
            price: Some(daily.close),
            weekly: Some(weekly),
            daily: Some(daily),
            monthly,
            error: None,
        }
    }
}
