// =============================================================================
// Setup Rule Table
// =============================================================================
//
// Weekly MUST rules define the conditions for a direction. Each MUST carries a
// PREFER refinement: failing it only raises a caution flag. Daily ENTRY rules
// decide whether a qualified direction is ready (Potential) or not (Watch).
//
// Every predicate is written once and flips polarity with `Direction`.
// =============================================================================

use serde::Serialize;

use crate::snapshot::IndicatorSnapshot;
use crate::types::{Direction, Timeframe};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Tier {
    Must,
    Prefer,
    Entry,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Must => "MUST",
            Self::Prefer => "PREFER",
            Self::Entry => "ENTRY",
        }
    }
}

pub type Predicate = fn(&IndicatorSnapshot, Direction) -> bool;

/// One row of the rule table.
#[derive(Clone, Copy)]
pub struct Rule {
    pub tier: Tier,
    pub timeframe: Timeframe,
    /// Short names for the long and short variants, e.g. "RSI Bull"/"RSI Bear".
    pub names: [&'static str; 2],
    pub description: &'static str,
    pub check: Predicate,
}

impl Rule {
    /// Display id such as "W:RSI Bull" or "D:MACD Bear".
    pub fn id(&self, direction: Direction) -> String {
        let name = match direction {
            Direction::Long => self.names[0],
            Direction::Short => self.names[1],
        };
        format!("{}:{}", self.timeframe.prefix(), name)
    }

    pub fn holds(&self, snapshot: &IndicatorSnapshot, direction: Direction) -> bool {
        (self.check)(snapshot, direction)
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("tier", &self.tier)
            .field("timeframe", &self.timeframe)
            .field("names", &self.names)
            .finish()
    }
}

// =============================================================================
// Predicates
// =============================================================================

fn rsi_beyond_mid(s: &IndicatorSnapshot, d: Direction) -> bool {
    s.rsi_state.favours(d)
}

fn rsi_beyond_ma(s: &IndicatorSnapshot, d: Direction) -> bool {
    s.rsi_vs_ma.favours(d)
}

fn macd_beyond_signal(s: &IndicatorSnapshot, d: Direction) -> bool {
    s.macd_state.favours(d)
}

fn macd_momentum(s: &IndicatorSnapshot, d: Direction) -> bool {
    s.macd_cross == Some(d) || s.macd_zero.favours(d)
}

fn close_beyond_ema_long(s: &IndicatorSnapshot, d: Direction) -> bool {
    s.price_vs_ema_long.favours(d)
}

fn close_beyond_ema_short(s: &IndicatorSnapshot, d: Direction) -> bool {
    s.price_vs_ema_short.favours(d)
}

fn entry_rsi(s: &IndicatorSnapshot, d: Direction) -> bool {
    s.rsi_cross == Some(d) && s.rsi_state.favours(d) && s.rsi_vs_ma.favours(d)
}

fn entry_macd(s: &IndicatorSnapshot, d: Direction) -> bool {
    s.macd_cross == Some(d) || s.macd_hook == Some(d)
}

fn entry_price(s: &IndicatorSnapshot, d: Direction) -> bool {
    (s.price_vs_ema_short.favours(d) && s.price_vs_ema_long.favours(d)) || s.ema_bounce == Some(d)
}

// =============================================================================
// Table
// =============================================================================

pub const RULES: &[Rule] = &[
    // --- Weekly conditions ------------------------------------------------
    Rule {
        tier: Tier::Must,
        timeframe: Timeframe::Weekly,
        names: ["RSI Bull", "RSI Bear"],
        description: "RSI beyond the midline",
        check: rsi_beyond_mid,
    },
    Rule {
        tier: Tier::Prefer,
        timeframe: Timeframe::Weekly,
        names: ["RSI>MA", "RSI<MA"],
        description: "RSI beyond its moving average",
        check: rsi_beyond_ma,
    },
    Rule {
        tier: Tier::Must,
        timeframe: Timeframe::Weekly,
        names: ["MACD Bull", "MACD Bear"],
        description: "MACD line beyond its signal line",
        check: macd_beyond_signal,
    },
    Rule {
        tier: Tier::Prefer,
        timeframe: Timeframe::Weekly,
        names: ["MACD Momentum Up", "MACD Momentum Down"],
        description: "recent MACD cross or MACD line on the trend side of zero",
        check: macd_momentum,
    },
    Rule {
        tier: Tier::Must,
        timeframe: Timeframe::Weekly,
        names: ["Prc>EMA Long", "Prc<EMA Long"],
        description: "close beyond the long EMA",
        check: close_beyond_ema_long,
    },
    Rule {
        tier: Tier::Prefer,
        timeframe: Timeframe::Weekly,
        names: ["Prc>EMA Short", "Prc<EMA Short"],
        description: "close also beyond the short EMA",
        check: close_beyond_ema_short,
    },
    // --- Daily entry ------------------------------------------------------
    Rule {
        tier: Tier::Entry,
        timeframe: Timeframe::Daily,
        names: ["RSI Cross Up", "RSI Cross Down"],
        description: "RSI crossed the midline within the lookback and sits beyond its moving average",
        check: entry_rsi,
    },
    Rule {
        tier: Tier::Entry,
        timeframe: Timeframe::Daily,
        names: ["MACD Bull", "MACD Bear"],
        description: "MACD cross within the lookback or a histogram hook",
        check: entry_macd,
    },
    Rule {
        tier: Tier::Entry,
        timeframe: Timeframe::Daily,
        names: ["Prc>EMAs", "Prc<EMAs"],
        description: "price beyond both EMAs or a bounce at the long EMA",
        check: entry_price,
    },
];

/// Rules of one tier in table order.
pub fn rules_of(tier: Tier) -> impl Iterator<Item = &'static Rule> {
    RULES.iter().filter(move |r| r.tier == tier)
}
