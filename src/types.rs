// =============================================================================
// Shared types used across the setup scanner
// =============================================================================

use serde::{Deserialize, Serialize};

/// Bar timeframe requested from the market-data provider.
///
/// The weekly timeframe supplies the "conditions", daily the "entry" and
/// monthly the optional long-term context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    Daily,
    Weekly,
    Monthly,
}

impl Timeframe {
    /// Interval string understood by the provider.
    pub fn interval(self) -> &'static str {
        match self {
            Self::Daily => "1d",
            Self::Weekly => "1wk",
            Self::Monthly => "1mo",
        }
    }

    /// Single-letter prefix used in rule ids and table columns ("W:RSI").
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Daily => "D",
            Self::Weekly => "W",
            Self::Monthly => "M",
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Daily => write!(f, "Daily"),
            Self::Weekly => write!(f, "Weekly"),
            Self::Monthly => write!(f, "Monthly"),
        }
    }
}

/// Trade direction a setup is evaluated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short. Short scores are negated with this.
    pub fn sign(self) -> i32 {
        match self {
            Self::Long => 1,
            Self::Short => -1,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Long => write!(f, "Long"),
            Self::Short => write!(f, "Short"),
        }
    }
}

/// Reading of a single indicator relative to its reference level, carrying
/// the indicator value itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value")]
pub enum Signal {
    Bullish(f64),
    Bearish(f64),
    Neutral(f64),
}

impl Signal {
    /// Classify `value` against `reference`: strictly above is bullish,
    /// strictly below is bearish, equal (or NaN on either side) is neutral.
    pub fn versus(value: f64, reference: f64) -> Self {
        if value > reference {
            Self::Bullish(value)
        } else if value < reference {
            Self::Bearish(value)
        } else {
            Self::Neutral(value)
        }
    }

    pub fn is_bullish(self) -> bool {
        matches!(self, Self::Bullish(_))
    }

    pub fn is_bearish(self) -> bool {
        matches!(self, Self::Bearish(_))
    }

    /// True when the signal points in `direction`.
    pub fn favours(self, direction: Direction) -> bool {
        match direction {
            Direction::Long => self.is_bullish(),
            Direction::Short => self.is_bearish(),
        }
    }

    /// Short label used in tables ("Bull", "Bear", "Flat").
    pub fn short_label(self) -> &'static str {
        match self {
            Self::Bullish(_) => "Bull",
            Self::Bearish(_) => "Bear",
            Self::Neutral(_) => "Flat",
        }
    }
}

/// Which scan is run over the ticker universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// Weekly conditions + daily entry setup classification.
    #[default]
    Setup,
    /// Daily/weekly RSI bias with daily EMA alignment.
    Momentum,
    /// Monthly Cycle Swing Oscillator.
    Mcso,
}

impl std::fmt::Display for ScanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Setup => write!(f, "setup"),
            Self::Momentum => write!(f, "momentum"),
            Self::Mcso => write!(f, "mcso"),
        }
    }
}

impl std::str::FromStr for ScanMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "setup" | "strategy" => Ok(Self::Setup),
            "momentum" | "bias" => Ok(Self::Momentum),
            "mcso" => Ok(Self::Mcso),
            other => anyhow::bail!("unknown scan mode '{other}' (expected setup, momentum or mcso)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_exactly_one_side_off_midline() {
        for v in [0.0, 12.5, 49.999, 50.001, 73.0, 100.0] {
            let s = Signal::versus(v, 50.0);
            assert!(s.is_bullish() ^ s.is_bearish(), "value {v} gave {s:?}");
        }
    }

    #[test]
    fn signal_neutral_at_midline() {
        let s = Signal::versus(50.0, 50.0);
        assert!(!s.is_bullish());
        assert!(!s.is_bearish());
        assert_eq!(s, Signal::Neutral(50.0));
    }

    #[test]
    fn signal_nan_is_neutral() {
        assert!(matches!(Signal::versus(f64::NAN, 50.0), Signal::Neutral(_)));
    }

    #[test]
    fn signal_favours_direction() {
        let s = Signal::Bearish(41.0);
        assert!(s.favours(Direction::Short));
        assert!(!s.favours(Direction::Long));
    }

    #[test]
    fn direction_sign() {
        assert_eq!(Direction::Long.sign(), 1);
        assert_eq!(Direction::Short.sign(), -1);
    }

    #[test]
    fn timeframe_intervals() {
        assert_eq!(Timeframe::Daily.interval(), "1d");
        assert_eq!(Timeframe::Weekly.interval(), "1wk");
        assert_eq!(Timeframe::Monthly.interval(), "1mo");
        assert_eq!(Timeframe::Weekly.prefix(), "W");
    }

    #[test]
    fn scan_mode_parses() {
        assert_eq!("Setup".parse::<ScanMode>().unwrap(), ScanMode::Setup);
        assert_eq!("mcso".parse::<ScanMode>().unwrap(), ScanMode::Mcso);
        assert!("macd".parse::<ScanMode>().is_err());
    }
}
