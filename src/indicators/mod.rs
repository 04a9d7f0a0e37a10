// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators used by the
// scanner.  Series functions return an empty `Vec` and scalar functions return
// `None` on insufficient data, so callers must handle short histories.

pub mod ema;
pub mod macd;
pub mod mcso;
pub mod rsi;
pub mod sma;
