//! PnL records: realized profit/loss events tied to a symbol and time.

use serde::{Deserialize, Serialize};

/// Exit reason used when no PnL record falls inside a signal's window.
pub const NO_TRADE: &str = "no_trade";

/// Exit reason stamped on PnL records synthesized from backtest signals.
pub const BACKTEST_EXIT_REASON: &str = "backtest";

/// A realized PnL event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnlRecord {
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub symbol: String,
    pub pnl: f64,
    pub exit_reason: String,
}

impl PnlRecord {
    pub fn new(timestamp: i64, symbol: impl Into<String>, pnl: f64, exit_reason: impl Into<String>) -> Self {
        Self {
            timestamp,
            symbol: symbol.into(),
            pnl,
            exit_reason: exit_reason.into(),
        }
    }
}
