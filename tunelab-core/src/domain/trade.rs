//! Backtest result file: ordered trade list plus run summary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of a backtest trade. `Flat` closes whatever position is open.
///
/// Any other label in a result file reads as `Unknown`: it neither opens
/// nor closes a position, so the surrounding trades never pair across it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Long,
    Short,
    Flat,
    #[serde(other)]
    Unknown,
}

impl Side {
    pub fn is_entry(self) -> bool {
        matches!(self, Side::Long | Side::Short)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Long => "LONG",
            Side::Short => "SHORT",
            Side::Flat => "FLAT",
            Side::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One fill in a backtest trade list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BacktestTrade {
    pub side: Side,
    pub price: f64,
    /// Epoch milliseconds.
    pub ts: i64,
}

impl BacktestTrade {
    pub fn new(side: Side, price: f64, ts: i64) -> Self {
        Self { side, price, ts }
    }
}

/// Run parameters echoed back by the backtester.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BacktestParams {
    pub start_date: String,
    pub end_date: String,
    pub strategy: String,
}

/// Headline metrics reported by the backtester.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BacktestMetrics {
    pub trades: u64,
    pub pnl: f64,
    pub max_drawdown: f64,
}

/// A complete backtest result file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestReport {
    pub trades: Vec<BacktestTrade>,
    /// Carried through untouched; extraction only needs the trade list.
    #[serde(default)]
    pub equity_curve: Vec<serde_json::Value>,
    #[serde(default)]
    pub params: BacktestParams,
    #[serde(default)]
    pub metrics: BacktestMetrics,
}
