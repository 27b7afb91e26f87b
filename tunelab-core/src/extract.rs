//! Backtest signal extraction: pairs entry fills with their closing fill.
//!
//! Pure function: ordered trade list → derived signals. An entry (`LONG` or
//! `SHORT`) is only paired with the trade immediately after it, and only if
//! that trade is `FLAT`. Anything else (a reversal, a second entry, the end
//! of the list) leaves the entry unattributed and it is skipped.

use serde::{Deserialize, Serialize};

use crate::domain::time::{iso_utc, MS_PER_MINUTE};
use crate::domain::{BacktestTrade, Side};

/// A closed round trip recovered from a backtest trade list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedSignal {
    /// Entry time, epoch ms. This is the signal's timestamp.
    pub timestamp: i64,
    pub side: Side,
    pub entry_price: f64,
    pub exit_price: f64,
    pub exit_ts: i64,
    pub pnl: f64,
    /// Minutes between entry and exit.
    pub hold_time: f64,
    pub profitable: bool,
}

/// Feature subset persisted with each derived signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedFeatures {
    pub price_change_pct: f64,
    pub hold_time_minutes: f64,
    pub side: Side,
}

impl DerivedSignal {
    pub fn entry_time(&self) -> String {
        iso_utc(self.timestamp)
    }

    pub fn exit_time(&self) -> String {
        iso_utc(self.exit_ts)
    }

    /// Fractional price move from entry to exit, unsigned by side.
    pub fn price_change_pct(&self) -> f64 {
        if self.entry_price == 0.0 {
            return 0.0;
        }
        (self.exit_price - self.entry_price) / self.entry_price
    }

    pub fn features(&self) -> DerivedFeatures {
        DerivedFeatures {
            price_change_pct: self.price_change_pct(),
            hold_time_minutes: self.hold_time,
            side: self.side,
        }
    }
}

/// Realized PnL of a round trip, per unit.
pub fn round_trip_pnl(side: Side, entry_price: f64, exit_price: f64) -> f64 {
    match side {
        Side::Long => exit_price - entry_price,
        Side::Short => entry_price - exit_price,
        Side::Flat | Side::Unknown => 0.0,
    }
}

/// Extract closed round trips from an ordered trade list.
pub fn extract_signals(trades: &[BacktestTrade]) -> Vec<DerivedSignal> {
    trades
        .windows(2)
        .filter_map(|pair| {
            let (entry, exit) = (&pair[0], &pair[1]);
            if !entry.side.is_entry() || exit.side != Side::Flat {
                return None;
            }

            let pnl = round_trip_pnl(entry.side, entry.price, exit.price);
            Some(DerivedSignal {
                timestamp: entry.ts,
                side: entry.side,
                entry_price: entry.price,
                exit_price: exit.price,
                exit_ts: exit.ts,
                pnl,
                hold_time: (exit.ts - entry.ts) as f64 / MS_PER_MINUTE as f64,
                profitable: pnl > 0.0,
            })
        })
        .collect()
}
