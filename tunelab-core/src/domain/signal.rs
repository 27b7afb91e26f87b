//! Signal rows: timestamped trading decisions with market features.
//!
//! Live and backtest sources are normalized into the same `SignalRow` shape
//! before merging. Backtest rows additionally carry their realized outcome.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Numeric market features attached to a signal, keyed by feature name.
///
/// `BTreeMap` keeps key order deterministic for hashing and tie-breaking.
pub type Features = BTreeMap<String, f64>;

/// Trigger name stamped on rows read from the backtest signal store.
pub const BACKTEST_TRIGGER: &str = "backtest";

/// A trading decision label.
///
/// The bot emits `LONG`, `SHORT` and `FLAT`, but the column is free text,
/// so unknown labels are kept verbatim rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Decision {
    Long,
    Short,
    Flat,
    Other(String),
}

impl Decision {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_uppercase().as_str() {
            "LONG" => Decision::Long,
            "SHORT" => Decision::Short,
            "FLAT" => Decision::Flat,
            _ => Decision::Other(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Decision::Long => "LONG",
            Decision::Short => "SHORT",
            Decision::Flat => "FLAT",
            Decision::Other(label) => label,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Decision {
    fn from(raw: String) -> Self {
        Decision::parse(&raw)
    }
}

impl From<Decision> for String {
    fn from(decision: Decision) -> Self {
        decision.as_str().to_string()
    }
}

/// Realized outcome columns carried by backtest-origin rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestOutcome {
    pub pnl: f64,
    pub profitable: bool,
    /// Minutes between entry and exit.
    pub hold_time: f64,
}

/// One normalized signal row, regardless of source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRow {
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub decision: Decision,
    pub confidence: f64,
    pub trigger: String,
    /// Feature blob exactly as stored. Parsed by the example builder.
    pub features: Option<String>,
    /// Present only for rows read from the backtest signal store.
    pub outcome: Option<BacktestOutcome>,
}

impl SignalRow {
    pub fn parsed_features(&self) -> Features {
        parse_features(self.features.as_deref())
    }
}

/// Parse a stored feature blob into a numeric mapping.
///
/// Never fails: a missing blob, malformed JSON, or JSON that is not an object
/// all yield an empty mapping. Non-numeric values (such as the `side` string
/// in backtest feature subsets) are skipped.
pub fn parse_features(raw: Option<&str>) -> Features {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Features::new();
    };

    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => map
            .into_iter()
            .filter_map(|(key, value)| value.as_f64().map(|v| (key, v)))
            .collect(),
        _ => Features::new(),
    }
}
