//! Training examples: structured (pre-format) and rendered.

use serde::{Deserialize, Serialize};

use super::pnl::NO_TRADE;
use super::signal::{Decision, Features};

/// The ten market features every example carries.
///
/// Field names serialize in the bot's camelCase so examples can be dumped
/// next to raw signal rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputFeatures {
    pub price: f64,
    pub volume: f64,
    pub volatility: f64,
    pub body_over_atr: f64,
    pub volume_z: f64,
    pub spread_bps: f64,
    pub premium_pct: f64,
    pub realized_vol: f64,
    pub open_interest: f64,
    pub funding_rate: f64,
}

impl InputFeatures {
    /// Pick the ten known keys out of a parsed mapping. Missing keys are 0.
    pub fn from_features(features: &Features) -> Self {
        let get = |key: &str| features.get(key).copied().unwrap_or(0.0);
        Self {
            price: get("price"),
            volume: get("volume"),
            volatility: get("volatility"),
            body_over_atr: get("bodyOverAtr"),
            volume_z: get("volumeZ"),
            spread_bps: get("spreadBps"),
            premium_pct: get("premiumPct"),
            realized_vol: get("realizedVol"),
            open_interest: get("openInterest"),
            funding_rate: get("fundingRate"),
        }
    }
}

/// Labels derived from the PnL attributed to a signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Labels {
    pub profitable: bool,
    pub pnl: f64,
    /// Minutes. A proxy: matched PnL rows × 60.
    pub hold_time: u64,
    pub exit_reason: String,
}

impl Labels {
    /// Labels for a signal with no PnL inside its window.
    pub fn no_trade() -> Self {
        Self {
            profitable: false,
            pnl: 0.0,
            hold_time: 0,
            exit_reason: NO_TRADE.to_string(),
        }
    }
}

/// A structured example before prompt rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub timestamp: i64,
    pub input_features: InputFeatures,
    pub ai_decision: Decision,
    pub ai_confidence: f64,
    pub e3_trigger: String,
    pub labels: Labels,
}

/// The persisted instruction/response unit consumed by the trainer and evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedExample {
    pub instruction: String,
    pub output: String,
    /// Always empty; some trainers expect the key.
    #[serde(default)]
    pub input: String,
}

/// A rendered example together with its typed label.
///
/// Only the `example` part is written to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledExample {
    pub example: FormattedExample,
    pub profitable: bool,
    pub timestamp: i64,
}
