//! Example builder: merges sources, joins signals to PnL, derives labels.
//!
//! Pure functions over in-memory rows:
//! - `merge_sources()` folds backtest rows into the live collections and
//!   sorts both by timestamp.
//! - `build_examples()` attributes PnL inside `[ts, ts + 1h]` to each signal
//!   and derives the profitability label.

use std::borrow::Cow;
use std::cmp::Ordering;

use crate::domain::time::MS_PER_HOUR;
use crate::domain::{
    InputFeatures, Labels, PnlRecord, SignalRow, TrainingExample, BACKTEST_EXIT_REASON,
};

/// Attribution horizon after a signal. Both bounds are inclusive.
pub const ATTRIBUTION_WINDOW_MS: i64 = MS_PER_HOUR;

/// Minutes credited per matched PnL row when deriving `hold_time`.
pub const HOLD_MINUTES_PER_MATCH: u64 = 60;

/// Signal and PnL collections in the normalized row shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceData {
    pub signals: Vec<SignalRow>,
    pub pnl: Vec<PnlRecord>,
}

impl SourceData {
    pub fn new(signals: Vec<SignalRow>, pnl: Vec<PnlRecord>) -> Self {
        Self { signals, pnl }
    }

    /// No signals means nothing to build examples from, whatever the PnL side holds.
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}

// ── Merging ──────────────────────────────────────────────────────────

/// Synthesize one PnL record per backtest row from its stored outcome.
pub fn synthesize_backtest_pnl(rows: &[SignalRow], symbol: &str) -> Vec<PnlRecord> {
    rows.iter()
        .map(|row| {
            let pnl = row.outcome.as_ref().map(|o| o.pnl).unwrap_or(0.0);
            PnlRecord::new(row.timestamp, symbol, pnl, BACKTEST_EXIT_REASON)
        })
        .collect()
}

/// Combine live collections with backtest-derived rows.
///
/// Backtest rows join the signal collection and contribute synthetic PnL
/// records stamped with `symbol`. Both collections are then sorted with a
/// total order (timestamp first, row content as tie-break), so the result
/// does not depend on which source was concatenated first.
pub fn merge_sources(live: SourceData, backtest: Vec<SignalRow>, symbol: &str) -> SourceData {
    let backtest_pnl = synthesize_backtest_pnl(&backtest, symbol);

    let mut signals = live.signals;
    signals.extend(backtest);
    let mut pnl = live.pnl;
    pnl.extend(backtest_pnl);

    sort_signals(&mut signals);
    sort_pnl(&mut pnl);

    SourceData { signals, pnl }
}

pub fn sort_signals(signals: &mut [SignalRow]) {
    signals.sort_by(compare_signals);
}

pub fn sort_pnl(pnl: &mut [PnlRecord]) {
    pnl.sort_by(compare_pnl);
}

fn compare_signals(a: &SignalRow, b: &SignalRow) -> Ordering {
    a.timestamp
        .cmp(&b.timestamp)
        .then_with(|| a.trigger.cmp(&b.trigger))
        .then_with(|| a.decision.cmp(&b.decision))
        .then_with(|| a.confidence.total_cmp(&b.confidence))
        .then_with(|| a.features.cmp(&b.features))
        .then_with(|| {
            let pnl = |r: &SignalRow| r.outcome.as_ref().map(|o| o.pnl).unwrap_or(0.0);
            pnl(a).total_cmp(&pnl(b))
        })
}

fn compare_pnl(a: &PnlRecord, b: &PnlRecord) -> Ordering {
    a.timestamp
        .cmp(&b.timestamp)
        .then_with(|| a.symbol.cmp(&b.symbol))
        .then_with(|| a.exit_reason.cmp(&b.exit_reason))
        .then_with(|| a.pnl.total_cmp(&b.pnl))
}

// ── Joining ──────────────────────────────────────────────────────────

/// PnL rows attributed to a signal at `ts`: `ts <= row.timestamp <= ts + 1h`.
///
/// `pnl` must be sorted by timestamp.
pub fn attribution_window(pnl: &[PnlRecord], ts: i64) -> &[PnlRecord] {
    let end_ts = ts.saturating_add(ATTRIBUTION_WINDOW_MS);
    let start = pnl.partition_point(|r| r.timestamp < ts);
    let end = pnl.partition_point(|r| r.timestamp <= end_ts);
    &pnl[start..end.max(start)]
}

/// Derive labels from the PnL rows inside a signal's window.
pub fn derive_labels(window: &[PnlRecord]) -> Labels {
    let Some(last) = window.last() else {
        return Labels::no_trade();
    };

    let pnl: f64 = window.iter().map(|r| r.pnl).sum();
    Labels {
        profitable: pnl > 0.0,
        pnl,
        hold_time: window.len() as u64 * HOLD_MINUTES_PER_MATCH,
        exit_reason: last.exit_reason.clone(),
    }
}

/// Build one example per informative signal.
///
/// Signals whose feature blob parses to an empty mapping are skipped. A
/// signal with no PnL in its window still yields an example, labelled
/// `no_trade`. Output order follows `signals`.
pub fn build_examples(signals: &[SignalRow], pnl: &[PnlRecord]) -> Vec<TrainingExample> {
    let pnl: Cow<'_, [PnlRecord]> = if pnl.windows(2).all(|w| w[0].timestamp <= w[1].timestamp) {
        Cow::Borrowed(pnl)
    } else {
        let mut sorted = pnl.to_vec();
        sort_pnl(&mut sorted);
        Cow::Owned(sorted)
    };

    signals
        .iter()
        .filter_map(|signal| {
            let features = signal.parsed_features();
            if features.is_empty() {
                return None;
            }

            let window = attribution_window(&pnl, signal.timestamp);
            Some(TrainingExample {
                timestamp: signal.timestamp,
                input_features: InputFeatures::from_features(&features),
                ai_decision: signal.decision.clone(),
                ai_confidence: signal.confidence,
                e3_trigger: signal.trigger.clone(),
                labels: derive_labels(window),
            })
        })
        .collect()
}
