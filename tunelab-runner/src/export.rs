//! Human- and tool-facing renderings of an extraction run.
//!
//! - **CSV**: derived-signal tape for spreadsheets and external analysis
//! - **Text**: backtest summary and sample signals printed after extraction

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use tunelab_core::domain::BacktestReport;
use tunelab_core::DerivedSignal;

/// Number of derived signals shown after extraction.
pub const SAMPLE_SIGNALS: usize = 5;

// ─── CSV export ─────────────────────────────────────────────────────

/// Export derived signals as CSV.
///
/// Columns: timestamp, side, entry_time, exit_time, entry_price, exit_price,
/// pnl, hold_time_minutes, profitable, price_change_pct
pub fn export_signals_csv(signals: &[DerivedSignal]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "timestamp",
        "side",
        "entry_time",
        "exit_time",
        "entry_price",
        "exit_price",
        "pnl",
        "hold_time_minutes",
        "profitable",
        "price_change_pct",
    ])?;

    for s in signals {
        wtr.write_record([
            &s.timestamp.to_string(),
            &s.side.to_string(),
            &s.entry_time(),
            &s.exit_time(),
            &format!("{:.6}", s.entry_price),
            &format!("{:.6}", s.exit_price),
            &format!("{:.6}", s.pnl),
            &format!("{:.3}", s.hold_time),
            &u8::from(s.profitable).to_string(),
            &format!("{:.6}", s.price_change_pct()),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Write the derived-signal tape to `path`, creating parent directories.
pub fn write_signals_csv(signals: &[DerivedSignal], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    let csv = export_signals_csv(signals)?;
    std::fs::write(path, csv).with_context(|| format!("failed to write {}", path.display()))
}

// ─── Text summaries ─────────────────────────────────────────────────

/// Run summary as reported by the backtester.
pub fn backtest_summary(report: &BacktestReport) -> String {
    let mut out = String::new();
    let p = &report.params;
    let m = &report.metrics;
    let _ = writeln!(out, "Backtest Summary:");
    let _ = writeln!(out, "   Period: {} - {}", p.start_date, p.end_date);
    let _ = writeln!(out, "   Strategy: {}", p.strategy);
    let _ = writeln!(out, "   Total Trades: {}", m.trades);
    let _ = writeln!(out, "   PnL: {:.2}", m.pnl);
    let _ = write!(out, "   Max Drawdown: {:.2}", m.max_drawdown);
    out
}

/// The first `limit` derived signals, one per line.
pub fn sample_signals(signals: &[DerivedSignal], limit: usize) -> String {
    let mut out = String::from("Sample Signals:");
    for (i, s) in signals.iter().take(limit).enumerate() {
        let _ = write!(
            out,
            "\n   {}. {} @ {:.2} -> {:.2} (PnL: {:.2}, Hold: {:.1}min)",
            i + 1,
            s.side,
            s.entry_price,
            s.exit_price,
            s.pnl,
            s.hold_time
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tunelab_core::domain::{BacktestMetrics, BacktestParams, BacktestTrade, Side};
    use tunelab_core::extract_signals;

    fn signals() -> Vec<DerivedSignal> {
        extract_signals(&[
            BacktestTrade::new(Side::Long, 100.0, 0),
            BacktestTrade::new(Side::Flat, 110.0, 90_000),
            BacktestTrade::new(Side::Short, 50.0, 120_000),
            BacktestTrade::new(Side::Flat, 55.0, 240_000),
        ])
    }

    #[test]
    fn csv_has_header_and_one_row_per_signal() {
        let csv = export_signals_csv(&signals()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("timestamp,side,entry_time"));
        assert!(lines[1].starts_with("0,LONG,1970-01-01T00:00:00.000,1970-01-01T00:01:30.000"));
        assert!(lines[1].contains(",1.500,1,"));
        assert!(lines[2].contains(",SHORT,"));
        assert!(lines[2].contains(",-5.000000,"));
    }

    #[test]
    fn csv_empty_signals() {
        let csv = export_signals_csv(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tapes/run1/signals.csv");
        write_signals_csv(&signals(), &path).unwrap();
        assert!(std::fs::read_to_string(path).unwrap().contains("LONG"));
    }

    #[test]
    fn summary_lists_run_metrics() {
        let report = BacktestReport {
            trades: Vec::new(),
            equity_curve: Vec::new(),
            params: BacktestParams {
                start_date: "2024-01-01".into(),
                end_date: "2024-03-01".into(),
                strategy: "drift-e3".into(),
            },
            metrics: BacktestMetrics {
                trades: 42,
                pnl: 123.456,
                max_drawdown: 7.0,
            },
        };
        let text = backtest_summary(&report);
        assert!(text.contains("Period: 2024-01-01 - 2024-03-01"));
        assert!(text.contains("Strategy: drift-e3"));
        assert!(text.contains("Total Trades: 42"));
        assert!(text.contains("PnL: 123.46"));
        assert!(text.contains("Max Drawdown: 7.00"));
    }

    #[test]
    fn samples_are_limited() {
        let text = sample_signals(&signals(), 1);
        assert!(text.contains("1. LONG @ 100.00 -> 110.00 (PnL: 10.00, Hold: 1.5min)"));
        assert!(!text.contains("SHORT"));
    }
}
