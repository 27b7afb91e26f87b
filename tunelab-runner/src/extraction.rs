//! Extraction stage: latest backtest file → derived signals → backtest store.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};
use tunelab_core::domain::BacktestReport;
use tunelab_core::{extract_signals, DerivedSignal};

use crate::backtest_file::{latest_backtest_file, load_backtest_report, BacktestFileError};
use crate::config::PipelineConfig;
use crate::export::write_signals_csv;
use crate::store::{BacktestSignalStore, StoreError};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    BacktestFile(#[from] BacktestFileError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to write signal tape: {0:#}")]
    Tape(anyhow::Error),
}

/// What one extraction run read and wrote.
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    pub source: PathBuf,
    pub report: BacktestReport,
    pub signals: Vec<DerivedSignal>,
    /// Rows in the store after this run's insert.
    pub store_rows: u64,
}

/// Run extraction against the configured backtest directory and store.
///
/// Returns `Ok(None)` when there is no backtest file to extract from.
pub fn run_extraction(
    config: &PipelineConfig,
    tape: Option<&Path>,
) -> Result<Option<ExtractionOutcome>, ExtractError> {
    let dir = &config.paths.backtest_dir;
    let Some(source) = latest_backtest_file(dir)? else {
        warn!(dir = %dir.display(), "no backtest files found");
        return Ok(None);
    };
    info!(file = %source.display(), "processing backtest");

    let report = load_backtest_report(&source)?;
    let signals = extract_signals(&report.trades);
    info!(
        trades = report.trades.len(),
        signals = signals.len(),
        "extracted trading signals"
    );

    let store = BacktestSignalStore::open(&config.paths.backtest_db)?;
    let inserted = store.insert(&signals)?;
    let store_rows = store.count()?;
    info!(
        inserted,
        total = store_rows,
        path = %store.path().display(),
        "saved backtest signals"
    );

    if let Some(path) = tape {
        write_signals_csv(&signals, path).map_err(ExtractError::Tape)?;
        info!(path = %path.display(), "wrote signal tape");
    }

    Ok(Some(ExtractionOutcome {
        source,
        report,
        signals,
        store_rows,
    }))
}
