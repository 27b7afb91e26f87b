//! Preparation stage: sources → examples → rendered split → dataset files.

use chrono::NaiveDateTime;
use thiserror::Error;
use tracing::{error, info};
use tunelab_core::{build_examples, format_examples, prefix_split, DatasetStats, SplitError};

use crate::config::PipelineConfig;
use crate::dataset::{write_dataset, DatasetError, DatasetFiles};
use crate::loader::load_sources;

#[derive(Debug, Error)]
pub enum PrepareError {
    #[error(transparent)]
    Split(#[from] SplitError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

/// What one preparation run produced.
#[derive(Debug, Clone)]
pub struct PrepareOutcome {
    pub signals: usize,
    pub pnl_records: usize,
    pub examples: usize,
    pub stats: DatasetStats,
    pub files: DatasetFiles,
}

/// Run preparation, stamping statistics with the current local time.
///
/// Returns `Ok(None)` when there is no data or no example could be built;
/// nothing is written in that case.
pub fn run_prepare(config: &PipelineConfig) -> Result<Option<PrepareOutcome>, PrepareError> {
    prepare_at(config, chrono::Local::now().naive_local())
}

/// [`run_prepare`] with an explicit creation time.
pub fn prepare_at(
    config: &PipelineConfig,
    created_at: NaiveDateTime,
) -> Result<Option<PrepareOutcome>, PrepareError> {
    info!("starting data preparation");

    let sources = load_sources(config);
    if sources.is_empty() {
        error!("no trading data found, nothing to prepare");
        return Ok(None);
    }

    let examples = build_examples(&sources.signals, &sources.pnl);
    info!(count = examples.len(), "created training examples");
    if examples.is_empty() {
        error!("no training examples created, check signal features");
        return Ok(None);
    }

    let labeled = format_examples(&examples);
    let split = prefix_split(labeled, config.data.train_split)?.map(|l| l.example);
    let stats = DatasetStats::compute(&split, created_at);
    let files = write_dataset(&config.paths.data_dir, &split, &stats)?;

    info!(
        train = stats.train_examples,
        eval = stats.eval_examples,
        profitable = stats.profitable_trades,
        "data preparation completed"
    );

    Ok(Some(PrepareOutcome {
        signals: sources.signals.len(),
        pnl_records: sources.pnl.len(),
        examples: examples.len(),
        stats,
        files,
    }))
}
