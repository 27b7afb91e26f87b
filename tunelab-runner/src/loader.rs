//! Source loading: live trading database plus backtest signal store.

use tracing::{info, warn};
use tunelab_core::{merge_sources, SourceData};

use crate::config::PipelineConfig;
use crate::store::{load_backtest, load_live};

/// Load both configured sources and merge them into one sorted collection.
///
/// Missing sources contribute nothing; the caller decides whether an empty
/// result is fatal.
pub fn load_sources(config: &PipelineConfig) -> SourceData {
    let live = match config.live_db_path() {
        Some(path) => load_live(path),
        None => {
            warn!("no live trading data source configured");
            SourceData::default()
        }
    };
    if config.trading.data_sources.len() > 1 {
        warn!(
            ignored = config.trading.data_sources.len() - 1,
            "only the first live data source is read"
        );
    }

    let backtest = load_backtest(&config.paths.backtest_db);
    let backtest_signals = backtest.len();

    let merged = merge_sources(live, backtest, &config.trading.backtest_symbol);
    if backtest_signals > 0 {
        info!(
            total = merged.signals.len(),
            backtest = backtest_signals,
            "combined live and backtest signals"
        );
    }
    merged
}
