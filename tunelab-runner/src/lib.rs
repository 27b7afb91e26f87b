//! TuneLab Runner: everything in the pipeline that touches the outside world.
//!
//! This crate builds on `tunelab-core` to provide:
//! - TOML pipeline configuration with defaults and validation
//! - SQLite stores: live trading reader and the migrated backtest signal store
//! - Backtest result discovery, extraction, and the CSV signal tape
//! - Dataset preparation and the train/eval/statistics files
//! - Trainer and generator process boundaries with evaluation scoring

pub mod backtest_file;
pub mod config;
pub mod dataset;
pub mod evaluate;
pub mod export;
pub mod extraction;
pub mod loader;
pub mod prepare;
pub mod store;
pub mod train;

pub use backtest_file::{latest_backtest_file, load_backtest_report, BacktestFileError};
pub use config::{ConfigError, PipelineConfig, DEFAULT_CONFIG_PATH};
pub use dataset::{load_examples, write_dataset, DatasetError, DatasetFiles};
pub use evaluate::{
    configured_generators, format_summary, run_evaluation, CommandGenerator, EvalCase, EvalError,
    EvaluationMetrics, EvaluationReport, EvaluationResults, Generator,
};
pub use extraction::{run_extraction, ExtractError, ExtractionOutcome};
pub use loader::load_sources;
pub use prepare::{run_prepare, PrepareError, PrepareOutcome};
pub use store::{load_backtest, load_live, BacktestSignalStore, StoreError};
pub use train::{run_training, ExternalTrainer, Trainer, TrainError, TrainingJob, TrainingMetadata};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_is_send_sync() {
        assert_send::<PipelineConfig>();
        assert_sync::<PipelineConfig>();
    }

    #[test]
    fn stage_outcomes_are_send() {
        assert_send::<ExtractionOutcome>();
        assert_send::<PrepareOutcome>();
        assert_send::<EvaluationReport>();
        assert_send::<TrainingMetadata>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<ExtractError>();
        assert_sync::<ExtractError>();
        assert_send::<TrainError>();
        assert_send::<EvalError>();
        assert_send::<PrepareError>();
    }
}
