//! TuneLab Core: domain types and the pure data-to-training-example pipeline.
//!
//! This crate contains everything that does not touch the filesystem:
//! - Domain types (signal rows, PnL records, backtest trades, training examples)
//! - Backtest trade pairing into derived signals
//! - Source merging and the attribution-window join with label derivation
//! - Prompt and target rendering, plus profitability extraction from text
//! - Prefix train/eval split and dataset statistics
//! - Evaluation scoring (accuracy, precision, recall, F1)

pub mod builder;
pub mod domain;
pub mod extract;
pub mod prompt;
pub mod scoring;
pub mod split;

pub use builder::{build_examples, merge_sources, SourceData, ATTRIBUTION_WINDOW_MS};
pub use extract::{extract_signals, DerivedSignal};
pub use prompt::{format_example, format_examples, profitability};
pub use split::{prefix_split, DatasetSplit, DatasetStats, SplitError};
