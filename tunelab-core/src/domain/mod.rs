//! Domain types for TuneLab

pub mod example;
pub mod pnl;
pub mod signal;
pub mod time;
pub mod trade;

pub use example::{FormattedExample, InputFeatures, LabeledExample, Labels, TrainingExample};
pub use pnl::{PnlRecord, BACKTEST_EXIT_REASON, NO_TRADE};
pub use signal::{parse_features, BacktestOutcome, Decision, Features, SignalRow, BACKTEST_TRIGGER};
pub use trade::{BacktestMetrics, BacktestParams, BacktestReport, BacktestTrade, Side};
