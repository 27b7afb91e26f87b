//! SQLite stores: the live trading database (read-only) and the
//! backtest signal store (append-only, owned by this pipeline).
//!
//! Each call opens its own connection and drops it before returning.

pub mod backtest;
pub mod live;

pub use backtest::{load_backtest, BacktestSignalStore};
pub use live::load_live;

use rusqlite::types::Value;
use std::path::PathBuf;
use thiserror::Error;
use tunelab_core::domain::time::{coerce_real_millis, coerce_text_millis};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open database {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to create parent directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("schema migration failed: {0}")]
    Migration(#[source] rusqlite::Error),

    #[error("database query failed: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("failed to encode features: {0}")]
    Features(#[from] serde_json::Error),
}

/// Coerce a dynamically typed timestamp column to epoch ms.
///
/// Returns `None` for NULL, blobs and unparseable text.
pub fn value_to_millis(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(ms) => Some(*ms),
        Value::Real(ms) => coerce_real_millis(*ms),
        Value::Text(raw) => coerce_text_millis(raw),
        Value::Null | Value::Blob(_) => None,
    }
}

/// Read a dynamically typed column as text, for free-text columns that
/// older writers sometimes filled with numbers.
pub(crate) fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::Text(s) => Some(s),
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(f) => Some(f.to_string()),
        Value::Null | Value::Blob(_) => None,
    }
}

/// Read a dynamically typed column as a float; text is parsed.
pub(crate) fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(i) => Some(*i as f64),
        Value::Real(f) => Some(*f),
        Value::Text(s) => s.trim().parse().ok(),
        Value::Null | Value::Blob(_) => None,
    }
}
