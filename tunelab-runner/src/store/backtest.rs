//! Backtest signal store: derived round trips, appended per extraction run.
//!
//! The schema is versioned with `PRAGMA user_version` and migrated once when
//! the store is opened. Inserts never touch the schema.

use rusqlite::types::Value;
use rusqlite::{params, Connection, OpenFlags};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use tunelab_core::domain::{BacktestOutcome, Decision, SignalRow, BACKTEST_TRIGGER};
use tunelab_core::DerivedSignal;

use super::{value_to_millis, value_to_text, StoreError};

/// Ordered schema migrations. Entry `i` moves the store to version `i + 1`.
const MIGRATIONS: &[&str] = &[r#"
CREATE TABLE IF NOT EXISTS backtest_signals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp INTEGER,
    side TEXT,
    entry_price REAL,
    exit_price REAL,
    pnl REAL,
    hold_time REAL,
    profitable INTEGER,
    entry_time TEXT,
    exit_time TEXT,
    features TEXT
);

CREATE INDEX IF NOT EXISTS idx_backtest_signals_timestamp
    ON backtest_signals(timestamp);
"#];

const INSERT_SQL: &str = "INSERT INTO backtest_signals \
    (timestamp, side, entry_price, exit_price, pnl, hold_time, profitable, entry_time, exit_time, features) \
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)";

const SELECT_SQL: &str = "SELECT timestamp, side, pnl, profitable, hold_time, features \
    FROM backtest_signals ORDER BY timestamp ASC, id ASC";

/// Current schema version.
pub fn schema_version() -> i64 {
    MIGRATIONS.len() as i64
}

/// Handle to a migrated backtest signal store.
///
/// Holds only the path; every operation opens and drops its own connection.
#[derive(Debug, Clone)]
pub struct BacktestSignalStore {
    path: PathBuf,
}

impl BacktestSignalStore {
    /// Open (creating if needed) and migrate the store at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self { path: path.into() };
        if let Some(parent) = store.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut conn = store.connect()?;
        let from = migrate(&mut conn).map_err(StoreError::Migration)?;
        if from < schema_version() {
            info!(
                path = %store.path.display(),
                from,
                to = schema_version(),
                "migrated backtest signal store"
            );
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        Connection::open(&self.path).map_err(|source| StoreError::Open {
            path: self.path.clone(),
            source,
        })
    }

    /// Append derived signals in a single transaction.
    ///
    /// An empty slice commits an empty transaction.
    pub fn insert(&self, signals: &[DerivedSignal]) -> Result<usize, StoreError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(INSERT_SQL)?;
            for s in signals {
                let features = serde_json::to_string(&s.features())?;
                stmt.execute(params![
                    s.timestamp,
                    s.side.as_str(),
                    s.entry_price,
                    s.exit_price,
                    s.pnl,
                    s.hold_time,
                    s.profitable,
                    s.entry_time(),
                    s.exit_time(),
                    features,
                ])?;
            }
        }
        tx.commit()?;
        debug!(rows = signals.len(), path = %self.path.display(), "stored derived signals");
        Ok(signals.len())
    }

    /// Total rows in the store.
    pub fn count(&self) -> Result<u64, StoreError> {
        let conn = self.connect()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM backtest_signals", [], |row| row.get(0))?;
        Ok(n.max(0) as u64)
    }
}

/// Apply pending migrations. Returns the version the store was at before.
fn migrate(conn: &mut Connection) -> rusqlite::Result<i64> {
    let current: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    let start = current.max(0) as usize;
    for (idx, sql) in MIGRATIONS.iter().enumerate().skip(start) {
        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", (idx + 1) as i64)?;
        tx.commit()?;
    }
    Ok(current)
}

/// Load stored backtest signals as uniform signal rows, oldest first.
///
/// A missing file is normal before the first extraction and yields no rows.
/// Query failures are logged and also yield no rows.
pub fn load_backtest(path: &Path) -> Vec<SignalRow> {
    if !path.exists() {
        info!(path = %path.display(), "no backtest signal store, skipping");
        return Vec::new();
    }

    match read_rows(path) {
        Ok(rows) => {
            info!(rows = rows.len(), path = %path.display(), "loaded backtest signals");
            rows
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "failed to read backtest signals");
            Vec::new()
        }
    }
}

struct RawRow {
    timestamp: Value,
    side: Value,
    pnl: Option<f64>,
    profitable: Option<i64>,
    hold_time: Option<f64>,
    features: Option<String>,
}

fn read_rows(path: &Path) -> Result<Vec<SignalRow>, StoreError> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(|source| {
        StoreError::Open {
            path: path.to_path_buf(),
            source,
        }
    })?;

    let mut stmt = conn.prepare(SELECT_SQL)?;
    let raw = stmt
        .query_map([], |row| {
            Ok(RawRow {
                timestamp: row.get(0)?,
                side: row.get(1)?,
                pnl: row.get(2)?,
                profitable: row.get(3)?,
                hold_time: row.get(4)?,
                features: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut rows = Vec::with_capacity(raw.len());
    let mut dropped = 0usize;
    for r in raw {
        let Some(timestamp) = value_to_millis(&r.timestamp) else {
            dropped += 1;
            continue;
        };
        let pnl = r.pnl.unwrap_or(0.0);
        rows.push(SignalRow {
            timestamp,
            decision: Decision::parse(&value_to_text(r.side).unwrap_or_default()),
            confidence: 1.0,
            trigger: BACKTEST_TRIGGER.to_string(),
            features: r.features,
            outcome: Some(BacktestOutcome {
                pnl,
                profitable: r.profitable.map(|p| p != 0).unwrap_or(pnl > 0.0),
                hold_time: r.hold_time.unwrap_or(0.0),
            }),
        });
    }
    if dropped > 0 {
        warn!(dropped, path = %path.display(), "dropped backtest rows with unreadable timestamps");
    }
    Ok(rows)
}
