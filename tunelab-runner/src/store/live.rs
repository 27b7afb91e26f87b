//! Live trading database reader.
//!
//! The bot owns this database; the pipeline only reads `signals` and `pnl`.
//! Column types drift between bot versions, so every column is read as a
//! dynamic value and coerced.

use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use tracing::{error, info, warn};
use tunelab_core::domain::{Decision, PnlRecord, SignalRow};
use tunelab_core::SourceData;

use super::{value_to_f64, value_to_millis, value_to_text, StoreError};

const SIGNALS_SQL: &str =
    "SELECT timestamp, decision, confidence, \"trigger\", features FROM signals ORDER BY timestamp ASC";

const PNL_SQL: &str = "SELECT ts, symbol, pnlUsd, reason FROM pnl ORDER BY ts ASC";

/// Load live signals and PnL records.
///
/// A missing database is logged as an error and yields empty collections.
/// Each table is read independently; a failing query empties only that table.
pub fn load_live(path: &Path) -> SourceData {
    if !path.exists() {
        error!(path = %path.display(), "live trading database not found");
        return SourceData::default();
    }

    let conn = match Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY) {
        Ok(conn) => conn,
        Err(source) => {
            let e = StoreError::Open {
                path: path.to_path_buf(),
                source,
            };
            error!(error = %e, "failed to open live trading database");
            return SourceData::default();
        }
    };

    let signals = read_signals(&conn).unwrap_or_else(|e| {
        error!(path = %path.display(), error = %e, "failed to read signals");
        Vec::new()
    });
    let pnl = read_pnl(&conn).unwrap_or_else(|e| {
        error!(path = %path.display(), error = %e, "failed to read pnl");
        Vec::new()
    });

    info!(
        signals = signals.len(),
        pnl = pnl.len(),
        path = %path.display(),
        "loaded live trading data"
    );
    SourceData::new(signals, pnl)
}

fn read_signals(conn: &Connection) -> Result<Vec<SignalRow>, StoreError> {
    let mut stmt = conn.prepare(SIGNALS_SQL)?;
    let raw = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, Value>(0)?,
                row.get::<_, Value>(1)?,
                row.get::<_, Value>(2)?,
                row.get::<_, Value>(3)?,
                row.get::<_, Value>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut rows = Vec::with_capacity(raw.len());
    let mut dropped = 0usize;
    for (ts, decision, confidence, trigger, features) in raw {
        let Some(timestamp) = value_to_millis(&ts) else {
            dropped += 1;
            continue;
        };
        rows.push(SignalRow {
            timestamp,
            decision: Decision::parse(&value_to_text(decision).unwrap_or_default()),
            confidence: value_to_f64(&confidence).unwrap_or(0.0),
            trigger: value_to_text(trigger).unwrap_or_default(),
            features: value_to_text(features),
            outcome: None,
        });
    }
    if dropped > 0 {
        warn!(dropped, "dropped live signals with unreadable timestamps");
    }
    Ok(rows)
}

fn read_pnl(conn: &Connection) -> Result<Vec<PnlRecord>, StoreError> {
    let mut stmt = conn.prepare(PNL_SQL)?;
    let raw = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, Value>(0)?,
                row.get::<_, Value>(1)?,
                row.get::<_, Value>(2)?,
                row.get::<_, Value>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut records = Vec::with_capacity(raw.len());
    let mut dropped = 0usize;
    for (ts, symbol, pnl, reason) in raw {
        let Some(timestamp) = value_to_millis(&ts) else {
            dropped += 1;
            continue;
        };
        records.push(PnlRecord::new(
            timestamp,
            value_to_text(symbol).unwrap_or_default(),
            value_to_f64(&pnl).unwrap_or(0.0),
            value_to_text(reason).unwrap_or_default(),
        ));
    }
    if dropped > 0 {
        warn!(dropped, "dropped pnl rows with unreadable timestamps");
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live_db(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("trading.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            r#"
CREATE TABLE signals (timestamp, decision TEXT, confidence REAL, "trigger" TEXT, features TEXT);
CREATE TABLE pnl (ts, symbol TEXT, pnlUsd REAL, reason TEXT);

INSERT INTO signals VALUES (3600000, 'SHORT', 0.6, 'volume_spike', '{"price": 99.0}');
INSERT INTO signals VALUES ('1970-01-01T00:00:00Z', 'long', 0.8, 'breakout', '{"price": 100.0}');
INSERT INTO signals VALUES ('whenever', 'LONG', 0.5, 'breakout', '{}');
INSERT INTO signals VALUES (7200000.0, 'FLAT', '0.4', 'exit', NULL);

INSERT INTO pnl VALUES (1800000, 'SOL-PERP', 2.5, 'tp');
INSERT INTO pnl VALUES ('900000', 'SOL-PERP', -1.0, 'sl');
"#,
        )
        .unwrap();
        path
    }

    #[test]
    fn reads_and_coerces_both_tables() {
        let dir = tempfile::tempdir().unwrap();
        let data = load_live(&live_db(dir.path()));

        let ts: Vec<i64> = data.signals.iter().map(|s| s.timestamp).collect();
        assert_eq!(ts.len(), 3);
        assert!(ts.contains(&0) && ts.contains(&3_600_000) && ts.contains(&7_200_000));

        let long = data.signals.iter().find(|s| s.timestamp == 0).unwrap();
        assert_eq!(long.decision, Decision::Long);
        assert_eq!(long.confidence, 0.8);
        assert_eq!(long.trigger, "breakout");
        assert!(long.outcome.is_none());

        let flat = data.signals.iter().find(|s| s.timestamp == 7_200_000).unwrap();
        assert_eq!(flat.confidence, 0.4);
        assert!(flat.features.is_none());

        assert_eq!(data.pnl.len(), 2);
        assert!(data.pnl.iter().any(|p| p.timestamp == 900_000 && p.exit_reason == "sl"));
        assert!(data.pnl.iter().any(|p| p.pnl == 2.5 && p.symbol == "SOL-PERP"));
    }

    #[test]
    fn missing_database_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let data = load_live(&dir.path().join("nope.db"));
        assert!(data.is_empty());
        assert!(data.pnl.is_empty());
    }

    #[test]
    fn missing_table_empties_only_that_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE pnl (ts INTEGER, symbol TEXT, pnlUsd REAL, reason TEXT);
             INSERT INTO pnl VALUES (10, 'SOL-PERP', 1.0, 'tp');",
        )
        .unwrap();
        drop(conn);

        let data = load_live(&path);
        assert!(data.signals.is_empty());
        assert_eq!(data.pnl.len(), 1);
    }
}
