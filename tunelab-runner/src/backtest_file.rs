//! Backtest result files: discovery and loading.
//!
//! The backtester drops `backtest-*.json` files into one directory; the
//! most recently modified file is the one to extract.

use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use tunelab_core::domain::BacktestReport;

/// File name prefix and extension of backtest result files.
pub const BACKTEST_FILE_PREFIX: &str = "backtest-";
pub const BACKTEST_FILE_EXT: &str = "json";

#[derive(Debug, Error)]
pub enum BacktestFileError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse backtest result {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn is_backtest_file(path: &Path) -> bool {
    let name_ok = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(BACKTEST_FILE_PREFIX));
    let ext_ok = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e == BACKTEST_FILE_EXT);
    name_ok && ext_ok
}

/// Find the most recently modified backtest file in `dir`.
///
/// Returns `Ok(None)` when the directory is missing or holds no matching
/// files. Ties on modification time go to the lexicographically last name.
pub fn latest_backtest_file(dir: &Path) -> Result<Option<PathBuf>, BacktestFileError> {
    if !dir.is_dir() {
        return Ok(None);
    }

    let entries = std::fs::read_dir(dir).map_err(|source| BacktestFileError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut latest: Option<(SystemTime, PathBuf)> = None;
    for entry in entries {
        let entry = entry.map_err(|source| BacktestFileError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_file() || !is_backtest_file(&path) {
            continue;
        }
        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .map_err(|source| BacktestFileError::Io {
                path: path.clone(),
                source,
            })?;

        let newer = match &latest {
            None => true,
            Some((t, p)) => (modified, &path) > (*t, p),
        };
        if newer {
            latest = Some((modified, path));
        }
    }
    Ok(latest.map(|(_, p)| p))
}

/// Load and parse one backtest result file.
pub fn load_backtest_report(path: &Path) -> Result<BacktestReport, BacktestFileError> {
    let content = std::fs::read_to_string(path).map_err(|source| BacktestFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| BacktestFileError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{File, FileTimes};
    use std::time::Duration;
    use tunelab_core::domain::Side;

    const SAMPLE: &str = r#"{
        "trades": [
            {"side": "LONG", "price": 100.0, "ts": 0},
            {"side": "FLAT", "price": 110.0, "ts": 60000}
        ],
        "equityCurve": [{"ts": 0, "equity": 1000.0}],
        "params": {"startDate": "2024-01-01", "endDate": "2024-02-01", "strategy": "e3"},
        "metrics": {"trades": 1, "pnl": 10.0, "maxDrawdown": 0.5}
    }"#;

    fn write_with_mtime(path: &Path, body: &str, secs: u64) {
        std::fs::write(path, body).unwrap();
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(secs);
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_times(FileTimes::new().set_modified(t))
            .unwrap();
    }

    #[test]
    fn picks_most_recently_modified() {
        let dir = tempfile::tempdir().unwrap();
        write_with_mtime(&dir.path().join("backtest-b.json"), SAMPLE, 1_000);
        write_with_mtime(&dir.path().join("backtest-a.json"), SAMPLE, 2_000);
        write_with_mtime(&dir.path().join("notes.json"), SAMPLE, 3_000);
        write_with_mtime(&dir.path().join("backtest-c.txt"), SAMPLE, 4_000);

        let latest = latest_backtest_file(dir.path()).unwrap().unwrap();
        assert_eq!(latest.file_name().unwrap(), "backtest-a.json");
    }

    #[test]
    fn missing_or_empty_dir_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(latest_backtest_file(dir.path()).unwrap().is_none());
        assert!(latest_backtest_file(&dir.path().join("absent")).unwrap().is_none());
    }

    #[test]
    fn loads_report_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backtest-1.json");
        std::fs::write(&path, SAMPLE).unwrap();

        let report = load_backtest_report(&path).unwrap();
        assert_eq!(report.trades.len(), 2);
        assert_eq!(report.trades[0].side, Side::Long);
        assert_eq!(report.params.strategy, "e3");
        assert_eq!(report.metrics.max_drawdown, 0.5);
        assert_eq!(report.equity_curve.len(), 1);
    }

    #[test]
    fn unrecognized_side_still_loads_and_never_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backtest-2.json");
        std::fs::write(
            &path,
            r#"{"trades": [
                {"side": "LONG", "price": 100.0, "ts": 0},
                {"side": "REBALANCE", "price": 100.5, "ts": 30000},
                {"side": "FLAT", "price": 110.0, "ts": 60000}
            ]}"#,
        )
        .unwrap();

        let report = load_backtest_report(&path).unwrap();
        assert_eq!(report.trades[1].side, Side::Unknown);
        assert!(tunelab_core::extract_signals(&report.trades).is_empty());
    }

    #[test]
    fn malformed_report_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backtest-bad.json");
        std::fs::write(&path, "{\"trades\": 3}").unwrap();
        let err = load_backtest_report(&path).unwrap_err();
        assert!(matches!(err, BacktestFileError::Parse { .. }));
        assert!(err.to_string().contains("backtest-bad.json"));
    }
}
