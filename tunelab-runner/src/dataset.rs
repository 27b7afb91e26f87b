//! Dataset files: `train.json`, `eval.json` and `dataset_stats.json`.
//!
//! The train/eval files are pretty-printed JSON arrays of formatted
//! examples and are the only contract with the trainer and evaluator.

use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use tunelab_core::domain::FormattedExample;
use tunelab_core::{DatasetSplit, DatasetStats};

pub const TRAIN_FILE: &str = "train.json";
pub const EVAL_FILE: &str = "eval.json";
pub const STATS_FILE: &str = "dataset_stats.json";

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error on {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Paths of one written dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetFiles {
    pub train: PathBuf,
    pub eval: PathBuf,
    pub stats: PathBuf,
}

impl DatasetFiles {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            train: dir.join(TRAIN_FILE),
            eval: dir.join(EVAL_FILE),
            stats: dir.join(STATS_FILE),
        }
    }
}

pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), DatasetError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| DatasetError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|source| DatasetError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, json).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a split and its statistics into `dir`.
pub fn write_dataset(
    dir: &Path,
    split: &DatasetSplit<FormattedExample>,
    stats: &DatasetStats,
) -> Result<DatasetFiles, DatasetError> {
    let files = DatasetFiles::in_dir(dir);

    write_json(&files.train, &split.train)?;
    info!(count = split.train.len(), path = %files.train.display(), "saved training examples");

    write_json(&files.eval, &split.eval)?;
    info!(count = split.eval.len(), path = %files.eval.display(), "saved evaluation examples");

    write_json(&files.stats, stats)?;
    info!(path = %files.stats.display(), "saved dataset statistics");

    Ok(files)
}

/// Read a formatted-example file written by [`write_dataset`].
pub fn load_examples(path: &Path) -> Result<Vec<FormattedExample>, DatasetError> {
    let content = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| DatasetError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Read dataset statistics written by [`write_dataset`].
pub fn load_stats(path: &Path) -> Result<DatasetStats, DatasetError> {
    let content = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| DatasetError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tunelab_core::prefix_split;

    fn example(i: usize, profitable: bool) -> FormattedExample {
        FormattedExample {
            instruction: format!("Analyze signal {i}"),
            output: format!("Trade Analysis:\nProfitable: {}\n", if profitable { "True" } else { "False" }),
            input: String::new(),
        }
    }

    fn created() -> chrono::NaiveDateTime {
        chrono::DateTime::from_timestamp(1_700_000_000, 0)
            .unwrap()
            .naive_utc()
    }

    #[test]
    fn writes_three_files_into_new_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("training/data");
        let split = prefix_split((0..5).map(|i| example(i, i % 2 == 0)).collect(), 0.8).unwrap();
        let stats = DatasetStats::compute(&split, created());

        let files = write_dataset(&out, &split, &stats).unwrap();
        assert_eq!(files, DatasetFiles::in_dir(&out));

        let train = load_examples(&files.train).unwrap();
        let eval = load_examples(&files.eval).unwrap();
        assert_eq!(train, split.train);
        assert_eq!(eval, split.eval);
        assert_eq!(load_stats(&files.stats).unwrap(), stats);
    }

    #[test]
    fn files_use_the_external_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let split = prefix_split(vec![example(0, true), example(1, false)], 0.5).unwrap();
        let stats = DatasetStats::compute(&split, created());
        let files = write_dataset(dir.path(), &split, &stats).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&files.train).unwrap()).unwrap();
        let first = &raw[0];
        assert_eq!(first["instruction"], "Analyze signal 0");
        assert_eq!(first["input"], "");
        assert!(first["output"].as_str().unwrap().contains("Profitable: True"));

        let stats_raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&files.stats).unwrap()).unwrap();
        for key in [
            "total_examples",
            "train_examples",
            "eval_examples",
            "profitable_trades",
            "unprofitable_trades",
            "created_at",
            "dataset_hash",
        ] {
            assert!(stats_raw.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn example_without_input_field_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eval.json");
        std::fs::write(&path, r#"[{"instruction": "i", "output": "o"}]"#).unwrap();
        let loaded = load_examples(&path).unwrap();
        assert_eq!(loaded[0].input, "");
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_examples(&dir.path().join("train.json")).unwrap_err();
        assert!(matches!(err, DatasetError::Io { .. }));
    }
}
