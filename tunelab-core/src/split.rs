//! Train/eval prefix split and dataset statistics.
//!
//! The split takes a leading contiguous slice for training and leaves the
//! rest for evaluation. Examples arrive in timestamp order, so the eval set
//! is always the most recent data; there is no shuffling.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::FormattedExample;
use crate::prompt::profitability;

#[derive(Debug, Error, PartialEq)]
pub enum SplitError {
    #[error("train split fraction must be strictly between 0 and 1, got {0}")]
    InvalidFraction(f64),
}

/// Training and evaluation partitions.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSplit<T> {
    pub train: Vec<T>,
    pub eval: Vec<T>,
}

impl<T> DatasetSplit<T> {
    pub fn len(&self) -> usize {
        self.train.len() + self.eval.len()
    }

    pub fn is_empty(&self) -> bool {
        self.train.is_empty() && self.eval.is_empty()
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> DatasetSplit<U> {
        DatasetSplit {
            train: self.train.into_iter().map(&mut f).collect(),
            eval: self.eval.into_iter().map(&mut f).collect(),
        }
    }

    /// Train followed by eval, i.e. the input order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.train.iter().chain(self.eval.iter())
    }
}

/// Number of training examples for `n` examples at fraction `f`: `floor(n·f)`.
pub fn train_len(n: usize, fraction: f64) -> usize {
    ((n as f64) * fraction).floor() as usize
}

/// Split `examples` into a training prefix and an evaluation remainder.
pub fn prefix_split<T>(mut examples: Vec<T>, fraction: f64) -> Result<DatasetSplit<T>, SplitError> {
    if !(fraction > 0.0 && fraction < 1.0) {
        return Err(SplitError::InvalidFraction(fraction));
    }

    let cut = train_len(examples.len(), fraction).min(examples.len());
    let eval = examples.split_off(cut);
    Ok(DatasetSplit {
        train: examples,
        eval,
    })
}

/// Summary persisted next to the train/eval files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetStats {
    pub total_examples: usize,
    pub train_examples: usize,
    pub eval_examples: usize,
    pub profitable_trades: usize,
    pub unprofitable_trades: usize,
    pub created_at: NaiveDateTime,
    /// BLAKE3 over every instruction/output pair in split order.
    pub dataset_hash: String,
}

impl DatasetStats {
    /// Compute statistics over a rendered split.
    ///
    /// Profitable counts come from the rendered outputs, the same way any
    /// consumer of the files would recover them. Every example lands in
    /// exactly one bucket; an output stating no label counts as unprofitable.
    pub fn compute(split: &DatasetSplit<FormattedExample>, created_at: NaiveDateTime) -> Self {
        let profitable_trades = split
            .iter()
            .filter(|ex| profitability(&ex.output) == Some(true))
            .count();
        let unprofitable_trades = split.len() - profitable_trades;

        Self {
            total_examples: split.len(),
            train_examples: split.train.len(),
            eval_examples: split.eval.len(),
            profitable_trades,
            unprofitable_trades,
            created_at,
            dataset_hash: dataset_hash(split),
        }
    }
}

/// Deterministic fingerprint of a split.
///
/// Length-prefixes every field so that moving text between the instruction
/// and output, or between train and eval, changes the hash.
pub fn dataset_hash(split: &DatasetSplit<FormattedExample>) -> String {
    let mut hasher = blake3::Hasher::new();
    for (tag, part) in [(b"train", &split.train), (b"eval\0", &split.eval)] {
        hasher.update(tag);
        hasher.update(&(part.len() as u64).to_le_bytes());
        for ex in part {
            for field in [&ex.instruction, &ex.output, &ex.input] {
                hasher.update(&(field.len() as u64).to_le_bytes());
                hasher.update(field.as_bytes());
            }
        }
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Labels;
    use crate::prompt::render_target;

    fn ex(profitable: bool) -> FormattedExample {
        FormattedExample {
            instruction: "Analyze".into(),
            output: render_target(&Labels {
                profitable,
                pnl: if profitable { 2.0 } else { -2.0 },
                hold_time: 60,
                exit_reason: "tp".into(),
            }),
            input: String::new(),
        }
    }

    fn created() -> NaiveDateTime {
        chrono::DateTime::from_timestamp(1_700_000_000, 0)
            .unwrap()
            .naive_utc()
    }

    #[test]
    fn split_takes_floor_prefix() {
        let split = prefix_split((0..10).collect::<Vec<_>>(), 0.8).unwrap();
        assert_eq!(split.train, vec![0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(split.eval, vec![8, 9]);
    }

    #[test]
    fn split_floors_fractional_counts() {
        let split = prefix_split((0..7).collect::<Vec<_>>(), 0.5).unwrap();
        assert_eq!(split.train.len(), 3);
        assert_eq!(split.eval.len(), 4);
    }

    #[test]
    fn tiny_input_goes_entirely_to_eval() {
        let split = prefix_split(vec!["only"], 0.8).unwrap();
        assert!(split.train.is_empty());
        assert_eq!(split.eval, vec!["only"]);
    }

    #[test]
    fn empty_input_splits_to_empty() {
        let split = prefix_split(Vec::<u8>::new(), 0.8).unwrap();
        assert!(split.is_empty());
    }

    #[test]
    fn fraction_bounds_are_exclusive() {
        assert_eq!(
            prefix_split(vec![1], 0.0).unwrap_err(),
            SplitError::InvalidFraction(0.0)
        );
        assert!(prefix_split(vec![1], 1.0).is_err());
        assert!(prefix_split(vec![1], f64::NAN).is_err());
    }

    #[test]
    fn stats_count_rendered_labels() {
        let split = prefix_split(vec![ex(true), ex(false), ex(true), ex(false), ex(false)], 0.6).unwrap();
        let stats = DatasetStats::compute(&split, created());
        assert_eq!(stats.total_examples, 5);
        assert_eq!(stats.train_examples, 3);
        assert_eq!(stats.eval_examples, 2);
        assert_eq!(stats.profitable_trades, 2);
        assert_eq!(stats.unprofitable_trades, 3);
        assert_eq!(
            stats.profitable_trades + stats.unprofitable_trades,
            stats.total_examples
        );
    }

    #[test]
    fn quoted_label_in_exit_reason_is_counted_once() {
        let output = render_target(&Labels {
            profitable: false,
            pnl: -4.0,
            hold_time: 60,
            exit_reason: "manual (Profitable: True override)".into(),
        });
        let quoted = FormattedExample {
            instruction: "Analyze".into(),
            output,
            input: String::new(),
        };
        let split = prefix_split(vec![quoted, ex(true)], 0.5).unwrap();
        let stats = DatasetStats::compute(&split, created());
        assert_eq!(stats.total_examples, 2);
        assert_eq!(stats.profitable_trades, 1);
        assert_eq!(stats.unprofitable_trades, 1);
    }

    #[test]
    fn hash_depends_on_split_point() {
        let items = vec![ex(true), ex(false), ex(true), ex(false)];
        let a = prefix_split(items.clone(), 0.5).unwrap();
        let b = prefix_split(items, 0.75).unwrap();
        assert_ne!(dataset_hash(&a), dataset_hash(&b));
        assert_eq!(dataset_hash(&a), dataset_hash(&a.clone()));
    }
}
