//! Evaluation scoring: compares generated completions against expected targets.
//!
//! Only the profitability call is scored. A prediction is correct when it
//! asserts `Profitable: True` exactly when the expected target does.

use serde::{Deserialize, Serialize};

use crate::prompt::profitability;

/// One scored completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub prompt: String,
    pub expected: String,
    pub predicted: String,
    pub correct: bool,
    /// Label recovered from `expected`.
    #[serde(default)]
    pub expected_profitable: Option<bool>,
    /// Label recovered from `predicted`; `None` when the model never said.
    #[serde(default)]
    pub predicted_profitable: Option<bool>,
}

impl Prediction {
    /// Score a completion, recovering the expected label from `expected`.
    pub fn score(prompt: impl Into<String>, expected: impl Into<String>, predicted: impl Into<String>) -> Self {
        let expected = expected.into();
        let expected_profitable = profitability(&expected);
        Self::score_labeled(prompt, expected, expected_profitable, predicted)
    }

    /// Score a completion against an already known expected label.
    pub fn score_labeled(
        prompt: impl Into<String>,
        expected: impl Into<String>,
        expected_profitable: Option<bool>,
        predicted: impl Into<String>,
    ) -> Self {
        let predicted = predicted.into();
        let predicted_profitable = profitability(&predicted);
        Self {
            correct: is_prediction_correct(predicted_profitable, expected_profitable),
            prompt: prompt.into(),
            expected: expected.into(),
            predicted,
            expected_profitable,
            predicted_profitable,
        }
    }
}

/// Correct when both sides agree on whether the trade is profitable.
///
/// Text that never states profitability counts as "not profitable".
pub fn is_prediction_correct(predicted: Option<bool>, expected: Option<bool>) -> bool {
    (predicted == Some(true)) == (expected == Some(true))
}

/// Running tally for one model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelResults {
    pub correct: usize,
    pub total: usize,
    pub predictions: Vec<Prediction>,
}

impl ModelResults {
    pub fn record(&mut self, prediction: Prediction) {
        if prediction.correct {
            self.correct += 1;
        }
        self.total += 1;
        self.predictions.push(prediction);
    }
}

/// Summary metrics for one model over the profitable class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub total_examples: usize,
    pub correct_predictions: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl ModelMetrics {
    /// Precision/recall treat `Profitable: True` as the positive class. A
    /// prediction that states neither label is never a false negative.
    pub fn compute(results: &ModelResults) -> Self {
        let mut tp = 0;
        let mut fp = 0;
        let mut fn_ = 0;
        for p in &results.predictions {
            match (p.predicted_profitable, p.expected_profitable) {
                (Some(true), Some(true)) => tp += 1,
                (Some(true), Some(false)) => fp += 1,
                (Some(false), Some(true)) => fn_ += 1,
                _ => {}
            }
        }

        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            accuracy: ratio(results.correct, results.total),
            precision,
            recall,
            f1_score,
            total_examples: results.total,
            correct_predictions: results.correct,
        }
    }
}

/// Relative accuracy change of `candidate` over `baseline`, in percent.
///
/// Zero when the baseline accuracy is zero.
pub fn accuracy_improvement_pct(baseline: &ModelMetrics, candidate: &ModelMetrics) -> f64 {
    if baseline.accuracy > 0.0 {
        (candidate.accuracy - baseline.accuracy) / baseline.accuracy * 100.0
    } else {
        0.0
    }
}
