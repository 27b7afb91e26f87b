//! Evaluation stage: score base and base+adapter completions on `eval.json`.
//!
//! Generation happens in an external process behind the [`Generator`]
//! trait. Only the profitability call in each completion is scored.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;
use tracing::{error, info, warn};
use tunelab_core::domain::FormattedExample;
use tunelab_core::prompt::generation_prompt;
use tunelab_core::profitability;
use tunelab_core::scoring::{accuracy_improvement_pct, ModelMetrics, ModelResults, Prediction};

use crate::config::PipelineConfig;
use crate::dataset::{load_examples, write_json, DatasetError};

/// Progress is logged after every this many examples.
pub const PROGRESS_EVERY: usize = 10;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("generator command is empty")]
    EmptyCommand,

    #[error("failed to run generator `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("generator exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },
}

/// Produces a completion for a generation prompt.
pub trait Generator {
    fn generate(&self, prompt: &str) -> Result<String, EvalError>;
}

/// Generator backed by an external command.
///
/// The prompt is written to stdin and the completion is read from stdout.
/// Arguments appended to the configured command:
/// `--model <base> [--adapter <dir>] --temperature <t> --max-new-tokens <n> --max-prompt-tokens <n>`
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    command: Vec<String>,
    model: String,
    adapter: Option<PathBuf>,
    temperature: f64,
    max_new_tokens: u32,
    max_prompt_tokens: u32,
}

impl CommandGenerator {
    /// Generator for the base model alone.
    pub fn base(config: &PipelineConfig) -> Self {
        let eval = &config.evaluation;
        Self {
            command: eval.generator_command.clone(),
            model: config.model.base_model.clone(),
            adapter: None,
            temperature: eval.temperature,
            max_new_tokens: eval.max_new_tokens,
            max_prompt_tokens: eval.max_prompt_tokens,
        }
    }

    /// Generator for the base model with an adapter applied.
    pub fn with_adapter(config: &PipelineConfig, adapter: impl Into<PathBuf>) -> Self {
        Self {
            adapter: Some(adapter.into()),
            ..Self::base(config)
        }
    }

    /// Arguments appended after the configured command.
    pub fn extra_args(&self) -> Vec<String> {
        let mut args = vec!["--model".to_string(), self.model.clone()];
        if let Some(adapter) = &self.adapter {
            args.push("--adapter".into());
            args.push(adapter.display().to_string());
        }
        args.extend([
            "--temperature".to_string(),
            self.temperature.to_string(),
            "--max-new-tokens".to_string(),
            self.max_new_tokens.to_string(),
            "--max-prompt-tokens".to_string(),
            self.max_prompt_tokens.to_string(),
        ]);
        args
    }
}

impl Generator for CommandGenerator {
    fn generate(&self, prompt: &str) -> Result<String, EvalError> {
        let (program, args) = self.command.split_first().ok_or(EvalError::EmptyCommand)?;
        let spawn_err = |source: std::io::Error| EvalError::Spawn {
            program: program.clone(),
            source,
        };

        let mut child = Command::new(program)
            .args(args)
            .args(self.extra_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_err)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(prompt.as_bytes()).map_err(spawn_err)?;
        }
        let output = child.wait_with_output().map_err(spawn_err)?;

        if !output.status.success() {
            return Err(EvalError::Failed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Base generator, plus an adapter generator when the adapter directory exists.
pub fn configured_generators(config: &PipelineConfig) -> (CommandGenerator, Option<CommandGenerator>) {
    let base = CommandGenerator::base(config);
    let adapter_dir = &config.training.output_dir;
    let lora = if adapter_dir.is_dir() {
        info!(adapter = %adapter_dir.display(), "evaluating adapter against base model");
        Some(CommandGenerator::with_adapter(config, adapter_dir))
    } else {
        warn!(adapter = %adapter_dir.display(), "adapter not found, evaluating base model only");
        None
    };
    (base, lora)
}

/// One held-out example with its typed expected label.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalCase {
    pub instruction: String,
    pub output: String,
    pub expected: Option<bool>,
}

impl EvalCase {
    pub fn from_example(example: FormattedExample) -> Self {
        Self {
            expected: profitability(&example.output),
            instruction: example.instruction,
            output: example.output,
        }
    }

    fn score(&self, completion: String) -> Prediction {
        Prediction::score_labeled(&self.instruction, &self.output, self.expected, completion)
    }
}

/// Per-prediction results for each evaluated model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResults {
    pub base_model: ModelResults,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lora_model: Option<ModelResults>,
}

/// Summary metrics for each evaluated model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub base_model: ModelMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lora_model: Option<ModelMetrics>,
}

impl EvaluationMetrics {
    pub fn compute(results: &EvaluationResults) -> Self {
        Self {
            base_model: ModelMetrics::compute(&results.base_model),
            lora_model: results.lora_model.as_ref().map(ModelMetrics::compute),
        }
    }

    /// Relative accuracy change of the adapter over the base model, in percent.
    pub fn improvement_pct(&self) -> Option<f64> {
        self.lora_model
            .as_ref()
            .map(|lora| accuracy_improvement_pct(&self.base_model, lora))
    }
}

/// Score up to `max_examples` cases with the base and (optional) adapter generators.
pub fn evaluate_cases(
    cases: &[EvalCase],
    base: &dyn Generator,
    lora: Option<&dyn Generator>,
    max_examples: usize,
) -> Result<EvaluationResults, EvalError> {
    let limit = cases.len().min(max_examples);
    let mut results = EvaluationResults {
        base_model: ModelResults::default(),
        lora_model: lora.map(|_| ModelResults::default()),
    };

    info!(examples = limit, "starting model evaluation");
    for (i, case) in cases.iter().take(limit).enumerate() {
        let prompt = generation_prompt(&case.instruction);

        results.base_model.record(case.score(base.generate(&prompt)?));
        if let (Some(generator), Some(tally)) = (lora, results.lora_model.as_mut()) {
            tally.record(case.score(generator.generate(&prompt)?));
        }

        if (i + 1) % PROGRESS_EVERY == 0 {
            info!("evaluated {}/{} examples", i + 1, limit);
        }
    }
    Ok(results)
}

/// Files and figures from one evaluation run.
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    pub results: EvaluationResults,
    pub metrics: EvaluationMetrics,
    pub results_path: PathBuf,
    pub metrics_path: PathBuf,
}

/// Timestamped result and metrics file paths under `dir`.
pub fn output_paths(dir: &Path, at: NaiveDateTime) -> (PathBuf, PathBuf) {
    let stamp = at.format("%Y%m%d_%H%M%S");
    (
        dir.join(format!("evaluation_results_{stamp}.json")),
        dir.join(format!("evaluation_metrics_{stamp}.json")),
    )
}

/// Evaluate the configured eval set and write results and metrics.
///
/// Returns `Ok(None)` when the eval set is missing or empty; nothing is
/// written in that case.
pub fn run_evaluation(
    config: &PipelineConfig,
    base: &dyn Generator,
    lora: Option<&dyn Generator>,
) -> Result<Option<EvaluationReport>, EvalError> {
    evaluate_at(config, base, lora, chrono::Local::now().naive_local())
}

/// [`run_evaluation`] with an explicit timestamp for the output file names.
pub fn evaluate_at(
    config: &PipelineConfig,
    base: &dyn Generator,
    lora: Option<&dyn Generator>,
    at: NaiveDateTime,
) -> Result<Option<EvaluationReport>, EvalError> {
    let eval_path = config.dataset_files().eval;
    if !eval_path.is_file() {
        error!(path = %eval_path.display(), "evaluation data not found");
        return Ok(None);
    }
    let cases: Vec<EvalCase> = load_examples(&eval_path)?
        .into_iter()
        .map(EvalCase::from_example)
        .collect();
    info!(count = cases.len(), "loaded test examples");
    if cases.is_empty() {
        error!("no test data available");
        return Ok(None);
    }

    let results = evaluate_cases(&cases, base, lora, config.evaluation.max_examples)?;
    let metrics = EvaluationMetrics::compute(&results);

    let (results_path, metrics_path) = output_paths(&config.paths.evaluation_dir, at);
    write_json(&results_path, &results)?;
    write_json(&metrics_path, &metrics)?;
    info!(path = %results_path.display(), "results saved");
    info!(path = %metrics_path.display(), "metrics saved");

    Ok(Some(EvaluationReport {
        results,
        metrics,
        results_path,
        metrics_path,
    }))
}

fn write_model_block(out: &mut String, name: &str, m: &ModelMetrics) {
    let _ = writeln!(out, "\n{name}:");
    let _ = writeln!(out, "  Accuracy:  {:.3}", m.accuracy);
    let _ = writeln!(out, "  Precision: {:.3}", m.precision);
    let _ = writeln!(out, "  Recall:    {:.3}", m.recall);
    let _ = writeln!(out, "  F1 Score:  {:.3}", m.f1_score);
    let _ = writeln!(out, "  Examples:  {}/{}", m.correct_predictions, m.total_examples);
}

/// Printable comparison of base and adapter metrics.
pub fn format_summary(metrics: &EvaluationMetrics) -> String {
    let rule = "=".repeat(60);
    let mut out = String::new();
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "ADAPTER EVALUATION SUMMARY");
    let _ = writeln!(out, "{rule}");

    write_model_block(&mut out, "BASE MODEL", &metrics.base_model);
    if let Some(lora) = &metrics.lora_model {
        write_model_block(&mut out, "LORA MODEL", lora);
    }
    if let Some(improvement) = metrics.improvement_pct() {
        let _ = writeln!(out, "\nIMPROVEMENT:");
        let _ = writeln!(out, "  LoRA vs Base: {improvement:+.1}% accuracy improvement");
    }
    let _ = write!(out, "{rule}");
    out
}
