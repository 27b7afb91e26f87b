//! Training stage: hand the dataset files to an external adapter trainer.
//!
//! The pipeline never loads a model. It describes the run as a
//! [`TrainingJob`], passes it to a [`Trainer`], and records metadata about
//! the finished run next to the adapter artifacts.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info, warn};
use tunelab_core::prompt::{INSTRUCTION_HEADER, RESPONSE_HEADER};

use crate::config::{
    DataConfig, HardwareConfig, LoraConfig, MonitoringConfig, PipelineConfig, TrainingConfig,
};
use crate::dataset::{load_examples, load_stats, write_json, DatasetError};

pub const JOB_FILE: &str = "job.json";
pub const METADATA_FILE: &str = "training_metadata.json";

#[derive(Debug, Error)]
pub enum TrainError {
    #[error("training data not found: {0} (run `tunelab prepare` first)")]
    MissingData(PathBuf),

    #[error("training set {0} is empty")]
    EmptyTrainingSet(PathBuf),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("failed to create {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("trainer command is empty")]
    EmptyCommand,

    #[error("failed to start trainer `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("trainer exited with {0}")]
    Failed(ExitStatus),
}

/// Text layout the trainer must use to build training texts.
///
/// A training text is `instruction_header + instruction + response_header +
/// output + eos_token`; generation prompts stop after `response_header`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub instruction_header: String,
    pub response_header: String,
    pub eos_token: String,
}

impl PromptTemplate {
    pub fn new(eos_token: impl Into<String>) -> Self {
        Self {
            instruction_header: INSTRUCTION_HEADER.to_string(),
            response_header: RESPONSE_HEADER.to_string(),
            eos_token: eos_token.into(),
        }
    }
}

/// Everything an external trainer needs for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingJob {
    pub base_model: String,
    pub trust_remote_code: bool,
    pub train_file: PathBuf,
    pub eval_file: PathBuf,
    pub output_dir: PathBuf,
    pub train_examples: usize,
    pub eval_examples: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_hash: Option<String>,
    pub template: PromptTemplate,
    pub training: TrainingConfig,
    pub lora: LoraConfig,
    pub data: DataConfig,
    pub hardware: HardwareConfig,
    pub monitoring: MonitoringConfig,
}

/// Runs one training job to completion.
pub trait Trainer {
    fn train(&self, job: &TrainingJob) -> Result<(), TrainError>;
}

/// Trainer that runs an external command.
///
/// The job is written to `<output_dir>/job.json` and the command is run
/// with `--job <path>` appended. A non-zero exit status is a failure.
#[derive(Debug, Clone)]
pub struct ExternalTrainer {
    command: Vec<String>,
}

impl ExternalTrainer {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.trainer.command.clone())
    }
}

impl Trainer for ExternalTrainer {
    fn train(&self, job: &TrainingJob) -> Result<(), TrainError> {
        let (program, args) = self.command.split_first().ok_or(TrainError::EmptyCommand)?;

        let job_path = job.output_dir.join(JOB_FILE);
        write_json(&job_path, job)?;

        info!(program = %program, job = %job_path.display(), "launching trainer");
        let status = Command::new(program)
            .args(args)
            .arg("--job")
            .arg(&job_path)
            .status()
            .map_err(|source| TrainError::Spawn {
                program: program.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(TrainError::Failed(status))
        }
    }
}

/// Record written next to the adapter after a successful run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetadata {
    pub model_name: String,
    /// Wall-clock duration as `H:MM:SS.ffffff`.
    pub training_duration: String,
    pub training_completed: NaiveDateTime,
    pub config: PipelineConfig,
    pub device: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_hash: Option<String>,
}

/// Render a duration as `H:MM:SS.ffffff`.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    format!(
        "{}:{:02}:{:02}.{:06}",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60,
        d.subsec_micros()
    )
}

fn require(path: &Path) -> Result<(), TrainError> {
    if path.is_file() {
        Ok(())
    } else {
        error!(path = %path.display(), "training data not found");
        Err(TrainError::MissingData(path.to_path_buf()))
    }
}

/// Build the job for the configured dataset and run it through `trainer`.
pub fn run_training(config: &PipelineConfig, trainer: &dyn Trainer) -> Result<TrainingMetadata, TrainError> {
    info!(model = %config.model.base_model, "starting adapter training");

    let files = config.dataset_files();
    require(&files.train)?;
    require(&files.eval)?;

    let train_examples = load_examples(&files.train)?.len();
    let eval_examples = load_examples(&files.eval)?.len();
    if train_examples == 0 {
        return Err(TrainError::EmptyTrainingSet(files.train));
    }
    info!(train = train_examples, eval = eval_examples, "loaded dataset");

    let dataset_hash = match load_stats(&files.stats) {
        Ok(stats) => Some(stats.dataset_hash),
        Err(e) => {
            warn!(error = %e, "dataset statistics unavailable");
            None
        }
    };

    let output_dir = config.training.output_dir.clone();
    std::fs::create_dir_all(&output_dir).map_err(|source| TrainError::Io {
        path: output_dir.clone(),
        source,
    })?;

    let job = TrainingJob {
        base_model: config.model.base_model.clone(),
        trust_remote_code: config.model.trust_remote_code,
        train_file: files.train,
        eval_file: files.eval,
        output_dir: output_dir.clone(),
        train_examples,
        eval_examples,
        dataset_hash: dataset_hash.clone(),
        template: PromptTemplate::new(config.trainer.eos_token.clone()),
        training: config.training.clone(),
        lora: config.lora.clone(),
        data: config.data.clone(),
        hardware: config.hardware.clone(),
        monitoring: config.monitoring.clone(),
    };

    let started = Instant::now();
    trainer.train(&job)?;
    let elapsed = started.elapsed();
    let training_duration = format_duration(elapsed);
    info!(duration = %training_duration, "training completed");

    let metadata = TrainingMetadata {
        model_name: config.model.base_model.clone(),
        training_duration,
        training_completed: chrono::Local::now().naive_local(),
        config: config.clone(),
        device: config.hardware.device.clone(),
        dataset_hash,
    };
    write_json(&output_dir.join(METADATA_FILE), &metadata)?;
    info!(output = %output_dir.display(), "adapter saved");

    Ok(metadata)
}
