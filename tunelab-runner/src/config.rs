//! Pipeline configuration, loaded once from TOML and passed by reference.
//!
//! Every section has defaults, so a partial file is valid:
//!
//! ```toml
//! [model]
//! base_model = "microsoft/DialoGPT-medium"
//!
//! [data]
//! train_split = 0.8
//!
//! [trading]
//! data_sources = ["var/trading.db"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::dataset::DatasetFiles;

/// Default location of the configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "training/config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// The complete, immutable pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub model: ModelConfig,
    pub training: TrainingConfig,
    pub lora: LoraConfig,
    pub data: DataConfig,
    pub hardware: HardwareConfig,
    pub monitoring: MonitoringConfig,
    pub trading: TradingConfig,
    pub paths: PathsConfig,
    pub trainer: TrainerConfig,
    pub evaluation: EvaluationConfig,
}

impl PipelineConfig {
    /// Load and validate a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a configuration string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let split = self.data.train_split;
        if !(split > 0.0 && split < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "data.train_split must be strictly between 0 and 1, got {split}"
            )));
        }
        if self.lora.r == 0 {
            return Err(ConfigError::Invalid("lora.r must be at least 1".into()));
        }
        if !(0.0..1.0).contains(&self.lora.lora_dropout) {
            return Err(ConfigError::Invalid(format!(
                "lora.lora_dropout must be in [0, 1), got {}",
                self.lora.lora_dropout
            )));
        }
        if self.lora.target_modules.is_empty() {
            return Err(ConfigError::Invalid(
                "lora.target_modules must name at least one module".into(),
            ));
        }
        if self.model.base_model.trim().is_empty() {
            return Err(ConfigError::Invalid("model.base_model must not be empty".into()));
        }
        Ok(())
    }

    /// Path of the live trading database (first configured data source).
    pub fn live_db_path(&self) -> Option<&Path> {
        self.trading.data_sources.first().map(PathBuf::as_path)
    }

    /// Dataset file locations under `paths.data_dir`.
    pub fn dataset_files(&self) -> DatasetFiles {
        DatasetFiles::in_dir(&self.paths.data_dir)
    }
}

// ── Sections ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub base_model: String,
    pub trust_remote_code: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_model: "microsoft/DialoGPT-medium".into(),
            trust_remote_code: false,
        }
    }
}

/// When the trainer evaluates or checkpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalStrategy {
    No,
    Steps,
    Epoch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Adapter artifact directory. Also where the evaluator looks for the adapter.
    pub output_dir: PathBuf,
    pub per_device_train_batch_size: u32,
    pub per_device_eval_batch_size: u32,
    pub gradient_accumulation_steps: u32,
    pub num_train_epochs: f64,
    /// `-1` lets the epoch count decide.
    pub max_steps: i64,
    pub learning_rate: f64,
    pub weight_decay: f64,
    pub warmup_steps: u32,
    pub lr_scheduler_type: String,
    pub logging_steps: u32,
    pub save_steps: u32,
    pub eval_steps: u32,
    pub evaluation_strategy: IntervalStrategy,
    pub save_strategy: IntervalStrategy,
    pub load_best_model_at_end: bool,
    pub metric_for_best_model: String,
    pub greater_is_better: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("training/models/lora-adapter"),
            per_device_train_batch_size: 4,
            per_device_eval_batch_size: 4,
            gradient_accumulation_steps: 4,
            num_train_epochs: 3.0,
            max_steps: -1,
            learning_rate: 2e-4,
            weight_decay: 0.01,
            warmup_steps: 100,
            lr_scheduler_type: "cosine".into(),
            logging_steps: 10,
            save_steps: 500,
            eval_steps: 500,
            evaluation_strategy: IntervalStrategy::Steps,
            save_strategy: IntervalStrategy::Steps,
            load_best_model_at_end: true,
            metric_for_best_model: "eval_loss".into(),
            greater_is_better: false,
        }
    }
}

/// Which bias parameters the adapter trains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoraBias {
    None,
    All,
    LoraOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoraConfig {
    /// Adapter rank.
    pub r: u32,
    /// Scaling factor.
    pub lora_alpha: u32,
    pub target_modules: Vec<String>,
    pub lora_dropout: f64,
    pub bias: LoraBias,
}

impl Default for LoraConfig {
    fn default() -> Self {
        Self {
            r: 16,
            lora_alpha: 32,
            target_modules: vec!["q_proj".into(), "v_proj".into()],
            lora_dropout: 0.05,
            bias: LoraBias::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Fraction of examples (leading, by time) that go to training.
    pub train_split: f64,
    pub max_seq_length: u32,
    pub preprocessing_num_workers: u32,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            train_split: 0.8,
            max_seq_length: 512,
            preprocessing_num_workers: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareConfig {
    pub fp16: bool,
    pub dataloader_num_workers: u32,
    pub dataloader_pin_memory: bool,
    pub remove_unused_columns: bool,
    /// Device hint passed to the external trainer (`auto`, `cpu`, `mps`, `cuda`).
    pub device: String,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            fp16: true,
            dataloader_num_workers: 0,
            dataloader_pin_memory: false,
            remove_unused_columns: false,
            device: "auto".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub report_to: Vec<String>,
    pub logging_dir: PathBuf,
    pub run_name: String,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            report_to: Vec::new(),
            logging_dir: PathBuf::from("training/logs"),
            run_name: "lora-adapter".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    /// Live trading databases; only the first is read.
    pub data_sources: Vec<PathBuf>,
    /// Symbol stamped on PnL records synthesized from backtest signals.
    pub backtest_symbol: String,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            data_sources: vec![PathBuf::from("var/trading.db")],
            backtest_symbol: "SOL-PERP".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory scanned for `backtest-*.json` result files.
    pub backtest_dir: PathBuf,
    /// Backtest signal store.
    pub backtest_db: PathBuf,
    /// Where `train.json`, `eval.json` and `dataset_stats.json` are written.
    pub data_dir: PathBuf,
    /// Where evaluation results and metrics are written.
    pub evaluation_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            backtest_dir: PathBuf::from("var/backtests"),
            backtest_db: PathBuf::from("var/backtest_training_data.db"),
            data_dir: PathBuf::from("training/data"),
            evaluation_dir: PathBuf::from("training/evaluation"),
        }
    }
}

/// External trainer process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Program and leading arguments; `--job <path>` is appended.
    pub command: Vec<String>,
    /// End-of-sequence token appended to training texts.
    pub eos_token: String,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            command: vec!["python3".into(), "training/scripts/train_lora.py".into()],
            eos_token: "</s>".into(),
        }
    }
}

/// External generator process and scoring limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Program and leading arguments; model, adapter and sampling flags are
    /// appended, the prompt goes to stdin and the completion is read from stdout.
    pub generator_command: Vec<String>,
    pub max_examples: usize,
    pub temperature: f64,
    pub max_new_tokens: u32,
    pub max_prompt_tokens: u32,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            generator_command: vec!["python3".into(), "training/scripts/generate.py".into()],
            max_examples: 50,
            temperature: 0.7,
            max_new_tokens: 512,
            max_prompt_tokens: 1024,
        }
    }
}
