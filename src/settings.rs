//! Run configuration: the YAML settings file plus the per-run command line parameters

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::utils::files::ensure_dir;

/// Settings loaded from the YAML configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Paths, partitioning and optimization
    pub training_settings: TrainingSettings,

    /// Model selection and architecture parameters
    pub model_settings: ModelSettings,
}

/// Paths, partitioning and optimization settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSettings {
    /// The pre-fit word-level tokenizer (`tokenizer.json`)
    pub tokenizer_path: PathBuf,

    /// Word vectors in "word c1 c2 ... cN" text format
    pub embedding_model_path: PathBuf,

    /// Where checkpoints, the model config and the history artifacts are written
    pub model_save_path: PathBuf,

    /// Prefix for the training history and log artifacts
    pub model_saved_name: String,

    /// Where the per-epoch log is written
    pub log_path: PathBuf,

    /// Evaluate against a separately supplied test set instead of a held-out partition
    #[serde(default)]
    pub using_separate_test_set: bool,

    /// The separately supplied test set
    #[serde(default)]
    pub test_set_path: Option<PathBuf>,

    /// Only checkpoint when the monitored metric improves
    #[serde(default = "default_true")]
    pub save_best_model: bool,

    /// Partitioning
    pub dataset_config: DatasetConfig,

    /// Optimization
    pub network_config: NetworkConfig,
}

/// Partitioning settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Share of the full set held out for testing
    #[serde(rename = "Test_set_ratio")]
    pub test_set_ratio: f64,

    /// Share of the remaining set held out for validation; the test ratio is used when absent
    #[serde(rename = "Validation_set_ratio", default)]
    pub validation_set_ratio: Option<f64>,

    /// Extensions of the source files that make up the dataset
    #[serde(default = "default_file_extensions")]
    pub file_extensions: Vec<String>,
}

impl DatasetConfig {
    /// The validation ratio in effect
    pub fn validation_ratio(&self) -> f64 {
        self.validation_set_ratio.unwrap_or(self.test_set_ratio)
    }
}

/// Optimization settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Batch size
    pub batch_size: usize,

    /// Maximum number of epochs
    pub epochs: usize,

    /// Epochs without improvement of the validation metric before training stops
    #[serde(alias = "patcience")]
    pub patience: usize,

    /// The metric monitored for checkpointing and early stopping
    #[serde(default = "default_validation_metric")]
    pub validation_metric: String,

    /// Persist the per-epoch history as JSON
    #[serde(default)]
    pub save_training_history: bool,

    /// Plot training vs. validation loss
    #[serde(default)]
    pub plot_training_history: bool,

    /// Initial learning rate
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
}

/// Model selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    /// One of DNN, GRU, LSTM, BiGRU, BiLSTM or textCNN
    pub model: String,

    /// Architecture parameters
    pub model_para: ModelParams,
}

/// Architecture parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelParams {
    /// Dimension of the word vectors
    pub embedding_dim: usize,

    /// Length every token sequence is padded or truncated to
    pub max_sequence_length: usize,

    /// Weight the loss by inverse class frequency
    #[serde(default)]
    pub handle_data_imbalance: bool,

    /// Units in the hidden dense or recurrent layers
    #[serde(default = "default_hidden_size")]
    pub hidden_size: usize,

    /// Dropout probability
    #[serde(default = "default_dropout")]
    pub dropout: f64,

    /// Convolution filters per kernel size (textCNN)
    #[serde(default = "default_filters")]
    pub filters: usize,

    /// Convolution kernel sizes (textCNN)
    #[serde(default = "default_kernel_sizes")]
    pub kernel_sizes: Vec<usize>,
}

fn default_true() -> bool {
    true
}

fn default_file_extensions() -> Vec<String> {
    vec!["c".to_string()]
}

fn default_validation_metric() -> String {
    "val_loss".to_string()
}

fn default_learning_rate() -> f64 {
    1e-3
}

fn default_hidden_size() -> usize {
    64
}

fn default_dropout() -> f64 {
    0.5
}

fn default_filters() -> usize {
    64
}

fn default_kernel_sizes() -> Vec<usize> {
    vec![3, 4, 5]
}

impl Settings {
    /// Load settings from a YAML file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let file = File::open(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let settings: Settings = serde_yaml::from_reader(BufReader::new(file))?;

        settings.validate()?;

        Ok(settings)
    }

    /// Parse settings from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_yaml::from_str(yaml)?;

        settings.validate()?;

        Ok(settings)
    }

    /// Check the values that serde cannot
    pub fn validate(&self) -> Result<(), SettingsError> {
        let dataset = &self.training_settings.dataset_config;
        let network = &self.training_settings.network_config;
        let params = &self.model_settings.model_para;

        for (name, ratio) in [
            ("Test_set_ratio", dataset.test_set_ratio),
            ("Validation_set_ratio", dataset.validation_ratio()),
        ] {
            if !(ratio > 0.0 && ratio < 1.0) {
                return Err(SettingsError::Invalid(format!(
                    "{name} must be between 0 and 1, got {ratio}"
                )));
            }
        }

        if network.batch_size == 0 {
            return Err(SettingsError::Invalid("batch_size must be positive".into()));
        }

        if network.epochs == 0 {
            return Err(SettingsError::Invalid("epochs must be positive".into()));
        }

        if params.embedding_dim == 0 || params.max_sequence_length == 0 {
            return Err(SettingsError::Invalid(
                "embedding_dim and max_sequence_length must be positive".into(),
            ));
        }

        if self.training_settings.using_separate_test_set
            && self.training_settings.test_set_path.is_none()
        {
            return Err(SettingsError::Invalid(
                "using_separate_test_set requires test_set_path".into(),
            ));
        }

        Ok(())
    }
}

/// Per-run parameters supplied on the command line
#[derive(Debug, Clone)]
pub struct RunParams {
    /// The dataset directory
    pub data_dir: PathBuf,

    /// Where evaluation results are written
    pub output_dir: PathBuf,

    /// Seed for the dataset partitioning, shared by training and evaluation
    pub seed: u64,

    /// Print progress information
    pub verbose: bool,

    /// The checkpoint to evaluate
    pub trained_model: Option<PathBuf>,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("output"),
            seed: 1337,
            verbose: false,
            trained_model: None,
        }
    }
}

/// Create the output, model-save and log directories if they are missing.
///
/// Invoke once at startup, before any step writes artifacts.
pub fn ensure_output_dirs(settings: &Settings, params: &RunParams) -> std::io::Result<()> {
    ensure_dir(&params.output_dir)?;
    ensure_dir(&settings.training_settings.model_save_path)?;
    ensure_dir(&settings.training_settings.log_path)?;

    Ok(())
}

/// Settings Error
#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    /// The settings file could not be read
    #[error("unable to read settings file {path}: {source}")]
    Io {
        /// The settings file
        path: PathBuf,
        /// The underlying error
        source: std::io::Error,
    },

    /// The settings file is not valid YAML for this schema
    #[error("unable to parse settings: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A value is out of range
    #[error("invalid settings: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    const YAML: &str = r#"
training_settings:
  tokenizer_path: data/tokenizer.json
  embedding_model_path: data/w2v.txt
  model_save_path: result/models
  model_saved_name: vuln
  log_path: result/logs
  dataset_config:
    Test_set_ratio: 0.2
  network_config:
    batch_size: 32
    epochs: 5
    patcience: 2
model_settings:
  model: BiGRU
  model_para:
    embedding_dim: 100
    max_sequence_length: 500
    handle_data_imbalance: true
"#;

    #[test]
    fn parses_settings_tree_with_defaults() -> anyhow::Result<()> {
        let settings = Settings::from_yaml(YAML)?;

        let training = &settings.training_settings;
        assert_eq!(training.network_config.patience, 2);
        assert_eq!(training.network_config.validation_metric, "val_loss");
        assert_eq!(training.dataset_config.file_extensions, vec!["c".to_string()]);
        assert!(training.save_best_model);
        assert!(!training.using_separate_test_set);
        assert_eq!(settings.model_settings.model, "BiGRU");
        assert_eq!(settings.model_settings.model_para.kernel_sizes, vec![3, 4, 5]);

        Ok(())
    }

    #[test]
    fn validation_ratio_is_distinct_from_test_ratio() -> anyhow::Result<()> {
        let mut settings = Settings::from_yaml(YAML)?;
        assert_eq!(settings.training_settings.dataset_config.validation_ratio(), 0.2);

        settings.training_settings.dataset_config.validation_set_ratio = Some(0.1);
        assert_eq!(settings.training_settings.dataset_config.validation_ratio(), 0.1);

        Ok(())
    }

    #[test]
    fn rejects_out_of_range_ratio() {
        let yaml = YAML.replace("Test_set_ratio: 0.2", "Test_set_ratio: 0.0");

        assert!(matches!(
            Settings::from_yaml(&yaml),
            Err(SettingsError::Invalid(_))
        ));
    }

    #[test]
    fn separate_test_set_requires_a_path() {
        let yaml = YAML.replace(
            "  log_path: result/logs",
            "  log_path: result/logs\n  using_separate_test_set: true",
        );

        assert!(matches!(
            Settings::from_yaml(&yaml),
            Err(SettingsError::Invalid(_))
        ));
    }

    #[test]
    fn output_dirs_are_created_idempotently() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let mut settings = Settings::from_yaml(YAML)?;
        settings.training_settings.model_save_path = root.path().join("models");
        settings.training_settings.log_path = root.path().join("logs");

        let params = RunParams {
            output_dir: root.path().join("output"),
            ..RunParams::default()
        };

        ensure_output_dirs(&settings, &params)?;
        ensure_output_dirs(&settings, &params)?;

        assert!(root.path().join("models").is_dir());
        assert!(root.path().join("logs").is_dir());
        assert!(root.path().join("output").is_dir());

        Ok(())
    }
}
