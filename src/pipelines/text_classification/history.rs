use std::path::Path;

use serde::{Deserialize, Serialize};

/// Metrics gathered at the end of one epoch
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// 1-based epoch number
    pub epoch: usize,

    /// Mean training loss
    pub loss: f64,

    /// Training accuracy
    pub accuracy: f64,

    /// Mean validation loss
    pub val_loss: f64,

    /// Validation accuracy
    pub val_accuracy: f64,
}

/// Per-epoch metric sequences for a whole training run
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    /// The epochs that ran
    pub epoch: Vec<usize>,

    /// Mean training loss per epoch
    pub loss: Vec<f64>,

    /// Training accuracy per epoch
    pub accuracy: Vec<f64>,

    /// Mean validation loss per epoch
    pub val_loss: Vec<f64>,

    /// Validation accuracy per epoch
    pub val_accuracy: Vec<f64>,
}

impl TrainingHistory {
    /// Append one epoch
    pub fn push(&mut self, metrics: EpochMetrics) {
        self.epoch.push(metrics.epoch);
        self.loss.push(metrics.loss);
        self.accuracy.push(metrics.accuracy);
        self.val_loss.push(metrics.val_loss);
        self.val_accuracy.push(metrics.val_accuracy);
    }

    /// The number of recorded epochs
    pub fn len(&self) -> usize {
        self.epoch.len()
    }

    /// Whether no epoch was recorded
    pub fn is_empty(&self) -> bool {
        self.epoch.is_empty()
    }

    /// Save as pretty-printed JSON
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;

        Ok(())
    }

    /// Load a history saved with [`TrainingHistory::save`]
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let file = std::fs::File::open(path)?;

        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}
