//! Per-epoch training hooks: checkpoint policy, early stopping and the CSV epoch log

use std::{
    fs::File,
    path::{Path, PathBuf},
    str::FromStr,
};

use super::history::EpochMetrics;

/// The metric watched for checkpointing and early stopping
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Monitor {
    /// Training loss (lower is better)
    Loss,
    /// Training accuracy (higher is better)
    Accuracy,
    /// Validation loss (lower is better)
    ValLoss,
    /// Validation accuracy (higher is better)
    ValAccuracy,
}

impl Monitor {
    /// Read the watched value from an epoch's metrics
    pub fn value(&self, metrics: &EpochMetrics) -> f64 {
        match self {
            Monitor::Loss => metrics.loss,
            Monitor::Accuracy => metrics.accuracy,
            Monitor::ValLoss => metrics.val_loss,
            Monitor::ValAccuracy => metrics.val_accuracy,
        }
    }

    /// Whether `current` is strictly better than `best`
    pub fn improves(&self, current: f64, best: Option<f64>) -> bool {
        match best {
            None => !current.is_nan(),
            Some(best) => match self {
                Monitor::Loss | Monitor::ValLoss => current < best,
                Monitor::Accuracy | Monitor::ValAccuracy => current > best,
            },
        }
    }

    /// The configuration name of the metric
    pub fn as_str(&self) -> &'static str {
        match self {
            Monitor::Loss => "loss",
            Monitor::Accuracy => "accuracy",
            Monitor::ValLoss => "val_loss",
            Monitor::ValAccuracy => "val_accuracy",
        }
    }
}

impl FromStr for Monitor {
    type Err = MonitorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "loss" => Ok(Monitor::Loss),
            "accuracy" | "acc" => Ok(Monitor::Accuracy),
            "val_loss" => Ok(Monitor::ValLoss),
            "val_accuracy" | "val_acc" => Ok(Monitor::ValAccuracy),
            _ => Err(MonitorError::Unknown(value.to_string())),
        }
    }
}

/// Monitor Error
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum MonitorError {
    /// No metric found for the given string
    #[error("no validation metric found for {0} (expected loss, accuracy, val_loss or val_accuracy)")]
    Unknown(String),
}

/// Stops training once the monitored metric has not improved for `patience` epochs
#[derive(Clone, Debug)]
pub struct EarlyStopping {
    monitor: Monitor,
    patience: usize,
    best: Option<f64>,
    wait: usize,
}

impl EarlyStopping {
    /// Create a new early stopping policy
    pub fn new(monitor: Monitor, patience: usize) -> Self {
        Self {
            monitor,
            patience,
            best: None,
            wait: 0,
        }
    }

    /// Record an epoch; returns true when training should stop
    pub fn should_stop(&mut self, metrics: &EpochMetrics) -> bool {
        let current = self.monitor.value(metrics);

        if self.monitor.improves(current, self.best) {
            self.best = Some(current);
            self.wait = 0;

            return false;
        }

        self.wait += 1;

        self.wait >= self.patience
    }
}

/// Decides after each epoch whether and where to checkpoint the model
#[derive(Clone, Debug)]
pub struct Checkpointer {
    dir: PathBuf,
    model_name: String,
    monitor: Monitor,
    save_best_only: bool,
    best: Option<f64>,
}

impl Checkpointer {
    /// Create a new checkpoint policy writing to `dir`
    pub fn new(dir: &Path, model_name: &str, monitor: Monitor, save_best_only: bool) -> Self {
        Self {
            dir: dir.to_path_buf(),
            model_name: model_name.to_string(),
            monitor,
            save_best_only,
            best: None,
        }
    }

    /// Record an epoch; returns the checkpoint path when the model should be saved
    pub fn on_epoch_end(&mut self, metrics: &EpochMetrics) -> Option<PathBuf> {
        let current = self.monitor.value(metrics);
        let improved = self.monitor.improves(current, self.best);

        if improved {
            log::info!(
                "Epoch {:02}: {} improved from {:?} to {:.5}",
                metrics.epoch,
                self.monitor.as_str(),
                self.best,
                current
            );

            self.best = Some(current);
        }

        if improved || !self.save_best_only {
            Some(self.dir.join(checkpoint_file_name(&self.model_name, metrics)))
        } else {
            None
        }
    }
}

/// `<model>_<epoch>_<val_accuracy>_<val_loss>.mpk`, e.g. `GRU_03_0.912_0.234567.mpk`
pub fn checkpoint_file_name(model_name: &str, metrics: &EpochMetrics) -> String {
    format!(
        "{}_{:02}_{:.3}_{:.6}.mpk",
        model_name, metrics.epoch, metrics.val_accuracy, metrics.val_loss
    )
}

/// Appends one CSV row per epoch
pub struct EpochLogger {
    writer: csv::Writer<File>,
}

impl EpochLogger {
    /// Create the log file and write the header
    pub fn create(path: &Path) -> Result<Self, csv::Error> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(["epoch", "accuracy", "loss", "val_accuracy", "val_loss"])?;
        writer.flush()?;

        Ok(Self { writer })
    }

    /// Write and flush one epoch row
    pub fn log(&mut self, metrics: &EpochMetrics) -> Result<(), csv::Error> {
        self.writer.write_record([
            metrics.epoch.to_string(),
            metrics.accuracy.to_string(),
            metrics.loss.to_string(),
            metrics.val_accuracy.to_string(),
            metrics.val_loss.to_string(),
        ])?;
        self.writer.flush()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn epoch(epoch: usize, val_loss: f64, val_accuracy: f64) -> EpochMetrics {
        EpochMetrics {
            epoch,
            loss: 0.5,
            accuracy: 0.5,
            val_loss,
            val_accuracy,
        }
    }

    #[test]
    fn parses_metric_names() {
        assert_eq!("val_loss".parse::<Monitor>(), Ok(Monitor::ValLoss));
        assert_eq!("val_acc".parse::<Monitor>(), Ok(Monitor::ValAccuracy));
        assert_eq!(
            "val_f1".parse::<Monitor>(),
            Err(MonitorError::Unknown("val_f1".to_string()))
        );
    }

    #[test]
    fn loss_minimizes_and_accuracy_maximizes() {
        assert!(Monitor::ValLoss.improves(0.3, Some(0.4)));
        assert!(!Monitor::ValLoss.improves(0.4, Some(0.4)));
        assert!(Monitor::ValAccuracy.improves(0.9, Some(0.8)));
        assert!(!Monitor::ValAccuracy.improves(0.7, Some(0.8)));
        assert!(Monitor::Loss.improves(10.0, None));
    }

    #[test]
    fn stops_after_patience_epochs_without_improvement() {
        let mut stopping = EarlyStopping::new(Monitor::ValLoss, 2);

        assert!(!stopping.should_stop(&epoch(1, 0.6, 0.5)));
        assert!(!stopping.should_stop(&epoch(2, 0.5, 0.5)));
        assert!(!stopping.should_stop(&epoch(3, 0.55, 0.5)));
        assert!(!stopping.should_stop(&epoch(4, 0.45, 0.5)));
        assert!(!stopping.should_stop(&epoch(5, 0.46, 0.5)));
        assert!(stopping.should_stop(&epoch(6, 0.47, 0.5)));
    }

    #[test]
    fn best_only_checkpoints_on_improvement() {
        let dir = Path::new("models");
        let mut checkpointer = Checkpointer::new(dir, "GRU", Monitor::ValAccuracy, true);

        assert_eq!(
            checkpointer.on_epoch_end(&epoch(1, 0.234_567_1, 0.9124)),
            Some(dir.join("GRU_01_0.912_0.234567.mpk"))
        );
        assert_eq!(checkpointer.on_epoch_end(&epoch(2, 0.2, 0.9)), None);
        assert!(checkpointer.on_epoch_end(&epoch(3, 0.3, 0.95)).is_some());
    }

    #[test]
    fn every_epoch_checkpoints_without_best_only() {
        let mut checkpointer = Checkpointer::new(Path::new("m"), "DNN", Monitor::ValLoss, false);

        assert!(checkpointer.on_epoch_end(&epoch(1, 0.5, 0.5)).is_some());
        assert!(checkpointer.on_epoch_end(&epoch(2, 0.9, 0.5)).is_some());
    }

    #[test]
    fn epoch_log_has_one_row_per_epoch() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("run.log");

        let mut logger = EpochLogger::create(&path)?;
        logger.log(&epoch(1, 0.5, 0.75))?;
        logger.log(&epoch(2, 0.25, 1.0))?;

        let content = std::fs::read_to_string(&path)?;
        assert_eq!(
            content,
            "epoch,accuracy,loss,val_accuracy,val_loss\n1,0.5,0.5,0.75,0.5\n2,0.5,0.5,1,0.25\n"
        );

        Ok(())
    }
}
