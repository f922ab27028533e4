use std::path::{Path, PathBuf};

use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::utils::files::ensure_dir;

/// One evaluated function: its id, the predicted probability of being vulnerable and its label
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, new)]
pub struct PredictionRecord {
    /// The function identifier
    #[serde(rename = "Function_ID")]
    pub id: String,

    /// The model's probability that the function is vulnerable
    #[serde(rename = "Probs. of being vulnerable")]
    pub probability: f32,

    /// The true label
    #[serde(rename = "Label")]
    pub label: usize,
}

/// `<output_dir>/<model>/<timestamp>_result.csv`
pub fn result_path(output_dir: &Path, model: &str, timestamp: &str) -> PathBuf {
    output_dir
        .join(model)
        .join(format!("{timestamp}_result.csv"))
}

/// Write the records, in order, to a CSV file. Missing parent directories are created.
pub fn write_results(path: &Path, records: &[PredictionRecord]) -> Result<(), ReportError> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;

    for record in records {
        writer.serialize(record)?;
    }

    writer.flush()?;

    Ok(())
}

/// Read records back from a results CSV file
pub fn read_results(path: &Path) -> Result<Vec<PredictionRecord>, ReportError> {
    let mut reader = csv::Reader::from_path(path)?;

    let records = reader
        .deserialize()
        .collect::<Result<Vec<PredictionRecord>, _>>()?;

    Ok(records)
}

/// Report Error
#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    /// The file or its directory could not be written
    #[error("unable to write results: {0}")]
    Io(#[from] std::io::Error),

    /// The CSV content could not be written or read
    #[error("invalid results file: {0}")]
    Csv(#[from] csv::Error),
}
