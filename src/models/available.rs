use std::{collections::HashMap, fmt::Display};

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

/// Available network architectures
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    /// Fully connected network over the flattened embeddings
    #[serde(rename = "DNN")]
    Dnn,

    /// Gated recurrent unit
    #[serde(rename = "GRU")]
    Gru,

    /// Long short-term memory
    #[serde(rename = "LSTM")]
    Lstm,

    /// Bidirectional GRU
    #[serde(rename = "BiGRU")]
    BiGru,

    /// Bidirectional LSTM
    #[serde(rename = "BiLSTM")]
    BiLstm,

    /// Parallel 1-D convolutions over the embeddings
    #[serde(rename = "textCNN")]
    TextCnn,
}

/// Every available architecture
pub static ALL_MODELS: &[ModelKind; 6] = &[
    ModelKind::Dnn,
    ModelKind::Gru,
    ModelKind::Lstm,
    ModelKind::BiGru,
    ModelKind::BiLstm,
    ModelKind::TextCnn,
];

lazy_static! {
    /// Architectures by their configuration name
    pub static ref MODELS_BY_NAME: HashMap<&'static str, ModelKind> = ALL_MODELS
        .iter()
        .map(|kind| (kind.as_str(), *kind))
        .collect();
}

impl ModelKind {
    /// Resolve a configured model name through the lookup table
    pub fn lookup(name: &str) -> Result<Self, ModelError> {
        MODELS_BY_NAME
            .get(name)
            .copied()
            .ok_or_else(|| ModelError::Unknown(name.to_string()))
    }

    /// The configuration name of the architecture
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Dnn => "DNN",
            ModelKind::Gru => "GRU",
            ModelKind::Lstm => "LSTM",
            ModelKind::BiGru => "BiGRU",
            ModelKind::BiLstm => "BiLSTM",
            ModelKind::TextCnn => "textCNN",
        }
    }

    /// Whether the architecture runs a second recurrent pass over the reversed sequence
    pub fn is_bidirectional(&self) -> bool {
        matches!(self, ModelKind::BiGru | ModelKind::BiLstm)
    }
}

impl Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for ModelKind {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ModelKind::lookup(&value)
    }
}

/// Model Error
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ModelError {
    /// No model found for the given string
    #[error("unknown model type {0} (expected one of DNN, GRU, LSTM, BiGRU, BiLSTM, textCNN)")]
    Unknown(String),

    /// The architecture parameters cannot produce a model
    #[error("invalid model configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn resolves_every_configured_name() {
        for kind in ALL_MODELS {
            assert_eq!(ModelKind::lookup(&kind.to_string()), Ok(*kind));
        }

        assert_eq!(ModelKind::lookup("BiLSTM"), Ok(ModelKind::BiLstm));
    }

    #[test]
    fn unknown_names_fail() {
        assert_eq!(
            ModelKind::try_from("Transformer".to_string()),
            Err(ModelError::Unknown("Transformer".to_string()))
        );
        assert!(ModelKind::lookup("gru").is_err());
    }

    #[test]
    fn serializes_with_configuration_names() -> anyhow::Result<()> {
        assert_eq!(serde_json::to_string(&ModelKind::TextCnn)?, "\"textCNN\"");
        assert_eq!(
            serde_json::from_str::<ModelKind>("\"BiGRU\"")?,
            ModelKind::BiGru
        );

        Ok(())
    }
}
