/// Available architectures and the name lookup table
pub mod available;

/// The persisted architecture configuration
pub mod config;

/// Fully connected network
pub mod dnn;

/// GRU, LSTM and their bidirectional variants
pub mod recurrent;

/// Convolutional network
pub mod text_cnn;

pub use available::{ModelError, ModelKind};
pub use config::ModelConfig;
pub use dnn::Dnn;
pub use recurrent::Recurrent;
pub use text_cnn::TextCnn;
