/// The classifier trait shared by every architecture
pub mod model;

/// Batcher
pub mod batcher;

/// Text Classification Items
pub mod item;

/// Pre-fit vocabulary tokenizer
pub mod tokenizer;

/// Seeded train/validation/test partitioning
pub mod partition;

/// Pretrained word vectors
pub mod embedding;

/// Data preparation shared by training and evaluation
pub mod pipeline;

/// Checkpoint, early stopping and epoch log policies
pub mod callbacks;

/// Training history
pub mod history;

/// Evaluation metrics
pub mod metrics;

/// Per-sample result files
pub mod report;

/// Training
pub mod training;

/// Inference
pub mod inference;

pub use batcher::Batcher;
pub use embedding::{load_embedding_matrix, EmbeddingError, EmbeddingMatrix};
pub use inference::{infer, load_model, load_test_set, Evaluation, TrainedModel};
pub use item::Sample;
pub use model::Classifier;
pub use partition::{PartitionError, Partitions};
pub use tokenizer::{SequenceTokenizer, TokenizerError};
pub use training::{train, TrainingSummary};
