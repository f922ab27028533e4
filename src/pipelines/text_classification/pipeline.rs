//! Data preparation shared by training and evaluation

use std::path::Path;

use crate::{datasets::functions::Dataset, settings::Settings, utils::tensors::pad_sequences};

use super::{
    item::{samples_from_parts, Sample},
    partition::{partition_with_test, partition_without_test, PartitionError, Partitions},
    tokenizer::SequenceTokenizer,
};

/// Load the functions below `data_dir`, tokenize them and pad every sequence to the configured
/// length. Labels are derived from the function ids.
pub async fn load_samples(
    data_dir: &Path,
    settings: &Settings,
    tokenizer: &SequenceTokenizer,
) -> anyhow::Result<Vec<Sample>> {
    let extensions = &settings.training_settings.dataset_config.file_extensions;
    let max_len = settings.model_settings.model_para.max_sequence_length;

    let (ids, texts) = Dataset::load(data_dir, extensions).await?.into_parts();

    let sequences = tokenizer.texts_to_sequences(&texts)?;
    let padded = pad_sequences(sequences, max_len);

    log::debug!("Padded {} sequences to length {}", padded.len(), max_len);

    Ok(samples_from_parts(ids, padded))
}

/// Partition samples the way the settings ask for: train/validation only when a separate test set
/// is configured, train/validation/test otherwise
pub fn partition(
    samples: Vec<Sample>,
    settings: &Settings,
    seed: u64,
) -> Result<Partitions, PartitionError> {
    let training = &settings.training_settings;
    let dataset = &training.dataset_config;

    if training.using_separate_test_set {
        partition_without_test(samples, dataset.validation_ratio(), seed)
    } else {
        partition_with_test(
            samples,
            dataset.test_set_ratio,
            dataset.validation_ratio(),
            seed,
        )
    }
}
