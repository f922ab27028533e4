use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::item::{count_vulnerable, Sample};

/// Samples split for training, validation and (optionally) testing
#[derive(Clone, Debug)]
pub struct Partitions {
    /// Samples the model is fit on
    pub train: Vec<Sample>,

    /// Samples monitored during training
    pub validation: Vec<Sample>,

    /// Held-out samples, absent when a separate test set is used
    pub test: Option<Vec<Sample>>,
}

impl Partitions {
    /// Log the size and vulnerable count of each partition
    pub fn log_summary(&self) {
        let mut named = vec![("training", &self.train), ("validation", &self.validation)];

        if let Some(test) = &self.test {
            named.push(("test", test));
        }

        for (name, samples) in named {
            log::info!(
                "There are {} total samples in the {} set. {} vulnerable samples.",
                samples.len(),
                name,
                count_vulnerable(samples)
            );
        }
    }
}

/// Randomly split `items` into `(kept, held_out)` reproducibly.
///
/// The held-out part has `ceil(ratio * len)` items. Both parts keep the order of the seeded
/// permutation, so the same seed and ratio always produce the same split.
pub fn train_test_split<T>(
    items: Vec<T>,
    ratio: f64,
    seed: u64,
) -> Result<(Vec<T>, Vec<T>), PartitionError> {
    if !(ratio > 0.0 && ratio < 1.0) {
        return Err(PartitionError::InvalidRatio(ratio));
    }

    let total = items.len();
    let n_held_out = (ratio * total as f64).ceil() as usize;

    let mut permutation: Vec<usize> = (0..total).collect();
    permutation.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));

    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    let mut take = |index: &usize| slots[*index].take();

    let held_out: Vec<T> = permutation[..n_held_out].iter().filter_map(&mut take).collect();
    let kept: Vec<T> = permutation[n_held_out..].iter().filter_map(&mut take).collect();

    Ok((kept, held_out))
}

/// Split into train, validation and test partitions.
///
/// The full set is split into (train + validation) and test with `test_ratio`, then
/// (train + validation) is split again with `validation_ratio`. Both splits use `seed`.
pub fn partition_with_test(
    samples: Vec<Sample>,
    test_ratio: f64,
    validation_ratio: f64,
    seed: u64,
) -> Result<Partitions, PartitionError> {
    let total = samples.len();

    let (train_validation, test) = train_test_split(samples, test_ratio, seed)?;
    let (train, validation) = train_test_split(train_validation, validation_ratio, seed)?;

    let partitions = Partitions {
        train,
        validation,
        test: Some(test),
    };

    check_non_empty(&partitions, total)?;

    Ok(partitions)
}

/// Split into train and validation partitions, for runs that evaluate on a separate test set
pub fn partition_without_test(
    samples: Vec<Sample>,
    validation_ratio: f64,
    seed: u64,
) -> Result<Partitions, PartitionError> {
    let total = samples.len();

    let (train, validation) = train_test_split(samples, validation_ratio, seed)?;

    let partitions = Partitions {
        train,
        validation,
        test: None,
    };

    check_non_empty(&partitions, total)?;

    Ok(partitions)
}

fn check_non_empty(partitions: &Partitions, total: usize) -> Result<(), PartitionError> {
    let test_len = partitions.test.as_ref().map(Vec::len);

    for (partition, len) in [
        ("train", Some(partitions.train.len())),
        ("validation", Some(partitions.validation.len())),
        ("test", test_len),
    ] {
        if len == Some(0) {
            return Err(PartitionError::Empty { partition, total });
        }
    }

    Ok(())
}

/// Partition Error
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum PartitionError {
    /// The split ratio must be strictly between 0 and 1
    #[error("split ratio must be between 0 and 1, got {0}")]
    InvalidRatio(f64),

    /// A partition ended up without samples
    #[error("the {partition} partition is empty ({total} samples in total); adjust the split ratios or add data")]
    Empty {
        /// The empty partition
        partition: &'static str,
        /// Samples available before splitting
        total: usize,
    },
}
