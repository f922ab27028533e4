/// The number of classes in a binary classification task
pub const N_CLASSES: usize = 2;

/// Count how often each class id appears in `labels`
pub fn class_counts(labels: &[usize]) -> [usize; N_CLASSES] {
    let mut counts = [0; N_CLASSES];

    for &label in labels {
        if label < N_CLASSES {
            counts[label] += 1;
        }
    }

    counts
}

/// Per-class loss weights that compensate for unequal class frequencies.
///
/// Each present class gets `n_samples / (n_present_classes * count)`. A class with no samples keeps
/// a neutral weight of 1.0.
pub fn balanced_class_weights(labels: &[usize]) -> Vec<f32> {
    let counts = class_counts(labels);
    let total: usize = counts.iter().sum();
    let present = counts.iter().filter(|count| **count > 0).count();

    counts
        .iter()
        .map(|&count| {
            if count == 0 {
                1.0
            } else {
                total as f32 / (present * count) as f32
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn balanced_weights_follow_frequency() {
        // 6 safe, 2 vulnerable
        let labels = vec![0, 0, 0, 0, 0, 0, 1, 1];

        let weights = balanced_class_weights(&labels);

        assert!((weights[0] - 8.0 / 12.0).abs() < 1e-6);
        assert!((weights[1] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn missing_class_keeps_neutral_weight() {
        assert_eq!(balanced_class_weights(&[1, 1, 1]), vec![1.0, 1.0]);
    }

    #[test]
    fn counts_each_class() {
        assert_eq!(class_counts(&[0, 1, 1, 0, 1]), [2, 3]);
    }
}
