use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::datasets::functions::label_from_id;

/// A function ready for classification: its identifier, padded token sequence and label
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, new)]
pub struct Sample {
    /// The function identifier
    pub id: String,

    /// Token indices padded to the configured sequence length
    pub sequence: Vec<u32>,

    /// 0 for non-vulnerable, 1 for vulnerable
    pub label: usize,
}

/// Zip parallel identifiers and padded sequences into samples, deriving each label from its id
pub fn samples_from_parts(ids: Vec<String>, sequences: Vec<Vec<u32>>) -> Vec<Sample> {
    debug_assert_eq!(ids.len(), sequences.len());

    ids.into_iter()
        .zip(sequences)
        .map(|(id, sequence)| {
            let label = label_from_id(&id);

            Sample::new(id, sequence, label)
        })
        .collect()
}

/// Count the vulnerable samples
pub fn count_vulnerable(samples: &[Sample]) -> usize {
    samples.iter().filter(|sample| sample.label == 1).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn labels_move_with_ids() {
        let samples = samples_from_parts(
            vec!["ok.c".into(), "CVE-1.c".into()],
            vec![vec![1, 0], vec![2, 3]],
        );

        assert_eq!(
            samples,
            vec![
                Sample::new("ok.c".into(), vec![1, 0], 0),
                Sample::new("CVE-1.c".into(), vec![2, 3], 1),
            ]
        );
        assert_eq!(count_vulnerable(&samples), 1);
    }
}
