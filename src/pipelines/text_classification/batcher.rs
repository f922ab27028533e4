use burn::{
    data::dataloader::{self, batcher::Batcher as _},
    tensor::{backend::Backend, Int, Tensor},
};
use derive_new::new;

use crate::utils::tensors::{to_class_tensor, to_int_tensor};

use super::item::Sample;

/// A training batch: padded token ids and their class ids
#[derive(Clone, Debug, new)]
pub struct Train<B: Backend> {
    /// Token ids, shape `[batch_size, seq_length]`
    pub tokens: Tensor<B, 2, Int>,

    /// Class ids for the batch
    pub targets: Tensor<B, 1, Int>,
}

/// An inference batch
#[derive(Clone, Debug, new)]
pub struct Infer<B: Backend> {
    /// Token ids, shape `[batch_size, seq_length]`
    pub tokens: Tensor<B, 2, Int>,
}

/// Struct for batching padded samples
#[derive(Clone, new)]
pub struct Batcher<B: Backend> {
    /// The device tensors are created on
    device: B::Device,

    /// The padded sequence length
    seq_length: usize,
}

/// Implement Batcher trait for Batcher struct for training
impl<B: Backend> dataloader::batcher::Batcher<Sample, Train<B>> for Batcher<B> {
    /// Collects samples into a training batch
    fn batch(&self, items: Vec<Sample>) -> Train<B> {
        let labels = items.iter().map(|item| item.label).collect::<Vec<_>>();
        let targets = to_class_tensor::<B>(&labels, &self.device);

        let infer: Infer<B> = self.batch(items);

        Train {
            tokens: infer.tokens,
            targets,
        }
    }
}

/// Implement Batcher trait for Batcher struct for inference
impl<B: Backend> dataloader::batcher::Batcher<Sample, Infer<B>> for Batcher<B> {
    /// Collects samples into an inference batch
    fn batch(&self, items: Vec<Sample>) -> Infer<B> {
        let sequences = items
            .into_iter()
            .map(|item| item.sequence)
            .collect::<Vec<_>>();

        Infer {
            tokens: to_int_tensor::<B>(&sequences, self.seq_length, &self.device),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use burn::{backend::NdArray, data::dataloader::batcher::Batcher as _};
    use pretty_assertions::assert_eq;

    #[test]
    fn batches_keep_sample_order() {
        let batcher = Batcher::<NdArray>::new(Default::default(), 3);

        let batch: Train<NdArray> = batcher.batch(vec![
            Sample::new("CVE-1.c".into(), vec![1, 2, 0], 1),
            Sample::new("ok.c".into(), vec![3, 0, 0], 0),
        ]);

        assert_eq!(batch.tokens.dims(), [2, 3]);
        assert_eq!(
            batch.tokens.into_data().convert::<i64>().value,
            vec![1, 2, 0, 3, 0, 0]
        );
        assert_eq!(batch.targets.into_data().convert::<i64>().value, vec![1, 0]);
    }
}
