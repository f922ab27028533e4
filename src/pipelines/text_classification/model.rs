use burn::{
    module::Module,
    nn::loss::CrossEntropyLoss,
    tensor::{activation::softmax, backend::Backend, Int, Tensor},
    train::ClassificationOutput,
};

use super::batcher::Train;

/// A trait for models that classify padded token sequences as vulnerable or not
pub trait Classifier<B: Backend>: Module<B> {
    /// Forward pass producing two logits per sample, shape `[batch_size, 2]`
    fn forward(&self, tokens: Tensor<B, 2, Int>) -> Tensor<B, 2>;

    /// Defines forward pass for training and validation
    fn forward_classification(
        &self,
        batch: Train<B>,
        loss: &CrossEntropyLoss<B>,
    ) -> ClassificationOutput<B> {
        let output = self.forward(batch.tokens);
        let loss = loss.forward(output.clone(), batch.targets.clone());

        ClassificationOutput {
            loss,
            output,
            targets: batch.targets,
        }
    }

    /// Defines forward pass for inference: the probability of each sample being vulnerable
    fn infer(&self, tokens: Tensor<B, 2, Int>) -> Tensor<B, 1> {
        let [batch_size, _seq_length] = tokens.dims();

        softmax(self.forward(tokens), 1)
            .slice([0..batch_size, 1..2])
            .reshape([batch_size])
    }
}
