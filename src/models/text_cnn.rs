use burn::{
    module::Module,
    nn::{conv::Conv1d, Dropout, Embedding, Linear},
    tensor::{activation::relu, backend::Backend, Int, Tensor},
};

use crate::pipelines::text_classification::Classifier;

/// Convolutional classifier: one 1-D convolution per kernel size, max-pooled over time
#[derive(Module, Debug)]
pub struct TextCnn<B: Backend> {
    /// Token embeddings
    pub embedding: Embedding<B>,

    /// Convolutions over the embedding channels, one per kernel size
    pub convolutions: Vec<Conv1d<B>>,

    /// Dropout over the concatenated features
    pub dropout: Dropout,

    /// Two-class output layer
    pub output: Linear<B>,
}

impl<B: Backend> Classifier<B> for TextCnn<B> {
    fn forward(&self, tokens: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let [batch_size, _seq_length] = tokens.dims();

        // [batch_size, embedding_dim, seq_length]
        let embedded = self.embedding.forward(tokens).swap_dims(1, 2);

        let features = self
            .convolutions
            .iter()
            .map(|conv| {
                let x = relu(conv.forward(embedded.clone()));
                let [_, filters, _] = x.dims();

                x.max_dim(2).reshape([batch_size, filters])
            })
            .collect::<Vec<_>>();

        let x = Tensor::cat(features, 1);
        let x = self.dropout.forward(x);

        self.output.forward(x)
    }
}
