use burn::{
    module::Module,
    nn::{Dropout, Embedding, Linear},
    tensor::{activation::relu, backend::Backend, Int, Tensor},
};

use crate::pipelines::text_classification::Classifier;

/// Fully connected classifier over the flattened sequence embeddings
#[derive(Module, Debug)]
pub struct Dnn<B: Backend> {
    /// Token embeddings
    pub embedding: Embedding<B>,

    /// First hidden layer over `seq_length * embedding_dim` inputs
    pub hidden: Linear<B>,

    /// Second hidden layer
    pub hidden_2: Linear<B>,

    /// Dropout between the hidden layers
    pub dropout: Dropout,

    /// Two-class output layer
    pub output: Linear<B>,
}

impl<B: Backend> Classifier<B> for Dnn<B> {
    fn forward(&self, tokens: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let [batch_size, seq_length] = tokens.dims();

        let embedded = self.embedding.forward(tokens);
        let [_, _, embedding_dim] = embedded.dims();

        let x = embedded.reshape([batch_size, seq_length * embedding_dim]);
        let x = relu(self.hidden.forward(x));
        let x = self.dropout.forward(x);
        let x = relu(self.hidden_2.forward(x));

        self.output.forward(x)
    }
}
