use burn::{
    module::Module,
    nn::{gru::Gru, Dropout, Embedding, Linear, Lstm},
    tensor::{activation::relu, backend::Backend, Int, Tensor},
};

use crate::{pipelines::text_classification::Classifier, utils::tensors::reverse_time};

/// A recurrent layer returning its hidden state at every step. Exactly one cell is set.
#[derive(Module, Debug)]
pub struct Cell<B: Backend> {
    /// Gated recurrent unit
    pub gru: Option<Gru<B>>,

    /// Long short-term memory
    pub lstm: Option<Lstm<B>>,
}

impl<B: Backend> Cell<B> {
    /// Wrap a GRU
    pub fn gru(gru: Gru<B>) -> Self {
        Self {
            gru: Some(gru),
            lstm: None,
        }
    }

    /// Wrap an LSTM
    pub fn lstm(lstm: Lstm<B>) -> Self {
        Self {
            gru: None,
            lstm: Some(lstm),
        }
    }

    /// `[batch_size, seq_length, d_input]` to `[batch_size, seq_length, d_hidden]`
    pub fn forward(&self, input: Tensor<B, 3>) -> Tensor<B, 3> {
        match (&self.gru, &self.lstm) {
            (Some(gru), _) => gru.forward(input, None),
            (None, Some(lstm)) => lstm.forward(input, None).1,
            (None, None) => input,
        }
    }
}

/// Recurrent classifier: embeddings, one or two recurrent passes, global max pooling and a
/// dense head
#[derive(Module, Debug)]
pub struct Recurrent<B: Backend> {
    /// Token embeddings
    pub embedding: Embedding<B>,

    /// Pass over the sequence in reading order
    pub forward_cell: Cell<B>,

    /// Pass over the reversed sequence, for bidirectional models
    pub backward_cell: Option<Cell<B>>,

    /// Dense layer over the pooled features
    pub hidden: Linear<B>,

    /// Dropout before the output layer
    pub dropout: Dropout,

    /// Two-class output layer
    pub output: Linear<B>,
}

impl<B: Backend> Recurrent<B> {
    /// Hidden states for every step, with both directions concatenated when bidirectional
    fn encode(&self, embedded: Tensor<B, 3>) -> Tensor<B, 3> {
        let forward = self.forward_cell.forward(embedded.clone());

        match &self.backward_cell {
            Some(cell) => {
                let backward = reverse_time(cell.forward(reverse_time(embedded)));

                Tensor::cat(vec![forward, backward], 2)
            }
            None => forward,
        }
    }
}

impl<B: Backend> Classifier<B> for Recurrent<B> {
    fn forward(&self, tokens: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let [batch_size, _seq_length] = tokens.dims();

        let states = self.encode(self.embedding.forward(tokens));
        let [_, _, features] = states.dims();

        // Global max pooling over time, taken on the last axis
        let pooled = states
            .swap_dims(1, 2)
            .max_dim(2)
            .reshape([batch_size, features]);

        let x = relu(self.hidden.forward(pooled));
        let x = self.dropout.forward(x);

        self.output.forward(x)
    }
}
