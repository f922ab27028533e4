use burn::{
    config::Config,
    module::Param,
    nn::{
        conv::Conv1dConfig, gru::GruConfig, DropoutConfig, Embedding, EmbeddingConfig,
        LinearConfig, LstmConfig,
    },
    tensor::backend::Backend,
};

use crate::pipelines::text_classification::EmbeddingMatrix;

use super::{
    available::{ModelError, ModelKind},
    dnn::Dnn,
    recurrent::{Cell, Recurrent},
    text_cnn::TextCnn,
};

/// The persisted architecture of a trained classifier
#[derive(Config, Debug)]
pub struct ModelConfig {
    /// The network architecture
    pub kind: ModelKind,

    /// Size of the vocabulary, excluding the reserved index 0
    pub vocab_size: usize,

    /// Size of each word vector
    pub embedding_dim: usize,

    /// Padded sequence length
    pub max_sequence_length: usize,

    /// Width of the hidden layers and recurrent state
    #[config(default = 64)]
    pub hidden_size: usize,

    /// Dropout probability
    #[config(default = 0.5)]
    pub dropout: f64,

    /// Output channels per convolution (textCNN)
    #[config(default = 64)]
    pub filters: usize,

    /// Convolution kernel sizes (textCNN)
    #[config(default = "vec![3, 4, 5]")]
    pub kernel_sizes: Vec<usize>,
}

impl ModelConfig {
    /// Check that the parameters can produce the configured architecture
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.vocab_size == 0 || self.embedding_dim == 0 || self.max_sequence_length == 0 {
            return Err(ModelError::Invalid(format!(
                "vocabulary size ({}), embedding dimension ({}) and sequence length ({}) must be positive",
                self.vocab_size, self.embedding_dim, self.max_sequence_length
            )));
        }

        if self.hidden_size == 0 || !(0.0..1.0).contains(&self.dropout) {
            return Err(ModelError::Invalid(format!(
                "hidden size must be positive and dropout in [0, 1), got {} and {}",
                self.hidden_size, self.dropout
            )));
        }

        if self.kind == ModelKind::TextCnn {
            let largest = self.kernel_sizes.iter().copied().max().unwrap_or(0);

            if self.filters == 0 || self.kernel_sizes.contains(&0) || largest == 0 {
                return Err(ModelError::Invalid(
                    "textCNN needs positive filters and kernel sizes".to_string(),
                ));
            }

            if largest > self.max_sequence_length {
                return Err(ModelError::Invalid(format!(
                    "kernel size {} exceeds the sequence length {}",
                    largest, self.max_sequence_length
                )));
            }
        }

        Ok(())
    }

    /// Initialize the fully connected architecture
    pub fn init_dnn<B: Backend>(
        &self,
        pretrained: Option<&EmbeddingMatrix>,
        device: &B::Device,
    ) -> Result<Dnn<B>, ModelError> {
        self.expect_kind(&[ModelKind::Dnn])?;

        let flattened = self.max_sequence_length * self.embedding_dim;

        Ok(Dnn {
            embedding: self.init_embedding(pretrained, device)?,
            hidden: LinearConfig::new(flattened, self.hidden_size).init(device),
            hidden_2: LinearConfig::new(self.hidden_size, self.hidden_size).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
            output: LinearConfig::new(self.hidden_size, 2).init(device),
        })
    }

    /// Initialize one of the recurrent architectures
    pub fn init_recurrent<B: Backend>(
        &self,
        pretrained: Option<&EmbeddingMatrix>,
        device: &B::Device,
    ) -> Result<Recurrent<B>, ModelError> {
        self.expect_kind(&[
            ModelKind::Gru,
            ModelKind::Lstm,
            ModelKind::BiGru,
            ModelKind::BiLstm,
        ])?;

        let cell = || match self.kind {
            ModelKind::Lstm | ModelKind::BiLstm => Cell::lstm(
                LstmConfig::new(self.embedding_dim, self.hidden_size, true).init(device),
            ),
            _ => Cell::gru(GruConfig::new(self.embedding_dim, self.hidden_size, true).init(device)),
        };

        let (backward_cell, features) = if self.kind.is_bidirectional() {
            (Some(cell()), 2 * self.hidden_size)
        } else {
            (None, self.hidden_size)
        };

        Ok(Recurrent {
            embedding: self.init_embedding(pretrained, device)?,
            forward_cell: cell(),
            backward_cell,
            hidden: LinearConfig::new(features, self.hidden_size).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
            output: LinearConfig::new(self.hidden_size, 2).init(device),
        })
    }

    /// Initialize the convolutional architecture
    pub fn init_text_cnn<B: Backend>(
        &self,
        pretrained: Option<&EmbeddingMatrix>,
        device: &B::Device,
    ) -> Result<TextCnn<B>, ModelError> {
        self.expect_kind(&[ModelKind::TextCnn])?;

        let convolutions = self
            .kernel_sizes
            .iter()
            .map(|kernel_size| {
                Conv1dConfig::new(self.embedding_dim, self.filters, *kernel_size).init(device)
            })
            .collect();

        Ok(TextCnn {
            embedding: self.init_embedding(pretrained, device)?,
            convolutions,
            dropout: DropoutConfig::new(self.dropout).init(),
            output: LinearConfig::new(self.filters * self.kernel_sizes.len(), 2).init(device),
        })
    }

    fn expect_kind(&self, kinds: &[ModelKind]) -> Result<(), ModelError> {
        self.validate()?;

        if kinds.contains(&self.kind) {
            Ok(())
        } else {
            Err(ModelError::Invalid(format!(
                "{} cannot be built as {:?}",
                self.kind, kinds
            )))
        }
    }

    /// One row per vocabulary index plus the reserved row 0, seeded from the pretrained matrix
    fn init_embedding<B: Backend>(
        &self,
        pretrained: Option<&EmbeddingMatrix>,
        device: &B::Device,
    ) -> Result<Embedding<B>, ModelError> {
        let mut embedding =
            EmbeddingConfig::new(self.vocab_size + 1, self.embedding_dim).init(device);

        if let Some(matrix) = pretrained {
            if matrix.rows() != self.vocab_size + 1 || matrix.dim() != self.embedding_dim {
                return Err(ModelError::Invalid(format!(
                    "embedding matrix is {}x{}, expected {}x{}",
                    matrix.rows(),
                    matrix.dim(),
                    self.vocab_size + 1,
                    self.embedding_dim
                )));
            }

            embedding.weight = Param::from_tensor(matrix.to_tensor(device));
        }

        Ok(embedding)
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, io::Cursor};

    use burn::{
        backend::{Autodiff, NdArray},
        module::AutodiffModule,
        nn::loss::CrossEntropyLossConfig,
        optim::{AdamWConfig, GradientsParams, Optimizer},
        tensor::{Int, Tensor},
    };
    use pretty_assertions::assert_eq;

    use crate::pipelines::text_classification::{
        batcher::Train, load_embedding_matrix, Classifier,
    };

    use super::*;

    type B = NdArray;
    type AD = Autodiff<NdArray>;

    fn config(kind: ModelKind) -> ModelConfig {
        ModelConfig::new(kind, 5, 4, 6)
            .with_hidden_size(8)
            .with_filters(3)
            .with_kernel_sizes(vec![2, 3])
    }

    fn tokens() -> Tensor<B, 2, Int> {
        Tensor::from_ints(
            [[1, 2, 3, 0, 0, 0], [5, 4, 3, 2, 1, 0], [0, 0, 0, 0, 0, 0]],
            &Default::default(),
        )
    }

    fn assert_probabilities(probabilities: Tensor<B, 1>) {
        let values = probabilities.into_data().convert::<f32>().value;

        assert_eq!(values.len(), 3);
        assert!(values.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn every_architecture_yields_two_logits() -> anyhow::Result<()> {
        let device = Default::default();

        let dnn = config(ModelKind::Dnn).init_dnn::<B>(None, &device)?;
        assert_eq!(dnn.forward(tokens()).dims(), [3, 2]);
        assert_probabilities(dnn.infer(tokens()));

        for kind in [
            ModelKind::Gru,
            ModelKind::Lstm,
            ModelKind::BiGru,
            ModelKind::BiLstm,
        ] {
            let model = config(kind).init_recurrent::<B>(None, &device)?;
            assert_eq!(model.forward(tokens()).dims(), [3, 2]);
            assert_eq!(model.backward_cell.is_some(), kind.is_bidirectional());
            assert_probabilities(model.infer(tokens()));
        }

        let cnn = config(ModelKind::TextCnn).init_text_cnn::<B>(None, &device)?;
        assert_eq!(cnn.convolutions.len(), 2);
        assert_eq!(cnn.forward(tokens()).dims(), [3, 2]);
        assert_probabilities(cnn.infer(tokens()));

        Ok(())
    }

    /// One weighted cross-entropy step: forward, backward and an optimizer update
    fn train_step<M>(model: M) -> M
    where
        M: AutodiffModule<AD> + Classifier<AD>,
        M::InnerModule: Classifier<B>,
    {
        let device = Default::default();

        let batch = Train::new(
            Tensor::from_ints([[1, 2, 3, 0, 0, 0], [5, 4, 3, 2, 1, 0]], &device),
            Tensor::from_ints([1, 0], &device),
        );
        let loss = CrossEntropyLossConfig::new()
            .with_weights(Some(vec![0.75, 1.5]))
            .init::<AD>(&device);

        let output = model.forward_classification(batch, &loss);
        assert!(output.loss.clone().into_scalar().is_finite());

        let mut optimizer = AdamWConfig::new().init::<AD, M>();
        let grads = GradientsParams::from_grads(output.loss.backward(), &model);
        let model = optimizer.step(1e-3, model, grads);

        assert_eq!(model.valid().forward(tokens()).dims(), [3, 2]);

        model
    }

    #[test]
    fn every_architecture_takes_a_training_step() -> anyhow::Result<()> {
        let device = Default::default();

        train_step(config(ModelKind::Dnn).init_dnn::<AD>(None, &device)?);

        for kind in [
            ModelKind::Gru,
            ModelKind::Lstm,
            ModelKind::BiGru,
            ModelKind::BiLstm,
        ] {
            train_step(config(kind).init_recurrent::<AD>(None, &device)?);
        }

        train_step(config(ModelKind::TextCnn).init_text_cnn::<AD>(None, &device)?);

        Ok(())
    }

    #[test]
    fn seeds_embedding_with_pretrained_vectors() -> anyhow::Result<()> {
        let word_index: BTreeMap<String, usize> = ["a", "b", "c", "d", "e"]
            .iter()
            .enumerate()
            .map(|(i, word)| (word.to_string(), i + 1))
            .collect();
        let matrix = load_embedding_matrix(Cursor::new("c 1 2 3 4\n"), &word_index, 4)?;

        let model =
            config(ModelKind::Gru).init_recurrent::<B>(Some(&matrix), &Default::default())?;
        let weights = model.embedding.weight.val().into_data().convert::<f32>().value;

        assert_eq!(&weights[12..16], &[1.0, 2.0, 3.0, 4.0]);
        assert!(weights[..12].iter().all(|w| *w == 0.0));

        Ok(())
    }

    #[test]
    fn rejects_mismatched_parameters() {
        let device = Default::default();

        let wrong_dim = EmbeddingMatrix::zeros(6, 3);
        assert!(config(ModelKind::Dnn)
            .init_dnn::<B>(Some(&wrong_dim), &device)
            .is_err());

        let too_wide = config(ModelKind::TextCnn).with_kernel_sizes(vec![3, 7]);
        assert!(matches!(too_wide.validate(), Err(ModelError::Invalid(_))));

        assert!(config(ModelKind::Gru).init_dnn::<B>(None, &device).is_err());
    }

    #[test]
    fn saves_and_loads_json() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.json");

        let saved = config(ModelKind::BiLstm);
        saved.save(&path)?;

        let loaded = ModelConfig::load(&path).map_err(|e| anyhow!("{}", e))?;

        assert_eq!(loaded.kind, ModelKind::BiLstm);
        assert_eq!(loaded.kernel_sizes, vec![2, 3]);
        assert_eq!(loaded.vocab_size, 5);

        Ok(())
    }
}
