use std::path::{Path, PathBuf};

use burn::{
    config::Config as _,
    data::dataloader::batcher::Batcher as _,
    module::Module,
    record::{CompactRecorder, Recorder},
    tensor::backend::Backend,
};

use crate::{
    models::{Dnn, ModelConfig, ModelKind, Recurrent, TextCnn},
    settings::{RunParams, Settings},
    utils::timestamp,
};

use super::{
    batcher::Infer,
    item::Sample,
    metrics::{accuracy, threshold, ClassificationReport, ConfusionMatrix},
    model::Classifier,
    pipeline::{load_samples, partition},
    report::{result_path, write_results, PredictionRecord},
    tokenizer::SequenceTokenizer,
    Batcher,
};

/// A trained classifier restored from a checkpoint
#[derive(Debug)]
pub enum TrainedModel<B: Backend> {
    /// Fully connected network
    Dnn(Dnn<B>),

    /// GRU, LSTM, BiGRU or BiLSTM
    Recurrent(Recurrent<B>),

    /// Convolutional network
    TextCnn(TextCnn<B>),
}

impl<B: Backend> TrainedModel<B> {
    /// Predict the probability of each sample being vulnerable, batch by batch, in sample order
    pub fn predict(
        &self,
        samples: &[Sample],
        seq_length: usize,
        batch_size: usize,
        device: &B::Device,
    ) -> Vec<f32> {
        match self {
            TrainedModel::Dnn(model) => predict(model, samples, seq_length, batch_size, device),
            TrainedModel::Recurrent(model) => {
                predict(model, samples, seq_length, batch_size, device)
            }
            TrainedModel::TextCnn(model) => predict(model, samples, seq_length, batch_size, device),
        }
    }
}

fn predict<B: Backend, M: Classifier<B>>(
    model: &M,
    samples: &[Sample],
    seq_length: usize,
    batch_size: usize,
    device: &B::Device,
) -> Vec<f32> {
    let batcher = Batcher::<B>::new(device.clone(), seq_length);

    samples
        .chunks(batch_size.max(1))
        .flat_map(|chunk| {
            let batch: Infer<B> = batcher.batch(chunk.to_vec());

            model.infer(batch.tokens).into_data().convert::<f32>().value
        })
        .collect()
}

/// Restore a checkpoint together with the `config.json` saved beside it.
///
/// Returns `None` when `path` is not a file, so that callers can skip evaluation.
pub fn load_model<B: Backend>(
    path: &Path,
    device: &B::Device,
) -> anyhow::Result<Option<(TrainedModel<B>, ModelConfig)>> {
    if !path.is_file() {
        log::warn!("Failed to load the trained model from {}", path.display());

        return Ok(None);
    }

    let config_file = path
        .parent()
        .map(|dir| dir.join("config.json"))
        .unwrap_or_else(|| PathBuf::from("config.json"));

    let config = ModelConfig::load(&config_file)
        .map_err(|e| anyhow!("Unable to load config file {}: {}", config_file.display(), e))?;

    let model = match config.kind {
        ModelKind::Dnn => {
            let model = config.init_dnn(None, device)?;

            TrainedModel::Dnn(load_record(model, path, device)?)
        }
        ModelKind::Gru | ModelKind::Lstm | ModelKind::BiGru | ModelKind::BiLstm => {
            let model = config.init_recurrent(None, device)?;

            TrainedModel::Recurrent(load_record(model, path, device)?)
        }
        ModelKind::TextCnn => {
            let model = config.init_text_cnn(None, device)?;

            TrainedModel::TextCnn(load_record(model, path, device)?)
        }
    };

    log::info!("Loaded {} from {}", config.kind, path.display());

    Ok(Some((model, config)))
}

fn load_record<B: Backend, M: Module<B>>(
    model: M,
    path: &Path,
    device: &B::Device,
) -> anyhow::Result<M> {
    let record = CompactRecorder::new()
        .load(path.to_path_buf(), device)
        .map_err(|e| anyhow!("Unable to load trained model weights: {}", e))?;

    Ok(model.load_record(record))
}

/// The test samples: the held-out partition of the dataset, or the separate test set
pub async fn load_test_set(
    settings: &Settings,
    params: &RunParams,
    tokenizer: &SequenceTokenizer,
) -> anyhow::Result<Vec<Sample>> {
    let training = &settings.training_settings;

    if training.using_separate_test_set {
        let test_set_path = training
            .test_set_path
            .as_ref()
            .ok_or_else(|| anyhow!("using_separate_test_set requires test_set_path"))?;

        let samples = load_samples(test_set_path, settings, tokenizer).await?;

        log::info!("Loaded {} samples from the separate test set", samples.len());

        return Ok(samples);
    }

    let samples = load_samples(&params.data_dir, settings, tokenizer).await?;

    partition(samples, settings, params.seed)?
        .test
        .ok_or_else(|| anyhow!("The dataset partition has no test set"))
}

/// The outcome of evaluating a trained model on the test set
#[derive(Clone, Debug)]
pub struct Evaluation {
    /// Fraction of correctly classified test samples
    pub accuracy: f64,

    /// Rows are true labels, columns predicted labels
    pub confusion_matrix: ConfusionMatrix,

    /// Per-class precision, recall and F1
    pub report: ClassificationReport,

    /// One record per test sample, in test order
    pub records: Vec<PredictionRecord>,

    /// Where the records were written
    pub result_file: PathBuf,
}

/// Score predicted probabilities against the true labels
pub fn evaluate(
    samples: &[Sample],
    probabilities: &[f32],
) -> (f64, ConfusionMatrix, ClassificationReport) {
    let labels = samples.iter().map(|sample| sample.label).collect::<Vec<_>>();
    let predicted = threshold(probabilities);

    let matrix = ConfusionMatrix::new(&labels, &predicted);
    let report = ClassificationReport::new(&matrix);

    (accuracy(&predicted, &labels), matrix, report)
}

/// Evaluate the model at `params.trained_model` on the test set and write the per-sample results.
///
/// Returns `None` when no trained model could be found.
pub async fn infer<B: Backend>(
    settings: &Settings,
    params: &RunParams,
    device: B::Device,
) -> anyhow::Result<Option<Evaluation>> {
    let Some(model_path) = params.trained_model.as_deref() else {
        log::warn!("Failed to load the trained model: no model path given");

        return Ok(None);
    };

    let Some((model, config)) = load_model::<B>(model_path, &device)? else {
        return Ok(None);
    };

    if config.kind.as_str() != settings.model_settings.model {
        log::warn!(
            "The checkpoint holds a {} model but the settings name {}; results go under {}",
            config.kind,
            settings.model_settings.model,
            config.kind
        );
    }

    let max_len = settings.model_settings.model_para.max_sequence_length;

    if config.max_sequence_length != max_len {
        return Err(anyhow!(
            "The checkpoint expects sequences of length {} but the settings pad to {}",
            config.max_sequence_length,
            max_len
        ));
    }

    let tokenizer = SequenceTokenizer::from_file(&settings.training_settings.tokenizer_path)?;
    let test = load_test_set(settings, params, &tokenizer).await?;

    let probabilities = model.predict(
        &test,
        config.max_sequence_length,
        settings.training_settings.network_config.batch_size,
        &device,
    );

    let (accuracy, confusion_matrix, report) = evaluate(&test, &probabilities);

    log::info!("Test accuracy: {:.4}", accuracy);

    let records = test
        .into_iter()
        .zip(probabilities)
        .map(|(sample, probability)| PredictionRecord::new(sample.id, probability, sample.label))
        .collect::<Vec<_>>();

    // Results are namespaced by the architecture that produced them
    let result_file = result_path(&params.output_dir, config.kind.as_str(), &timestamp());
    write_results(&result_file, &records)?;

    log::info!("Results written to {}", result_file.display());

    Ok(Some(Evaluation {
        accuracy,
        confusion_matrix,
        report,
        records,
        result_file,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    use burn::{backend::NdArray, config::Config as _};
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_checkpoint_is_skipped() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;

        let loaded = load_model::<NdArray>(&dir.path().join("absent.mpk"), &Default::default())?;
        assert!(loaded.is_none());

        // A directory is not a checkpoint either
        assert!(load_model::<NdArray>(dir.path(), &Default::default())?.is_none());

        Ok(())
    }

    #[test]
    fn evaluates_thresholded_probabilities() {
        let samples = vec![
            Sample::new("CVE-1.c".into(), vec![], 1),
            Sample::new("a.c".into(), vec![], 0),
            Sample::new("CVE-2.c".into(), vec![], 1),
            Sample::new("b.c".into(), vec![], 0),
        ];

        let (accuracy, matrix, report) = evaluate(&samples, &[0.9, 0.1, 0.4, 0.6]);

        assert_eq!(accuracy, 0.5);
        assert_eq!(matrix, ConfusionMatrix([[1, 1], [1, 1]]));
        assert_eq!(report.classes[1].support, 2);
    }

    #[test]
    fn restores_saved_weights() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let device = Default::default();

        let config = ModelConfig::new(ModelKind::Gru, 4, 3, 5).with_hidden_size(4);
        config
            .save(dir.path().join("config.json"))
            .map_err(|e| anyhow!("{}", e))?;

        let model = config.init_recurrent::<NdArray>(None, &device)?;
        let path = dir.path().join("GRU_01_0.500_0.693147.mpk");
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .map_err(|e| anyhow!("{}", e))?;

        let samples = vec![
            Sample::new("x.c".into(), vec![1, 2, 3, 0, 0], 0),
            Sample::new("y.c".into(), vec![4, 4, 0, 0, 0], 1),
            Sample::new("z.c".into(), vec![0, 0, 0, 0, 0], 0),
        ];

        let (restored, restored_config) =
            load_model::<NdArray>(&path, &device)?.ok_or_else(|| anyhow!("model not loaded"))?;
        assert_eq!(restored_config.kind, ModelKind::Gru);

        let expected = predict(&model, &samples, 5, 2, &device);
        let actual = restored.predict(&samples, 5, 2, &device);

        // Checkpoints are stored at half precision
        assert_eq!(actual.len(), 3);
        for (a, e) in actual.iter().zip(&expected) {
            assert!((a - e).abs() < 1e-2);
        }

        Ok(())
    }
}
