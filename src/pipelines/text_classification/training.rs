use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    sync::Arc,
};

use burn::{
    config::Config as _,
    data::{
        dataloader::{DataLoader, DataLoaderBuilder},
        dataset::InMemDataset,
    },
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::{AdamWConfig, GradientsParams, Optimizer},
    record::{CompactRecorder, Recorder},
    tensor::{
        backend::{AutodiffBackend, Backend},
        ElementConversion,
    },
    train::ClassificationOutput,
};

use crate::{
    models::{ModelConfig, ModelKind},
    settings::{RunParams, Settings},
    utils::{classes::balanced_class_weights, renderer::save_loss_chart, timestamp},
};

use super::{
    batcher::Train,
    callbacks::{Checkpointer, EarlyStopping, EpochLogger, Monitor},
    embedding::load_embedding_matrix,
    history::{EpochMetrics, TrainingHistory},
    item::Sample,
    model::Classifier,
    pipeline::{load_samples, partition},
    tokenizer::SequenceTokenizer,
    Batcher,
};

/// The artifacts of a finished training run
#[derive(Clone, Debug)]
pub struct TrainingSummary {
    /// The trained architecture
    pub model: ModelKind,

    /// Per-epoch metrics of the epochs that ran
    pub history: TrainingHistory,

    /// Every checkpoint written, in order; the last one is the best when only improvements are
    /// saved
    pub checkpoints: Vec<PathBuf>,

    /// The persisted architecture (`config.json`)
    pub config_file: PathBuf,

    /// The CSV epoch log
    pub log_file: PathBuf,

    /// The JSON history, if requested
    pub history_file: Option<PathBuf>,

    /// The loss chart, if requested
    pub plot_file: Option<PathBuf>,
}

/// Options for one call to [`fit`]
struct FitOptions<'a> {
    seq_length: usize,
    batch_size: usize,
    epochs: usize,
    patience: usize,
    learning_rate: f64,
    class_weights: Option<Vec<f32>>,
    checkpointer: Checkpointer,
    monitor: Monitor,
    log_file: &'a Path,
}

/// What [`fit`] produced
struct FitOutcome {
    history: TrainingHistory,
    checkpoints: Vec<PathBuf>,
}

/// Train the configured architecture on the dataset below `params.data_dir`
pub async fn train<B: AutodiffBackend>(
    settings: &Settings,
    params: &RunParams,
    device: B::Device,
) -> anyhow::Result<TrainingSummary> {
    let training = &settings.training_settings;
    let network = &training.network_config;
    let model_params = &settings.model_settings.model_para;

    let kind = ModelKind::lookup(&settings.model_settings.model)?;
    let monitor: Monitor = network.validation_metric.parse()?;

    let tokenizer = SequenceTokenizer::from_file(&training.tokenizer_path)?;
    log::info!("Found {} unique tokens.", tokenizer.vocab_size());

    let samples = load_samples(&params.data_dir, settings, &tokenizer).await?;
    let partitions = partition(samples, settings, params.seed)?;
    partitions.log_summary();

    let vectors = File::open(&training.embedding_model_path).map_err(|e| {
        anyhow!(
            "Unable to open word vectors {}: {}",
            training.embedding_model_path.display(),
            e
        )
    })?;
    let embedding = load_embedding_matrix(
        BufReader::new(vectors),
        tokenizer.word_index(),
        model_params.embedding_dim,
    )?;

    let config = ModelConfig::new(
        kind,
        tokenizer.vocab_size(),
        model_params.embedding_dim,
        model_params.max_sequence_length,
    )
    .with_hidden_size(model_params.hidden_size)
    .with_dropout(model_params.dropout)
    .with_filters(model_params.filters)
    .with_kernel_sizes(model_params.kernel_sizes.clone());

    config.validate()?;

    let config_file = training.model_save_path.join("config.json");
    config
        .save(&config_file)
        .map_err(|e| anyhow!("Unable to save model config: {}", e))?;

    let class_weights = if model_params.handle_data_imbalance {
        let labels = partitions
            .train
            .iter()
            .map(|sample| sample.label)
            .collect::<Vec<_>>();
        let weights = balanced_class_weights(&labels);

        log::info!("Class weights: {:?}", weights);

        Some(weights)
    } else {
        None
    };

    let run_timestamp = timestamp();
    let log_file = training
        .log_path
        .join(format!("{}_{}.log", training.model_saved_name, run_timestamp));

    let options = FitOptions {
        seq_length: model_params.max_sequence_length,
        batch_size: network.batch_size,
        epochs: network.epochs,
        patience: network.patience,
        learning_rate: network.learning_rate,
        class_weights,
        checkpointer: Checkpointer::new(
            &training.model_save_path,
            kind.as_str(),
            monitor,
            training.save_best_model,
        ),
        monitor,
        log_file: &log_file,
    };

    log::info!("Training {} on {:?}", kind, device);

    let (train, validation) = (partitions.train, partitions.validation);

    let outcome = match kind {
        ModelKind::Dnn => fit::<B, _>(
            config.init_dnn(Some(&embedding), &device)?,
            train,
            validation,
            options,
            &device,
        )?,
        ModelKind::Gru | ModelKind::Lstm | ModelKind::BiGru | ModelKind::BiLstm => fit::<B, _>(
            config.init_recurrent(Some(&embedding), &device)?,
            train,
            validation,
            options,
            &device,
        )?,
        ModelKind::TextCnn => fit::<B, _>(
            config.init_text_cnn(Some(&embedding), &device)?,
            train,
            validation,
            options,
            &device,
        )?,
    };

    let history_file = if network.save_training_history {
        let path = training.model_save_path.join(format!(
            "{}_{}_history.json",
            training.model_saved_name, run_timestamp
        ));
        outcome.history.save(&path)?;

        Some(path)
    } else {
        None
    };

    let plot_file = if network.plot_training_history {
        let path = training
            .model_save_path
            .join(format!("{}_Epoch_loss.svg", training.model_saved_name));
        save_loss_chart(&path, &outcome.history.loss, &outcome.history.val_loss)?;

        Some(path)
    } else {
        None
    };

    Ok(TrainingSummary {
        model: kind,
        history: outcome.history,
        checkpoints: outcome.checkpoints,
        config_file,
        log_file,
        history_file,
        plot_file,
    })
}

/// Running loss and accuracy over the batches of one epoch
#[derive(Debug, Default)]
struct RunningMetrics {
    loss_sum: f64,
    correct: usize,
    seen: usize,
}

impl RunningMetrics {
    fn update<B: Backend>(&mut self, output: &ClassificationOutput<B>) {
        let [batch_size, _n_classes] = output.output.dims();

        let loss = output.loss.clone().into_scalar().elem::<f64>();

        let predicted = output.output.clone().argmax(1).reshape([batch_size]);
        let correct = predicted
            .equal(output.targets.clone())
            .int()
            .sum()
            .into_scalar()
            .elem::<i64>();

        self.loss_sum += loss * batch_size as f64;
        self.correct += correct as usize;
        self.seen += batch_size;
    }

    fn loss(&self) -> f64 {
        if self.seen == 0 {
            return 0.0;
        }

        self.loss_sum / self.seen as f64
    }

    fn accuracy(&self) -> f64 {
        if self.seen == 0 {
            return 0.0;
        }

        self.correct as f64 / self.seen as f64
    }
}

/// Fit a model epoch by epoch, checkpointing, logging and stopping early as configured
fn fit<B, M>(
    model: M,
    train: Vec<Sample>,
    validation: Vec<Sample>,
    options: FitOptions<'_>,
    device: &B::Device,
) -> anyhow::Result<FitOutcome>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + Classifier<B>,
    M::InnerModule: Classifier<B::InnerBackend>,
{
    let FitOptions {
        seq_length,
        batch_size,
        epochs,
        patience,
        learning_rate,
        class_weights,
        mut checkpointer,
        monitor,
        log_file,
    } = options;

    // Batches follow partition order so that every run sees the same sequence
    let dataloader_train: Arc<dyn DataLoader<Train<B>>> =
        DataLoaderBuilder::new(Batcher::<B>::new(device.clone(), seq_length))
            .batch_size(batch_size)
            .build(InMemDataset::new(train));

    let dataloader_valid: Arc<dyn DataLoader<Train<B::InnerBackend>>> =
        DataLoaderBuilder::new(Batcher::<B::InnerBackend>::new(device.clone(), seq_length))
            .batch_size(batch_size)
            .build(InMemDataset::new(validation));

    let loss_train = CrossEntropyLossConfig::new()
        .with_weights(class_weights.clone())
        .init::<B>(device);
    let loss_valid = CrossEntropyLossConfig::new()
        .with_weights(class_weights)
        .init::<B::InnerBackend>(device);

    let mut optimizer = AdamWConfig::new().init::<B, M>();
    let mut early_stopping = EarlyStopping::new(monitor, patience);
    let mut epoch_logger = EpochLogger::create(log_file)?;

    let mut model = model;
    let mut history = TrainingHistory::default();
    let mut checkpoints = Vec::new();

    for epoch in 1..=epochs {
        let mut train_metrics = RunningMetrics::default();

        for batch in dataloader_train.iter() {
            let output = model.forward_classification(batch, &loss_train);
            train_metrics.update(&output);

            let grads = GradientsParams::from_grads(output.loss.backward(), &model);
            model = optimizer.step(learning_rate, model, grads);
        }

        let model_valid = model.valid();
        let mut valid_metrics = RunningMetrics::default();

        for batch in dataloader_valid.iter() {
            let output = model_valid.forward_classification(batch, &loss_valid);
            valid_metrics.update(&output);
        }

        let metrics = EpochMetrics {
            epoch,
            loss: train_metrics.loss(),
            accuracy: train_metrics.accuracy(),
            val_loss: valid_metrics.loss(),
            val_accuracy: valid_metrics.accuracy(),
        };

        log::info!(
            "Epoch {}/{} - loss: {:.4} - accuracy: {:.4} - val_loss: {:.4} - val_accuracy: {:.4}",
            epoch,
            epochs,
            metrics.loss,
            metrics.accuracy,
            metrics.val_loss,
            metrics.val_accuracy
        );

        if let Some(path) = checkpointer.on_epoch_end(&metrics) {
            CompactRecorder::new()
                .record(model.clone().into_record(), path.clone())
                .map_err(|e| anyhow!("Unable to save checkpoint {}: {}", path.display(), e))?;

            log::info!("Saved checkpoint {}", path.display());

            checkpoints.push(path);
        }

        epoch_logger.log(&metrics)?;
        history.push(metrics);

        if early_stopping.should_stop(&metrics) {
            log::info!("Epoch {:02}: early stopping", epoch);
            break;
        }
    }

    Ok(FitOutcome {
        history,
        checkpoints,
    })
}
