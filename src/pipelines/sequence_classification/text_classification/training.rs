use burn::{
    config::Config as _,
    data::{dataloader::DataLoaderBuilder, dataset::Dataset},
    lr_scheduler::linear::LinearLrSchedulerConfig,
    module::AutodiffModule,
    optim::AdamWConfig,
    record::{CompactRecorder, Recorder},
    tensor::backend::AutodiffBackend,
    train::{
        metric::{AccuracyMetric, LearningRateMetric, LossMetric},
        ClassificationOutput, LearnerBuilder, ValidStep,
    },
};

use crate::{
    pipelines::sequence_classification,
    utils::{
        hugging_face::{download_hf_model, load_tokenizer},
        model_card,
        renderer::Simple,
    },
};

use super::{batcher::Train, evaluate, Batcher, EvalReport, Item, Model, ModelConfig};

/// Training Config
pub type Config = sequence_classification::config::Training;

/// Number of optimizer steps over the whole run, used as the length of the learning rate decay
fn total_steps(n_train: usize, batch_size: usize, num_epochs: usize) -> usize {
    let steps_per_epoch = n_train.div_ceil(batch_size.max(1));

    (steps_per_epoch * num_epochs).max(1)
}

/// Fine-tune a pre-trained model on a labeled dataset, then evaluate it and save the artifacts
pub async fn train<B, M, I, D>(
    devices: Vec<B::Device>, // Device on which to perform computation (e.g., CPU or CUDA device)
    dataset_train: D,        // Training dataset
    dataset_test: D,         // Testing dataset
    config: Config,          // Experiment configuration
    use_tui: bool,           // Render progress with the terminal UI rather than the log
) -> anyhow::Result<EvalReport>
where
    B: AutodiffBackend,
    M: Model<B> + 'static,
    I: Item + 'static,
    D: Dataset<I> + 'static,

    M::InnerModule: ValidStep<
        Train<<B as AutodiffBackend>::InnerBackend>,
        ClassificationOutput<<B as AutodiffBackend>::InnerBackend>,
    >,
{
    config.validate()?;

    let device = devices
        .first()
        .cloned()
        .ok_or_else(|| anyhow!("At least one device is required for training"))?;

    let artifact_dir = config.artifact_dir();
    std::fs::create_dir_all(&artifact_dir)?;

    let files = download_hf_model(&config.model_name).await?;

    let (tokenizer, pad_token_id) = load_tokenizer(&files.tokenizer, config.max_seq_length)?;

    let model_config = M::Config::load_pretrained(
        files.config,
        &config.labels,
        pad_token_id,
        config.max_seq_length,
    )
    .map_err(|e| anyhow!("Unable to load pre-trained model config file: {}", e))?;

    let model = M::load_from_safetensors(&device, files.weights, model_config.clone())?;

    log::info!(
        "Training {} on {} train / {} test examples",
        config.model_name,
        dataset_train.len(),
        dataset_test.len()
    );

    let num_iters = total_steps(dataset_train.len(), config.batch_size, config.num_epochs);

    // Initialize batchers for training and testing data
    let batcher_train =
        Batcher::<B>::new(tokenizer.clone(), model_config.get_config(), device.clone());
    let batcher_test = Batcher::<B::InnerBackend>::new(
        tokenizer.clone(),
        model_config.get_config(),
        device.clone(),
    );

    let workers = std::thread::available_parallelism()?;

    // Initialize data loaders for training and testing data
    let dataloader_train = DataLoaderBuilder::new(batcher_train)
        .batch_size(config.batch_size)
        .shuffle(config.seed)
        .num_workers(workers.into())
        .build(dataset_train);

    let dataloader_test = DataLoaderBuilder::new(batcher_test)
        .batch_size(config.batch_size * 2)
        .num_workers(workers.into())
        .build(dataset_test);

    // Initialize optimizer
    let optimizer = AdamWConfig::new()
        .with_epsilon(config.adam_epsilon)
        .with_weight_decay(config.weight_decay)
        .init();

    // Decay linearly from the initial learning rate to zero over the run
    let lr_scheduler = LinearLrSchedulerConfig::new(config.learning_rate, 0.0, num_iters).init();

    // Initialize learner
    let mut builder = LearnerBuilder::new(&artifact_dir)
        .metric_train_numeric(AccuracyMetric::new())
        .metric_valid_numeric(AccuracyMetric::new())
        .metric_train_numeric(LossMetric::new())
        .metric_valid_numeric(LossMetric::new())
        .metric_train_numeric(LearningRateMetric::new())
        .with_file_checkpointer(CompactRecorder::new())
        .devices(devices)
        .num_epochs(config.num_epochs)
        .summary();

    if !use_tui {
        builder = builder.renderer(Simple::new());
    }

    let learner = builder.build(model, optimizer, lr_scheduler);

    // Train the model
    let model_trained = learner.fit(dataloader_train, dataloader_test.clone());

    let report = evaluate(&model_trained.valid(), dataloader_test);

    // Save the configurations, tokenizer, metrics and the trained model
    model_config
        .save(format!("{artifact_dir}/config.json"))
        .map_err(|e| anyhow!("Unable to save model config: {}", e))?;

    config
        .save(format!("{artifact_dir}/training.json"))
        .map_err(|e| anyhow!("Unable to save training config: {}", e))?;

    tokenizer
        .save(format!("{artifact_dir}/tokenizer.json"), false)
        .map_err(|e| anyhow!("Unable to save tokenizer: {}", e))?;

    CompactRecorder::new()
        .record(
            model_trained.into_record(),
            format!("{artifact_dir}/model").into(),
        )
        .map_err(|e| anyhow!("Unable to save trained model: {}", e))?;

    report.save(format!("{artifact_dir}/eval_results.json"))?;

    std::fs::write(
        format!("{artifact_dir}/README.md"),
        model_card::render(&config, &report)?,
    )?;

    log::info!("Saved artifacts to {}", artifact_dir);

    Ok(report)
}
