//! Command line tool to fine-tune a model for sentiment classification

use anyhow::anyhow;
use burn::backend::{libtorch::LibTorchDevice, Autodiff, LibTorch};
use burn_sentiment::{
    cli::{datasets::Dataset, models, pipelines::Pipeline},
    datasets::{sentiment, LoadableDataset},
    models::gpt2,
    pipelines::sequence_classification::{self, text_classification::training::Config},
};
use pico_args::Arguments;

const HELP: &str = "\
Usage: train PIPELINE DATASET [OPTIONS]

Arguments:
  PIPELINE             The pipeline to use (e.g., 'text-classification')
  DATASET              The dataset to use (e.g., 'imdb' or 'rotten_tomatoes')

Options:
  -h, --help           Print help
  -m, --model          The model to use (e.g., 'distilgpt2')
  -n, --num-epochs     Number of epochs to train for
  -b, --batch-size     Batch size
  -r, --rows           Number of rows to fetch from the dataset
  -d, --data-dir       The path to the top-level data directory (defaults to 'data')
  --lr                 Initial learning rate
  --max-seq-length     Maximum tokenized sequence length
  --refresh            Fetch the dataset again, ignoring the local cache
  --cpu                Train on the CPU rather than the first CUDA device
  --no-tui             Disable TUI
";

#[derive(Debug)]
struct Args {
    pipeline: String,
    dataset: String,
    model: Option<String>,
    num_epochs: Option<usize>,
    batch_size: Option<usize>,
    num_rows: Option<usize>,
    data_dir: Option<String>,
    learning_rate: Option<f64>,
    max_seq_length: Option<usize>,
    refresh: bool,
    cpu: bool,
    use_tui: bool,
}

impl Args {
    fn parse() -> anyhow::Result<Option<Self>> {
        let mut pargs = Arguments::from_env();

        // Help has a higher priority and should be handled separately.
        if pargs.contains(["-h", "--help"]) {
            return Ok(None);
        }

        let args = Args {
            model: pargs.opt_value_from_str(["-m", "--model"])?,
            num_epochs: pargs.opt_value_from_str(["-n", "--num-epochs"])?,
            batch_size: pargs.opt_value_from_str(["-b", "--batch-size"])?,
            num_rows: pargs.opt_value_from_str(["-r", "--rows"])?,
            data_dir: pargs.opt_value_from_str(["-d", "--data-dir"])?,
            learning_rate: pargs.opt_value_from_str("--lr")?,
            max_seq_length: pargs.opt_value_from_str("--max-seq-length")?,
            refresh: pargs.contains("--refresh"),
            cpu: pargs.contains("--cpu"),
            use_tui: !(pargs.contains("--no-tui")),
            pipeline: pargs.free_from_str().map_err(|e| match e {
                pico_args::Error::MissingArgument => anyhow!("Missing required argument: PIPELINE"),
                _ => anyhow!("{}", e),
            })?,
            dataset: pargs.free_from_str().map_err(|e| match e {
                pico_args::Error::MissingArgument => anyhow!("Missing required argument: DATASET"),
                _ => anyhow!("{}", e),
            })?,
        };

        Ok(Some(args))
    }

    /// Apply the command line overrides to the training defaults
    fn apply(&self, config: &mut Config) {
        if let Some(num_epochs) = self.num_epochs {
            config.num_epochs = num_epochs;
        }

        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }

        if let Some(num_rows) = self.num_rows {
            config.num_rows = num_rows;
        }

        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.to_string();
        }

        if let Some(learning_rate) = self.learning_rate {
            config.learning_rate = learning_rate;
        }

        if let Some(max_seq_length) = self.max_seq_length {
            config.max_seq_length = max_seq_length;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let Some(args) = Args::parse()? else {
        print!("{}", HELP);

        return Ok(());
    };

    let pipeline = Pipeline::try_from(args.pipeline.as_str())?;
    let model = models::resolve(&pipeline, args.model.as_deref())?;
    let dataset = Dataset::try_from(args.dataset.as_str())?;

    match pipeline {
        Pipeline::TextClassification => {
            handle_text_classification(&dataset, &model.to_string(), &args).await
        }
    }
}

async fn handle_text_classification(
    dataset: &Dataset,
    model_name: &str,
    args: &Args,
) -> anyhow::Result<()> {
    let labels = sentiment::Labels::default();

    let mut config = Config::new(
        model_name.to_string(),
        dataset.to_string(),
        labels.names().to_vec(),
    );
    args.apply(&mut config);
    config.validate()?;

    let source = dataset.source(config.num_rows);

    let data = sentiment::Dataset::load(&source, &config.data_dir, args.refresh).await?;

    log::info!(
        "Class counts for {}: {:?}",
        source.name,
        data.class_counts(labels.len())
    );

    let (train, test) = data.split(config.test_size, config.seed)?;

    let device = if args.cpu {
        LibTorchDevice::Cpu
    } else {
        LibTorchDevice::Cuda(0)
    };

    let report = sequence_classification::text_classification::train::<
        Autodiff<LibTorch>,
        gpt2::text_classification::Model<Autodiff<LibTorch>>,
        sentiment::Item,
        sentiment::Dataset,
    >(vec![device], train, test, config, args.use_tui)
    .await?;

    println!(
        "Evaluated {} samples: loss {:.4}, accuracy {:.4}",
        report.samples, report.loss, report.accuracy
    );

    Ok(())
}
