//! Command line tool for classifying text with a fine-tuned model

use anyhow::Result;
use burn::backend::{libtorch::LibTorchDevice, Autodiff, LibTorch};
use burn_sentiment::{
    cli::{models, pipelines::Pipeline},
    models::gpt2,
    pipelines::sequence_classification::text_classification::{infer, predictions},
};
use pico_args::Arguments;

const HELP: &str = "\
Usage: infer [OPTIONS] [TEXT]...

Arguments:
  TEXT                 Text to classify. Built-in samples are used when none are given.

Options:
  -h, --help           Print help
  -m, --model          The fine-tuned model to use (e.g., 'distilgpt2')
  -d, --data-dir       The path to the top-level data directory (defaults to 'data')
  --cpu                Run on the CPU rather than the first CUDA device
";

const SAMPLES: &[&str] = &[
    "An absolute delight from start to finish, with a cast that clearly loved every minute.",
    "I walked out halfway through. The plot made no sense and the acting was wooden.",
    "A quiet, moving film that stayed with me for days.",
    "Two hours of my life I will never get back.",
];

#[derive(Debug)]
struct Args {
    help: bool,
    model: Option<String>,
    data_dir: Option<String>,
    cpu: bool,
    texts: Vec<String>,
}

fn parse_args() -> Result<Args, pico_args::Error> {
    let mut pargs = Arguments::from_env();

    let help = pargs.contains(["-h", "--help"]);
    let model = pargs.opt_value_from_str(["-m", "--model"])?;
    let data_dir = pargs.opt_value_from_str(["-d", "--data-dir"])?;
    let cpu = pargs.contains("--cpu");

    let texts = pargs
        .finish()
        .into_iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();

    Ok(Args {
        help,
        model,
        data_dir,
        cpu,
        texts,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();

    let args = parse_args()?;

    if args.help {
        println!("{}", HELP);
        return Ok(());
    }

    let pipeline = Pipeline::TextClassification;
    let model = models::resolve(&pipeline, args.model.as_deref())?;

    let data_dir = args.data_dir.unwrap_or_else(|| "data".to_string());
    let artifact_dir = format!("{}/{}/{}", data_dir, pipeline, model);

    let device = if args.cpu {
        LibTorchDevice::Cpu
    } else {
        LibTorchDevice::Cuda(0)
    };

    let texts = if args.texts.is_empty() {
        SAMPLES.iter().map(|s| s.to_string()).collect()
    } else {
        args.texts
    };

    // Get model predictions
    let (probabilities, config) = infer::<
        Autodiff<LibTorch>,
        gpt2::text_classification::Model<Autodiff<LibTorch>>,
    >(device, &artifact_dir, texts.clone())?;

    for (i, (text, prediction)) in texts
        .iter()
        .zip(predictions(probabilities, &config.id2label))
        .enumerate()
    {
        println!(
            "\n=== Item {i} ===\
             \n- Text: {text}\
             \n- Class: {}\
             \n- Score: {:.4}\
             \n================",
            prediction.label, prediction.score
        );
    }

    Ok(())
}
