use std::collections::BTreeMap;

use burn::{
    config::Config as _,
    data::dataloader::batcher::Batcher as _,
    record::{CompactRecorder, Recorder},
    tensor::{
        backend::{AutodiffBackend, Backend},
        Tensor,
    },
};
use tokenizers::Tokenizer;

use crate::pipelines::sequence_classification::batcher::Infer;

use super::{Batcher, Model, ModelConfig};

/// The most likely class for a single input
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    /// Index of the predicted class
    pub class_id: usize,

    /// Name of the predicted class
    pub label: String,

    /// Probability assigned to the predicted class
    pub score: f32,
}

/// Pick the most probable class of each row in a `[batch_size, n_classes]` probability tensor
pub fn predictions<B: Backend>(
    probabilities: Tensor<B, 2>,
    id2label: &BTreeMap<usize, String>,
) -> Vec<Prediction> {
    let [_batch_size, n_classes] = probabilities.dims();
    let values = probabilities.into_data().convert::<f32>().value;

    values
        .chunks(n_classes.max(1))
        .map(|row| {
            let (class_id, score) = row
                .iter()
                .copied()
                .enumerate()
                .fold((0, f32::NEG_INFINITY), |best, (i, p)| {
                    if p > best.1 {
                        (i, p)
                    } else {
                        best
                    }
                });

            let label = id2label
                .get(&class_id)
                .cloned()
                .unwrap_or_else(|| class_id.to_string());

            Prediction {
                class_id,
                label,
                score,
            }
        })
        .collect()
}

/// Classify text samples with a fine-tuned model saved in `artifact_dir`
pub fn infer<B: AutodiffBackend, M: Model<B>>(
    device: B::Device,    // Device on which to perform computation (e.g., CPU or CUDA device)
    artifact_dir: &str,   // Directory containing model and config files
    samples: Vec<String>, // Text samples for inference
) -> anyhow::Result<(Tensor<B, 2>, M::Config)> {
    // Load experiment configuration
    let mut config = M::Config::load(format!("{artifact_dir}/config.json").as_str())
        .map_err(|e| anyhow!("Unable to load config file: {}", e))?;

    config.disable_dropout();

    let tokenizer = Tokenizer::from_file(format!("{artifact_dir}/tokenizer.json"))
        .map_err(|e| anyhow!("Unable to load tokenizer: {}", e))?;

    // Initialize batcher for batching samples
    let batcher = Batcher::<B>::new(tokenizer, config.get_config(), device.clone());

    log::info!("Loading weights from {}", artifact_dir);

    let record = CompactRecorder::new()
        .load(format!("{artifact_dir}/model").into(), &device)
        .map_err(|e| anyhow!("Unable to load trained model weights: {}", e))?;

    let model = M::init(&config, &device).load_record(record);

    log::info!("Running inference on {} samples", samples.len());

    let input: Infer<B> = batcher.batch(samples);
    let predictions = model.infer(input);

    Ok((predictions, config))
}

#[cfg(test)]
mod tests {
    use burn::{
        backend::{libtorch::LibTorchDevice, LibTorch},
        tensor::Data,
    };
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn picks_the_most_probable_label() {
        let id2label = BTreeMap::from([(0, "negative".to_string()), (1, "positive".to_string())]);
        let probabilities = Tensor::<LibTorch, 2>::from_data(
            Data::from([[0.25f32, 0.75], [0.9, 0.1]]),
            &LibTorchDevice::Cpu,
        );

        let result = predictions(probabilities, &id2label);

        assert_eq!(
            result,
            vec![
                Prediction {
                    class_id: 1,
                    label: "positive".to_string(),
                    score: 0.75,
                },
                Prediction {
                    class_id: 0,
                    label: "negative".to_string(),
                    score: 0.9,
                },
            ]
        );
    }

    #[test]
    fn unknown_classes_fall_back_to_their_index() {
        let probabilities =
            Tensor::<LibTorch, 2>::from_data(Data::from([[0.1f32, 0.2, 0.7]]), &LibTorchDevice::Cpu);

        let result = predictions(probabilities, &BTreeMap::new());

        assert_eq!(result[0].label, "2");
    }
}
