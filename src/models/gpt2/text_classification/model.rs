use std::path::PathBuf;

use burn::{
    module::Module,
    nn::{loss::CrossEntropyLossConfig, Linear},
    tensor::{
        activation::softmax,
        backend::{AutodiffBackend, Backend},
        Int, Tensor,
    },
    train::ClassificationOutput,
};
use derive_new::new;

use crate::{
    models::gpt2::{weights, Gpt2Model},
    pipelines::sequence_classification::{
        batcher::Infer,
        text_classification::{self, batcher::Train},
    },
};

use super::Config;

/// GPT-2 for Text Classification
#[derive(Module, Debug, new)]
pub struct Model<B: Backend> {
    /// The base GPT-2 decoder
    pub model: Gpt2Model<B>,

    /// Linear scoring head, applied to the last non-padding token
    pub score: Linear<B>,

    /// Total number of classes
    pub n_classes: usize,
}

/// Define model behavior
impl<B: Backend> Model<B> {
    /// Class logits `[batch_size, n_classes]` read from each sequence's last real token
    pub fn logits(&self, input: Infer<B>) -> Tensor<B, 2> {
        let [batch_size, _seq_length] = input.tokens.dims();

        // A causal decoder only sees the whole sequence at its final position. Padding sits on
        // the right, so that position is the count of real tokens minus one.
        let last_token = input
            .mask_pad
            .clone()
            .bool_not()
            .int()
            .sum_dim(1)
            .sub_scalar(1)
            .clamp_min(0);

        let hidden_states = self.model.forward(input.tokens, input.mask_pad);
        let [_, _, n_embd] = hidden_states.dims();

        let index: Tensor<B, 3, Int> = last_token.reshape([batch_size, 1, 1]).repeat(2, n_embd);

        let pooled = hidden_states
            .gather(1, index)
            .reshape([batch_size, n_embd]);

        self.score.forward(pooled)
    }

    /// Defines forward pass for training
    pub fn forward(&self, input: Infer<B>, targets: Tensor<B, 1, Int>) -> ClassificationOutput<B> {
        let output = self.logits(input);

        let loss = CrossEntropyLossConfig::new()
            .init(&output.device())
            .forward(output.clone(), targets.clone());

        ClassificationOutput {
            loss,
            output,
            targets,
        }
    }

    /// Defines forward pass for inference
    pub fn infer(&self, input: Infer<B>) -> Tensor<B, 2> {
        softmax(self.logits(input), 1)
    }
}

impl<B: AutodiffBackend> text_classification::Model<B> for Model<B> {
    /// The model configuration
    type Config = Config;

    fn init(config: &Self::Config, device: &B::Device) -> Self {
        config.init(device)
    }

    /// Load a model from a file
    fn load_from_safetensors(
        device: &B::Device,
        model_file: PathBuf,
        config: Self::Config,
    ) -> anyhow::Result<Self> {
        if config.id2label.is_empty() {
            return Err(anyhow!("Classes are not defined in the model configuration"));
        }

        let model = config.init(device);

        let decoder = weights::load_pretrained(&model_file, &config.model, device)
            .map_err(|e| anyhow!("Unable to load pre-trained weights: {}", e))?;

        let record = ModelRecord {
            model: decoder,
            ..model.clone().into_record()
        };

        Ok(model.load_record(record))
    }

    /// Perform a forward pass
    fn forward(&self, item: Train<B>) -> ClassificationOutput<B> {
        self.forward(item.input, item.targets)
    }

    /// Defines forward pass for inference
    fn infer(&self, input: Infer<B>) -> Tensor<B, 2> {
        self.infer(input)
    }
}
