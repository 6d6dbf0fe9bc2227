use std::{fmt::Display, path::PathBuf};

use burn::{
    module::AutodiffModule,
    tensor::{backend::AutodiffBackend, Tensor},
    train::{ClassificationOutput, TrainStep},
};

use crate::pipelines::sequence_classification::{self, batcher::Infer};

use super::batcher::Train;

/// A trait for models that can be used for Text Classification
pub trait Model<B>:
    AutodiffModule<B> + TrainStep<Train<B>, ClassificationOutput<B>> + Display
where
    B: AutodiffBackend,
{
    /// The model configuration
    type Config: ModelConfig;

    /// Initialize a model with random weights
    fn init(config: &Self::Config, device: &B::Device) -> Self;

    /// Perform a forward pass
    fn forward(&self, item: Train<B>) -> ClassificationOutput<B>;

    /// Defines forward pass for inference, returning class probabilities
    fn infer(&self, input: Infer<B>) -> Tensor<B, 2>;

    /// Load pre-trained base weights from a file, with a freshly initialized classification head
    fn load_from_safetensors(
        device: &B::Device,
        model_file: PathBuf,
        config: Self::Config,
    ) -> anyhow::Result<Self>;
}

/// A trait for configs that can be used for Text Classification models
pub trait ModelConfig: burn::config::Config + Clone {
    /// Load a pretrained model configuration and attach the class labels
    ///
    /// `pad_token_id` overrides the padding token when the tokenizer defines one that the base
    /// model config lacks.
    fn load_pretrained(
        config_file: PathBuf,
        labels: &[String],
        pad_token_id: Option<usize>,
        max_seq_len: usize,
    ) -> anyhow::Result<Self>;

    /// Return the Config needed for the text classification pipeline
    fn get_config(&self) -> sequence_classification::Config;

    /// Zero every dropout probability, for inference
    fn disable_dropout(&mut self);
}
