/// GPT-2 model configuration, as published on the Hugging Face Hub
pub mod config;

/// The GPT-2 decoder stack
pub mod model;

/// Loading pre-trained weights from safetensors
pub mod weights;

/// GPT-2 for Text Classification (such as sentiment analysis)
pub mod text_classification;

pub use config::Gpt2Config;
pub use model::{Gpt2Model, Gpt2ModelRecord};
pub use weights::WeightsError;
