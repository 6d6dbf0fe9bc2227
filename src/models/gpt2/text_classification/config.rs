//! Adapt GPT-2 for Sequence Classification to the Text Classification pipeline

use std::{collections::BTreeMap, path::PathBuf};

use burn::{config::Config as _, nn::LinearConfig, tensor::backend::Backend};

use crate::{
    models::gpt2::Gpt2Config,
    pipelines::sequence_classification::{self, text_classification},
};

use super::Model;

/// The Model Configuration
#[derive(burn::config::Config)]
pub struct Config {
    /// The base GPT-2 config
    pub model: Gpt2Config,

    /// Index of the padding token, the end-of-text token unless the tokenizer says otherwise
    pub pad_token_id: usize,

    /// Maximum sequence length for the tokenizer
    pub max_seq_len: Option<usize>,

    /// A map from class ids to class name labels
    pub id2label: BTreeMap<usize, String>,
}

impl Config {
    /// Attach class labels to a base model config
    pub fn new_with_labels(
        model: Gpt2Config,
        labels: &[String],
        pad_token_id: Option<usize>,
        max_seq_len: usize,
    ) -> Self {
        let id2label = labels
            .iter()
            .enumerate()
            .map(|(i, s)| (i, s.trim().to_string()))
            .collect();

        let pad_token_id = pad_token_id
            .or(model.pad_token_id)
            .unwrap_or(model.eos_token_id);

        let max_seq_len = max_seq_len.min(model.n_positions);

        Config::new(model, pad_token_id, id2label).with_max_seq_len(Some(max_seq_len))
    }

    /// Initialize the model
    pub fn init<B: Backend>(&self, device: &B::Device) -> Model<B> {
        let n_classes = self.id2label.len();

        Model {
            model: self.model.init(device),
            score: LinearConfig::new(self.model.n_embd, n_classes)
                .with_bias(false)
                .init(device),
            n_classes,
        }
    }
}

impl text_classification::ModelConfig for Config {
    /// Load a pretrained model configuration
    fn load_pretrained(
        config_file: PathBuf,
        labels: &[String],
        pad_token_id: Option<usize>,
        max_seq_len: usize,
    ) -> anyhow::Result<Self> {
        let gpt2_config = Gpt2Config::load(config_file)
            .map_err(|e| anyhow!("Unable to load Hugging Face Config file: {}", e))?;

        let model_config = Config::new_with_labels(gpt2_config, labels, pad_token_id, max_seq_len);

        let n_classes = model_config.id2label.len();
        if n_classes == 0 {
            return Err(anyhow!("Classes are not defined in the model configuration"));
        }

        Ok(model_config)
    }

    fn get_config(&self) -> sequence_classification::Config {
        sequence_classification::Config {
            pad_token_id: self.pad_token_id,
            max_position_embeddings: self.model.n_positions,
            hidden_size: self.model.n_embd,
            max_seq_len: self.max_seq_len,
            id2label: self.id2label.clone(),
        }
    }

    fn disable_dropout(&mut self) {
        self.model.resid_pdrop = 0.0;
        self.model.embd_pdrop = 0.0;
        self.model.attn_pdrop = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::pipelines::sequence_classification::text_classification::ModelConfig as _;

    fn labels() -> Vec<String> {
        vec!["negative".to_string(), " positive ".to_string()]
    }

    #[test]
    fn pads_with_end_of_text_by_default() {
        let config = Config::new_with_labels(Gpt2Config::new(100, 64, 8, 1, 2), &labels(), None, 128);

        assert_eq!(config.pad_token_id, 50256);
        assert_eq!(config.max_seq_len, Some(64));
        assert_eq!(config.id2label[&1], "positive");

        let pipeline = config.get_config();
        assert_eq!(pipeline.max_seq_length(), 64);
        assert_eq!(pipeline.hidden_size, 8);
    }

    #[test]
    fn prefers_the_tokenizer_pad_token() {
        let base = Gpt2Config::new(100, 64, 8, 1, 2).with_pad_token_id(Some(3));

        assert_eq!(
            Config::new_with_labels(base.clone(), &labels(), Some(7), 32).pad_token_id,
            7
        );
        assert_eq!(
            Config::new_with_labels(base, &labels(), None, 32).pad_token_id,
            3
        );
    }

    #[test]
    fn inference_disables_dropout() {
        let mut config =
            Config::new_with_labels(Gpt2Config::new(100, 64, 8, 1, 2), &labels(), None, 16);
        config.disable_dropout();

        assert_eq!(config.model.resid_pdrop, 0.0);
        assert_eq!(config.model.embd_pdrop, 0.0);
        assert_eq!(config.model.attn_pdrop, 0.0);
    }

    #[test]
    fn round_trips_through_json() {
        let config = Config::new_with_labels(Gpt2Config::new(100, 64, 8, 1, 2), &labels(), None, 16);

        let json = serde_json::to_string(&config).unwrap();
        let loaded: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(loaded.id2label, config.id2label);
        assert_eq!(loaded.model.n_positions, 64);
    }
}
