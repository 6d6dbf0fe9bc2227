use std::collections::BTreeMap;

use burn::LearningRate;

/// The common model configuration properties needed for the pipeline
#[derive(Clone, Debug)]
pub struct Config {
    /// The padding token ID
    pub pad_token_id: usize,

    /// The max position embeddings
    pub max_position_embeddings: usize,

    /// The size of the hidden state
    pub hidden_size: usize,

    /// An optional max sequence length, if different from max position embeddings
    pub max_seq_len: Option<usize>,

    /// A mapping from class ids to class name labels
    pub id2label: BTreeMap<usize, String>,
}

impl Config {
    /// The longest sequence the batcher should produce, never past the position embeddings
    pub fn max_seq_length(&self) -> usize {
        self.max_seq_len
            .unwrap_or(self.max_position_embeddings)
            .min(self.max_position_embeddings)
    }
}

/// Define configuration struct for the experiment
#[derive(burn::config::Config)]
pub struct Training {
    /// Batch size
    #[config(default = 8)]
    pub batch_size: usize,

    /// Number of epochs
    #[config(default = 3)]
    pub num_epochs: usize,

    /// Adam epsilon
    #[config(default = 1e-8)]
    pub adam_epsilon: f32,

    /// AdamW weight decay
    #[config(default = 0.01)]
    pub weight_decay: f32,

    /// Initial learning rate
    #[config(default = 2e-5)]
    pub learning_rate: LearningRate,

    /// Maximum tokenized sequence length
    #[config(default = 128)]
    pub max_seq_length: usize,

    /// Fraction of the fetched rows held out for evaluation
    #[config(default = 0.2)]
    pub test_size: f64,

    /// Seed for the train/test split and data loader shuffling
    #[config(default = 42)]
    pub seed: u64,

    /// Number of rows to fetch from the dataset host
    #[config(default = 1000)]
    pub num_rows: usize,

    /// The location of the top-level data directory
    #[config(default = "\"data\".to_string()")]
    pub data_dir: String,

    /// Model name (e.g., "distilgpt2")
    pub model_name: String,

    /// The Dataset to use (e.g., "imdb")
    pub dataset_name: String,

    /// Class labels for the selected dataset
    pub labels: Vec<String>,
}

impl Training {
    /// The directory receiving checkpoints and the final artifacts
    pub fn artifact_dir(&self) -> String {
        format!("{}/text-classification/{}", self.data_dir, self.model_name)
    }

    /// Reject settings that training cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(anyhow!(
                "Learning rate must be in (0, 1], got {}",
                self.learning_rate
            ));
        }

        for (name, value) in [
            ("Batch size", self.batch_size),
            ("Number of epochs", self.num_epochs),
            ("Max sequence length", self.max_seq_length),
        ] {
            if value == 0 {
                return Err(anyhow!("{} must be at least 1", name));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn max_seq_length_is_capped_by_positions() {
        let mut config = Config {
            pad_token_id: 0,
            max_position_embeddings: 64,
            hidden_size: 8,
            max_seq_len: Some(128),
            id2label: BTreeMap::new(),
        };
        assert_eq!(config.max_seq_length(), 64);

        config.max_seq_len = Some(16);
        assert_eq!(config.max_seq_length(), 16);

        config.max_seq_len = None;
        assert_eq!(config.max_seq_length(), 64);
    }

    #[test]
    fn training_defaults() {
        let config = Training::new(
            "distilgpt2".to_string(),
            "imdb".to_string(),
            vec!["negative".to_string(), "positive".to_string()],
        );

        assert_eq!(config.batch_size, 8);
        assert_eq!(config.num_epochs, 3);
        assert_eq!(config.max_seq_length, 128);
        assert_eq!(config.seed, 42);
        assert_eq!(config.artifact_dir(), "data/text-classification/distilgpt2");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_unusable_training_settings() {
        let config = Training::new(
            "distilgpt2".to_string(),
            "imdb".to_string(),
            vec!["negative".to_string(), "positive".to_string()],
        );

        for lr in [0.0, -1e-5, 1.5, f64::NAN] {
            let err = config.clone().with_learning_rate(lr).validate().unwrap_err();
            assert!(err.to_string().starts_with("Learning rate"), "{err}");
        }
        assert!(config.clone().with_learning_rate(1.0).validate().is_ok());

        let err = config.clone().with_batch_size(0).validate().unwrap_err();
        assert_eq!(err.to_string(), "Batch size must be at least 1");

        let err = config.clone().with_num_epochs(0).validate().unwrap_err();
        assert_eq!(err.to_string(), "Number of epochs must be at least 1");

        let err = config.with_max_seq_length(0).validate().unwrap_err();
        assert_eq!(err.to_string(), "Max sequence length must be at least 1");
    }
}
