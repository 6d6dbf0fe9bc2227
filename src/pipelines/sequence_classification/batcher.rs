use std::{collections::BTreeMap, fmt::Debug};

use burn::{
    data::dataloader,
    tensor::{backend::Backend, Bool, Data, ElementConversion, Int, Shape, Tensor},
};
use derive_new::new;
use tokenizers::Tokenizer;

use crate::pipelines::sequence_classification;

/// An inference batch for sequence classification
#[derive(Debug, Clone, new)]
pub struct Infer<B: Backend> {
    /// Tokenized text as 2D tensor: [batch_size, max_seq_length]
    pub tokens: Tensor<B, 2, Int>,

    /// Padding mask for the tokenized text containing booleans for padding locations
    pub mask_pad: Tensor<B, 2, Bool>,
}

/// Struct for batching sequence classification items
#[derive(Clone)]
pub struct Batcher<B: Backend> {
    /// Tokenizer for converting text to token IDs
    pub tokenizer: Tokenizer,

    /// Maximum sequence length for tokenized text
    pub max_seq_length: usize,

    /// ID of the padding token
    pub pad_token_id: usize,

    /// A mapping from class ids to class name labels
    pub id2label: BTreeMap<usize, String>,

    /// Device on which to perform computation (e.g., CPU or CUDA device)
    pub device: B::Device,
}

impl<B: Backend> Batcher<B> {
    /// Creates a new batcher
    pub fn new(
        tokenizer: Tokenizer,
        config: sequence_classification::Config,
        device: B::Device,
    ) -> Self {
        Self {
            tokenizer,
            pad_token_id: config.pad_token_id,
            max_seq_length: config.max_seq_length(),
            id2label: config.id2label,
            device,
        }
    }

    /// Encode a single text into token ids
    ///
    /// Text that cannot be encoded, or that encodes to nothing, becomes a lone padding token so
    /// that every row of the batch has at least one position.
    pub fn encode(&self, input: String) -> Vec<usize> {
        let token_ids: Vec<usize> = match self.tokenizer.encode(input, true) {
            Ok(encoding) => encoding.get_ids().iter().map(|t| *t as usize).collect(),
            Err(err) => {
                log::warn!("Unable to encode input, substituting padding: {}", err);

                Vec::new()
            }
        };

        if token_ids.is_empty() {
            vec![self.pad_token_id]
        } else {
            token_ids
        }
    }
}

/// Implement Batcher trait for Batcher struct for inference
impl<B: Backend> dataloader::batcher::Batcher<String, Infer<B>> for Batcher<B> {
    /// Collects a vector of texts into an inference batch
    ///
    /// Rows are padded on the right. The mask follows each row's encoded length, so a padding id
    /// that the text itself encodes to stays visible to the model.
    fn batch(&self, items: Vec<String>) -> Infer<B> {
        let token_ids_list: Vec<Vec<usize>> = items
            .into_iter()
            .map(|input| {
                let mut token_ids = self.encode(input);
                token_ids.truncate(self.max_seq_length.max(1));

                token_ids
            })
            .collect();

        let batch_size = token_ids_list.len();
        let seq_length = token_ids_list.iter().map(Vec::len).max().unwrap_or(1);

        let mut tokens: Vec<B::IntElem> = Vec::with_capacity(batch_size * seq_length);
        let mut mask = Vec::with_capacity(batch_size * seq_length);

        for token_ids in &token_ids_list {
            for position in 0..seq_length {
                let id = token_ids.get(position).copied();

                tokens.push((id.unwrap_or(self.pad_token_id) as i64).elem());
                mask.push(id.is_none());
            }
        }

        let shape = Shape::new([batch_size, seq_length]);

        Infer {
            tokens: Tensor::from_data(Data::new(tokens, shape.clone()), &self.device),
            mask_pad: Tensor::from_data(Data::new(mask, shape), &self.device),
        }
    }
}
