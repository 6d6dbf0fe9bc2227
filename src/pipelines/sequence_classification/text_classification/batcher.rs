use std::fmt::Debug;

use burn::{
    data::dataloader,
    tensor::{backend::Backend, Data, ElementConversion, Int, Shape, Tensor},
};
use derive_new::new;
use tokenizers::Tokenizer;

use crate::pipelines::sequence_classification;

use super::Item;

/// A training batch for text classification
#[derive(Clone, Debug, new)]
pub struct Train<B: Backend> {
    /// Model input
    pub input: sequence_classification::batcher::Infer<B>,

    /// Class ids for the batch
    pub targets: Tensor<B, 1, Int>,
}

/// Struct for batching text classification items
#[derive(Clone)]
pub struct Batcher<B: Backend> {
    batcher: sequence_classification::Batcher<B>,
}

impl<B: Backend> Batcher<B> {
    /// Creates a new batcher
    pub fn new(
        tokenizer: Tokenizer,
        config: sequence_classification::Config,
        device: B::Device,
    ) -> Self {
        let batcher = sequence_classification::Batcher::new(tokenizer, config, device);

        Self { batcher }
    }
}

/// Implement Batcher trait for Batcher struct for inference
impl<B: Backend> dataloader::batcher::Batcher<String, sequence_classification::batcher::Infer<B>>
    for Batcher<B>
{
    /// Collects a vector of texts into an inference batch
    fn batch(&self, items: Vec<String>) -> sequence_classification::batcher::Infer<B> {
        self.batcher.batch(items)
    }
}

/// Implement Batcher trait for Batcher struct for training
impl<B: Backend, I: Item> dataloader::batcher::Batcher<I, Train<B>> for Batcher<B> {
    /// Collects a vector of text classification items into a training batch
    fn batch(&self, items: Vec<I>) -> Train<B> {
        let batch_size = items.len();

        let inputs = items.iter().map(|item| item.input().to_string()).collect();
        let input: sequence_classification::batcher::Infer<B> = self.batch(inputs);

        let class_ids: Vec<B::IntElem> = items
            .iter()
            .map(|item| (item.class_id() as i64).elem())
            .collect();

        let targets = Tensor::<B, 1, Int>::from_data(
            Data::new(class_ids, Shape::new([batch_size])),
            &self.batcher.device,
        );

        Train { input, targets }
    }
}
