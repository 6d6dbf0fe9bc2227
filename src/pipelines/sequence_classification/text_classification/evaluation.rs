use std::{path::Path, sync::Arc};

use burn::{
    data::dataloader::DataLoader,
    tensor::{backend::Backend, ElementConversion},
    train::{ClassificationOutput, ValidStep},
};
use derive_new::new;
use serde::{Deserialize, Serialize};

use super::batcher::Train;

/// Metrics from a pass over the evaluation split
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, new)]
pub struct EvalReport {
    /// Number of evaluated examples
    pub samples: usize,

    /// Mean cross-entropy loss per example
    pub loss: f64,

    /// Fraction of examples classified correctly
    pub accuracy: f64,
}

impl EvalReport {
    /// Build a report from running totals, reporting zeros when nothing was evaluated
    pub fn from_totals(samples: usize, loss_sum: f64, correct: usize) -> Self {
        if samples == 0 {
            return Self::new(0, 0.0, 0.0);
        }

        Self::new(
            samples,
            loss_sum / samples as f64,
            correct as f64 / samples as f64,
        )
    }

    /// Write the report as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;

        Ok(())
    }
}

/// Run a validation step over every batch and summarize loss and accuracy
pub fn evaluate<B, M>(model: &M, dataloader: Arc<dyn DataLoader<Train<B>>>) -> EvalReport
where
    B: Backend,
    M: ValidStep<Train<B>, ClassificationOutput<B>>,
{
    let mut samples = 0;
    let mut correct = 0;
    let mut loss_sum = 0.0;

    for batch in dataloader.iter() {
        let output = model.step(batch);
        let [batch_size, _n_classes] = output.output.dims();

        let hits = output
            .output
            .argmax(1)
            .reshape([batch_size])
            .equal(output.targets)
            .int()
            .sum()
            .into_scalar()
            .elem::<i64>();

        correct += hits as usize;
        loss_sum += output.loss.into_scalar().elem::<f64>() * batch_size as f64;
        samples += batch_size;
    }

    let report = EvalReport::from_totals(samples, loss_sum, correct);

    log::info!(
        "Evaluated {} samples: loss {:.4}, accuracy {:.4}",
        report.samples,
        report.loss,
        report.accuracy
    );

    report
}

#[cfg(test)]
mod tests {
    use burn::{
        backend::{libtorch::LibTorchDevice, LibTorch},
        data::{dataloader::DataLoaderBuilder, dataset::InMemDataset},
        nn::loss::CrossEntropyLossConfig,
        tensor::{Data, Tensor},
    };
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        datasets::sentiment::Item,
        pipelines::sequence_classification::{
            batcher::tests::{config, tokenizer},
            text_classification::Batcher,
        },
    };

    /// Predicts "positive" for everything
    struct AlwaysPositive;

    impl ValidStep<Train<LibTorch>, ClassificationOutput<LibTorch>> for AlwaysPositive {
        fn step(&self, item: Train<LibTorch>) -> ClassificationOutput<LibTorch> {
            let [batch_size] = item.targets.dims();
            let device = item.targets.device();

            let output = Tensor::<LibTorch, 1>::from_data(Data::from([-1.0f32, 1.0]), &device)
                .reshape([1, 2])
                .repeat(0, batch_size);

            let loss = CrossEntropyLossConfig::new()
                .init(&device)
                .forward(output.clone(), item.targets.clone());

            ClassificationOutput {
                loss,
                output,
                targets: item.targets,
            }
        }
    }

    #[test]
    fn averages_over_every_batch() {
        let items = vec![
            Item::new("great".to_string(), 1),
            Item::new("terrible".to_string(), 0),
            Item::new("a great movie".to_string(), 1),
            Item::new("the plot".to_string(), 1),
            Item::new("terrible movie".to_string(), 0),
        ];

        let batcher = Batcher::<LibTorch>::new(tokenizer(), config(8), LibTorchDevice::Cpu);
        let dataloader = DataLoaderBuilder::new(batcher)
            .batch_size(2)
            .build(InMemDataset::new(items));

        let report = evaluate(&AlwaysPositive, dataloader);

        assert_eq!(report.samples, 5);
        assert!((report.accuracy - 0.6).abs() < 1e-9);
        assert!(report.loss > 0.0);
    }

    #[test]
    fn empty_evaluation_reports_zeros() {
        assert_eq!(EvalReport::from_totals(0, 0.0, 0), EvalReport::new(0, 0.0, 0.0));
        assert_eq!(
            EvalReport::from_totals(4, 2.0, 3),
            EvalReport::new(4, 0.5, 0.75)
        );
    }
}
