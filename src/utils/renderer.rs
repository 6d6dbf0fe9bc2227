use std::collections::BTreeMap;

use burn::train::renderer::{MetricState, MetricsRenderer, TrainingProgress};

/// Iterations between progress lines
const LOG_EVERY: usize = 50;

/// A renderer for TUI-disabled modes, reporting progress and the latest metrics through the log
#[derive(Default)]
pub struct Simple {
    train: BTreeMap<String, String>,
    valid: BTreeMap<String, String>,
}

impl Simple {
    /// Create a renderer with no recorded metrics
    pub fn new() -> Self {
        Self::default()
    }
}

fn record(metrics: &mut BTreeMap<String, String>, state: MetricState) {
    let entry = match state {
        MetricState::Generic(entry) => entry,
        MetricState::Numeric(entry, _) => entry,
    };

    metrics.insert(entry.name, entry.formatted);
}

fn summary(metrics: &BTreeMap<String, String>) -> String {
    metrics.values().cloned().collect::<Vec<_>>().join(" | ")
}

fn report(split: &str, item: &TrainingProgress, metrics: &BTreeMap<String, String>) {
    let done = item.progress.items_processed >= item.progress.items_total;

    if item.iteration % LOG_EVERY == 0 || done {
        log::info!(
            "{} epoch {}/{} [{}/{}] {}",
            split,
            item.epoch,
            item.epoch_total,
            item.progress.items_processed,
            item.progress.items_total,
            summary(metrics)
        );
    }
}

impl MetricsRenderer for Simple {
    fn update_train(&mut self, state: MetricState) {
        record(&mut self.train, state);
    }

    fn update_valid(&mut self, state: MetricState) {
        record(&mut self.valid, state);
    }

    fn render_train(&mut self, item: TrainingProgress) {
        report("train", &item, &self.train);
    }

    fn render_valid(&mut self, item: TrainingProgress) {
        report("valid", &item, &self.valid);
    }
}
