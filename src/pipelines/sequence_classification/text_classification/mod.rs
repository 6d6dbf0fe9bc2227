/// Common model config and traits for text classification
pub mod model;

/// Batcher
pub mod batcher;

/// Text Classification Items
pub mod item;

/// Training
pub mod training;

/// Evaluation of a trained model
pub mod evaluation;

/// Inference
pub mod inference;

pub use batcher::Batcher;
pub use evaluation::{evaluate, EvalReport};
pub use inference::{infer, predictions, Prediction};
pub use item::Item;
pub use model::{Model, ModelConfig};
pub use training::train;
