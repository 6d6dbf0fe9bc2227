/// Text Classification
pub mod text_classification;

/// Common batcher operations for Sequence Classification
pub mod batcher;

/// Common config for Sequence Classification
pub mod config;

pub use batcher::Batcher;
pub use config::Config;
