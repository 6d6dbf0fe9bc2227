/// CLI indexes: Pipelines
pub mod pipelines;

/// CLI indexes: Models
pub mod models;

/// CLI indexes: Datasets
pub mod datasets;
