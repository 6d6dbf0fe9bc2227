/// Sequence Classification pipelines (Text Classification for sentiment)
pub mod sequence_classification;
