use std::fmt::Display;

use super::models::{gpt2, Model};

/// The unique string token that identifies this pipeline
pub static TEXT_CLASSIFICATION: &str = "text-classification";

/// Available Pipelines
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Pipeline {
    /// Text Classification
    TextClassification,
}

impl Pipeline {
    /// Get the default model variant for the given pipeline
    pub fn default_model(&self) -> Model {
        match self {
            Pipeline::TextClassification => {
                Model::Gpt2(gpt2::DEFAULT_TEXT_CLASSIFICATION_MODEL.to_string())
            }
        }
    }
}

impl TryFrom<&str> for Pipeline {
    type Error = PipelineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if value == TEXT_CLASSIFICATION {
            Ok(Pipeline::TextClassification)
        } else {
            Err(PipelineError::Unknown(value.to_string()))
        }
    }
}

impl Display for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Pipeline::TextClassification => TEXT_CLASSIFICATION,
        };

        write!(f, "{}", name)
    }
}

/// Pipeline Error
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// No pipeline found for the given string
    #[error("no pipeline found for {0}")]
    Unknown(String),
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_text_classification() {
        let pipeline = Pipeline::try_from("text-classification").unwrap();

        assert_eq!(pipeline, Pipeline::TextClassification);
        assert_eq!(pipeline.to_string(), "text-classification");
        assert_eq!(pipeline.default_model().to_string(), "distilgpt2");
    }

    #[test]
    fn rejects_unknown_pipelines() {
        let err = Pipeline::try_from("token-classification").unwrap_err();

        assert_eq!(err.to_string(), "no pipeline found for token-classification");
    }
}
