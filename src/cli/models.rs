use std::{collections::HashMap, fmt::Display};

use lazy_static::lazy_static;

use super::pipelines::Pipeline;

/// GPT-2 model variants
pub mod gpt2 {
    /// The base model type
    pub static MODEL_TYPE: &str = "gpt2";

    /// gpt2
    pub static GPT2: &str = "gpt2";

    /// distilgpt2
    pub static DISTILGPT2: &str = "distilgpt2";

    /// All available GPT-2 models
    pub static ALL_MODELS: &[&str; 2] = &[GPT2, DISTILGPT2];

    /// Available models to use with GPT-2 for Text Classification
    pub static TEXT_CLASSIFICATION_MODELS: &[&str; 2] = &[DISTILGPT2, GPT2];

    /// The default model to use
    pub static DEFAULT_TEXT_CLASSIFICATION_MODEL: &str = DISTILGPT2;
}

lazy_static! {
    /// Available models for each pipeline
    pub static ref MODELS_BY_PIPELINE: HashMap<Pipeline, &'static [&'static str]> =
        [(Pipeline::TextClassification, &gpt2::TEXT_CLASSIFICATION_MODELS[..])]
            .into_iter()
            .collect();
}

/// Available Models
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Model {
    /// The GPT-2 family of models, with the specific model name contained within
    Gpt2(String),
}

impl Model {
    /// Get the model type
    pub fn model_type(&self) -> &str {
        match self {
            Model::Gpt2(_) => gpt2::MODEL_TYPE,
        }
    }

    /// Check if the model is valid for the given pipeline
    pub fn is_supported(&self, pipeline: &Pipeline) -> bool {
        let Model::Gpt2(model_name) = self;

        MODELS_BY_PIPELINE
            .get(pipeline)
            .is_some_and(|models| models.contains(&model_name.as_str()))
    }
}

impl Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Model::Gpt2(name) = self;

        write!(f, "{}", name)
    }
}

impl TryFrom<&str> for Model {
    type Error = ModelError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if gpt2::ALL_MODELS.contains(&value) {
            Ok(Model::Gpt2(value.to_string()))
        } else {
            Err(ModelError::Unknown(value.to_string()))
        }
    }
}

/// Model Error
#[derive(thiserror::Error, Debug)]
pub enum ModelError {
    /// No model found for the given string
    #[error("no model found for {0}")]
    Unknown(String),

    /// The model exists but cannot serve the pipeline
    #[error("model {model} does not support the {pipeline} pipeline")]
    Unsupported {
        /// The requested model
        model: String,
        /// The requested pipeline
        pipeline: String,
    },
}

/// Resolve the model for a pipeline, falling back to the pipeline's default
pub fn resolve(pipeline: &Pipeline, name: Option<&str>) -> Result<Model, ModelError> {
    let model = match name {
        Some(name) => Model::try_from(name)?,
        None => pipeline.default_model(),
    };

    if !model.is_supported(pipeline) {
        return Err(ModelError::Unsupported {
            model: model.to_string(),
            pipeline: pipeline.to_string(),
        });
    }

    Ok(model)
}
