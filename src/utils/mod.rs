/// Hugging Face utilities
pub mod hugging_face;

/// Renderer Utilities
pub mod renderer;

/// Model card rendering
pub mod model_card;
