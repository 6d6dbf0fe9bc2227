/// GPT-2 variants
pub mod gpt2;
