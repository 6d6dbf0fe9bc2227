use std::path::{Path, PathBuf};

use hf_hub::api::tokio::{ApiBuilder, ApiRepo};
use tokenizers::{PaddingParams, Tokenizer, TruncationParams};

/// The GPT-2 end-of-text token, which doubles as padding
pub static EOS_TOKEN: &str = "<|endoftext|>";

/// Files needed to fine-tune a pre-trained model
#[derive(Clone, Debug)]
pub struct PretrainedFiles {
    /// The model's `config.json`
    pub config: PathBuf,

    /// The model's `model.safetensors`
    pub weights: PathBuf,

    /// The model's `tokenizer.json`
    pub tokenizer: PathBuf,
}

/// Download model config, weights and tokenizer from Hugging Face Hub
/// If a file exists in the cache, it will not be downloaded again
pub async fn download_hf_model(model_name: &str) -> anyhow::Result<PretrainedFiles> {
    let api = ApiBuilder::new()
        .with_token(std::env::var("HF_TOKEN").ok().filter(|t| !t.is_empty()))
        .build()?;

    let repo = api.model(model_name.to_string());

    Ok(PretrainedFiles {
        config: fetch(&repo, model_name, "config.json").await?,
        weights: fetch(&repo, model_name, "model.safetensors").await?,
        tokenizer: fetch(&repo, model_name, "tokenizer.json").await?,
    })
}

async fn fetch(repo: &ApiRepo, model_name: &str, file: &str) -> anyhow::Result<PathBuf> {
    log::info!("Fetching {} from {}", file, model_name);

    repo.get(file).await.map_err(|e| {
        anyhow!(
            "Failed to download: {} file {} from HuggingFace Hub: {}",
            model_name,
            file,
            e
        )
    })
}

/// Load a tokenizer and give it a padding token and truncation length
///
/// GPT-2 tokenizers ship without a padding token, so the end-of-text token stands in. Returns
/// the tokenizer along with the padding token id, if the vocabulary has one.
pub fn load_tokenizer(
    path: &Path,
    max_seq_length: usize,
) -> anyhow::Result<(Tokenizer, Option<usize>)> {
    let mut tokenizer = Tokenizer::from_file(path)
        .map_err(|e| anyhow!("Unable to load tokenizer from {}: {}", path.display(), e))?;

    let pad_token = tokenizer
        .get_padding()
        .map(|padding| padding.pad_token.clone())
        .unwrap_or_else(|| EOS_TOKEN.to_string());

    let pad_token_id = tokenizer.token_to_id(&pad_token);

    if let Some(pad_id) = pad_token_id {
        tokenizer.with_padding(Some(PaddingParams {
            pad_id,
            pad_token,
            ..Default::default()
        }));
    } else {
        log::warn!("Tokenizer has no {} token to pad with", pad_token);
    }

    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length: max_seq_length,
            ..Default::default()
        }))
        .map_err(|e| anyhow!("Unable to configure truncation: {}", e))?;

    Ok((tokenizer, pad_token_id.map(|id| id as usize)))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn pads_with_end_of_text() {
        let path = std::env::temp_dir().join(format!(
            "burn-sentiment-tokenizer-{}.json",
            std::process::id()
        ));
        std::fs::write(
            &path,
            r#"{
                "version": "1.0",
                "truncation": null,
                "padding": null,
                "added_tokens": [],
                "normalizer": null,
                "pre_tokenizer": { "type": "Whitespace" },
                "post_processor": null,
                "decoder": null,
                "model": {
                    "type": "WordLevel",
                    "vocab": { "[UNK]": 0, "good": 1, "<|endoftext|>": 2 },
                    "unk_token": "[UNK]"
                }
            }"#,
        )
        .unwrap();

        let (tokenizer, pad_token_id) = load_tokenizer(&path, 3).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(pad_token_id, Some(2));
        assert_eq!(tokenizer.get_padding().unwrap().pad_id, 2);

        let encoding = tokenizer.encode("good good good good", true).unwrap();
        assert_eq!(encoding.get_ids(), &[1, 1, 1]);
    }
}
