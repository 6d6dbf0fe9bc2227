use burn::{
    nn::{DropoutConfig, EmbeddingConfig, LayerNormConfig, LinearConfig},
    tensor::backend::Backend,
};

use super::model::{Attention, Block, Gpt2Model, Mlp};

/// GPT-2 configuration, deserialized from the Hugging Face `config.json`
#[derive(burn::config::Config)]
pub struct Gpt2Config {
    /// Size of the vocabulary
    pub vocab_size: usize,
    /// Max position embeddings (the context window)
    pub n_positions: usize,
    /// Size of the embeddings and hidden states
    pub n_embd: usize,
    /// Number of decoder blocks
    pub n_layer: usize,
    /// Number of attention heads in each block
    pub n_head: usize,
    /// Layer normalization epsilon
    #[config(default = 1e-5)]
    pub layer_norm_epsilon: f64,
    /// Dropout applied to residual branches
    #[config(default = 0.1)]
    pub resid_pdrop: f64,
    /// Dropout applied to the summed embeddings
    #[config(default = 0.1)]
    pub embd_pdrop: f64,
    /// Dropout applied to attention weights
    #[config(default = 0.1)]
    pub attn_pdrop: f64,
    /// The end-of-text token, reused for padding
    #[config(default = 50256)]
    pub eos_token_id: usize,
    /// The padding token, which GPT-2 checkpoints usually leave unset
    pub pad_token_id: Option<usize>,
    /// Model family name
    #[config(default = "\"gpt2\".to_string()")]
    pub model_type: String,
}

impl Gpt2Config {
    /// Initialize a decoder with random weights
    pub fn init<B: Backend>(&self, device: &B::Device) -> Gpt2Model<B> {
        let h = (0..self.n_layer)
            .map(|_| self.init_block(device))
            .collect();

        Gpt2Model {
            wte: EmbeddingConfig::new(self.vocab_size, self.n_embd).init(device),
            wpe: EmbeddingConfig::new(self.n_positions, self.n_embd).init(device),
            drop: DropoutConfig::new(self.embd_pdrop).init(),
            h,
            ln_f: self.init_layer_norm(device),
        }
    }

    fn init_block<B: Backend>(&self, device: &B::Device) -> Block<B> {
        Block {
            ln_1: self.init_layer_norm(device),
            attn: Attention {
                c_attn: LinearConfig::new(self.n_embd, 3 * self.n_embd).init(device),
                c_proj: LinearConfig::new(self.n_embd, self.n_embd).init(device),
                attn_dropout: DropoutConfig::new(self.attn_pdrop).init(),
                resid_dropout: DropoutConfig::new(self.resid_pdrop).init(),
                n_head: self.n_head,
            },
            ln_2: self.init_layer_norm(device),
            mlp: Mlp {
                c_fc: LinearConfig::new(self.n_embd, 4 * self.n_embd).init(device),
                c_proj: LinearConfig::new(4 * self.n_embd, self.n_embd).init(device),
                dropout: DropoutConfig::new(self.resid_pdrop).init(),
            },
        }
    }

    fn init_layer_norm<B: Backend>(&self, device: &B::Device) -> burn::nn::LayerNorm<B> {
        LayerNormConfig::new(self.n_embd)
            .with_epsilon(self.layer_norm_epsilon)
            .init(device)
    }
}
