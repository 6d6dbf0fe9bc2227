use burn::{
    module::Module,
    nn::{attention::generate_autoregressive_mask, Dropout, Embedding, LayerNorm, Linear},
    tensor::{
        activation::{softmax, tanh},
        backend::Backend,
        Bool, Int, Tensor,
    },
};

/// Value written into masked attention scores before the softmax
const MASK_FILL: f32 = -1.0e4;

/// The GPT-2 decoder: token and position embeddings, a stack of pre-norm blocks and a final
/// layer norm. Parameter names follow the Hub checkpoints.
#[derive(Module, Debug)]
pub struct Gpt2Model<B: Backend> {
    /// Token embeddings
    pub wte: Embedding<B>,
    /// Position embeddings
    pub wpe: Embedding<B>,
    /// Embedding dropout
    pub drop: Dropout,
    /// Decoder blocks
    pub h: Vec<Block<B>>,
    /// Final layer norm
    pub ln_f: LayerNorm<B>,
}

impl<B: Backend> Gpt2Model<B> {
    /// Compute hidden states `[batch_size, seq_length, n_embd]`
    ///
    /// `mask_pad` is true at padding positions, which are never attended to.
    pub fn forward(&self, tokens: Tensor<B, 2, Int>, mask_pad: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let [batch_size, seq_length] = tokens.dims();
        let device = tokens.device();

        let positions = Tensor::arange(0..seq_length as i64, &device)
            .reshape([1, seq_length])
            .repeat(0, batch_size);

        let mut x = self
            .drop
            .forward(self.wte.forward(tokens) + self.wpe.forward(positions));

        for block in &self.h {
            x = block.forward(x, mask_pad.clone());
        }

        self.ln_f.forward(x)
    }
}

/// One decoder block
#[derive(Module, Debug)]
pub struct Block<B: Backend> {
    pub(crate) ln_1: LayerNorm<B>,
    pub(crate) attn: Attention<B>,
    pub(crate) ln_2: LayerNorm<B>,
    pub(crate) mlp: Mlp<B>,
}

impl<B: Backend> Block<B> {
    fn forward(&self, x: Tensor<B, 3>, mask_pad: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let x = x.clone() + self.attn.forward(self.ln_1.forward(x), mask_pad);

        x.clone() + self.mlp.forward(self.ln_2.forward(x))
    }
}

/// Causal multi-head self-attention with a fused query/key/value projection
#[derive(Module, Debug)]
pub struct Attention<B: Backend> {
    pub(crate) c_attn: Linear<B>,
    pub(crate) c_proj: Linear<B>,
    pub(crate) attn_dropout: Dropout,
    pub(crate) resid_dropout: Dropout,
    pub(crate) n_head: usize,
}

impl<B: Backend> Attention<B> {
    fn forward(&self, x: Tensor<B, 3>, mask_pad: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let [batch_size, seq_length, n_embd] = x.dims();
        let device = x.device();

        let qkv = self.c_attn.forward(x);

        let query = self.split_heads(qkv.clone().slice([0..batch_size, 0..seq_length, 0..n_embd]));
        let key = self.split_heads(qkv.clone().slice([
            0..batch_size,
            0..seq_length,
            n_embd..2 * n_embd,
        ]));
        let value = self.split_heads(qkv.slice([
            0..batch_size,
            0..seq_length,
            2 * n_embd..3 * n_embd,
        ]));

        let head_dim = n_embd / self.n_head;

        let scores = query
            .matmul(key.transpose())
            .div_scalar((head_dim as f32).sqrt());

        let mask_causal = generate_autoregressive_mask::<B>(batch_size, seq_length, &device);

        let scores = scores
            .mask_fill(
                mask_causal.reshape([batch_size, 1, seq_length, seq_length]),
                MASK_FILL,
            )
            .mask_fill(
                mask_pad.reshape([batch_size, 1, 1, seq_length]),
                MASK_FILL,
            );

        let weights = self.attn_dropout.forward(softmax(scores, 3));

        let output = weights
            .matmul(value)
            .swap_dims(1, 2)
            .reshape([batch_size, seq_length, n_embd]);

        self.resid_dropout.forward(self.c_proj.forward(output))
    }

    /// `[batch, seq, n_embd]` to `[batch, n_head, seq, head_dim]`
    fn split_heads(&self, x: Tensor<B, 3>) -> Tensor<B, 4> {
        let [batch_size, seq_length, n_embd] = x.dims();

        x.reshape([batch_size, seq_length, self.n_head, n_embd / self.n_head])
            .swap_dims(1, 2)
    }
}

/// Position-wise feed-forward network
#[derive(Module, Debug)]
pub struct Mlp<B: Backend> {
    pub(crate) c_fc: Linear<B>,
    pub(crate) c_proj: Linear<B>,
    pub(crate) dropout: Dropout,
}

impl<B: Backend> Mlp<B> {
    fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let x = gelu_new(self.c_fc.forward(x));

        self.dropout.forward(self.c_proj.forward(x))
    }
}

/// The tanh approximation of GELU that GPT-2 checkpoints were trained with
pub fn gelu_new<B: Backend, const D: usize>(x: Tensor<B, D>) -> Tensor<B, D> {
    let cube = x.clone() * x.clone() * x.clone();
    let inner =
        (x.clone() + cube.mul_scalar(0.044715)).mul_scalar((2.0 / std::f64::consts::PI).sqrt());

    x.mul_scalar(0.5) * tanh(inner).add_scalar(1.0)
}

#[cfg(test)]
pub(crate) mod tests {
    use burn::{
        backend::{libtorch::LibTorchDevice, LibTorch},
        tensor::{Data, Shape},
    };
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::gpt2::Gpt2Config;

    pub(crate) type TestBackend = LibTorch;

    pub(crate) fn tiny_config() -> Gpt2Config {
        Gpt2Config::new(16, 8, 8, 2, 2).with_eos_token_id(0)
    }

    pub(crate) fn tokens(rows: &[&[i64]]) -> Tensor<TestBackend, 2, Int> {
        let seq_length = rows[0].len();
        let values: Vec<i64> = rows.iter().flat_map(|row| row.iter().copied()).collect();

        Tensor::from_data(
            Data::new(values, Shape::new([rows.len(), seq_length])),
            &LibTorchDevice::Cpu,
        )
    }

    #[test]
    fn gelu_uses_the_tanh_approximation() {
        let x = Tensor::<TestBackend, 1>::from_data(
            Data::from([0.0f32, 1.0, -1.0, 2.0, -3.0]),
            &LibTorchDevice::Cpu,
        );

        let values = gelu_new(x).into_data().convert::<f32>().value;
        let expected = [0.0f32, 0.841_192, -0.158_808, 1.954_598, -0.003_637];

        for (value, expected) in values.iter().zip(expected) {
            assert!((value - expected).abs() < 1e-5, "{value} != {expected}");
        }
    }

    #[test]
    fn produces_one_hidden_state_per_token() {
        let model = tiny_config().init::<TestBackend>(&LibTorchDevice::Cpu);
        let tokens = tokens(&[&[3, 4, 5], &[6, 0, 0]]);
        let mask_pad = tokens.clone().equal_elem(0);

        let hidden = model.forward(tokens, mask_pad);

        assert_eq!(hidden.dims(), [2, 3, 8]);
    }

    #[test]
    fn later_tokens_do_not_change_earlier_states() {
        let model = tiny_config().init::<TestBackend>(&LibTorchDevice::Cpu);

        let short = tokens(&[&[3, 4]]);
        let long = tokens(&[&[3, 4, 9, 10]]);

        let short_hidden = model.forward(short.clone(), short.equal_elem(0));
        let long_hidden = model
            .forward(long.clone(), long.equal_elem(0))
            .slice([0..1, 0..2, 0..8]);

        short_hidden
            .into_data()
            .assert_approx_eq(&long_hidden.into_data(), 4);
    }
}
