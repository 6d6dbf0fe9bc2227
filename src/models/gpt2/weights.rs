//! Read Hub `model.safetensors` checkpoints into Burn records.
//!
//! GPT-2 stores its projections as `Conv1D` weights laid out `[d_input, d_output]`, which is
//! already the layout of a Burn `Linear` weight, so no transposition is needed. The fused
//! `c_attn` projection stays fused.

use std::{collections::HashMap, path::Path};

use burn::{
    module::{ConstantRecord, Param},
    nn::{EmbeddingRecord, LayerNormRecord, LinearRecord},
    tensor::{backend::Backend, Data, Shape, Tensor},
};
use candle_core::{DType, Device};

use super::{
    model::{AttentionRecord, BlockRecord, MlpRecord},
    Gpt2Config, Gpt2ModelRecord,
};

/// Checkpoints saved from a head model nest the decoder under this prefix
static PREFIX: &str = "transformer.";

/// Errors raised while reading pre-trained weights
#[derive(thiserror::Error, Debug)]
pub enum WeightsError {
    /// The safetensors file could not be read or converted
    #[error("unable to read weights: {0}")]
    Candle(#[from] candle_core::Error),

    /// A tensor the config requires is absent from the checkpoint
    #[error("missing tensor {0}")]
    Missing(String),

    /// A tensor does not have the shape the config implies
    #[error("tensor {name} has shape {actual:?}, expected {expected:?}")]
    Shape {
        /// Tensor name
        name: String,
        /// Shape implied by the model config
        expected: Vec<usize>,
        /// Shape found in the checkpoint
        actual: Vec<usize>,
    },
}

/// Named tensors from a checkpoint, converted on demand onto a Burn device
pub struct Weights<'a, B: Backend> {
    tensors: HashMap<String, candle_core::Tensor>,
    device: &'a B::Device,
}

impl<'a, B: Backend> Weights<'a, B> {
    /// Read every tensor in a safetensors file
    pub fn from_file(path: &Path, device: &'a B::Device) -> Result<Self, WeightsError> {
        let tensors = candle_core::safetensors::load(path, &Device::Cpu)?;

        Ok(Self::new(tensors, device))
    }

    /// Wrap already-loaded tensors
    pub fn new(tensors: HashMap<String, candle_core::Tensor>, device: &'a B::Device) -> Self {
        Self { tensors, device }
    }

    fn get(&self, name: &str) -> Result<&candle_core::Tensor, WeightsError> {
        self.tensors
            .get(name)
            .or_else(|| self.tensors.get(&format!("{PREFIX}{name}")))
            .ok_or_else(|| WeightsError::Missing(name.to_string()))
    }

    /// Convert a tensor after checking its shape
    pub fn tensor<const D: usize>(
        &self,
        name: &str,
        expected: [usize; D],
    ) -> Result<Tensor<B, D>, WeightsError> {
        let tensor = self.get(name)?;

        if tensor.dims() != expected.as_slice() {
            return Err(WeightsError::Shape {
                name: name.to_string(),
                expected: expected.to_vec(),
                actual: tensor.dims().to_vec(),
            });
        }

        let values = tensor.to_dtype(DType::F32)?.flatten_all()?.to_vec1::<f32>()?;

        Ok(Tensor::from_floats(
            Data::new(values, Shape::new(expected)),
            self.device,
        ))
    }

    fn linear(
        &self,
        prefix: &str,
        d_input: usize,
        d_output: usize,
    ) -> Result<LinearRecord<B>, WeightsError> {
        Ok(LinearRecord {
            weight: Param::from_tensor(self.tensor(&format!("{prefix}.weight"), [d_input, d_output])?),
            bias: Some(Param::from_tensor(
                self.tensor(&format!("{prefix}.bias"), [d_output])?,
            )),
        })
    }

    fn layer_norm(&self, prefix: &str, size: usize) -> Result<LayerNormRecord<B>, WeightsError> {
        Ok(LayerNormRecord {
            gamma: Param::from_tensor(self.tensor(&format!("{prefix}.weight"), [size])?),
            beta: Param::from_tensor(self.tensor(&format!("{prefix}.bias"), [size])?),
            epsilon: ConstantRecord::new(),
        })
    }

    fn embedding(&self, name: &str, rows: usize, size: usize) -> Result<EmbeddingRecord<B>, WeightsError> {
        Ok(EmbeddingRecord {
            weight: Param::from_tensor(self.tensor(&format!("{name}.weight"), [rows, size])?),
        })
    }

    fn block(&self, index: usize, config: &Gpt2Config) -> Result<BlockRecord<B>, WeightsError> {
        let prefix = format!("h.{index}");
        let n_embd = config.n_embd;

        Ok(BlockRecord {
            ln_1: self.layer_norm(&format!("{prefix}.ln_1"), n_embd)?,
            attn: AttentionRecord {
                c_attn: self.linear(&format!("{prefix}.attn.c_attn"), n_embd, 3 * n_embd)?,
                c_proj: self.linear(&format!("{prefix}.attn.c_proj"), n_embd, n_embd)?,
                attn_dropout: ConstantRecord::new(),
                resid_dropout: ConstantRecord::new(),
                n_head: ConstantRecord::new(),
            },
            ln_2: self.layer_norm(&format!("{prefix}.ln_2"), n_embd)?,
            mlp: MlpRecord {
                c_fc: self.linear(&format!("{prefix}.mlp.c_fc"), n_embd, 4 * n_embd)?,
                c_proj: self.linear(&format!("{prefix}.mlp.c_proj"), 4 * n_embd, n_embd)?,
                dropout: ConstantRecord::new(),
            },
        })
    }

    /// Build the full decoder record described by `config`
    pub fn decoder(&self, config: &Gpt2Config) -> Result<Gpt2ModelRecord<B>, WeightsError> {
        let h = (0..config.n_layer)
            .map(|index| self.block(index, config))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Gpt2ModelRecord {
            wte: self.embedding("wte", config.vocab_size, config.n_embd)?,
            wpe: self.embedding("wpe", config.n_positions, config.n_embd)?,
            drop: ConstantRecord::new(),
            h,
            ln_f: self.layer_norm("ln_f", config.n_embd)?,
        })
    }
}

/// Load the pre-trained decoder weights from a safetensors checkpoint
pub fn load_pretrained<B: Backend>(
    path: &Path,
    config: &Gpt2Config,
    device: &B::Device,
) -> Result<Gpt2ModelRecord<B>, WeightsError> {
    log::info!("Loading pre-trained weights from {}", path.display());

    Weights::<B>::from_file(path, device)?.decoder(config)
}
