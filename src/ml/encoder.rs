// ============================================================
// Layer 5 - Transformer Encoder
// ============================================================
// token ids [batch, seq_len]
//   -> embedding                  [batch, seq_len, d_model]
//   -> positional encoding (+ its own dropout)
//   -> dropout
//   -> num_layers x EncoderLayer  [batch, seq_len, d_model]
//
// The output is the "memory" consumed by the decoder.
//
// Dropout runs twice on the embedding path: once inside
// PositionalEncoding and once more here. Both are kept.

use burn::{
    nn::{Dropout, DropoutConfig, Embedding, EmbeddingConfig},
    prelude::*,
};

use crate::ml::blocks::{BlockConfig, EncoderBlock};
use crate::ml::error::{validate_dims, ModelError, Result};
use crate::ml::layers::EncoderLayer;
use crate::ml::positional_encoding::{PositionalEncoding, PositionalEncodingConfig};

#[derive(Config, Debug)]
pub struct TransformerEncoderConfig {
    pub num_layers:  usize,
    pub d_model:     usize,
    pub num_heads:   usize,
    pub d_ff:        usize,
    pub vocab_size:  usize,
    pub max_seq_len: usize,
    #[config(default = 0.1)]
    pub dropout:     f64,
}

impl TransformerEncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<TransformerEncoder<B>> {
        validate_dims(self.d_model, self.num_heads, self.vocab_size, self.max_seq_len, self.dropout)?;

        let embedding = EmbeddingConfig::new(self.vocab_size, self.d_model).init(device);
        let positional_encoding = PositionalEncodingConfig::new(self.d_model, self.max_seq_len)
            .with_dropout(self.dropout)
            .init(device)?;

        let block_cfg = BlockConfig::new(self.d_model, self.num_heads, self.d_ff)
            .with_dropout(self.dropout);
        let layers: Vec<EncoderBlock<B>> = (0..self.num_layers)
            .map(|_| block_cfg.init_encoder(device))
            .collect();

        tracing::debug!(
            "Encoder ready: {} layers, d_model={}, vocab_size={}",
            self.num_layers, self.d_model, self.vocab_size
        );

        Ok(TransformerEncoder {
            embedding,
            positional_encoding,
            layers,
            dropout:    DropoutConfig::new(self.dropout).init(),
            vocab_size: self.vocab_size,
        })
    }
}

#[derive(Module, Debug)]
pub struct TransformerEncoder<B: Backend> {
    pub embedding:           Embedding<B>,
    pub positional_encoding: PositionalEncoding<B>,
    pub layers:              Vec<EncoderBlock<B>>,
    pub dropout:             Dropout,
    pub vocab_size:          usize,
}

impl<B: Backend> TransformerEncoder<B> {
    /// src: [batch, seq_len] -> memory: [batch, seq_len, d_model]
    pub fn forward(
        &self,
        src:  Tensor<B, 2, Int>,
        mask: Option<Tensor<B, 2>>,
    ) -> Result<Tensor<B, 3>> {
        check_token_ids(&src, self.vocab_size)?;

        let [batch, seq_len] = src.dims();
        if seq_len == 0 {
            // nothing to attend over
            let d_model = self.positional_encoding.d_model();
            return Ok(Tensor::zeros([batch, 0, d_model], &src.device()));
        }

        let x = self.embedding.forward(src);
        let x = self.positional_encoding.forward(x)?;
        let x = self.dropout.forward(x);

        self.layers
            .iter()
            .try_fold(x, |x, layer| layer.forward(x, mask.clone()))
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }
}

/// Every id must lie in `[0, vocab_size)` before the embedding lookup.
pub(crate) fn check_token_ids<B: Backend>(ids: &Tensor<B, 2, Int>, vocab_size: usize) -> Result<()> {
    let [batch, seq_len] = ids.dims();
    if batch == 0 || seq_len == 0 {
        return Ok(());
    }

    let min = ids.clone().min().into_scalar().elem::<i64>();
    if min < 0 {
        return Err(ModelError::TokenOutOfRange { id: min, vocab_size });
    }
    let max = ids.clone().max().into_scalar().elem::<i64>();
    if max >= vocab_size as i64 {
        return Err(ModelError::TokenOutOfRange { id: max, vocab_size });
    }
    Ok(())
}
