// ============================================================
// Layer 5 - Transformer (encoder + decoder)
// ============================================================
// src ids -> TransformerEncoder -> memory
// tgt ids + memory + masks -> TransformerDecoder -> output
//
// The decoder output is returned as-is; there is no extra
// projection at this level.
//
// Reference: Vaswani et al. (2017) Attention Is All You Need

use burn::prelude::*;

use crate::ml::decoder::{TransformerDecoder, TransformerDecoderConfig};
use crate::ml::encoder::{TransformerEncoder, TransformerEncoderConfig};
use crate::ml::error::Result;
use crate::ml::layers::MemoryDecoder;
use crate::ml::mask::causal_mask;

#[derive(Config, Debug)]
pub struct TransformerConfig {
    pub num_layers:  usize,
    pub d_model:     usize,
    pub num_heads:   usize,
    pub d_ff:        usize,
    pub vocab_size:  usize,
    pub max_seq_len: usize,
    #[config(default = 0.1)]
    pub dropout:     f64,
}

impl TransformerConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<Transformer<B>> {
        let encoder = TransformerEncoderConfig::new(
            self.num_layers, self.d_model, self.num_heads, self.d_ff,
            self.vocab_size, self.max_seq_len,
        )
        .with_dropout(self.dropout)
        .init(device)?;

        let decoder = TransformerDecoderConfig::new(
            self.num_layers, self.d_model, self.num_heads, self.d_ff,
            self.vocab_size, self.max_seq_len,
        )
        .with_dropout(self.dropout)
        .init(device)?;

        Ok(Transformer { encoder, decoder })
    }
}

#[derive(Module, Debug)]
pub struct Transformer<B: Backend> {
    pub encoder: TransformerEncoder<B>,
    pub decoder: TransformerDecoder<B>,
}

impl<B: Backend> Transformer<B> {
    /// src: [batch, src_len], tgt: [batch, tgt_len] -> decoder output
    /// [batch, tgt_len, vocab_size].
    pub fn forward(
        &self,
        src:         Tensor<B, 2, Int>,
        tgt:         Tensor<B, 2, Int>,
        tgt_mask:    Option<Tensor<B, 2>>,
        memory_mask: Option<Tensor<B, 2>>,
    ) -> Result<Tensor<B, 3>> {
        let memory = self.encoder.forward(src, None)?;
        self.decoder.forward(tgt, memory, tgt_mask, memory_mask)
    }

    /// Causal `[size, size]` target mask: 0.0 on and below the diagonal,
    /// -inf above it.
    pub fn tgt_mask(size: usize, device: &B::Device) -> Tensor<B, 2> {
        causal_mask(size, device)
    }
}
