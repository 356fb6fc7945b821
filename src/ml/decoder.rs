// ============================================================
// Layer 5 - Transformer Decoder
// ============================================================
// tgt ids [batch, tgt_len]
//   -> embedding + positional encoding + dropout
//   -> num_layers x DecoderBlock (self-attn, cross-attn, ffn)
//   -> output projection          [batch, tgt_len, vocab_size]
//
// Implements MemoryDecoder, the contract the top-level
// Transformer relies on.

use burn::{
    nn::{Dropout, DropoutConfig, Embedding, EmbeddingConfig, Linear, LinearConfig},
    prelude::*,
};

use crate::ml::blocks::{BlockConfig, DecoderBlock};
use crate::ml::encoder::check_token_ids;
use crate::ml::error::{validate_dims, ModelError, Result};
use crate::ml::layers::MemoryDecoder;
use crate::ml::mask::attention_mask;
use crate::ml::positional_encoding::{PositionalEncoding, PositionalEncodingConfig};

#[derive(Config, Debug)]
pub struct TransformerDecoderConfig {
    pub num_layers:  usize,
    pub d_model:     usize,
    pub num_heads:   usize,
    pub d_ff:        usize,
    pub vocab_size:  usize,
    pub max_seq_len: usize,
    #[config(default = 0.1)]
    pub dropout:     f64,
}

impl TransformerDecoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<TransformerDecoder<B>> {
        validate_dims(self.d_model, self.num_heads, self.vocab_size, self.max_seq_len, self.dropout)?;

        let block_cfg = BlockConfig::new(self.d_model, self.num_heads, self.d_ff)
            .with_dropout(self.dropout);

        Ok(TransformerDecoder {
            embedding: EmbeddingConfig::new(self.vocab_size, self.d_model).init(device),
            positional_encoding: PositionalEncodingConfig::new(self.d_model, self.max_seq_len)
                .with_dropout(self.dropout)
                .init(device)?,
            layers: (0..self.num_layers)
                .map(|_| block_cfg.init_decoder(device))
                .collect(),
            dropout:    DropoutConfig::new(self.dropout).init(),
            output:     LinearConfig::new(self.d_model, self.vocab_size).init(device),
            vocab_size: self.vocab_size,
        })
    }
}

#[derive(Module, Debug)]
pub struct TransformerDecoder<B: Backend> {
    pub embedding:           Embedding<B>,
    pub positional_encoding: PositionalEncoding<B>,
    pub layers:              Vec<DecoderBlock<B>>,
    pub dropout:             Dropout,
    pub output:              Linear<B>,
    pub vocab_size:          usize,
}

impl<B: Backend> MemoryDecoder<B> for TransformerDecoder<B> {
    fn forward(
        &self,
        tgt:         Tensor<B, 2, Int>,
        memory:      Tensor<B, 3>,
        tgt_mask:    Option<Tensor<B, 2>>,
        memory_mask: Option<Tensor<B, 2>>,
    ) -> Result<Tensor<B, 3>> {
        let [batch, tgt_len] = tgt.dims();
        let [mem_batch, src_len, mem_width] = memory.dims();
        let d_model = self.positional_encoding.d_model();

        if mem_batch != batch || mem_width != d_model {
            return Err(ModelError::ShapeMismatch {
                context:  "decoder memory",
                expected: vec![batch, src_len, d_model],
                got:      vec![mem_batch, src_len, mem_width],
            });
        }
        check_token_ids(&tgt, self.vocab_size)?;

        if tgt_len == 0 {
            return Ok(Tensor::zeros([batch, 0, self.vocab_size], &tgt.device()));
        }
        if src_len == 0 {
            return Err(ModelError::EmptyMemory { tgt_len });
        }

        let tgt_mask = tgt_mask
            .map(|m| attention_mask(m, batch, tgt_len, tgt_len, "target mask"))
            .transpose()?;
        let memory_mask = memory_mask
            .map(|m| attention_mask(m, batch, tgt_len, src_len, "memory mask"))
            .transpose()?;

        let x = self.embedding.forward(tgt);
        let x = self.positional_encoding.forward(x)?;
        let mut x = self.dropout.forward(x);

        for layer in &self.layers {
            x = layer.forward(x, memory.clone(), tgt_mask.clone(), memory_mask.clone());
        }
        tracing::trace!("Decoder output: [{}, {}, {}]", batch, tgt_len, self.vocab_size);

        Ok(self.output.forward(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::mask::causal_mask;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn decoder(device: &<TestBackend as Backend>::Device) -> TransformerDecoder<TestBackend> {
        TransformerDecoderConfig::new(2, 8, 2, 16, 12, 16)
            .init::<TestBackend>(device)
            .unwrap()
    }

    #[test]
    fn test_outputs_vocab_logits() {
        let device = Default::default();
        let tgt    = Tensor::<TestBackend, 2, Int>::from_ints([[1, 2, 3], [4, 5, 6]], &device);
        let memory = Tensor::<TestBackend, 3>::ones([2, 7, 8], &device);

        let out = decoder(&device)
            .forward(tgt, memory, Some(causal_mask::<TestBackend>(3, &device)), None)
            .unwrap();
        assert_eq!(out.dims(), [2, 3, 12]);
    }

    #[test]
    fn test_memory_mask_shape() {
        let device = Default::default();
        let tgt    = Tensor::<TestBackend, 2, Int>::from_ints([[1, 2, 3]], &device);
        let memory = Tensor::<TestBackend, 3>::ones([1, 4, 8], &device);

        let ok = Tensor::<TestBackend, 2>::zeros([3, 4], &device);
        assert!(decoder(&device).forward(tgt.clone(), memory.clone(), None, Some(ok)).is_ok());

        let wrong = Tensor::<TestBackend, 2>::zeros([4, 3], &device);
        assert!(matches!(
            decoder(&device).forward(tgt, memory, None, Some(wrong)),
            Err(ModelError::ShapeMismatch { context: "memory mask", .. })
        ));
    }

    #[test]
    fn test_empty_target_gives_empty_logits() {
        let device = Default::default();
        let tgt    = Tensor::<TestBackend, 2, Int>::zeros([2, 0], &device);
        let memory = Tensor::<TestBackend, 3>::ones([2, 4, 8], &device);

        let out = decoder(&device).forward(tgt, memory, None, None).unwrap();
        assert_eq!(out.dims(), [2, 0, 12]);
    }

    #[test]
    fn test_rejects_empty_memory() {
        let device = Default::default();
        let tgt    = Tensor::<TestBackend, 2, Int>::from_ints([[1, 2, 3]], &device);
        let memory = Tensor::<TestBackend, 3>::zeros([1, 0, 8], &device);

        assert_eq!(
            decoder(&device).forward(tgt, memory, None, None).unwrap_err(),
            ModelError::EmptyMemory { tgt_len: 3 }
        );
    }

    #[test]
    fn test_rejects_memory_of_wrong_width() {
        let device = Default::default();
        let tgt    = Tensor::<TestBackend, 2, Int>::from_ints([[1, 2]], &device);
        let memory = Tensor::<TestBackend, 3>::ones([1, 4, 6], &device);

        assert_eq!(
            decoder(&device).forward(tgt, memory, None, None).unwrap_err(),
            ModelError::ShapeMismatch {
                context:  "decoder memory",
                expected: vec![1, 4, 8],
                got:      vec![1, 4, 6],
            }
        );
    }

    #[test]
    fn test_rejects_target_out_of_vocab() {
        let device = Default::default();
        let tgt    = Tensor::<TestBackend, 2, Int>::from_ints([[1, 12]], &device);
        let memory = Tensor::<TestBackend, 3>::ones([1, 4, 8], &device);

        assert_eq!(
            decoder(&device).forward(tgt, memory, None, None).unwrap_err(),
            ModelError::TokenOutOfRange { id: 12, vocab_size: 12 }
        );
    }
}
