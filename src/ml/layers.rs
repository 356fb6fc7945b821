// ============================================================
// Layer 5 - Collaborator Contracts
// ============================================================
// The encoder stack and the top-level Transformer only talk to
// their sub-layers through these two traits. EncoderBlock and
// TransformerDecoder are the implementations shipped with the
// crate; anything else honouring the same shapes can replace
// them.

use burn::prelude::*;

use crate::ml::error::Result;

/// One residual block of the encoder stack.
pub trait EncoderLayer<B: Backend> {
    /// x: [batch, seq_len, d_model] -> [batch, seq_len, d_model].
    /// `mask` is an additive `[seq_len, seq_len]` mask; `None` attends everywhere.
    fn forward(&self, x: Tensor<B, 3>, mask: Option<Tensor<B, 2>>) -> Result<Tensor<B, 3>>;
}

/// A decoder consuming encoder memory.
pub trait MemoryDecoder<B: Backend> {
    /// tgt: [batch, tgt_len] token ids, memory: [batch, src_len, d_model].
    /// `tgt_mask` is `[tgt_len, tgt_len]`, `memory_mask` is `[tgt_len, src_len]`.
    fn forward(
        &self,
        tgt:         Tensor<B, 2, Int>,
        memory:      Tensor<B, 3>,
        tgt_mask:    Option<Tensor<B, 2>>,
        memory_mask: Option<Tensor<B, 2>>,
    ) -> Result<Tensor<B, 3>>;
}
