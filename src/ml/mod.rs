// ============================================================
// Layer 5 - ML / Model Layer (Burn)
// ============================================================
// All Burn module code lives here.
//
//   error.rs               - ModelError and construction checks
//   positional_encoding.rs - fixed sinusoidal table + dropout
//   mask.rs                - causal mask, additive -> bool masks
//   layers.rs              - EncoderLayer / MemoryDecoder traits
//   blocks.rs              - default encoder and decoder blocks
//   encoder.rs             - embedding + positions + layer stack
//   decoder.rs             - decoder stack with vocab projection
//   model.rs               - Transformer: encoder + decoder
//
// Reference: Burn Book section 3 (Building Blocks)
//            Vaswani et al. (2017) Attention Is All You Need

pub mod error;

pub mod positional_encoding;

pub mod mask;

pub mod layers;

pub mod blocks;

pub mod encoder;

pub mod decoder;

/// Top-level encoder/decoder composition
pub mod model;
