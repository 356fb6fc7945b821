// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// Cross-cutting concerns that touch the filesystem:
//
//   checkpoint.rs - saving and loading Transformer weights
//                   with Burn's recorder, plus the model
//                   config as JSON so a model can be rebuilt.

/// Model checkpoint saving and loading
pub mod checkpoint;
