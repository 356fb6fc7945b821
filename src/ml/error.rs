// ============================================================
// Layer 5 - Model Errors
// ============================================================
// Every failure the numeric core can detect before handing a
// tensor to the backend. None of these are retried here; they
// propagate to whoever drives the forward pass.

use thiserror::Error;

/// Errors raised while building or running the transformer modules.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    /// Input is longer than the positional table.
    #[error("sequence length {len} exceeds max_seq_len {max}")]
    SequenceTooLong { len: usize, max: usize },

    /// Two tensors that must line up do not.
    #[error("shape mismatch in {context}: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        context:  &'static str,
        expected: Vec<usize>,
        got:      Vec<usize>,
    },

    /// Cross-attention over a zero-length memory.
    #[error("decoder memory is empty but target length is {tgt_len}")]
    EmptyMemory { tgt_len: usize },

    /// A token id outside `[0, vocab_size)`.
    #[error("token id {id} out of range for vocab_size {vocab_size}")]
    TokenOutOfRange { id: i64, vocab_size: usize },

    /// Hyper-parameters that cannot produce a working module.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T, E = ModelError> = std::result::Result<T, E>;

/// Shared construction checks for the seven transformer hyper-parameters.
pub(crate) fn validate_dims(
    d_model:     usize,
    num_heads:   usize,
    vocab_size:  usize,
    max_seq_len: usize,
    dropout:     f64,
) -> Result<()> {
    if d_model == 0 {
        return Err(ModelError::InvalidConfig("d_model must be positive".into()));
    }
    if max_seq_len == 0 {
        return Err(ModelError::InvalidConfig("max_seq_len must be positive".into()));
    }
    if vocab_size == 0 {
        return Err(ModelError::InvalidConfig("vocab_size must be positive".into()));
    }
    if num_heads == 0 || d_model % num_heads != 0 {
        return Err(ModelError::InvalidConfig(format!(
            "d_model ({d_model}) must be divisible by num_heads ({num_heads})"
        )));
    }
    validate_dropout(dropout)
}

pub(crate) fn validate_dropout(dropout: f64) -> Result<()> {
    if !(0.0..1.0).contains(&dropout) {
        return Err(ModelError::InvalidConfig(format!(
            "dropout must be in [0, 1), got {dropout}"
        )));
    }
    Ok(())
}
