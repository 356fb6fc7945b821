// ============================================================
// Layer 2 - Inspect Use Cases
// ============================================================
// Read-only views of the two fixed (non-learned) tensors the
// model uses: the causal target mask and the sinusoidal
// positional table. Both are computed on the CPU backend and
// returned as plain rows for the CLI to print.

use anyhow::{Context, Result};
use burn::backend::{ndarray::NdArrayDevice, NdArray};

use crate::ml::model::Transformer;
use crate::ml::positional_encoding::PositionalEncodingConfig;

/// Rows of the `[size, size]` causal mask.
pub fn mask_rows(size: usize) -> Result<Vec<Vec<f32>>> {
    let mask = Transformer::<NdArray>::tgt_mask(size, &NdArrayDevice::Cpu);
    let flat = mask
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| anyhow::anyhow!("Cannot read mask: {e:?}"))?;

    Ok(flat.chunks(size.max(1)).map(<[f32]>::to_vec).collect())
}

/// The first `rows` positions of the positional table.
pub fn positional_rows(d_model: usize, max_seq_len: usize, rows: usize) -> Result<Vec<Vec<f32>>> {
    let pe = PositionalEncodingConfig::new(d_model, max_seq_len)
        .with_dropout(0.0)
        .init::<NdArray>(&NdArrayDevice::Cpu)
        .context("Cannot build positional encoding")?;

    let rows = rows.min(max_seq_len);
    if rows == 0 {
        return Ok(Vec::new());
    }
    let flat = pe
        .table()
        .slice([0..rows, 0..d_model])
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| anyhow::anyhow!("Cannot read table: {e:?}"))?;

    Ok(flat.chunks(d_model).map(<[f32]>::to_vec).collect())
}
