// ============================================================
// Layer 5 - Attention Masks
// ============================================================
// Masks in this crate are additive float matrices of shape
// [query_len, key_len]: 0.0 lets a query attend to a key, -inf
// forbids it. Burn's MultiHeadAttention wants a boolean
// [batch, query_len, key_len] mask instead (true = masked), so
// attention_mask() does that conversion at the layer boundary.

use burn::prelude::*;

use crate::ml::error::{ModelError, Result};

/// Causal mask for autoregressive decoding.
///
/// Entry (i, j) is 0.0 when j <= i and -inf when j > i. Built from the
/// strict upper triangle of a matrix of ones, so it is recomputed on every
/// call; callers that reuse one target length can cache the result.
pub fn causal_mask<B: Backend>(size: usize, device: &B::Device) -> Tensor<B, 2> {
    if size == 0 {
        return Tensor::<B, 2>::zeros([0, 0], device);
    }
    let upper = Tensor::<B, 2>::ones([size, size], device).triu(1);
    let future = upper.clone().equal_elem(1.0);
    upper.mask_fill(future, f32::NEG_INFINITY)
}

/// Converts an additive `[query_len, key_len]` mask into Burn's boolean
/// attention mask broadcast over the batch. Negative entries are masked.
pub fn attention_mask<B: Backend>(
    mask:      Tensor<B, 2>,
    batch:     usize,
    query_len: usize,
    key_len:   usize,
    context:   &'static str,
) -> Result<Tensor<B, 3, Bool>> {
    let dims = mask.dims();
    if dims != [query_len, key_len] {
        return Err(ModelError::ShapeMismatch {
            context,
            expected: vec![query_len, key_len],
            got:      dims.to_vec(),
        });
    }
    Ok(mask
        .lower_elem(0.0)
        .unsqueeze::<3>()
        .expand([batch, query_len, key_len]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_causal_mask_of_four() {
        let device = Default::default();
        let mask   = causal_mask::<TestBackend>(4, &device);
        assert_eq!(mask.dims(), [4, 4]);

        let inf = f32::NEG_INFINITY;
        let expected = vec![
            0.0, inf, inf, inf,
            0.0, 0.0, inf, inf,
            0.0, 0.0, 0.0, inf,
            0.0, 0.0, 0.0, 0.0,
        ];
        assert_eq!(mask.into_data().to_vec::<f32>().unwrap(), expected);
    }

    #[test]
    fn test_causal_mask_of_one_attends_to_self() {
        let device = Default::default();
        let mask   = causal_mask::<TestBackend>(1, &device);
        assert_eq!(mask.into_data().to_vec::<f32>().unwrap(), vec![0.0]);
    }

    #[test]
    fn test_causal_mask_of_zero_is_empty() {
        let device = Default::default();
        assert_eq!(causal_mask::<TestBackend>(0, &device).dims(), [0, 0]);
    }

    #[test]
    fn test_attention_mask_marks_future_positions() {
        let device = Default::default();
        let mask   = attention_mask(causal_mask::<TestBackend>(3, &device), 2, 3, 3, "test")
            .unwrap();
        assert_eq!(mask.dims(), [2, 3, 3]);

        let flags = mask.into_data().to_vec::<bool>().unwrap();
        let row   = vec![false, true, true, false, false, true, false, false, false];
        assert_eq!(&flags[0..9], row.as_slice());
        assert_eq!(&flags[9..18], row.as_slice());
    }

    #[test]
    fn test_attention_mask_rejects_wrong_shape() {
        let device = Default::default();
        let err = attention_mask(causal_mask::<TestBackend>(3, &device), 1, 4, 4, "self-attention")
            .unwrap_err();
        assert_eq!(
            err,
            ModelError::ShapeMismatch {
                context:  "self-attention",
                expected: vec![4, 4],
                got:      vec![3, 3],
            }
        );
    }
}
