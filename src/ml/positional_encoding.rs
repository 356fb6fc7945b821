// ============================================================
// Layer 5 - Sinusoidal Positional Encoding
// ============================================================
// Self-attention has no notion of order, so a fixed signal is
// added to every embedding before the first layer:
//
//   PE(pos, 2k)   = sin(pos * exp(-2k * ln(10000) / d_model))
//   PE(pos, 2k+1) = cos(pos * exp(-2k * ln(10000) / d_model))
//
// The table is computed once at construction and stored as a
// plain (non-Param) tensor, so it never shows up in
// num_params() and no optimiser touches it, but it still moves
// with the module on to_device() / fork().
//
// Odd d_model: the sin branch fills ceil(d/2) even columns and
// the cos branch floor(d/2) odd columns. The would-be trailing
// cos column is simply absent.
//
// Reference: Vaswani et al. (2017) section 3.5

use burn::{
    nn::{Dropout, DropoutConfig},
    prelude::*,
    tensor::TensorData,
};

use crate::ml::error::{validate_dropout, ModelError, Result};

#[derive(Config, Debug)]
pub struct PositionalEncodingConfig {
    pub d_model:     usize,
    pub max_seq_len: usize,
    #[config(default = 0.1)]
    pub dropout:     f64,
}

impl PositionalEncodingConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<PositionalEncoding<B>> {
        if self.d_model == 0 {
            return Err(ModelError::InvalidConfig("d_model must be positive".into()));
        }
        if self.max_seq_len == 0 {
            return Err(ModelError::InvalidConfig("max_seq_len must be positive".into()));
        }
        validate_dropout(self.dropout)?;

        let values = sinusoidal_table(self.max_seq_len, self.d_model);
        let table  = Tensor::<B, 2>::from_data(
            TensorData::new(values, [self.max_seq_len, self.d_model]),
            device,
        );
        tracing::debug!(
            "Positional table built: {} x {}",
            self.max_seq_len, self.d_model
        );

        Ok(PositionalEncoding {
            table,
            dropout:     DropoutConfig::new(self.dropout).init(),
            d_model:     self.d_model,
            max_seq_len: self.max_seq_len,
        })
    }
}

/// Row-major `[max_seq_len, d_model]` sinusoidal table.
pub fn sinusoidal_table(max_seq_len: usize, d_model: usize) -> Vec<f32> {
    let mut table = vec![0.0f32; max_seq_len * d_model];
    if d_model == 0 {
        return table;
    }
    let scale = -(10000.0f32).ln() / d_model as f32;

    for (pos, row) in table.chunks_mut(d_model).enumerate() {
        // chunks of 2 leave a lone sin column at the end when d_model is odd
        for (k, pair) in row.chunks_mut(2).enumerate() {
            let angle = pos as f32 * ((2 * k) as f32 * scale).exp();
            pair[0] = angle.sin();
            if let Some(odd) = pair.get_mut(1) {
                *odd = angle.cos();
            }
        }
    }
    table
}

#[derive(Module, Debug)]
pub struct PositionalEncoding<B: Backend> {
    table:       Tensor<B, 2>,
    dropout:     Dropout,
    d_model:     usize,
    max_seq_len: usize,
}

impl<B: Backend> PositionalEncoding<B> {
    /// x: [batch, seq_len, d_model] -> x + PE[0..seq_len], then dropout.
    pub fn forward(&self, x: Tensor<B, 3>) -> Result<Tensor<B, 3>> {
        let [batch, seq_len, d_model] = x.dims();

        if seq_len > self.max_seq_len {
            return Err(ModelError::SequenceTooLong { len: seq_len, max: self.max_seq_len });
        }
        if d_model != self.d_model {
            return Err(ModelError::ShapeMismatch {
                context:  "positional encoding input",
                expected: vec![batch, seq_len, self.d_model],
                got:      vec![batch, seq_len, d_model],
            });
        }
        if seq_len == 0 {
            return Ok(x);
        }

        let pe = self.table
            .clone()
            .slice([0..seq_len, 0..d_model])
            .to_device(&x.device())
            .unsqueeze::<3>()
            .expand([batch, seq_len, d_model]);

        Ok(self.dropout.forward(x + pe))
    }

    /// The full `[max_seq_len, d_model]` table.
    pub fn table(&self) -> Tensor<B, 2> {
        self.table.clone()
    }

    pub fn d_model(&self) -> usize {
        self.d_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::module::AutodiffModule;

    type TestBackend = NdArray;

    fn to_vec<const D: usize>(t: Tensor<TestBackend, D>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_sin_cos_pairs_have_unit_norm() {
        for d_model in [2usize, 4, 6, 8, 16, 64] {
            let max_len = 50;
            let table   = sinusoidal_table(max_len, d_model);
            for pos in 0..max_len {
                for k in 0..d_model / 2 {
                    let s = table[pos * d_model + 2 * k];
                    let c = table[pos * d_model + 2 * k + 1];
                    assert!((s * s + c * c - 1.0).abs() < 1e-5, "pos={pos} k={k} d={d_model}");
                }
            }
        }
    }

    #[test]
    fn test_table_is_deterministic() {
        assert_eq!(sinusoidal_table(32, 12), sinusoidal_table(32, 12));
    }

    #[test]
    fn test_known_values() {
        let table = sinusoidal_table(3, 4);
        // position 0 alternates sin(0)=0, cos(0)=1
        assert_eq!(&table[0..4], &[0.0, 1.0, 0.0, 1.0]);
        // position 1, k=0: angle is exactly 1
        assert!((table[4] - 1.0f32.sin()).abs() < 1e-6);
        assert!((table[5] - 1.0f32.cos()).abs() < 1e-6);
        // position 1, k=1: angle = exp(-2 ln(10000) / 4) = 0.01
        assert!((table[6] - 0.01f32.sin()).abs() < 1e-6);
        assert!((table[7] - 0.01f32.cos()).abs() < 1e-6);
    }

    #[test]
    fn test_odd_d_model_keeps_trailing_sin_column() {
        let d_model = 5;
        let table   = sinusoidal_table(4, d_model);
        assert_eq!(table.len(), 4 * d_model);
        let scale = -(10000.0f32).ln() / d_model as f32;
        for pos in 0..4 {
            let angle_k2 = pos as f32 * (4.0 * scale).exp();
            let angle_k1 = pos as f32 * (2.0 * scale).exp();
            assert!((table[pos * d_model + 4] - angle_k2.sin()).abs() < 1e-6);
            assert!((table[pos * d_model + 3] - angle_k1.cos()).abs() < 1e-6);
        }
    }

    #[test]
    fn test_forward_without_dropout_is_exact_sum() {
        let device = Default::default();
        let pe = PositionalEncodingConfig::new(6, 10)
            .with_dropout(0.0)
            .init::<TestBackend>(&device)
            .unwrap();

        let x   = Tensor::<TestBackend, 3>::ones([2, 4, 6], &device);
        let out = pe.forward(x).unwrap();
        assert_eq!(out.dims(), [2, 4, 6]);

        let table = sinusoidal_table(10, 6);
        let out   = to_vec(out);
        for b in 0..2 {
            for i in 0..4 * 6 {
                assert!((out[b * 24 + i] - (1.0 + table[i])).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_eval_mode_ignores_dropout_probability() {
        let device = Default::default();
        let pe = PositionalEncodingConfig::new(4, 8)
            .with_dropout(0.5)
            .init::<TestBackend>(&device)
            .unwrap();

        let x   = Tensor::<TestBackend, 3>::zeros([1, 8, 4], &device);
        let out = to_vec(pe.forward(x).unwrap());
        assert_eq!(out, sinusoidal_table(8, 4));
    }

    #[test]
    fn test_too_long_sequence_is_rejected() {
        let device = Default::default();
        let pe = PositionalEncodingConfig::new(4, 3)
            .init::<TestBackend>(&device)
            .unwrap();

        let x   = Tensor::<TestBackend, 3>::zeros([1, 4, 4], &device);
        let err = pe.forward(x).unwrap_err();
        assert_eq!(err, ModelError::SequenceTooLong { len: 4, max: 3 });
    }

    #[test]
    fn test_wrong_width_is_rejected() {
        let device = Default::default();
        let pe = PositionalEncodingConfig::new(4, 8)
            .init::<TestBackend>(&device)
            .unwrap();

        let x = Tensor::<TestBackend, 3>::zeros([1, 2, 6], &device);
        assert!(matches!(
            pe.forward(x),
            Err(ModelError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_sequence_passes_through() {
        let device = Default::default();
        let pe = PositionalEncodingConfig::new(4, 8)
            .init::<TestBackend>(&device)
            .unwrap();

        let x = Tensor::<TestBackend, 3>::zeros([2, 0, 4], &device);
        assert_eq!(pe.forward(x).unwrap().dims(), [2, 0, 4]);
    }

    #[test]
    fn test_table_follows_module_to_device() {
        let device = Default::default();
        let pe = PositionalEncodingConfig::new(4, 6)
            .with_dropout(0.0)
            .init::<TestBackend>(&device)
            .unwrap();

        let moved  = pe.to_device(&device);
        assert_eq!(moved.table().device(), device);
        let forked = moved.fork(&device);

        let x   = Tensor::<TestBackend, 3>::zeros([1, 6, 4], &device);
        let out = to_vec(forked.forward(x).unwrap());
        assert_eq!(out, sinusoidal_table(6, 4));
    }

    #[test]
    fn test_table_is_not_a_parameter() {
        let device = Default::default();
        let pe = PositionalEncodingConfig::new(16, 64)
            .init::<TestBackend>(&device)
            .unwrap();
        assert_eq!(pe.num_params(), 0);
        assert_eq!(pe.table().dims(), [64, 16]);
    }

    #[test]
    fn test_invalid_config() {
        let device = Default::default();
        assert!(PositionalEncodingConfig::new(0, 8).init::<TestBackend>(&device).is_err());
        assert!(PositionalEncodingConfig::new(4, 0).init::<TestBackend>(&device).is_err());
        assert!(PositionalEncodingConfig::new(4, 8)
            .with_dropout(1.0)
            .init::<TestBackend>(&device)
            .is_err());
    }

    #[test]
    fn test_training_mode_applies_dropout() {
        type Train = Autodiff<NdArray>;
        let device = Default::default();
        let pe = PositionalEncodingConfig::new(8, 128)
            .with_dropout(0.5)
            .init::<Train>(&device)
            .unwrap();

        let x   = Tensor::<Train, 3>::ones([2, 128, 8], &device);
        let out = pe.forward(x).unwrap().into_data().to_vec::<f32>().unwrap();

        let table    = sinusoidal_table(128, 8);
        let mut kept = 0usize;
        let mut zero = 0usize;
        for (i, v) in out.iter().enumerate() {
            let expected = 2.0 * (1.0 + table[i % table.len()]);
            if *v == 0.0 {
                zero += 1;
            } else {
                assert!((v - expected).abs() < 1e-4, "index {i}: {v} vs {expected}");
                kept += 1;
            }
        }
        assert!(kept > 0 && zero > 0);

        // the evaluation copy of the same module is deterministic
        let valid = pe.valid();
        let x     = Tensor::<NdArray, 3>::ones([1, 128, 8], &device);
        let out   = valid.forward(x).unwrap().into_data().to_vec::<f32>().unwrap();
        for (v, t) in out.iter().zip(table.iter()) {
            assert!((v - (1.0 + t)).abs() < 1e-6);
        }
    }
}
