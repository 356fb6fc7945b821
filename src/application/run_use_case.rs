// ============================================================
// Layer 2 - RunUseCase
// ============================================================
// Exercises the whole model end to end:
//
//   Step 1: Build the Transformer from the hyper-parameters
//   Step 2: Draw random source / target token ids
//   Step 3: Forward pass with a causal target mask
//   Step 4: (optional) save a checkpoint, restore it, and
//           compare the restored model's output
//
// Runs on Wgpu by default, or NdArray on the CPU.

use anyhow::{Context, Result};
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, NdArray, Wgpu},
    prelude::*,
};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::{Transformer, TransformerConfig};

/// Everything a `run` needs. Serialisable so a run can be described in JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub num_layers:     usize,
    pub d_model:        usize,
    pub num_heads:      usize,
    pub d_ff:           usize,
    pub vocab_size:     usize,
    pub max_seq_len:    usize,
    pub dropout:        f64,
    pub batch_size:     usize,
    pub src_len:        usize,
    pub tgt_len:        usize,
    pub cpu:            bool,
    pub checkpoint_dir: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            num_layers:     6,
            d_model:        512,
            num_heads:      8,
            d_ff:           2048,
            vocab_size:     32000,
            max_seq_len:    512,
            dropout:        0.1,
            batch_size:     2,
            src_len:        32,
            tgt_len:        16,
            cpu:            false,
            checkpoint_dir: None,
        }
    }
}

impl RunConfig {
    pub fn model_config(&self) -> TransformerConfig {
        TransformerConfig::new(
            self.num_layers, self.d_model, self.num_heads, self.d_ff,
            self.vocab_size, self.max_seq_len,
        )
        .with_dropout(self.dropout)
    }
}

/// What a run observed.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub output_dims:  [usize; 3],
    pub num_params:   usize,
    /// Largest |original - restored| over the output, when a checkpoint was written.
    pub restore_diff: Option<f32>,
}

pub struct RunUseCase {
    config: RunConfig,
}

impl RunUseCase {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<RunReport> {
        if self.config.cpu {
            tracing::info!("Using NdArray (CPU) backend");
            self.execute_on::<NdArray>(NdArrayDevice::Cpu)
        } else {
            let device = WgpuDevice::default();
            tracing::info!("Using WGPU device: {:?}", device);
            self.execute_on::<Wgpu>(device)
        }
    }

    pub fn execute_on<B: Backend>(&self, device: B::Device) -> Result<RunReport> {
        let cfg       = &self.config;
        let model_cfg = cfg.model_config();

        // ── Step 1: Build model ───────────────────────────────────────────────
        let model: Transformer<B> = model_cfg.init(&device)
            .context("Cannot build transformer")?;
        let num_params = model.num_params();
        tracing::info!(
            "Model ready: {} layers, d_model={}, {} parameters",
            model.encoder.num_layers(), cfg.d_model, num_params
        );

        // ── Step 2: Random token ids ──────────────────────────────────────────
        let src = random_ids::<B>(cfg.batch_size, cfg.src_len, cfg.vocab_size, &device);
        let tgt = random_ids::<B>(cfg.batch_size, cfg.tgt_len, cfg.vocab_size, &device);

        // ── Step 3: Forward pass ──────────────────────────────────────────────
        let tgt_mask = Transformer::<B>::tgt_mask(cfg.tgt_len, &device);
        let output   = model
            .forward(src.clone(), tgt.clone(), Some(tgt_mask.clone()), None)
            .context("Forward pass failed")?;
        let output_dims = output.dims();
        tracing::info!("Output shape: {:?}", output_dims);

        // ── Step 4: Checkpoint round trip ─────────────────────────────────────
        let restore_diff = match &cfg.checkpoint_dir {
            None => None,
            Some(dir) => {
                let ckpt = CheckpointManager::new(dir)?;
                ckpt.save(&model_cfg, &model)?;

                let (_, restored) = ckpt.restore::<B>(&device)?;
                let again = restored
                    .forward(src, tgt, Some(tgt_mask), None)
                    .context("Forward pass on restored model failed")?;

                let diff = max_abs_diff(output, again);
                tracing::info!("Restored model max |diff| = {:e}", diff);
                Some(diff)
            }
        };

        Ok(RunReport { output_dims, num_params, restore_diff })
    }
}

fn random_ids<B: Backend>(
    batch:      usize,
    seq_len:    usize,
    vocab_size: usize,
    device:     &B::Device,
) -> Tensor<B, 2, Int> {
    let mut rng = rand::thread_rng();
    let flat: Vec<i32> = (0..batch * seq_len)
        .map(|_| rng.gen_range(0..vocab_size) as i32)
        .collect();

    Tensor::<B, 1, Int>::from_ints(flat.as_slice(), device).reshape([batch, seq_len])
}

fn max_abs_diff<B: Backend>(a: Tensor<B, 3>, b: Tensor<B, 3>) -> f32 {
    if a.dims().iter().product::<usize>() == 0 {
        return 0.0;
    }
    (a - b).abs().max().into_scalar().elem::<f32>()
}
