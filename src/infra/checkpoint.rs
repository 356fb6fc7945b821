// ============================================================
// Layer 6 - Checkpoint Manager
// ============================================================
// Saves and restores Transformer weights with Burn's recorder.
//
// What gets saved:
//   1. model.mpk.gz       - all learned parameters
//   2. model_config.json  - the TransformerConfig used to build it
//
// Loading rebuilds the model from the config first, then loads
// the weights into it. The positional table is not a parameter;
// it is recomputed from the config on rebuild.
//
// Full precision is used so a restored model reproduces the
// saved one's outputs exactly.
//
// Reference: Burn Book section 5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};

use crate::ml::model::{Transformer, TransformerConfig};

const MODEL_FILE:  &str = "model";
const CONFIG_FILE: &str = "model_config.json";

type CheckpointRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

/// Manages saving and loading of model checkpoints in one directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Writes the model weights to `{dir}/model.mpk.gz`.
    pub fn save_model<B: Backend>(&self, model: &Transformer<B>) -> Result<()> {
        // recorder appends the extension
        let path = self.dir.join(MODEL_FILE);

        CheckpointRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        tracing::debug!("Saved weights to '{}'", path.display());
        Ok(())
    }

    /// Loads saved weights into a model of the same architecture.
    pub fn load_model<B: Backend>(
        &self,
        model:  Transformer<B>,
        device: &B::Device,
    ) -> Result<Transformer<B>> {
        let path = self.dir.join(MODEL_FILE);

        let record = CheckpointRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load checkpoint '{}'", path.display()))?;

        Ok(model.load_record(record))
    }

    pub fn save_config(&self, cfg: &TransformerConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved model config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TransformerConfig> {
        let path = self.dir.join(CONFIG_FILE);

        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read config from '{}'", path.display()))?;

        serde_json::from_str(&json)
            .with_context(|| format!("Malformed config in '{}'", path.display()))
    }

    /// Saves both the config and the weights.
    pub fn save<B: Backend>(&self, cfg: &TransformerConfig, model: &Transformer<B>) -> Result<()> {
        self.save_config(cfg)?;
        self.save_model(model)
    }

    /// Rebuilds the model from the saved config and restores its weights.
    pub fn restore<B: Backend>(&self, device: &B::Device) -> Result<(TransformerConfig, Transformer<B>)> {
        let cfg   = self.load_config()?;
        let model = cfg.init::<B>(device)
            .with_context(|| "Saved config no longer builds a model")?;
        let model = self.load_model(model, device)?;

        tracing::info!("Restored model from '{}'", self.dir.display());
        Ok((cfg, model))
    }
}
