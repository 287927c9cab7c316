// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores VAE weights using Burn's CompactRecorder.
//
// What gets saved:
//   1. Model weights (model.mpk) — overwritten each time the
//      single-step probe loss improves, so the file always holds
//      the best encoder seen so far
//   2. train_config.json — the TrainConfig of the run
//
// The config is needed to rebuild the exact architecture
// (input_dim, hidden_dim, latent_dim) before loading weights
// back into it.
//
// File layout:
//   checkpoints/
//     model.mpk
//     train_config.json
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::VaeModel;

const MODEL_FILE:  &str = "model";
/// Extension CompactRecorder gives its files
const MODEL_EXT:   &str = "mpk";
const CONFIG_FILE: &str = "train_config.json";

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", self.dir.display()))
    }

    /// Save model weights to {dir}/model.mpk, replacing any previous file.
    pub fn save_model<B: Backend>(&self, model: &VaeModel<B>) -> Result<()> {
        self.ensure_dir()?;
        // Without extension, the recorder appends .mpk
        let path = self.dir.join(MODEL_FILE);

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| {
                format!("Failed to save checkpoint to '{}'", path.display())
            })?;

        tracing::debug!("Saved checkpoint to '{}'", path.display());
        Ok(())
    }

    /// Load weights into `model`. Its architecture must match the saved one.
    pub fn load_model<B: Backend>(
        &self,
        model:  VaeModel<B>,
        device: &B::Device,
    ) -> Result<VaeModel<B>> {
        let path = self.dir.join(MODEL_FILE);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you trained the model first?",
                    path.display())
            })?;

        tracing::info!("Loaded checkpoint from '{}'", path.display());
        Ok(model.load_record(record))
    }

    pub fn has_model(&self) -> bool {
        self.dir.join(MODEL_FILE).with_extension(MODEL_EXT).exists()
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        self.ensure_dir()?;
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| {
                format!("Cannot write config to '{}'", path.display())
            })?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(CONFIG_FILE);

        let json = fs::read_to_string(&path)
            .with_context(|| {
                format!(
                    "Cannot read config from '{}'. \
                     Make sure you have run 'train' before probing.",
                    path.display()
                )
            })?;

        serde_json::from_str(&json)
            .with_context(|| format!("Malformed training config '{}'", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    use crate::ml::encoder::Encoder;
    use crate::ml::model::VaeConfig;

    type TB = NdArray;

    #[test]
    fn test_config_round_trip() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path().join("nested").join("ckpt"));

        let cfg = TrainConfig { epochs: 12, beta: 4.0, latent_dim: 7, ..TrainConfig::default() };
        ckpt.save_config(&cfg).unwrap();

        let loaded = ckpt.load_config().unwrap();
        assert_eq!(loaded.epochs, 12);
        assert_eq!(loaded.beta, 4.0);
        assert_eq!(loaded.latent_dim, 7);
    }

    #[test]
    fn test_missing_config_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CheckpointManager::new(dir.path()).load_config().is_err());
    }

    #[test]
    fn test_model_round_trip() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path());
        let device = Default::default();
        let config = VaeConfig::new(6).with_hidden_dim(5).with_latent_dim(2);

        let saved: VaeModel<TB> = config.init(&device);
        assert!(!ckpt.has_model());
        ckpt.save_model(&saved).unwrap();
        assert!(ckpt.has_model());
        assert!(dir.path().join("model.mpk").exists());

        let fresh: VaeModel<TB> = config.init(&device);
        let loaded = ckpt.load_model(fresh, &device).unwrap();

        let x = Tensor::<TB, 2>::ones([1, 6], &device);
        let a: Vec<f32> = saved.embed(x.clone()).into_data().convert::<f32>().to_vec().unwrap();
        let b: Vec<f32> = loaded.embed(x).into_data().convert::<f32>().to_vec().unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-2, "{x} vs {y}");
        }
    }
}
