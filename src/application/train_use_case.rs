// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a VAE training run in order:
//
//   Step 1: Load the train files          (Layer 4 - data)
//   Step 2: Split train/validation        (Layer 4 - data)
//   Step 3: Build the 1-per-class probe   (Layer 4 - data)
//   Step 4: Save config                   (Layer 6 - infra)
//   Step 5: Run the training loop         (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::Result;
use burn::backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, Autodiff, NdArray, Wgpu};
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::ImageDataset,
    idx::IdxSource,
    splitter::{split_train_val, take_per_class},
};
use crate::domain::{
    dataset_kind::{DatasetKind, SplitFiles},
    device::ComputeDevice,
    traits::SampleSource,
};
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsWriter};
use crate::ml::model::VaeConfig;
use crate::ml::trainer::{train_vae, TrainData, TrainSummary};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run. Saved next to the
// checkpoint so probing can rebuild the same architecture and
// reproduce the same train/validation split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub root:         String,
    pub dataset:      DatasetKind,
    pub save_dir:     String,
    pub run_dir:      String,
    pub epochs:       usize,
    pub batch_size:   usize,
    pub lr:           f64,
    /// 0 disables weight decay; otherwise the cosine decay schedule applies
    pub weight_decay: f64,
    pub beta:         f64,
    pub hidden_dim:   usize,
    pub latent_dim:   usize,
    pub save_every:   usize,
    pub val_fraction: f64,
    pub seed:         u64,
    pub device:       ComputeDevice,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            root:         "data/mnist".to_string(),
            dataset:      DatasetKind::Mnist,
            save_dir:     "checkpoints".to_string(),
            run_dir:      "runs/vae".to_string(),
            epochs:       50,
            batch_size:   256,
            lr:           3e-4,
            weight_decay: 0.04,
            beta:         1.0,
            hidden_dim:   512,
            latent_dim:   32,
            save_every:   1,
            val_fraction: 1.0 / 6.0,
            seed:         42,
            device:       ComputeDevice::Wgpu,
        }
    }
}

impl TrainConfig {
    pub fn model_config(&self) -> VaeConfig {
        VaeConfig::new(self.dataset.input_dim())
            .with_hidden_dim(self.hidden_dim)
            .with_latent_dim(self.latent_dim)
    }
}

/// The (train, val) split of the train files, reproducible from the config.
pub fn load_train_val(cfg: &TrainConfig) -> Result<(ImageDataset, ImageDataset)> {
    let pool = IdxSource::new(&cfg.root, cfg.dataset, SplitFiles::Train).load_all()?;
    let (train, val) = split_train_val(pool, 1.0 - cfg.val_fraction, cfg.seed);
    tracing::info!("Split: {} train, {} validation", train.len(), val.len());
    Ok((ImageDataset::new(train), ImageDataset::new(val)))
}

pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<TrainSummary> {
        match self.config.device {
            ComputeDevice::Cpu  => self.run::<Autodiff<NdArray>>(NdArrayDevice::default()),
            ComputeDevice::Wgpu => self.run::<Autodiff<Wgpu>>(WgpuDevice::default()),
        }
    }

    fn run<B: AutodiffBackend>(&self, device: B::Device) -> Result<TrainSummary> {
        let cfg = &self.config;
        tracing::info!("Using {} device: {:?}", cfg.device, device);

        // ── Steps 1-2: Load and split ─────────────────────────────────────────
        let (train, val) = load_train_val(cfg)?;

        // ── Step 3: Single-step probe set ─────────────────────────────────────
        // One labelled example per class, scored on the validation split
        let probe_train = ImageDataset::new(take_per_class(train.samples(), 1, cfg.seed));

        // ── Step 4: Save config for probing ───────────────────────────────────
        let ckpt = CheckpointManager::new(&cfg.save_dir);
        ckpt.save_config(cfg)?;
        let writer = MetricsWriter::new(&cfg.run_dir)?;

        // ── Step 5: Train ─────────────────────────────────────────────────────
        let model_cfg = cfg.model_config();
        let model     = model_cfg.init::<B>(&device);
        tracing::info!(
            "Model ready: input_dim={}, hidden_dim={}, latent_dim={}",
            model_cfg.input_dim, model_cfg.hidden_dim, model_cfg.latent_dim,
        );

        let data = TrainData {
            train,
            probe_val: val.clone(),
            val,
            probe_train,
        };
        let (_, summary) = train_vae(model, &model_cfg, cfg, data, Some(&writer), Some(&ckpt), &device)?;
        Ok(summary)
    }
}
