// ============================================================
// Layer 2 — Probe Use Case
// ============================================================
// Evaluates a trained encoder:
//
//   Step 1: Rebuild the model from train_config.json + weights
//   Step 2: Recreate the training run's train/val split
//   Step 3: For each n_per_class, run a full linear probe
//   Step 4: Compute representation metrics on the test split
//
// The same seed and validation fraction as training are used,
// so the probe never scores on samples the encoder trained on.

use anyhow::{ensure, Result};
use burn::backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, Autodiff, NdArray, Wgpu};
use burn::module::AutodiffModule;
use burn::tensor::backend::{AutodiffBackend, Backend};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::application::train_use_case::{load_train_val, TrainConfig};
use crate::data::{dataset::ImageDataset, idx::IdxSource, splitter::take_per_class};
use crate::domain::{
    dataset_kind::{DatasetKind, SplitFiles},
    device::ComputeDevice,
    traits::SampleSource,
};
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsWriter};
use crate::ml::encoder::Encoder;
use crate::ml::features::{rep_metrics, TrackedMetrics};
use crate::ml::model::VaeModel;
use crate::ml::probe::{linear_probing, ProbeData, ProbeReport, ProbeSettings};

/// ModelNet10 validation sets are capped at this many samples per class.
const VOXEL_VAL_PER_CLASS: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Overrides the dataset root saved with the checkpoint
    pub root:        Option<String>,
    pub save_dir:    String,
    pub run_dir:     String,
    /// Empty → skip linear probing, only compute representation metrics
    pub n_per_class: Vec<usize>,
    pub finetune:    bool,
    pub bn_output:   bool,
    pub tracked:     TrackedMetrics,
    pub device:      ComputeDevice,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub probes:  Vec<ProbeReport>,
    pub metrics: BTreeMap<String, f64>,
}

pub struct ProbeUseCase {
    config: ProbeConfig,
}

impl ProbeUseCase {
    pub fn new(config: ProbeConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<ProbeOutcome> {
        match self.config.device {
            ComputeDevice::Cpu  => self.run::<Autodiff<NdArray>>(NdArrayDevice::default()),
            ComputeDevice::Wgpu => self.run::<Autodiff<Wgpu>>(WgpuDevice::default()),
        }
    }

    fn run<B: AutodiffBackend>(&self, device: B::Device) -> Result<ProbeOutcome> {
        let cfg  = &self.config;
        let ckpt = CheckpointManager::new(&cfg.save_dir);

        // ── Step 1: Rebuild the trained encoder ───────────────────────────────
        let mut train_cfg: TrainConfig = ckpt.load_config()?;
        ensure!(
            ckpt.has_model(),
            "No model weights in '{}'. No epoch improved on the single-step probe, or training never ran.",
            cfg.save_dir,
        );
        if let Some(root) = &cfg.root {
            train_cfg.root = root.clone();
        }
        let model: VaeModel<B> = ckpt.load_model(train_cfg.model_config().init(&device), &device)?;

        let writer = MetricsWriter::new(&cfg.run_dir)?;
        let test   = ImageDataset::new(
            IdxSource::new(&train_cfg.root, train_cfg.dataset, SplitFiles::Test).load_all()?,
        );

        let mut outcome = ProbeOutcome::default();

        // ── Steps 2-3: Linear probes ──────────────────────────────────────────
        if !cfg.n_per_class.is_empty() {
            let (train, val) = load_train_val(&train_cfg)?;
            let val = match train_cfg.dataset {
                DatasetKind::Mnist      => val,
                DatasetKind::ModelNet10 => ImageDataset::new(
                    take_per_class(val.samples(), VOXEL_VAL_PER_CLASS, train_cfg.seed),
                ),
            };

            for &n in &cfg.n_per_class {
                ensure!(n > 0, "n_per_class values must be at least 1");
                let data = ProbeData {
                    train: ImageDataset::new(take_per_class(train.samples(), n, train_cfg.seed)),
                    val:   val.clone(),
                    test:  test.clone(),
                };
                let settings = ProbeSettings {
                    n_per_class: n,
                    epochs:      train_cfg.dataset.probe_epochs(),
                    step_size:   train_cfg.dataset.probe_step_size(),
                    bn_output:   cfg.bn_output,
                    finetune:    cfg.finetune,
                };

                tracing::info!(
                    "Linear probe: {} per class ({} samples), finetune={}",
                    n, data.train.samples().len(), cfg.finetune,
                );
                outcome.probes.push(linear_probing::<B, _>(&model, &data, &settings, Some(&writer), &device)?);
            }
        }

        // ── Step 4: Representation metrics ────────────────────────────────────
        outcome.metrics = eval_representations(&model.valid(), &test, cfg.tracked, &device)?;
        for (name, value) in &outcome.metrics {
            writer.add_scalar(&format!("rep/{name}"), *value, None)?;
            tracing::info!("{name}: {value:.4}");
        }

        Ok(outcome)
    }
}

/// Representation metrics of an encoder on the test split.
pub fn eval_representations<B, E>(
    encoder: &E,
    test:    &ImageDataset,
    tracked: TrackedMetrics,
    device:  &B::Device,
) -> Result<BTreeMap<String, f64>>
where
    B: Backend,
    E: Encoder<B>,
{
    rep_metrics(encoder, test, tracked, device)
}
