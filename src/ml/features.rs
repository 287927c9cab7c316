// ============================================================
// Layer 5 — Representation Metrics
// ============================================================
// Summary statistics of an encoder's embeddings over a dataset,
// used to spot collapsed or redundant representations:
//
//   std      — mean per-feature standard deviation
//              (→ 0 when every input maps to the same point)
//   corr     — mean |Pearson correlation| between distinct
//              features (→ 1 when features are redundant)
//   entropy  — mean Shannon entropy (nats) of softmax(z)
//
// Embeddings are computed on an inference backend in batches
// of 100, then concatenated into one [N, F] matrix.

use anyhow::{ensure, Result};
use burn::{
    data::dataloader::DataLoaderBuilder,
    prelude::*,
    tensor::activation::{log_softmax, softmax},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::data::{batcher::ImageBatcher, dataset::ImageDataset};
use crate::ml::encoder::Encoder;

const EMBED_BATCH: usize = 100;
const EPS: f64 = 1e-8;

/// Which metrics `rep_metrics` should compute.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TrackedMetrics {
    pub corr:    bool,
    pub std:     bool,
    pub entropy: bool,
}

/// Embed every sample of `dataset` → [N, num_features]
pub fn collect_embeddings<B, E>(encoder: &E, dataset: &ImageDataset, device: &B::Device) -> Result<Tensor<B, 2>>
where
    B: Backend,
    E: Encoder<B>,
{
    ensure!(!dataset.samples().is_empty(), "cannot embed an empty dataset");

    let loader = DataLoaderBuilder::new(ImageBatcher::<B>::new(device.clone()))
        .batch_size(EMBED_BATCH)
        .num_workers(1)
        .build(dataset.clone());

    let chunks: Vec<Tensor<B, 2>> = loader
        .iter()
        .map(|batch| encoder.embed(batch.images))
        .collect();

    Ok(Tensor::cat(chunks, 0))
}

fn centered<B: Backend>(z: Tensor<B, 2>) -> Tensor<B, 2> {
    let mean = z.clone().mean_dim(0);
    z - mean
}

/// Unbiased per-feature standard deviation → [1, F]
fn per_feature_std<B: Backend>(z: Tensor<B, 2>) -> Tensor<B, 2> {
    let n = z.dims()[0].max(2);
    centered(z)
        .powf_scalar(2.0)
        .sum_dim(0)
        .div_scalar((n - 1) as f64)
        .sqrt()
}

pub fn feature_std<B: Backend>(z: Tensor<B, 2>) -> f64 {
    per_feature_std(z).mean().into_scalar().elem::<f64>()
}

pub fn feature_correlation<B: Backend>(z: Tensor<B, 2>) -> f64 {
    let [n, f] = z.dims();
    if f < 2 {
        return 0.0;
    }

    let std = per_feature_std(z.clone()).add_scalar(EPS);
    let standardised = centered(z) / std;

    // [F, N] x [N, F] → [F, F]
    let corr = standardised
        .clone()
        .transpose()
        .matmul(standardised.clone())
        .div_scalar((n.max(2) - 1) as f64);

    // diagonal entries, recomputed directly rather than masked out
    let diag = standardised
        .powf_scalar(2.0)
        .sum_dim(0)
        .div_scalar((n.max(2) - 1) as f64);

    let total: f64 = corr.abs().sum().into_scalar().elem::<f64>();
    let on_diag: f64 = diag.abs().sum().into_scalar().elem::<f64>();

    (total - on_diag) / (f * (f - 1)) as f64
}

pub fn feature_entropy<B: Backend>(z: Tensor<B, 2>) -> f64 {
    let p     = softmax(z.clone(), 1);
    let log_p = log_softmax(z, 1);
    (p * log_p)
        .sum_dim(1)
        .neg()
        .mean()
        .into_scalar()
        .elem::<f64>()
}

/// Compute the tracked metrics over `dataset`, keyed "corr" / "std" / "entropy".
pub fn rep_metrics<B, E>(
    encoder: &E,
    dataset: &ImageDataset,
    tracked: TrackedMetrics,
    device:  &B::Device,
) -> Result<BTreeMap<String, f64>>
where
    B: Backend,
    E: Encoder<B>,
{
    let embeddings = collect_embeddings(encoder, dataset, device)?;

    let mut metrics = BTreeMap::new();
    if tracked.corr {
        metrics.insert("corr".to_string(), feature_correlation(embeddings.clone()));
    }
    if tracked.std {
        metrics.insert("std".to_string(), feature_std(embeddings.clone()));
    }
    if tracked.entropy {
        metrics.insert("entropy".to_string(), feature_entropy(embeddings));
    }

    tracing::debug!("Representation metrics over {} samples: {:?}", dataset.samples().len(), metrics);
    Ok(metrics)
}
