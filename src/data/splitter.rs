// ============================================================
// Layer 4 — Train/Validation Splitter & Per-Class Subsets
// ============================================================
// Two ways of carving a labelled pool:
//
//   split_train_val  — shuffle, then cut into (train, val)
//   take_per_class   — shuffle, then keep at most n samples of
//                      each label (the "n examples per class"
//                      sets that linear probes train on)
//
// Both shuffles are seeded so a run can be reproduced, and so
// that the probe sets stay identical across training epochs.
//
// Reference: rand crate documentation (SliceRandom, SeedableRng)

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use std::collections::HashMap;

use crate::domain::sample::ImageSample;

/// Shuffle `samples` with `seed` and split into (train, validation).
///
/// `train_fraction` is the proportion kept for training, e.g. 0.8.
pub fn split_train_val<T>(mut samples: Vec<T>, train_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total    = samples.len();
    let split_at = ((total as f64) * train_fraction).round() as usize;
    let split_at = split_at.min(total);

    // After this: samples = [0..split_at], val = [split_at..total]
    let val = samples.split_off(split_at);

    tracing::debug!(
        "Dataset split: {} training, {} validation ({}% / {}%)",
        samples.len(),
        val.len(),
        (samples.len() * 100) / total.max(1),
        (val.len()     * 100) / total.max(1),
    );

    (samples, val)
}

/// Keep at most `n` samples per label, chosen after a seeded shuffle.
///
/// Output is grouped by label in ascending order so the same seed
/// always yields the same subset in the same order.
pub fn take_per_class(samples: &[ImageSample], n: usize, seed: u64) -> Vec<ImageSample> {
    let mut indices: Vec<usize> = (0..samples.len()).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let mut by_label: HashMap<usize, Vec<usize>> = HashMap::new();
    for i in indices {
        let bucket = by_label.entry(samples[i].label).or_default();
        if bucket.len() < n {
            bucket.push(i);
        }
    }

    let mut labels: Vec<usize> = by_label.keys().copied().collect();
    labels.sort_unstable();

    labels
        .into_iter()
        .flat_map(|label| by_label.remove(&label).unwrap_or_default())
        .map(|i| samples[i].clone())
        .collect()
}
