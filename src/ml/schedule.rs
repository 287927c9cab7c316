// ============================================================
// Layer 5 — Learning-Rate & Weight-Decay Schedules
// ============================================================
// All schedules here are per-epoch tables computed up front.
//
//   VAE learning rate:  linear warmup to base_lr over 10 epochs,
//                       then cosine from base_lr towards 1e-6
//   VAE weight decay:   cosine from 0.04 up to 0.4
//   Linear probe:       StepLR (×gamma every step_size epochs)
//
// base_lr follows the linear scaling rule: lr × batch / 256.

use anyhow::{ensure, Result};
use std::f64::consts::PI;

pub const WARMUP_EPOCHS: usize = 10;
pub const END_LR:        f64   = 1e-6;
pub const START_WD:      f64   = 0.04;
pub const END_WD:        f64   = 0.4;

/// Cosine interpolation from `start` towards `end` over `steps` values.
///
/// value(t) = end − (end − start)·(cos(π·t/steps) + 1)/2 for t in 0..steps,
/// so the first value is exactly `start` and `end` is never reached.
pub fn cosine_schedule(start: f64, end: f64, steps: usize) -> Vec<f64> {
    (0..steps)
        .map(|t| {
            let cos = (PI * t as f64 / steps as f64).cos();
            end - (end - start) * (cos + 1.0) / 2.0
        })
        .collect()
}

/// lr × batch_size / 256
pub fn scaled_base_lr(lr: f64, batch_size: usize) -> f64 {
    lr * batch_size as f64 / 256.0
}

/// Per-epoch learning rates: `warmup` linear steps then cosine decay.
///
/// The warmup values are linspace(0, base_lr, warmup + 1) without the
/// leading zero, so the first epoch already trains at base_lr / warmup.
pub fn warmup_cosine_lrs(base_lr: f64, end_lr: f64, warmup: usize, epochs: usize) -> Result<Vec<f64>> {
    ensure!(
        epochs >= warmup,
        "need at least {warmup} epochs to fit the learning-rate warmup, got {epochs}"
    );

    let mut lrs: Vec<f64> = (1..=warmup)
        .map(|k| base_lr * k as f64 / warmup as f64)
        .collect();
    lrs.extend(cosine_schedule(base_lr, end_lr, epochs - warmup));

    debug_assert_eq!(lrs.len(), epochs);
    Ok(lrs)
}

/// Per-epoch weight decay, increasing along a cosine from START_WD to END_WD.
pub fn weight_decay_schedule(epochs: usize) -> Vec<f64> {
    cosine_schedule(START_WD, END_WD, epochs)
}

/// StepLR: base × gamma^(epoch / step_size)
pub fn step_lr(base: f64, epoch: usize, step_size: usize, gamma: f64) -> f64 {
    base * gamma.powi((epoch / step_size.max(1)) as i32)
}
