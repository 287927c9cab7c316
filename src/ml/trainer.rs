// ============================================================
// Layer 5 — VAE Training Loop
// ============================================================
// Train + validation + single-step probe, once per epoch.
//
// Per epoch:
//   1. set the epoch's learning rate (warmup → cosine table)
//   2. if weight decay is enabled, rebuild AdamW with the
//      epoch's decay, carrying the optimiser state across
//   3. training pass on the autodiff backend
//   4. validation pass on the inner backend (model.valid())
//   5. single-step linear probe on the current encoder
//   6. log, then checkpoint if the probe loss improved
//
// Losses are summed over batches and divided by the dataset
// size, giving per-sample averages.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{ensure, Result};
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::ImageBatcher, dataset::ImageDataset};
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::{EpochMetrics, MetricsWriter};
use crate::infra::progress::epoch_bar;
use crate::ml::loss::{vae_loss, VaeLoss};
use crate::ml::model::{VaeConfig, VaeModel};
use crate::ml::optim::adamw;
use crate::ml::probe::one_step_linear_probing;
use crate::ml::schedule::{scaled_base_lr, warmup_cosine_lrs, weight_decay_schedule, END_LR, WARMUP_EPOCHS};

/// Datasets one training run needs.
pub struct TrainData {
    pub train:       ImageDataset,
    pub val:         ImageDataset,
    /// One labelled sample per class for the single-step probe
    pub probe_train: ImageDataset,
    pub probe_val:   ImageDataset,
}

#[derive(Debug, Clone)]
pub struct TrainSummary {
    pub last:            Option<EpochMetrics>,
    pub best_probe_loss: f64,
    pub saved_epochs:    Vec<usize>,
}

/// Scheduled decay for `epoch`, or None when weight decay is disabled.
fn epoch_weight_decay(configured: f64, schedule: &[f64], epoch: usize) -> Option<f64> {
    if configured == 0.0 {
        return None;
    }
    schedule.get(epoch).copied()
}

pub fn train_vae<B: AutodiffBackend>(
    mut model:  VaeModel<B>,
    model_cfg:  &VaeConfig,
    cfg:        &TrainConfig,
    data:       TrainData,
    writer:     Option<&MetricsWriter>,
    ckpt:       Option<&CheckpointManager>,
    device:     &B::Device,
) -> Result<(VaeModel<B>, TrainSummary)> {
    ensure!(cfg.batch_size > 0, "batch_size must be positive");
    ensure!(cfg.save_every > 0, "save_every must be positive");
    ensure!(!data.train.samples().is_empty(), "training set is empty");
    ensure!(!data.val.samples().is_empty(), "validation set is empty");

    // ── Schedules ─────────────────────────────────────────────────────────────
    let base_lr = scaled_base_lr(cfg.lr, cfg.batch_size);
    let lrs     = warmup_cosine_lrs(base_lr, END_LR, WARMUP_EPOCHS, cfg.epochs)?;
    let wds     = weight_decay_schedule(cfg.epochs);

    let mut optim = adamw::<B, VaeModel<B>>(cfg.weight_decay);

    // ── Run description ───────────────────────────────────────────────────────
    if let Some(w) = writer {
        w.add_text("Encoder/options", &serde_json::to_string(cfg)?)?;
        w.add_text(
            "Encoder/model",
            &format!("{} ({} parameters)", model_cfg, model.num_params()),
        )?;
        w.add_text(
            "Encoder/optimiser",
            &format!("AdamW(base_lr={base_lr:e}, end_lr={END_LR:e}, weight_decay={})", cfg.weight_decay),
        )?;
    }

    // ── Data loaders ──────────────────────────────────────────────────────────
    let train_loader = DataLoaderBuilder::new(ImageBatcher::<B>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(data.train.clone());

    // Validation runs on the inner backend — no autodiff overhead
    let val_loader = DataLoaderBuilder::new(ImageBatcher::<B::InnerBackend>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(data.val.clone());

    let train_batches = data.train.samples().len().div_ceil(cfg.batch_size);
    let train_count   = data.train.samples().len() as f64;
    let val_count     = data.val.samples().len() as f64;

    let mut summary = TrainSummary {
        last:            None,
        best_probe_loss: f64::INFINITY,
        saved_epochs:    Vec::new(),
    };
    let mut postfix = String::new();

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 0..cfg.epochs {
        let lr = lrs[epoch];
        if let Some(wd) = epoch_weight_decay(cfg.weight_decay, &wds, epoch) {
            optim = adamw::<B, VaeModel<B>>(wd).load_record(optim.to_record());
        }

        // ── Training phase ────────────────────────────────────────────────────
        let pb = epoch_bar(train_batches, epoch, cfg.epochs, &postfix);
        let mut train_loss_sum = 0.0f64;
        let mut train_mse_sum  = 0.0f64;

        for batch in train_loader.iter() {
            let out = model.reconstruct(batch.images.clone());
            let VaeLoss { loss, mse } = vae_loss(out.logits, batch.images, out.mu, out.log_var, cfg.beta);

            train_loss_sum += loss.clone().into_scalar().elem::<f64>();
            train_mse_sum  += mse.into_scalar().elem::<f64>();

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(lr, model, grads);
            pb.inc(1);
        }
        pb.finish_and_clear();

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid = model.valid();
        let mut val_loss_sum = 0.0f64;
        let mut val_mse_sum  = 0.0f64;

        for batch in val_loader.iter() {
            let out = model_valid.reconstruct(batch.images.clone());
            let VaeLoss { loss, mse } = vae_loss(out.logits, batch.images, out.mu, out.log_var, cfg.beta);
            val_loss_sum += loss.into_scalar().elem::<f64>();
            val_mse_sum  += mse.into_scalar().elem::<f64>();
        }

        // ── Single-step linear probe ──────────────────────────────────────────
        let (probe_acc, probe_loss) = one_step_linear_probing::<B, _>(
            &model, &data.probe_train, &data.probe_val, cfg.batch_size, device,
        );

        let metrics = EpochMetrics {
            epoch,
            train_loss: train_loss_sum / train_count,
            train_mse:  train_mse_sum / train_count,
            val_loss:   val_loss_sum / val_count,
            val_mse:    val_mse_sum / val_count,
            probe_acc,
            probe_loss,
        };
        postfix = metrics.postfix();
        tracing::info!("Epoch [{}/{}] lr={:.2e} | {}", epoch, cfg.epochs, lr, postfix);

        if let Some(w) = writer {
            w.add_scalar("Encoder/train_loss",     metrics.train_loss, Some(epoch))?;
            w.add_scalar("Encoder/val_loss",       metrics.val_loss,   Some(epoch))?;
            w.add_scalar("Encoder/1step_val_acc",  metrics.probe_acc,  Some(epoch))?;
            w.add_scalar("Encoder/1step_val_loss", metrics.probe_loss, Some(epoch))?;
            w.log_epoch(&metrics)?;
        }

        // ── Checkpoint on improvement ─────────────────────────────────────────
        if let Some(ckpt) = ckpt {
            if metrics.is_improvement(summary.best_probe_loss) && epoch % cfg.save_every == 0 {
                summary.best_probe_loss = metrics.probe_loss;
                ckpt.save_model(&model)?;
                summary.saved_epochs.push(epoch);
                tracing::info!("Checkpoint saved for epoch {} (1step_val_loss={:.4})", epoch, metrics.probe_loss);
            }
        }

        summary.last = Some(metrics);
    }

    tracing::info!("Training complete!");
    Ok((model, summary))
}
