// ============================================================
// Layer 5 — Linear Probing
// ============================================================
// Measures representation quality by training a linear
// classifier on top of an encoder's features.
//
//   one_step_linear_probing — a fresh head trained for one pass
//       over a tiny labelled set (1 sample per class), then
//       scored on the validation set. Cheap enough to run after
//       every training epoch.
//
//   linear_probing — the full evaluation: n samples per class,
//       100/200 epochs with StepLR, optional batch-norm on the
//       features, optional fine-tuning of a copy of the encoder,
//       and a final test accuracy.
//
// Frozen encoders run on the inner (non-autodiff) backend and
// their features are lifted back with Tensor::from_inner, so no
// gradient ever reaches the encoder's parameters.
//
// Reference: Burn Book §5 (Custom Training Loop)

use anyhow::{ensure, Result};
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    nn::{
        loss::CrossEntropyLossConfig,
        BatchNorm, BatchNormConfig,
        Linear, LinearConfig,
    },
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::data::{batcher::ImageBatcher, dataset::ImageDataset};
use crate::domain::dataset_kind::NUM_CLASSES;
use crate::infra::metrics::MetricsWriter;
use crate::ml::encoder::Encoder;
use crate::ml::optim::adamw;
use crate::ml::schedule::step_lr;

const PROBE_LR:        f64 = 0.1;
const PROBE_WD:        f64 = 0.005;
const STEP_GAMMA:      f64 = 0.1;
const VAL_BATCH:       usize = 1000;
const TEST_BATCH:      usize = 100;

// ─── ProbeHead ────────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct ProbeHeadConfig {
    pub num_features: usize,
    #[config(default = 10)]
    pub num_classes:  usize,
    #[config(default = false)]
    pub bn_output:    bool,
}

impl ProbeHeadConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ProbeHead<B> {
        ProbeHead {
            // Plain standardisation: gamma stays 1 and beta 0, never trained or decayed
            norm:   self.bn_output.then(|| BatchNormConfig::new(self.num_features).init(device).no_grad()),
            linear: LinearConfig::new(self.num_features, self.num_classes)
                .with_bias(false)
                .init(device),
        }
    }
}

/// Optional batch-norm over features, then a bias-free linear classifier.
#[derive(Module, Debug)]
pub struct ProbeHead<B: Backend> {
    pub norm:   Option<BatchNorm<B, 1>>,
    pub linear: Linear<B>,
}

impl<B: Backend> ProbeHead<B> {
    /// features: [batch, num_features] → logits: [batch, num_classes]
    pub fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        let features = match &self.norm {
            Some(norm) => {
                let [n, f] = features.dims();
                // BatchNorm expects [batch, channels, length]
                norm.forward(features.reshape([n, f, 1])).reshape([n, f])
            }
            None => features,
        };
        self.linear.forward(features)
    }
}

// ─── Shared helpers ───────────────────────────────────────────────────────────

/// Fraction of rows whose argmax matches the label
fn batch_accuracy<B: Backend>(logits: Tensor<B, 2>, labels: Tensor<B, 1, Int>) -> f64 {
    let n = labels.dims()[0].max(1);
    // argmax(1) returns shape [batch, 1] — flatten to [batch]
    let correct: i64 = logits
        .argmax(1)
        .flatten::<1>(0, 1)
        .equal(labels)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>();
    correct as f64 / n as f64
}

/// Mean (loss, accuracy) of a head over a dataset, evaluated without autodiff.
fn evaluate<B, E>(
    encoder:    &E,
    head:       &ProbeHead<B>,
    dataset:    &ImageDataset,
    batch_size: usize,
    device:     &B::Device,
) -> (f64, f64)
where
    B: Backend,
    E: Encoder<B>,
{
    let loader = DataLoaderBuilder::new(ImageBatcher::<B>::new(device.clone()))
        .batch_size(batch_size)
        .num_workers(1)
        .build(dataset.clone());
    let ce = CrossEntropyLossConfig::new().init(device);

    let mut loss_sum = 0.0f64;
    let mut acc_sum  = 0.0f64;
    let mut batches  = 0usize;

    for batch in loader.iter() {
        let logits = head.forward(encoder.embed(batch.images));
        loss_sum += ce.forward(logits.clone(), batch.labels.clone()).into_scalar().elem::<f64>();
        acc_sum  += batch_accuracy(logits, batch.labels);
        batches  += 1;
    }

    if batches == 0 {
        return (f64::NAN, 0.0);
    }
    (loss_sum / batches as f64, acc_sum / batches as f64)
}

// ─── Single-step probe ────────────────────────────────────────────────────────

/// Train a fresh head for one pass over `train` with the encoder frozen,
/// then return (mean val accuracy, mean val loss).
pub fn one_step_linear_probing<B, E>(
    encoder:    &E,
    train:      &ImageDataset,
    val:        &ImageDataset,
    batch_size: usize,
    device:     &B::Device,
) -> (f64, f64)
where
    B: AutodiffBackend,
    E: AutodiffModule<B> + Encoder<B>,
    E::InnerModule: Encoder<B::InnerBackend>,
{
    let frozen = encoder.valid();

    let mut head: ProbeHead<B> = ProbeHeadConfig::new(encoder.num_features()).init(device);
    let mut optim = adamw::<B, ProbeHead<B>>(0.0);
    let ce = CrossEntropyLossConfig::new().init(device);

    let train_loader = DataLoaderBuilder::new(ImageBatcher::<B>::new(device.clone()))
        .batch_size(batch_size.max(1))
        .num_workers(1)
        .build(train.clone());

    for batch in train_loader.iter() {
        let features = Tensor::from_inner(frozen.embed(batch.images.inner()));
        let loss     = ce.forward(head.forward(features), batch.labels);

        let grads = GradientsParams::from_grads(loss.backward(), &head);
        head = optim.step(PROBE_LR, head, grads);
    }

    let (loss, acc) = evaluate(&frozen, &head.valid(), val, batch_size.max(1), device);
    (acc, loss)
}

// ─── Full linear probe ────────────────────────────────────────────────────────

/// Labelled sets for one probe run.
pub struct ProbeData {
    pub train: ImageDataset,
    pub val:   ImageDataset,
    pub test:  ImageDataset,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeSettings {
    pub n_per_class: usize,
    pub epochs:      usize,
    pub step_size:   usize,
    pub bn_output:   bool,
    pub finetune:    bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeReport {
    pub n_per_class:  usize,
    pub train_loss:   f64,
    pub train_acc:    f64,
    pub val_loss:     f64,
    pub val_acc:      f64,
    pub best_val_acc: f64,
    pub test_acc:     f64,
}

pub fn linear_probing<B, E>(
    encoder:  &E,
    data:     &ProbeData,
    settings: &ProbeSettings,
    writer:   Option<&MetricsWriter>,
    device:   &B::Device,
) -> Result<ProbeReport>
where
    B: AutodiffBackend,
    E: AutodiffModule<B> + Encoder<B>,
    E::InnerModule: Encoder<B::InnerBackend>,
{
    train_head(encoder, data, settings, writer, device).map(|(report, _)| report)
}

/// Train and score a probe head, returning the trained head alongside the report.
fn train_head<B, E>(
    encoder:  &E,
    data:     &ProbeData,
    settings: &ProbeSettings,
    writer:   Option<&MetricsWriter>,
    device:   &B::Device,
) -> Result<(ProbeReport, ProbeHead<B>)>
where
    B: AutodiffBackend,
    E: AutodiffModule<B> + Encoder<B>,
    E::InnerModule: Encoder<B::InnerBackend>,
{
    ensure!(settings.n_per_class > 0, "n_per_class must be at least 1");
    ensure!(!data.train.samples().is_empty(), "probe training set is empty");
    ensure!(!data.val.samples().is_empty(), "probe validation set is empty");
    ensure!(!data.test.samples().is_empty(), "probe test set is empty");

    let batch_size = settings.n_per_class.max(10);

    let mut head: ProbeHead<B> = ProbeHeadConfig::new(encoder.num_features())
        .with_num_classes(NUM_CLASSES)
        .with_bn_output(settings.bn_output)
        .init(device);
    let mut head_optim = adamw::<B, ProbeHead<B>>(PROBE_WD);

    // Fine-tuning trains a copy; the caller's encoder is never modified.
    let frozen = encoder.valid();
    let mut tuned: Option<E> = settings.finetune.then(|| encoder.clone());
    let mut encoder_optim = adamw::<B, E>(PROBE_WD);

    let ce = CrossEntropyLossConfig::new().init(device);
    let train_loader = DataLoaderBuilder::new(ImageBatcher::<B>::new(device.clone()))
        .batch_size(batch_size)
        .shuffle(0)
        .num_workers(1)
        .build(data.train.clone());

    let prefix = if settings.finetune { "finetuning_" } else { "" };
    let mut report = ProbeReport {
        n_per_class:  settings.n_per_class,
        train_loss:   -1.0,
        train_acc:    -1.0,
        val_loss:     -1.0,
        val_acc:      -1.0,
        best_val_acc: -1.0,
        test_acc:     -1.0,
    };

    for epoch in 0..settings.epochs {
        let lr = step_lr(PROBE_LR, epoch, settings.step_size, STEP_GAMMA);

        // ── Training phase ────────────────────────────────────────────────────
        let mut loss_sum = 0.0f64;
        let mut acc_sum  = 0.0f64;
        let mut batches  = 0usize;

        for batch in train_loader.iter() {
            let features = match &tuned {
                Some(enc) => enc.embed(batch.images),
                None      => Tensor::from_inner(frozen.embed(batch.images.inner())),
            };
            let logits = head.forward(features);
            let loss   = ce.forward(logits.clone(), batch.labels.clone());

            loss_sum += loss.clone().into_scalar().elem::<f64>();
            acc_sum  += batch_accuracy(logits, batch.labels);
            batches  += 1;

            let mut grads = loss.backward();
            let head_grads = GradientsParams::from_module(&mut grads, &head);
            head = head_optim.step(lr, head, head_grads);

            if let Some(enc) = tuned.take() {
                let enc_grads = GradientsParams::from_module(&mut grads, &enc);
                tuned = Some(encoder_optim.step(lr, enc, enc_grads));
            }
        }

        report.train_loss = loss_sum / batches.max(1) as f64;
        report.train_acc  = acc_sum / batches.max(1) as f64;

        // ── Validation phase ──────────────────────────────────────────────────
        let eval_encoder = tuned.as_ref().map(|e| e.valid()).unwrap_or_else(|| frozen.clone());
        let (val_loss, val_acc) = evaluate(&eval_encoder, &head.valid(), &data.val, VAL_BATCH, device);
        report.val_loss = val_loss;
        report.val_acc  = val_acc;
        if val_acc > report.best_val_acc {
            report.best_val_acc = val_acc;
        }

        if let Some(w) = writer {
            w.add_scalar(&format!("train/{prefix}loss"),     report.train_loss, Some(epoch))?;
            w.add_scalar(&format!("train/{prefix}accuracy"), report.train_acc,  Some(epoch))?;
            w.add_scalar(&format!("val/{prefix}loss"),       report.val_loss,   Some(epoch))?;
            w.add_scalar(&format!("val/{prefix}accuracy"),   report.val_acc,    Some(epoch))?;
        }

        tracing::debug!(
            "Probe epoch {}/{} | lr={:.1e} | train_loss={:.4} | train_acc={:.3} | val_loss={:.4} | val_acc={:.3}",
            epoch, settings.epochs, lr, report.train_loss, report.train_acc, report.val_loss, report.val_acc,
        );
    }

    // ── Test phase ────────────────────────────────────────────────────────────
    let eval_encoder = tuned.as_ref().map(|e| e.valid()).unwrap_or(frozen);
    let (_, test_acc) = evaluate(&eval_encoder, &head.valid(), &data.test, TEST_BATCH, device);
    report.test_acc = test_acc;

    if let Some(w) = writer {
        w.add_scalar(&format!("test/{prefix}accuracy"), test_acc, None)?;
    }
    println!("N: {} - Test accuracy: {}", settings.n_per_class, test_acc);

    Ok((report, head))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    use crate::domain::sample::ImageSample;
    use crate::ml::model::{VaeConfig, VaeModel};

    type TB = Autodiff<NdArray>;

    /// Class c lights up feature c, so a linear probe can separate them.
    fn one_hot_dataset(per_class: usize) -> ImageDataset {
        let mut samples = Vec::new();
        for c in 0..NUM_CLASSES {
            for _ in 0..per_class {
                let mut pixels = vec![0.0; NUM_CLASSES];
                pixels[c] = 1.0;
                samples.push(ImageSample::new(pixels, c));
            }
        }
        ImageDataset::new(samples)
    }

    fn small_vae(device: &<TB as Backend>::Device) -> VaeModel<TB> {
        VaeConfig::new(NUM_CLASSES).with_hidden_dim(32).with_latent_dim(16).init(device)
    }

    fn embedding_of(model: &VaeModel<TB>, sample: &ImageSample) -> Vec<f32> {
        let x = Tensor::<TB, 2>::from_data(
            TensorData::new(sample.pixels.clone(), [1, sample.dim()]), &Default::default(),
        );
        model.embed(x).into_data().convert::<f32>().to_vec().unwrap()
    }

    #[test]
    fn test_head_shapes_with_and_without_norm() {
        let device = Default::default();
        let x = Tensor::<NdArray, 2>::ones([4, 6], &device);

        let plain: ProbeHead<NdArray> = ProbeHeadConfig::new(6).init(&device);
        assert!(plain.norm.is_none());
        assert_eq!(plain.forward(x.clone()).dims(), [4, 10]);

        let normed: ProbeHead<NdArray> = ProbeHeadConfig::new(6).with_bn_output(true).init(&device);
        assert!(normed.norm.is_some());
        assert_eq!(normed.forward(x).dims(), [4, 10]);
    }

    #[test]
    fn test_batch_accuracy() {
        let device = Default::default();
        let logits = Tensor::<NdArray, 2>::from_data(
            TensorData::new(vec![0.9f32, 0.1, 0.2, 0.8, 0.7, 0.3], [3, 2]), &device,
        );
        let labels = Tensor::<NdArray, 1, Int>::from_ints([0, 1, 1].as_slice(), &device);
        assert!((batch_accuracy(logits, labels) - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_one_step_probe_returns_valid_metrics() {
        let device = Default::default();
        let model  = small_vae(&device);

        let (acc, loss) = one_step_linear_probing::<TB, _>(
            &model, &one_hot_dataset(1), &one_hot_dataset(3), 16, &device,
        );
        assert!((0.0..=1.0).contains(&acc));
        assert!(loss.is_finite() && loss > 0.0);
    }

    #[test]
    fn test_linear_probe_learns_separable_classes() {
        let device = Default::default();
        let model  = small_vae(&device);
        let data   = ProbeData {
            train: one_hot_dataset(4),
            val:   one_hot_dataset(2),
            test:  one_hot_dataset(2),
        };
        let settings = ProbeSettings {
            n_per_class: 4,
            epochs:      40,
            step_size:   30,
            bn_output:   false,
            finetune:    false,
        };

        let report = linear_probing::<TB, _>(&model, &data, &settings, None, &device).unwrap();
        assert!(report.test_acc > 0.5, "test accuracy {}", report.test_acc);
        assert!(report.best_val_acc >= report.val_acc);
        assert!(report.train_loss.is_finite());
    }

    #[test]
    fn test_finetune_leaves_caller_encoder_untouched() {
        let device = Default::default();
        let model  = small_vae(&device);
        let data   = ProbeData {
            train: one_hot_dataset(2),
            val:   one_hot_dataset(1),
            test:  one_hot_dataset(1),
        };
        let settings = ProbeSettings {
            n_per_class: 2,
            epochs:      2,
            step_size:   30,
            bn_output:   true,
            finetune:    true,
        };

        let probe_sample = data.test.samples()[0].clone();
        let before = embedding_of(&model, &probe_sample);

        let report = linear_probing::<TB, _>(&model, &data, &settings, None, &device).unwrap();
        assert!((0.0..=1.0).contains(&report.test_acc));

        assert_eq!(before, embedding_of(&model, &probe_sample));
    }

    #[test]
    fn test_feature_norm_stays_unit_scale() {
        let device = Default::default();
        let model  = small_vae(&device);
        let data   = ProbeData {
            train: one_hot_dataset(2),
            val:   one_hot_dataset(1),
            test:  one_hot_dataset(1),
        };
        let settings = ProbeSettings {
            n_per_class: 2,
            epochs:      3,
            step_size:   30,
            bn_output:   true,
            finetune:    false,
        };

        let (_, head) = train_head::<TB, _>(&model, &data, &settings, None, &device).unwrap();
        let norm = head.norm.expect("bn_output builds a norm layer");

        let gamma: Vec<f32> = norm.gamma.val().into_data().convert::<f32>().to_vec().unwrap();
        let beta:  Vec<f32> = norm.beta.val().into_data().convert::<f32>().to_vec().unwrap();
        assert!(gamma.iter().all(|&g| g == 1.0), "gamma {gamma:?}");
        assert!(beta.iter().all(|&b| b == 0.0), "beta {beta:?}");
    }

    #[test]
    fn test_linear_probe_rejects_zero_n() {
        let device = Default::default();
        let model  = small_vae(&device);
        let data   = ProbeData {
            train: one_hot_dataset(1),
            val:   one_hot_dataset(1),
            test:  one_hot_dataset(1),
        };
        let settings = ProbeSettings { n_per_class: 0, epochs: 1, step_size: 30, bn_output: false, finetune: false };
        assert!(linear_probing::<TB, _>(&model, &data, &settings, None, &device).is_err());
    }
}
