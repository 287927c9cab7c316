// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `train`, `probe`, `metrics`
// and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for bad values
//   - type conversion (string → usize, f64, DatasetKind, ...)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::probe_use_case::ProbeConfig;
use crate::application::train_use_case::TrainConfig;
use crate::domain::{dataset_kind::DatasetKind, device::ComputeDevice};
use crate::ml::features::TrackedMetrics;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a VAE, checkpointing on single-step probe improvement
    Train(TrainArgs),

    /// Linear-probe a trained encoder, then compute representation metrics
    Probe(ProbeArgs),

    /// Only compute representation metrics for a trained encoder
    Metrics(MetricsArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory holding the dataset's IDX files
    #[arg(long, default_value = "data/mnist")]
    pub root: String,

    /// mnist or modelnet10
    #[arg(long, default_value = "mnist")]
    pub dataset: DatasetKind,

    #[arg(long, default_value_t = 50)]
    pub epochs: usize,

    #[arg(long, default_value_t = 256)]
    pub batch_size: usize,

    /// Base learning rate, scaled by batch_size / 256
    #[arg(long, default_value_t = 3e-4)]
    pub lr: f64,

    /// 0 disables weight decay and its schedule
    #[arg(long, default_value_t = 0.04)]
    pub weight_decay: f64,

    /// Weight of the KL term
    #[arg(long, default_value_t = 1.0)]
    pub beta: f64,

    #[arg(long, default_value_t = 512)]
    pub hidden_dim: usize,

    #[arg(long, default_value_t = 32)]
    pub latent_dim: usize,

    /// Where model weights and train_config.json are written
    #[arg(long, default_value = "checkpoints")]
    pub save_dir: String,

    /// Only epochs divisible by this may write a checkpoint
    #[arg(long, default_value_t = 1)]
    pub save_every: usize,

    /// Where scalar and text metrics are written
    #[arg(long, default_value = "runs/vae")]
    pub run_dir: String,

    /// Seed for the train/validation split and shuffling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// cpu or wgpu
    #[arg(long, default_value = "wgpu")]
    pub device: ComputeDevice,
}

impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            root:         a.root,
            dataset:      a.dataset,
            save_dir:     a.save_dir,
            run_dir:      a.run_dir,
            epochs:       a.epochs,
            batch_size:   a.batch_size,
            lr:           a.lr,
            weight_decay: a.weight_decay,
            beta:         a.beta,
            hidden_dim:   a.hidden_dim,
            latent_dim:   a.latent_dim,
            save_every:   a.save_every,
            seed:         a.seed,
            device:       a.device,
            ..TrainConfig::default()
        }
    }
}

/// Flags shared by `probe` and `metrics`.
#[derive(Args, Debug)]
pub struct CheckpointArgs {
    /// Directory written by `train`
    #[arg(long, default_value = "checkpoints")]
    pub save_dir: String,

    /// Overrides the dataset root recorded at training time
    #[arg(long)]
    pub root: Option<String>,

    #[arg(long, default_value = "runs/probe")]
    pub run_dir: String,

    #[arg(long)]
    pub track_corr: bool,

    #[arg(long)]
    pub track_std: bool,

    #[arg(long)]
    pub track_entropy: bool,

    /// cpu or wgpu
    #[arg(long, default_value = "wgpu")]
    pub device: ComputeDevice,
}

impl CheckpointArgs {
    fn tracked(&self) -> TrackedMetrics {
        TrackedMetrics {
            corr:    self.track_corr,
            std:     self.track_std,
            entropy: self.track_entropy,
        }
    }

    fn into_config(self, n_per_class: Vec<usize>, finetune: bool, bn_output: bool) -> ProbeConfig {
        ProbeConfig {
            tracked:  self.tracked(),
            root:     self.root,
            save_dir: self.save_dir,
            run_dir:  self.run_dir,
            device:   self.device,
            n_per_class,
            finetune,
            bn_output,
        }
    }
}

/// All arguments for the `probe` command.
#[derive(Args, Debug)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub common: CheckpointArgs,

    /// Labelled samples per class; repeat the flag for several runs
    #[arg(long = "n-per-class", default_values_t = vec![1usize])]
    pub n_per_class: Vec<usize>,

    /// Train a copy of the encoder together with the head
    #[arg(long)]
    pub finetune: bool,

    /// Batch-normalise encoder features before the linear head
    #[arg(long)]
    pub bn_output: bool,
}

impl From<ProbeArgs> for ProbeConfig {
    fn from(a: ProbeArgs) -> Self {
        a.common.into_config(a.n_per_class, a.finetune, a.bn_output)
    }
}

/// All arguments for the `metrics` command.
#[derive(Args, Debug)]
pub struct MetricsArgs {
    #[command(flatten)]
    pub common: CheckpointArgs,
}

impl From<MetricsArgs> for ProbeConfig {
    fn from(a: MetricsArgs) -> Self {
        a.common.into_config(Vec::new(), false, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_flags_convert_to_config() {
        let cli = Cli::try_parse_from([
            "vae-probe", "train", "--dataset", "modelnet10", "--epochs", "20",
            "--weight-decay", "0", "--device", "cpu",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();

        assert_eq!(cfg.dataset, DatasetKind::ModelNet10);
        assert_eq!(cfg.epochs, 20);
        assert_eq!(cfg.weight_decay, 0.0);
        assert_eq!(cfg.device, ComputeDevice::Cpu);
        assert_eq!(cfg.batch_size, 256);
    }

    #[test]
    fn test_probe_accepts_repeated_n_per_class() {
        let cli = Cli::try_parse_from([
            "vae-probe", "probe", "--n-per-class", "1", "--n-per-class", "10",
            "--finetune", "--track-std",
        ])
        .unwrap();
        let Commands::Probe(args) = cli.command else { panic!("expected probe") };
        let cfg: ProbeConfig = args.into();

        assert_eq!(cfg.n_per_class, vec![1, 10]);
        assert!(cfg.finetune);
        assert!(cfg.tracked.std && !cfg.tracked.corr);
    }

    #[test]
    fn test_metrics_skips_probing() {
        let cli = Cli::try_parse_from(["vae-probe", "metrics", "--track-entropy"]).unwrap();
        let Commands::Metrics(args) = cli.command else { panic!("expected metrics") };
        let cfg: ProbeConfig = args.into();
        assert!(cfg.n_per_class.is_empty());
    }

    #[test]
    fn test_unknown_dataset_rejected() {
        assert!(Cli::try_parse_from(["vae-probe", "train", "--dataset", "cifar"]).is_err());
    }
}
