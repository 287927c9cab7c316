// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All business logic is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `train`   — trains a VAE and checkpoints the best encoder
//   2. `probe`   — linear-probes a checkpoint, then reports metrics
//   3. `metrics` — representation metrics only
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, MetricsArgs, ProbeArgs, TrainArgs};

use crate::application::probe_use_case::ProbeUseCase;
use crate::application::train_use_case::TrainUseCase;

#[derive(Parser, Debug)]
#[command(
    name = "vae-probe",
    version = "0.1.0",
    about = "Train a VAE on MNIST or ModelNet10 and evaluate its encoder with linear probes."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route the subcommand to its use case. The CLI layer never computes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Probe(args)   => run_probe(args),
            Commands::Metrics(args) => run_metrics(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    tracing::info!("Starting {} training from: {}", args.dataset, args.root);

    let summary = TrainUseCase::new(args.into()).execute()?;

    match summary.saved_epochs.last() {
        Some(epoch) => println!(
            "Training complete. Best checkpoint from epoch {} (1step_val_loss={:.4}).",
            epoch, summary.best_probe_loss
        ),
        None => println!("Training complete. No checkpoint was written."),
    }
    if let Some(last) = &summary.last {
        println!("Final epoch {}: {}", last.epoch, last.postfix());
    }
    Ok(())
}

fn run_probe(args: ProbeArgs) -> Result<()> {
    let outcome = ProbeUseCase::new(args.into()).execute()?;
    for report in &outcome.probes {
        println!(
            "N: {} - best val accuracy: {:.4}",
            report.n_per_class, report.best_val_acc
        );
    }
    print_metrics(&outcome.metrics);
    Ok(())
}

fn run_metrics(args: MetricsArgs) -> Result<()> {
    let outcome = ProbeUseCase::new(args.into()).execute()?;
    print_metrics(&outcome.metrics);
    Ok(())
}

fn print_metrics(metrics: &std::collections::BTreeMap<String, f64>) {
    for (name, value) in metrics {
        println!("{name}: {value}");
    }
}
