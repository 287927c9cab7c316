// ============================================================
// Layer 6 — Metrics Writer
// ============================================================
// Records run metrics under a run directory:
//
//   scalars.csv  — tag,step,value   (one row per add_scalar)
//   text.jsonl   — {"tag": .., "text": ..} per add_text call
//   epochs.csv   — one row per VAE training epoch
//
// Files are appended to, so several probes (one per n_per_class)
// can share a run directory.
//
// Example scalars.csv:
//   tag,step,value
//   Encoder/train_loss,0,183.402100
//   Encoder/1step_val_acc,0,0.412000
//   test/accuracy,,0.871000
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

/// One VAE training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// 0-based epoch index
    pub epoch: usize,

    /// Summed VAE loss over the training set / number of samples
    pub train_loss: f64,

    /// Summed batch-scaled MSE / number of samples
    pub train_mse: f64,

    pub val_loss: f64,
    pub val_mse:  f64,

    /// Single-step linear probe accuracy on the validation set
    pub probe_acc: f64,

    /// Single-step linear probe cross-entropy; drives checkpointing
    pub probe_loss: f64,
}

impl EpochMetrics {
    /// Returns true if this epoch's probe loss beats the best seen so far
    pub fn is_improvement(&self, best_probe_loss: f64) -> bool {
        self.probe_loss < best_probe_loss
    }

    /// `key=value` pairs for progress-bar postfixes and logs
    pub fn postfix(&self) -> String {
        format!(
            "train_loss={:.4} train_mse={:.4} val_loss={:.4} val_mse={:.4} 1step_val_acc={:.4} 1step_val_loss={:.4}",
            self.train_loss, self.train_mse, self.val_loss, self.val_mse, self.probe_acc, self.probe_loss,
        )
    }
}

#[derive(Serialize)]
struct TextEntry<'a> {
    tag:  &'a str,
    text: &'a str,
}

pub struct MetricsWriter {
    dir: PathBuf,
}

impl MetricsWriter {
    /// Create the run directory and any missing headers.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create run directory '{}'", dir.display()))?;

        let writer = Self { dir };
        writer.ensure_header(&writer.scalars_path(), "tag,step,value")?;
        writer.ensure_header(
            &writer.epochs_path(),
            "epoch,train_loss,train_mse,val_loss,val_mse,1step_val_acc,1step_val_loss",
        )?;
        Ok(writer)
    }

    fn ensure_header(&self, path: &Path, header: &str) -> Result<()> {
        if !path.exists() {
            let mut f = fs::File::create(path)
                .with_context(|| format!("Cannot create '{}'", path.display()))?;
            writeln!(f, "{header}")?;
            tracing::debug!("Created metrics file: '{}'", path.display());
        }
        Ok(())
    }

    fn append(&self, path: &Path, line: &str) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .with_context(|| format!("Cannot open '{}' for append", path.display()))?;
        writeln!(f, "{line}")?;
        Ok(())
    }

    /// Append one scalar. `step = None` leaves the step column empty.
    pub fn add_scalar(&self, tag: &str, value: f64, step: Option<usize>) -> Result<()> {
        let step = step.map(|s| s.to_string()).unwrap_or_default();
        self.append(&self.scalars_path(), &format!("{tag},{step},{value:.6}"))
    }

    pub fn add_text(&self, tag: &str, text: &str) -> Result<()> {
        let line = serde_json::to_string(&TextEntry { tag, text })?;
        self.append(&self.text_path(), &line)
    }

    pub fn log_epoch(&self, m: &EpochMetrics) -> Result<()> {
        self.append(
            &self.epochs_path(),
            &format!(
                "{},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6}",
                m.epoch, m.train_loss, m.train_mse, m.val_loss, m.val_mse, m.probe_acc, m.probe_loss,
            ),
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}",
            m.epoch, m.train_loss, m.val_loss,
        );
        Ok(())
    }

    pub fn scalars_path(&self) -> PathBuf { self.dir.join("scalars.csv") }

    pub fn text_path(&self) -> PathBuf { self.dir.join("text.jsonl") }

    pub fn epochs_path(&self) -> PathBuf { self.dir.join("epochs.csv") }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(probe_loss: f64) -> EpochMetrics {
        EpochMetrics {
            epoch: 2, train_loss: 2.5, train_mse: 0.1, val_loss: 2.3,
            val_mse: 0.09, probe_acc: 0.4, probe_loss,
        }
    }

    #[test]
    fn test_is_improvement() {
        let m = metrics(2.3);
        assert!(m.is_improvement(3.0));
        assert!(!m.is_improvement(2.0));
        assert!(m.is_improvement(f64::INFINITY));
    }

    #[test]
    fn test_scalars_and_text_are_appended() {
        let dir    = tempfile::tempdir().unwrap();
        let writer = MetricsWriter::new(dir.path()).unwrap();

        writer.add_scalar("Encoder/train_loss", 1.5, Some(0)).unwrap();
        writer.add_scalar("test/accuracy", 0.25, None).unwrap();
        writer.add_text("Encoder/options", "{\"beta\": 1.0}").unwrap();

        let scalars = fs::read_to_string(writer.scalars_path()).unwrap();
        let lines: Vec<&str> = scalars.lines().collect();
        assert_eq!(lines, vec!["tag,step,value", "Encoder/train_loss,0,1.500000", "test/accuracy,,0.250000"]);

        let text = fs::read_to_string(writer.text_path()).unwrap();
        let entry: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(entry["tag"], "Encoder/options");
        assert_eq!(entry["text"], "{\"beta\": 1.0}");
    }

    #[test]
    fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        MetricsWriter::new(dir.path()).unwrap().log_epoch(&metrics(1.0)).unwrap();
        let writer = MetricsWriter::new(dir.path()).unwrap();
        writer.log_epoch(&metrics(0.5)).unwrap();

        let epochs = fs::read_to_string(writer.epochs_path()).unwrap();
        assert_eq!(epochs.lines().count(), 3);
        assert!(epochs.lines().nth(2).unwrap().ends_with(",0.500000"));
    }
}
