// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// Programming against traits lets the application layer load
// samples without knowing the on-disk format. IdxSource reads
// MNIST-style IDX files.

use anyhow::Result;
use crate::domain::sample::ImageSample;

// ─── SampleSource ─────────────────────────────────────────────────────────────
/// Any component that can produce a labelled set of samples.
pub trait SampleSource {
    /// Load every sample this source holds.
    fn load_all(&self) -> Result<Vec<ImageSample>>;
}
