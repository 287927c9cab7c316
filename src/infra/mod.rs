// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by several layers:
//
//   checkpoint.rs — Saving and loading VAE weights with Burn's
//                   CompactRecorder, plus TrainConfig as JSON
//                   so probing can rebuild the model.
//
//   metrics.rs    — Scalar and text logs for a run
//                   (scalars.csv, text.jsonl, epochs.csv).
//
//   progress.rs   — indicatif bars for the epoch loop.
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Run metrics logger
pub mod metrics;

/// Per-epoch progress bars
pub mod progress;
