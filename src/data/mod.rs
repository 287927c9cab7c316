// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from raw IDX files to device-ready tensor batches.
//
//   IDX files (images + labels)
//       │
//       ▼
//   IdxSource         → parses both files, yields ImageSample
//       │
//       ▼
//   splitter          → seeded train/val split, n-per-class subsets
//       │
//       ▼
//   ImageDataset      → implements Burn's Dataset trait
//       │
//       ▼
//   ImageBatcher      → stacks samples into [N, D] tensors
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Big-endian IDX tensor files (MNIST and voxelised ModelNet10)
pub mod idx;

/// Shuffles and splits data; per-class subsets for probing
pub mod splitter;

/// Implements Burn's Dataset trait for labelled samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
