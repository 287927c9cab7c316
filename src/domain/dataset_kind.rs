// ============================================================
// Layer 3 — DatasetKind
// ============================================================
// The datasets the tool knows about, and the per-dataset
// constants the training and probing loops depend on.
//
// Files are IDX tensors (the MNIST format). ModelNet10 is
// expected pre-voxelised as a rank-4 IDX file [N, 32, 32, 32].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of classes in every supported dataset
pub const NUM_CLASSES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Mnist,
    ModelNet10,
}

/// Which file pair a split is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitFiles {
    Train,
    Test,
}

impl DatasetKind {
    /// Flattened input dimensionality
    pub fn input_dim(&self) -> usize {
        match self {
            DatasetKind::Mnist      => 28 * 28,
            DatasetKind::ModelNet10 => 32 * 32 * 32,
        }
    }

    /// (images, labels) file names for a split
    pub fn file_names(&self, split: SplitFiles) -> (&'static str, &'static str) {
        match (self, split) {
            (DatasetKind::Mnist, SplitFiles::Train) =>
                ("train-images-idx3-ubyte", "train-labels-idx1-ubyte"),
            (DatasetKind::Mnist, SplitFiles::Test) =>
                ("t10k-images-idx3-ubyte", "t10k-labels-idx1-ubyte"),
            (DatasetKind::ModelNet10, SplitFiles::Train) =>
                ("modelnet10-train-voxels-idx4-ubyte", "modelnet10-train-labels-idx1-ubyte"),
            (DatasetKind::ModelNet10, SplitFiles::Test) =>
                ("modelnet10-test-voxels-idx4-ubyte", "modelnet10-test-labels-idx1-ubyte"),
        }
    }

    /// Epochs the full linear probe trains for
    pub fn probe_epochs(&self) -> usize {
        match self {
            DatasetKind::Mnist      => 100,
            DatasetKind::ModelNet10 => 200,
        }
    }

    /// StepLR period for the linear probe
    pub fn probe_step_size(&self) -> usize {
        match self {
            DatasetKind::Mnist      => 30,
            DatasetKind::ModelNet10 => 60,
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetKind::Mnist      => write!(f, "mnist"),
            DatasetKind::ModelNet10 => write!(f, "modelnet10"),
        }
    }
}

impl FromStr for DatasetKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mnist"      => Ok(DatasetKind::Mnist),
            "modelnet10" => Ok(DatasetKind::ModelNet10),
            other        => anyhow::bail!("unknown dataset '{other}' (expected mnist or modelnet10)"),
        }
    }
}
