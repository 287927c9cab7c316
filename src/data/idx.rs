// ============================================================
// Layer 4 — IDX Loader
// ============================================================
// Reads MNIST-style IDX tensor files from a dataset root.
//
// File layout (all integers big-endian):
//   byte 0-1   : 0x00 0x00
//   byte 2     : element type (0x08 = unsigned byte)
//   byte 3     : rank (number of dimensions)
//   rank x u32 : size of each dimension
//   payload    : product(dims) elements, row-major
//
// An images file has rank >= 2 (first dim = sample count), a
// labels file has rank 1. Voxel grids use the same layout with
// rank 4, so one loader covers both MNIST and ModelNet10.
//
// Reference: http://yann.lecun.com/exdb/mnist/ (file format)
//            Rust Book §9 (Error Handling)

use anyhow::{bail, ensure, Context, Result};
use std::{fs, path::{Path, PathBuf}};

use crate::domain::dataset_kind::{DatasetKind, SplitFiles};
use crate::domain::sample::ImageSample;
use crate::domain::traits::SampleSource;

const UBYTE: u8 = 0x08;

/// A decoded IDX file: its shape and raw u8 payload.
#[derive(Debug, Clone)]
pub struct IdxTensor {
    pub dims: Vec<usize>,
    pub data: Vec<u8>,
}

impl IdxTensor {
    /// Decode an in-memory IDX buffer.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        ensure!(bytes.len() >= 4, "IDX header truncated ({} bytes)", bytes.len());
        if bytes[0] != 0 || bytes[1] != 0 {
            bail!("bad IDX magic number {:02x}{:02x}", bytes[0], bytes[1]);
        }
        if bytes[2] != UBYTE {
            bail!("unsupported IDX element type 0x{:02x} (only u8 is supported)", bytes[2]);
        }

        let rank       = bytes[3] as usize;
        let header_len = 4 + 4 * rank;
        ensure!(bytes.len() >= header_len, "IDX header truncated: rank {rank} needs {header_len} bytes");

        let dims: Vec<usize> = bytes[4..header_len]
            .chunks_exact(4)
            .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]) as usize)
            .collect();

        let Some(expected) = dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d)) else {
            bail!("IDX dims {:?} overflow the addressable size", dims);
        };
        let payload = &bytes[header_len..];
        ensure!(
            payload.len() >= expected,
            "IDX payload truncated: dims {:?} need {} bytes, found {}",
            dims, expected, payload.len()
        );

        Ok(Self { dims, data: payload[..expected].to_vec() })
    }

    pub fn read(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .with_context(|| format!("Cannot read IDX file '{}'", path.display()))?;
        Self::parse(&bytes)
            .with_context(|| format!("Malformed IDX file '{}'", path.display()))
    }

    /// Number of items along the first dimension
    pub fn count(&self) -> usize {
        self.dims.first().copied().unwrap_or(0)
    }

    /// Elements per item (product of the trailing dimensions)
    pub fn item_len(&self) -> usize {
        self.dims.iter().skip(1).product()
    }
}

/// Loads one split (train or test files) of a dataset from `root`.
pub struct IdxSource {
    root:    PathBuf,
    dataset: DatasetKind,
    split:   SplitFiles,
}

impl IdxSource {
    pub fn new(root: impl Into<PathBuf>, dataset: DatasetKind, split: SplitFiles) -> Self {
        Self { root: root.into(), dataset, split }
    }
}

impl SampleSource for IdxSource {
    fn load_all(&self) -> Result<Vec<ImageSample>> {
        let (images_file, labels_file) = self.dataset.file_names(self.split);
        let images = IdxTensor::read(&self.root.join(images_file))?;
        let labels = IdxTensor::read(&self.root.join(labels_file))?;

        ensure!(images.dims.len() >= 2, "'{images_file}' must have rank >= 2, got {:?}", images.dims);
        ensure!(labels.dims.len() == 1, "'{labels_file}' must have rank 1, got {:?}", labels.dims);
        ensure!(
            images.count() == labels.count(),
            "'{images_file}' holds {} items but '{labels_file}' holds {}",
            images.count(), labels.count()
        );

        let item_len = images.item_len();
        let expected = self.dataset.input_dim();
        let mut samples = Vec::with_capacity(images.count());

        for (i, chunk) in images.data.chunks_exact(item_len.max(1)).enumerate() {
            // Skip rather than fail: one odd grid should not sink the run
            if chunk.len() != expected {
                tracing::warn!(
                    "Skipping item {} of '{}': {} features, expected {}",
                    i, images_file, chunk.len(), expected
                );
                continue;
            }
            samples.push(ImageSample::from_bytes(chunk, labels.data[i] as usize));
        }

        tracing::info!(
            "Loaded {} {} samples from '{}'",
            samples.len(), self.dataset, self.root.display()
        );
        Ok(samples)
    }
}

/// Encode a u8 tensor as IDX bytes for test fixtures.
#[cfg(test)]
pub fn encode_idx(dims: &[usize], data: &[u8]) -> Vec<u8> {
    let mut out = vec![0, 0, UBYTE, dims.len() as u8];
    for &d in dims {
        out.extend_from_slice(&(d as u32).to_be_bytes());
    }
    out.extend_from_slice(data);
    out
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header_and_payload() {
        let bytes = encode_idx(&[2, 2, 2], &[1, 2, 3, 4, 5, 6, 7, 8]);
        let t     = IdxTensor::parse(&bytes).unwrap();
        assert_eq!(t.dims, vec![2, 2, 2]);
        assert_eq!(t.count(), 2);
        assert_eq!(t.item_len(), 4);
        assert_eq!(t.data, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut bytes = encode_idx(&[1], &[0]);
        bytes[0] = 1;
        assert!(IdxTensor::parse(&bytes).is_err());
    }

    #[test]
    fn test_rejects_truncated_payload() {
        let bytes = encode_idx(&[3, 2], &[1, 2, 3]);
        assert!(IdxTensor::parse(&bytes).is_err());
    }

    #[test]
    fn test_rejects_overflowing_dims() {
        let mut bytes = vec![0, 0, UBYTE, 3];
        for _ in 0..3 {
            bytes.extend_from_slice(&u32::MAX.to_be_bytes());
        }
        assert!(IdxTensor::parse(&bytes).is_err());
    }

    #[test]
    fn test_source_reads_mnist_pair() {
        let dir = tempfile::tempdir().unwrap();
        let (img_name, lbl_name) = DatasetKind::Mnist.file_names(SplitFiles::Test);

        let pixels: Vec<u8> = (0..2 * 784).map(|i| (i % 256) as u8).collect();
        fs::write(dir.path().join(img_name), encode_idx(&[2, 28, 28], &pixels)).unwrap();
        fs::write(dir.path().join(lbl_name), encode_idx(&[2], &[7, 3])).unwrap();

        let samples = IdxSource::new(dir.path(), DatasetKind::Mnist, SplitFiles::Test)
            .load_all()
            .unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].label, 7);
        assert_eq!(samples[1].label, 3);
        assert_eq!(samples[0].dim(), 784);
        assert!((samples[0].pixels[255] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_source_rejects_count_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let (img_name, lbl_name) = DatasetKind::Mnist.file_names(SplitFiles::Train);
        fs::write(dir.path().join(img_name), encode_idx(&[1, 28, 28], &[0; 784])).unwrap();
        fs::write(dir.path().join(lbl_name), encode_idx(&[2], &[0, 1])).unwrap();

        let result = IdxSource::new(dir.path(), DatasetKind::Mnist, SplitFiles::Train).load_all();
        assert!(result.is_err());
    }

    #[test]
    fn test_source_skips_wrong_sized_items() {
        let dir = tempfile::tempdir().unwrap();
        let (img_name, lbl_name) = DatasetKind::Mnist.file_names(SplitFiles::Train);
        fs::write(dir.path().join(img_name), encode_idx(&[2, 27, 27], &[0; 2 * 27 * 27])).unwrap();
        fs::write(dir.path().join(lbl_name), encode_idx(&[2], &[4, 5])).unwrap();

        let samples = IdxSource::new(dir.path(), DatasetKind::Mnist, SplitFiles::Train)
            .load_all()
            .unwrap();
        assert!(samples.is_empty());
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir    = tempfile::tempdir().unwrap();
        let result = IdxSource::new(dir.path(), DatasetKind::Mnist, SplitFiles::Train).load_all();
        assert!(result.is_err());
    }
}
