// ============================================================
// Layer 3 — ImageSample Domain Type
// ============================================================
// A single labelled example. 2-D images (MNIST, 28x28) and
// 3-D voxel grids (ModelNet10, 32x32x32) share this type:
// the models only ever see a flat feature vector, so the
// spatial layout is folded into `pixels` in row-major order.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSample {
    /// Flattened intensities scaled to [0, 1]
    pub pixels: Vec<f32>,

    /// Class index in 0..num_classes
    pub label: usize,
}

impl ImageSample {
    pub fn new(pixels: Vec<f32>, label: usize) -> Self {
        Self { pixels, label }
    }

    /// Number of input features (784 for MNIST)
    pub fn dim(&self) -> usize {
        self.pixels.len()
    }

    /// Build a sample from raw u8 intensities, scaling by 1/255
    pub fn from_bytes(bytes: &[u8], label: usize) -> Self {
        Self::new(bytes.iter().map(|&b| b as f32 / 255.0).collect(), label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_scales_to_unit_range() {
        let s = ImageSample::from_bytes(&[0, 51, 255], 3);
        assert_eq!(s.label, 3);
        assert_eq!(s.dim(), 3);
        assert_eq!(s.pixels[0], 0.0);
        assert!((s.pixels[1] - 0.2).abs() < 1e-6);
        assert_eq!(s.pixels[2], 1.0);
    }
}
