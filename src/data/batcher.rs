// ============================================================
// Layer 4 — Image Batcher
// ============================================================
// Implements Burn's Batcher trait to stack a Vec<ImageSample>
// into device tensors.
//
// How batching works here:
//   Input:  Vec of N ImageSamples, each with D features
//   Output: ImageBatch with images [N, D] and labels [N]
//
//   All pixel vectors are flattened into one long Vec, then
//   shaped [N, D] in a single TensorData:
//   [s1_p1, ..., s1_pD, s2_p1, ..., sN_pD] → [N, D]
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::domain::sample::ImageSample;

// ─── ImageBatch ───────────────────────────────────────────────────────────────
/// A batch of samples ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// Flattened inputs — shape: [batch_size, dim]
    pub images: Tensor<B, 2>,

    /// Class labels — shape: [batch_size]
    pub labels: Tensor<B, 1, Int>,
}

// ─── ImageBatcher ─────────────────────────────────────────────────────────────
/// Holds the target device so tensors land on the right GPU/CPU.
#[derive(Clone, Debug)]
pub struct ImageBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> ImageBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<ImageSample, ImageBatch<B>> for ImageBatcher<B> {
    fn batch(&self, items: Vec<ImageSample>) -> ImageBatch<B> {
        let batch_size = items.len();
        let dim        = items.first().map(ImageSample::dim).unwrap_or(0);

        let flat: Vec<f32> = items
            .iter()
            .flat_map(|s| s.pixels.iter().copied())
            .collect();

        let labels: Vec<i32> = items
            .iter()
            .map(|s| s.label as i32)
            .collect();

        let images = Tensor::<B, 2>::from_data(
            TensorData::new(flat, [batch_size, dim]), &self.device,
        );
        let labels = Tensor::<B, 1, Int>::from_ints(
            labels.as_slice(), &self.device,
        );

        ImageBatch { images, labels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn test_batch_shapes_and_values() {
        let batcher = ImageBatcher::<NdArray>::new(Default::default());
        let batch   = batcher.batch(vec![
            ImageSample::new(vec![0.0, 0.5, 1.0], 2),
            ImageSample::new(vec![1.0, 0.5, 0.0], 9),
        ]);

        assert_eq!(batch.images.dims(), [2, 3]);

        let labels: Vec<i64> = batch.labels.into_data().convert::<i64>().to_vec().unwrap();
        assert_eq!(labels, vec![2, 9]);

        let pixels: Vec<f32> = batch.images.into_data().convert::<f32>().to_vec().unwrap();
        assert_eq!(pixels, vec![0.0, 0.5, 1.0, 1.0, 0.5, 0.0]);
    }
}
