use burn::data::dataset::Dataset;

use crate::domain::sample::ImageSample;

/// In-memory labelled dataset, fully preloaded.
#[derive(Debug, Clone)]
pub struct ImageDataset {
    samples: Vec<ImageSample>,
}

impl ImageDataset {
    pub fn new(samples: Vec<ImageSample>) -> Self { Self { samples } }

    pub fn samples(&self) -> &[ImageSample] { &self.samples }
}

impl Dataset<ImageSample> for ImageDataset {
    fn get(&self, index: usize) -> Option<ImageSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_access() {
        let ds = ImageDataset::new(vec![
            ImageSample::new(vec![0.0, 1.0], 0),
            ImageSample::new(vec![1.0, 0.0], 1),
        ]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.samples()[0].dim(), 2);
        assert_eq!(ds.get(1).map(|s| s.label), Some(1));
        assert!(ds.get(2).is_none());
    }
}
