// ============================================================
// Layer 4 — Image Batcher
// ============================================================
// Implements Burn's Batcher trait to stack a Vec<ImageSample>
// into device tensors:
//
//   images:  [batch, 3, size, size]  (float)
//   targets: [batch]                 (int class indices)
//
// Every sample has the same length because the preprocessor
// resizes to a fixed square, so batching is a flatten + reshape.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::{dataset::ImageSample, preprocessor::CHANNELS};

#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// Normalised pixels — shape: [batch_size, 3, size, size]
    pub images: Tensor<B, 4>,

    /// Ground truth class indices — shape: [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> ImageBatch<B> {
    pub fn len(&self) -> usize {
        self.targets.dims()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug)]
pub struct ImageBatcher<B: Backend> {
    device:     B::Device,
    image_size: usize,
}

impl<B: Backend> ImageBatcher<B> {
    pub fn new(device: B::Device, image_size: usize) -> Self {
        Self { device, image_size }
    }

    /// Build a single-image batch, used for prediction.
    pub fn single(&self, pixels: &[f32]) -> Tensor<B, 4> {
        Tensor::<B, 1>::from_floats(pixels, &self.device)
            .reshape([1, CHANNELS, self.image_size, self.image_size])
    }
}

impl<B: Backend> Batcher<ImageSample, ImageBatch<B>> for ImageBatcher<B> {
    fn batch(&self, items: Vec<ImageSample>) -> ImageBatch<B> {
        let batch_size = items.len();

        let pixels: Vec<f32> = items
            .iter()
            .flat_map(|s| s.pixels.iter().copied())
            .collect();

        let labels: Vec<i32> = items
            .iter()
            .map(|s| s.label as i32)
            .collect();

        let images = Tensor::<B, 1>::from_floats(pixels.as_slice(), &self.device)
            .reshape([batch_size, CHANNELS, self.image_size, self.image_size]);

        let targets = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        ImageBatch { images, targets }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn test_batch_shapes_and_labels() {
        let batcher = ImageBatcher::<NdArray>::new(Default::default(), 2);
        let items = vec![
            ImageSample { pixels: vec![0.5; 12], label: 3 },
            ImageSample { pixels: vec![1.0; 12], label: 1 },
        ];
        let batch = batcher.batch(items);

        assert_eq!(batch.images.dims(), [2, 3, 2, 2]);
        assert_eq!(batch.len(), 2);
        let labels = batch.targets.into_data().convert::<i64>().to_vec::<i64>().unwrap();
        assert_eq!(labels, vec![3, 1]);
    }

    #[test]
    fn test_single_image() {
        let batcher = ImageBatcher::<NdArray>::new(Default::default(), 3);
        assert_eq!(batcher.single(&[0.0; 27]).dims(), [1, 3, 3, 3]);
    }
}
