use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::data::preprocessor::ImagePreprocessor;
use crate::domain::image::LabeledImage;

/// One decoded, normalised image. `pixels` is [3, size, size] row-major.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSample {
    pub pixels: Vec<f32>,
    pub label:  usize,
}

/// Decodes images on demand, so only the current batches are in memory.
pub struct ImageDataset {
    items:        Vec<LabeledImage>,
    preprocessor: ImagePreprocessor,
}

impl ImageDataset {
    pub fn new(items: Vec<LabeledImage>, preprocessor: ImagePreprocessor) -> Self {
        Self { items, preprocessor }
    }
}

impl Dataset<ImageSample> for ImageDataset {
    fn get(&self, index: usize) -> Option<ImageSample> {
        let item = self.items.get(index)?;
        // The data loader stops at the first `None`, so a bad file must
        // still produce a sample.
        let pixels = match self.preprocessor.load(&item.path) {
            Ok(pixels) => pixels,
            Err(e) => {
                tracing::warn!("{e:#}; using a blank image");
                self.preprocessor.blank()
            }
        };
        Some(ImageSample { pixels, label: item.label })
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_get_decodes_and_falls_back_to_blank() {
        let dir  = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.png");
        RgbImage::from_pixel(6, 6, Rgb([1, 2, 3])).save(&good).unwrap();

        let ds = ImageDataset::new(
            vec![
                LabeledImage::new(&good, 1),
                LabeledImage::new(dir.path().join("gone.png"), 0),
            ],
            ImagePreprocessor::new(4),
        );
        assert_eq!(ds.len(), 2);

        let first = ds.get(0).unwrap();
        assert_eq!(first.label, 1);
        assert_eq!(first.pixels.len(), 48);

        let second = ds.get(1).unwrap();
        assert!(second.pixels.iter().all(|&v| v == 0.0));
        assert!(ds.get(2).is_none());
    }
}
