// ============================================================
// Layer 4 — Image Preprocessor
// ============================================================
// Turns an encoded image file into the flat f32 buffer the
// batcher stacks into a tensor.
//
// Steps (applied in order):
//   1. Decode (png / jpeg / bmp) and convert to 8-bit RGB
//   2. Resize to image_size x image_size
//   3. Scale to [0, 1]
//   4. Normalise per channel with the ImageNet mean / std
//   5. Lay out channel-major: [3, image_size, image_size]
//
// Reference: image crate documentation

use anyhow::{Context, Result};
use image::{imageops::FilterType, DynamicImage, RgbImage};
use std::path::Path;

pub const CHANNELS: usize = 3;

// ImageNet statistics, the usual choice for MobileNet inputs
pub const MEAN: [f32; CHANNELS] = [0.485, 0.456, 0.406];
pub const STD:  [f32; CHANNELS] = [0.229, 0.224, 0.225];

#[derive(Debug, Clone, Copy)]
pub struct ImagePreprocessor {
    image_size: usize,
}

impl ImagePreprocessor {
    pub fn new(image_size: usize) -> Self {
        Self { image_size }
    }

    /// Number of f32 values in one processed image.
    pub fn sample_len(&self) -> usize {
        CHANNELS * self.image_size * self.image_size
    }

    /// Decode and process the image at `path`.
    pub fn load(&self, path: &Path) -> Result<Vec<f32>> {
        let img = image::open(path)
            .with_context(|| format!("Cannot decode image '{}'", path.display()))?;
        Ok(self.process(img))
    }

    /// Resize, normalise and transpose an already decoded image.
    pub fn process(&self, img: DynamicImage) -> Vec<f32> {
        let size = self.image_size as u32;
        let rgb: RgbImage = if img.width() == size && img.height() == size {
            img.into_rgb8()
        } else {
            img.resize_exact(size, size, FilterType::Triangle).into_rgb8()
        };

        let plane = self.image_size * self.image_size;
        let mut out = vec![0f32; self.sample_len()];
        for (i, pixel) in rgb.pixels().enumerate() {
            for c in 0..CHANNELS {
                let v = pixel.0[c] as f32 / 255.0;
                out[c * plane + i] = (v - MEAN[c]) / STD[c];
            }
        }
        out
    }

    /// A buffer standing in for an image that failed to decode.
    pub fn blank(&self) -> Vec<f32> {
        vec![0f32; self.sample_len()]
    }
}
