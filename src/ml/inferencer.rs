// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Rebuilds the model from the saved run configuration, loads
// the best checkpoint, and classifies single images.

use anyhow::{anyhow, Result};
use burn::{prelude::*, tensor::activation::softmax};
use std::path::Path;

use crate::data::{batcher::ImageBatcher, preprocessor::ImagePreprocessor};
use crate::infra::checkpoint::{CheckpointManager, CheckpointSlot};
use crate::ml::model::{MobileNetV3, ModelConfig};

/// One ranked class for a predicted image.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label:       usize,
    pub class_name:  String,
    pub probability: f32,
}

pub struct Inferencer<B: Backend> {
    model:        MobileNetV3<B>,
    class_names:  Vec<String>,
    preprocessor: ImagePreprocessor,
    batcher:      ImageBatcher<B>,
}

impl<B: Backend> Inferencer<B> {
    pub fn from_checkpoint(
        ckpt:   &CheckpointManager,
        slot:   CheckpointSlot,
        device: B::Device,
    ) -> Result<Self> {
        let cfg         = ckpt.load_config()?;
        let class_names = ckpt.load_classes()?;

        let model = ModelConfig::new(class_names.len(), cfg.variant)
            .with_dropout(cfg.dropout)
            .init::<B>(&device);
        let model = ckpt.load(model, slot, &device)?;
        tracing::info!("Model loaded from checkpoint ({} classes)", class_names.len());

        Ok(Self::new(model, class_names, cfg.image_size, device))
    }

    pub fn new(
        model:       MobileNetV3<B>,
        class_names: Vec<String>,
        image_size:  usize,
        device:      B::Device,
    ) -> Self {
        Self {
            model,
            class_names,
            preprocessor: ImagePreprocessor::new(image_size),
            batcher:      ImageBatcher::new(device, image_size),
        }
    }

    /// Classify the image at `path`, returning the `top_k` most likely classes.
    pub fn predict_file(&self, path: &Path, top_k: usize) -> Result<Vec<Prediction>> {
        let pixels = self.preprocessor.load(path)?;
        self.predict_pixels(&pixels, top_k)
    }

    pub fn predict_pixels(&self, pixels: &[f32], top_k: usize) -> Result<Vec<Prediction>> {
        let logits = self.model.forward(self.batcher.single(pixels));
        let probs: Vec<f32> = softmax(logits, 1)
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("Cannot read probabilities: {e:?}"))?;

        let mut ranked = rank(probs);
        ranked.truncate(top_k);

        Ok(ranked
            .into_iter()
            .map(|(label, probability)| Prediction {
                label,
                class_name: self
                    .class_names
                    .get(label)
                    .cloned()
                    .unwrap_or_else(|| format!("class_{label}")),
                probability,
            })
            .collect())
    }
}

/// Sort class indices by descending probability. NaN goes last and
/// equal probabilities keep class order.
fn rank(probs: Vec<f32>) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = probs.into_iter().enumerate().collect();
    ranked.sort_by(|a, b| {
        a.1.is_nan()
            .cmp(&b.1.is_nan())
            .then(b.1.total_cmp(&a.1))
            .then(a.0.cmp(&b.0))
    });
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::Variant;
    use burn::backend::NdArray;

    #[test]
    fn test_predictions_are_ranked_probabilities() {
        let device = Default::default();
        let model  = ModelConfig::new(3, Variant::Small).init::<NdArray>(&device);
        let names  = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let inf    = Inferencer::new(model, names, 32, device);

        let preds = inf.predict_pixels(&vec![0.1; 3 * 32 * 32], 5).unwrap();
        assert_eq!(preds.len(), 3);

        let total: f32 = preds.iter().map(|p| p.probability).sum();
        assert!((total - 1.0).abs() < 1e-4);
        assert!(preds.windows(2).all(|w| w[0].probability >= w[1].probability));
    }

    #[test]
    fn test_nan_probabilities_rank_last() {
        let ranked = rank(vec![f32::NAN, 0.2, 0.7, 0.2]);
        let order: Vec<usize> = ranked.iter().map(|(i, _)| *i).collect();
        assert_eq!(order, vec![2, 1, 3, 0]);
    }
}
