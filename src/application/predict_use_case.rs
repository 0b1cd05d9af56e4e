// ============================================================
// Layer 2 — PredictUseCase
// ============================================================
// Loads the best checkpoint written by `train` and classifies
// a single image file.
//
//   Step 1: Read train_config.json and classes.json  (Layer 6)
//   Step 2: Rebuild the model and load model_best     (Layer 5)
//   Step 3: Preprocess the image and rank classes     (Layer 4/5)

use anyhow::{bail, Result};
use burn::backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, NdArray, Wgpu};
use std::path::{Path, PathBuf};

use crate::application::train_use_case::BackendKind;
use crate::infra::checkpoint::{CheckpointManager, CheckpointSlot};
use crate::ml::inferencer::{Inferencer, Prediction};

pub struct PredictUseCase {
    checkpoint_dir: PathBuf,
    slot:           CheckpointSlot,
    backend:        BackendKind,
}

impl PredictUseCase {
    pub fn new(checkpoint_dir: impl Into<PathBuf>, backend: BackendKind) -> Self {
        Self { checkpoint_dir: checkpoint_dir.into(), slot: CheckpointSlot::Best, backend }
    }

    /// Restore `slot` instead of the best weights.
    pub fn with_slot(mut self, slot: CheckpointSlot) -> Self {
        self.slot = slot;
        self
    }

    /// Return the `top_k` most likely classes for `image`, best first.
    pub fn predict(&self, image: &Path, top_k: usize) -> Result<Vec<Prediction>> {
        if top_k == 0 {
            bail!("top_k must be at least 1");
        }
        if !self.checkpoint_dir.is_dir() {
            bail!(
                "Checkpoint directory '{}' not found. Run 'train' first.",
                self.checkpoint_dir.display()
            );
        }
        let ckpt = CheckpointManager::new(&self.checkpoint_dir)?;

        match self.backend {
            BackendKind::Wgpu => {
                Inferencer::<Wgpu>::from_checkpoint(&ckpt, self.slot, WgpuDevice::default())?
                    .predict_file(image, top_k)
            }
            BackendKind::Ndarray => {
                Inferencer::<NdArray>::from_checkpoint(&ckpt, self.slot, NdArrayDevice::Cpu)?
                    .predict_file(image, top_k)
            }
        }
    }
}
