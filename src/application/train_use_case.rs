// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Discover training images        (Layer 4 - data)
//   Step 2: Discover or split validation    (Layer 4 - data)
//   Step 3: Build lazy-decoding datasets    (Layer 4 - data)
//   Step 4: Save config and class names     (Layer 6 - infra)
//   Step 5: Run training on chosen backend  (Layer 5 - ml)
//
// Expected layout:
//   data_dir/train/<class>/*.png
//   data_dir/valid/<class>/*.png   (optional)

use anyhow::{bail, Result};
use burn::backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, Autodiff, NdArray, Wgpu};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::{
    dataset::ImageDataset,
    loader::ImageFolderLoader,
    preprocessor::ImagePreprocessor,
    splitter::split_train_val,
};
use crate::domain::{image::ImageCollection, traits::ImageSource};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    model::Variant,
    trainer::{run_training, TrainSummary},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    /// Stochastic gradient descent with optional momentum
    Sgd,
    /// Adam
    Adam,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// GPU via wgpu
    Wgpu,
    /// CPU via ndarray
    Ndarray,
}

// ─── Training Configuration ──────────────────────────────────────────────────
// All settings for a training run. Saved next to the checkpoints
// so `predict` can rebuild exactly the same model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_dir:        PathBuf,
    pub checkpoint_dir:  PathBuf,
    pub variant:         Variant,
    pub image_size:      usize,
    pub batch_size:      usize,
    pub epochs:          usize,
    pub lr:              f64,
    pub optimizer:       OptimizerKind,
    pub momentum:        f64,
    pub weight_decay:    f32,
    pub label_smoothing: f32,
    pub dropout:         f64,
    pub num_workers:     usize,
    pub seed:            u64,
    pub train_fraction:  f64,
    pub log_interval:    usize,
    pub keep_last:       usize,
    pub backend:         BackendKind,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir:        PathBuf::from("data"),
            checkpoint_dir:  PathBuf::from("checkpoints"),
            variant:         Variant::Small,
            image_size:      224,
            batch_size:      32,
            epochs:          30,
            lr:              0.05,
            optimizer:       OptimizerKind::Sgd,
            momentum:        0.9,
            weight_decay:    4e-5,
            label_smoothing: 0.0,
            dropout:         0.2,
            num_workers:     4,
            seed:            42,
            train_fraction:  0.8,
            log_interval:    100,
            keep_last:       0,
            backend:         BackendKind::Wgpu,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        if self.image_size < 32 {
            bail!("image_size must be at least 32 (MobileNetV3 downsamples by 32)");
        }
        if self.epochs == 0 {
            bail!("epochs must be at least 1");
        }
        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            bail!("train_fraction must be in (0, 1), got {}", self.train_fraction);
        }
        if !(self.lr >= 0.0) {
            bail!("learning rate must be non-negative, got {}", self.lr);
        }
        if !(0.0..1.0).contains(&self.dropout) {
            bail!("dropout must be in [0, 1), got {}", self.dropout);
        }
        if !(0.0..1.0).contains(&self.label_smoothing) {
            bail!("label_smoothing must be in [0, 1), got {}", self.label_smoothing);
        }
        Ok(())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainSummary> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Steps 1-2: Discover images ────────────────────────────────────────
        let (train, valid) = load_splits(cfg)?;
        if train.is_empty() {
            bail!("No training images found under '{}'", cfg.data_dir.display());
        }
        if valid.is_empty() {
            bail!("Validation set is empty; add a valid/ folder or lower --train-fraction");
        }
        let class_names = train.class_names.clone();
        tracing::info!(
            "Split: {} train, {} validation, {} classes",
            train.len(),
            valid.len(),
            train.num_classes()
        );
        for (name, count) in class_names.iter().zip(train.class_counts()) {
            tracing::debug!("  class '{}': {} training images", name, count);
        }

        // ── Step 3: Build Burn datasets ───────────────────────────────────────
        let prep          = ImagePreprocessor::new(cfg.image_size);
        let train_dataset = ImageDataset::new(train.items, prep);
        let valid_dataset = ImageDataset::new(valid.items, prep);

        // ── Step 4: Save what predict needs ───────────────────────────────────
        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt.save_config(cfg)?;
        ckpt.save_classes(&class_names)?;

        // ── Step 5: Run training loop (Layer 5) ───────────────────────────────
        let summary = match cfg.backend {
            BackendKind::Wgpu => {
                let device = WgpuDevice::default();
                tracing::info!("Using WGPU device: {:?}", device);
                run_training::<Autodiff<Wgpu>>(
                    cfg, class_names.len(), train_dataset, valid_dataset, ckpt, device,
                )?
            }
            BackendKind::Ndarray => {
                tracing::info!("Using ndarray CPU backend");
                run_training::<Autodiff<NdArray>>(
                    cfg, class_names.len(), train_dataset, valid_dataset, ckpt, NdArrayDevice::Cpu,
                )?
            }
        };

        tracing::info!(
            "Best validation loss {:.5} at epoch {}",
            summary.best_valid_loss,
            summary.best_epoch
        );
        Ok(summary)
    }
}

/// Load `train/`, and `valid/` if present; otherwise split `train/`.
fn load_splits(cfg: &TrainConfig) -> Result<(ImageCollection, ImageCollection)> {
    let train_dir = cfg.data_dir.join("train");
    let valid_dir = cfg.data_dir.join("valid");

    tracing::info!("Loading training images from '{}'", train_dir.display());
    let train = ImageFolderLoader::new(&train_dir).load_all()?;

    if valid_dir.is_dir() {
        let valid = ImageFolderLoader::new(&valid_dir)
            .with_classes(train.class_names.clone())
            .load_all()?;
        return Ok((train, valid));
    }

    tracing::info!(
        "No '{}' folder; holding out {:.0}% of training images",
        valid_dir.display(),
        (1.0 - cfg.train_fraction) * 100.0
    );
    let (train_items, valid_items) = split_train_val(train.items, cfg.train_fraction, cfg.seed);
    Ok((
        ImageCollection::new(train.class_names.clone(), train_items),
        ImageCollection::new(train.class_names, valid_items),
    ))
}
