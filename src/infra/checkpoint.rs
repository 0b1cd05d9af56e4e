// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder.
//
// File layout:
//   checkpoints/
//     model_epoch_1.*     ← weights after epoch 1
//     model_epoch_2.*     ← weights after epoch 2
//     ...
//     model_best.*        ← weights of the lowest validation loss so far
//     latest_epoch.json   ← number of the last saved epoch
//     best_epoch.json     ← number of the epoch held in model_best
//     train_config.json   ← run configuration (rebuilds the model)
//     classes.json        ← class names in label order
//
// The recorder appends its own extension, so paths here are
// given without one.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use std::{fs, path::PathBuf};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::MobileNetV3;

const BEST_NAME:    &str = "model_best";
const LATEST_FILE:  &str = "latest_epoch.json";
const BEST_FILE:    &str = "best_epoch.json";
const CONFIG_FILE:  &str = "train_config.json";
const CLASSES_FILE: &str = "classes.json";

/// Which saved weights to restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CheckpointSlot {
    /// Lowest validation loss so far
    Best,
    /// Most recently finished epoch
    Latest,
}

/// Manages saving and loading of model checkpoints.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    fn epoch_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("model_epoch_{epoch}"))
    }

    /// Save the weights for `epoch`; when `is_best` also overwrite the
    /// best-model slot.
    pub fn save_model<B: Backend>(
        &self,
        model:   &MobileNetV3<B>,
        epoch:   usize,
        is_best: bool,
    ) -> Result<()> {
        let path = self.epoch_path(epoch);
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;
        self.write_json(LATEST_FILE, &epoch)?;

        if is_best {
            let best = self.dir.join(BEST_NAME);
            CompactRecorder::new()
                .record(model.clone().into_record(), best.clone())
                .with_context(|| format!("Failed to save best checkpoint to '{}'", best.display()))?;
            self.write_json(BEST_FILE, &epoch)?;
            tracing::debug!("Epoch {} is the new best checkpoint", epoch);
        }

        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    pub fn load<B: Backend>(
        &self,
        model:  MobileNetV3<B>,
        slot:   CheckpointSlot,
        device: &B::Device,
    ) -> Result<MobileNetV3<B>> {
        match slot {
            CheckpointSlot::Best   => self.load_best(model, device),
            CheckpointSlot::Latest => self.load_latest(model, device),
        }
    }

    /// Restore the best weights into `model`.
    pub fn load_best<B: Backend>(
        &self,
        model:  MobileNetV3<B>,
        device: &B::Device,
    ) -> Result<MobileNetV3<B>> {
        let epoch = self.best_epoch()?;
        tracing::info!("Loading best checkpoint (epoch {})", epoch);
        self.load_from(model, self.dir.join(BEST_NAME), device)
    }

    /// Restore the most recently saved weights into `model`.
    pub fn load_latest<B: Backend>(
        &self,
        model:  MobileNetV3<B>,
        device: &B::Device,
    ) -> Result<MobileNetV3<B>> {
        let epoch = self.latest_epoch()?;
        tracing::info!("Loading checkpoint from epoch {}", epoch);
        self.load_from(model, self.epoch_path(epoch), device)
    }

    fn load_from<B: Backend>(
        &self,
        model:  MobileNetV3<B>,
        path:   PathBuf,
        device: &B::Device,
    ) -> Result<MobileNetV3<B>> {
        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you trained the model first?",
                    path.display())
            })?;
        Ok(model.load_record(record))
    }

    /// Delete per-epoch weight files older than the newest `keep_last`.
    /// The best-model slot is never removed.
    pub fn prune(&self, latest: usize, keep_last: usize) -> Result<usize> {
        let oldest_kept = latest.saturating_sub(keep_last.saturating_sub(1)).max(1);
        let mut removed = 0;

        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Cannot read '{}'", self.dir.display()))?
        {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
            let Some(epoch) = parse_epoch_file(name) else { continue };
            if epoch < oldest_kept {
                fs::remove_file(&path)
                    .with_context(|| format!("Cannot remove '{}'", path.display()))?;
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::debug!("Pruned {} old checkpoint files", removed);
        }
        Ok(removed)
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        self.write_json(CONFIG_FILE, cfg)
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        self.read_json(CONFIG_FILE)
            .context("Make sure you have run 'train' before 'predict'")
    }

    pub fn save_classes(&self, classes: &[String]) -> Result<()> {
        self.write_json(CLASSES_FILE, &classes)
    }

    pub fn load_classes(&self) -> Result<Vec<String>> {
        self.read_json(CLASSES_FILE)
    }

    pub fn latest_epoch(&self) -> Result<usize> {
        self.read_json(LATEST_FILE)
    }

    pub fn best_epoch(&self) -> Result<usize> {
        self.read_json(BEST_FILE)
    }

    fn write_json<T: serde::Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write '{}'", path.display()))
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed '{}'", path.display()))
    }
}

/// `model_epoch_12.mpk` → Some(12)
fn parse_epoch_file(name: &str) -> Option<usize> {
    let rest = name.strip_prefix("model_epoch_")?;
    let digits: &str = rest.split('.').next()?;
    if rest.len() == digits.len() {
        return None;
    }
    digits.parse().ok()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::{ModelConfig, Variant};
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_parse_epoch_file() {
        assert_eq!(parse_epoch_file("model_epoch_3.mpk"), Some(3));
        assert_eq!(parse_epoch_file("model_epoch_12.mpk.gz"), Some(12));
        assert_eq!(parse_epoch_file("model_epoch_3"), None);
        assert_eq!(parse_epoch_file("model_best.mpk"), None);
    }

    #[test]
    fn test_best_and_latest_pointers() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();
        let model  = ModelConfig::new(2, Variant::Small).init::<TestBackend>(&device);

        ckpt.save_model(&model, 1, true).unwrap();
        ckpt.save_model(&model, 2, false).unwrap();

        assert_eq!(ckpt.latest_epoch().unwrap(), 2);
        assert_eq!(ckpt.best_epoch().unwrap(), 1);

        let fresh = ModelConfig::new(2, Variant::Small).init::<TestBackend>(&device);
        assert!(ckpt.load_best(fresh, &device).is_ok());
    }

    #[test]
    fn test_load_restores_weights() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();
        let saved  = ModelConfig::new(3, Variant::Small).init::<TestBackend>(&device);
        ckpt.save_model(&saved, 1, true).unwrap();

        let fresh  = ModelConfig::new(3, Variant::Small).init::<TestBackend>(&device);
        let loaded = ckpt.load(fresh, CheckpointSlot::Latest, &device).unwrap();

        // Half-precision records round the weights, so compare loosely.
        let a = saved.classifier.weight.val().into_data().to_vec::<f32>().unwrap();
        let b = loaded.classifier.weight.val().into_data().to_vec::<f32>().unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-2);
        }
    }

    #[test]
    fn test_missing_checkpoint_is_an_error() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let model = ModelConfig::new(2, Variant::Small).init::<TestBackend>(&Default::default());
        assert!(ckpt.load_best(model, &Default::default()).is_err());
        assert!(ckpt.load_config().is_err());
    }

    #[test]
    fn test_prune_keeps_recent_epochs() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        for e in 1..=5 {
            fs::write(dir.path().join(format!("model_epoch_{e}.mpk")), b"w").unwrap();
        }
        fs::write(dir.path().join("model_best.mpk"), b"w").unwrap();

        assert_eq!(ckpt.prune(5, 2).unwrap(), 3);
        assert!(dir.path().join("model_epoch_4.mpk").exists());
        assert!(dir.path().join("model_epoch_5.mpk").exists());
        assert!(!dir.path().join("model_epoch_3.mpk").exists());
        assert!(dir.path().join("model_best.mpk").exists());
    }

    #[test]
    fn test_classes_round_trip() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        ckpt.save_classes(&["cat".to_string(), "dog".to_string()]).unwrap();
        assert_eq!(ckpt.load_classes().unwrap(), vec!["cat", "dog"]);
    }
}
