// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Epoch-level train / validate control loop.
//
// Per epoch:
//   1. train_epoch  — forward, loss, backward, optimiser step for
//                     every training batch
//   2. valid_epoch  — forward + loss only, on model.valid() (the
//                     inner, non-autodiff backend, so BatchNorm uses
//                     its running statistics and dropout is off)
//   3. checkpoint   — always saved; also saved as "best" when the
//                     validation loss beats every earlier epoch
//   4. metrics row  — appended to metrics.csv
//
// Running loss and top-1 / top-5 accuracy are averaged over
// samples (weighted by batch size), not over batches.
//
// Reference: Burn Book §5 (Custom Training Loop)

use anyhow::{anyhow, Result};
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::AutodiffModule,
    optim::{
        decay::WeightDecayConfig, momentum::MomentumConfig, AdamConfig, GradientsParams,
        Optimizer, SgdConfig,
    },
    prelude::*,
    tensor::{backend::AutodiffBackend, ElementConversion},
};
use std::sync::Arc;

use crate::application::train_use_case::{OptimizerKind, TrainConfig};
use crate::data::{
    batcher::{ImageBatch, ImageBatcher},
    dataset::ImageDataset,
};
use crate::domain::stats::{accuracy, AverageMeter};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger, PhaseMetrics},
};
use crate::ml::model::{MobileNetV3, ModelConfig};

/// Knobs the loop needs besides the model, optimiser and data.
#[derive(Debug, Clone)]
pub struct TrainerSettings {
    pub learning_rate:   f64,
    pub label_smoothing: Option<f32>,
    /// Log running averages every this many steps (0 disables)
    pub log_interval:    usize,
    /// Per-epoch checkpoints to keep on disk (0 keeps all)
    pub keep_last:       usize,
}

impl Default for TrainerSettings {
    fn default() -> Self {
        Self {
            learning_rate:   0.01,
            label_smoothing: None,
            log_interval:    100,
            keep_last:       0,
        }
    }
}

/// Outcome of a whole `train` call.
#[derive(Debug, Clone)]
pub struct TrainSummary {
    /// Epoch whose weights are in the best-checkpoint slot
    pub best_epoch:      usize,
    pub best_valid_loss: f64,
    pub history:         Vec<EpochMetrics>,
}

/// Holds the epoch currently in the best-checkpoint slot.
#[derive(Debug, Clone, Copy)]
struct BestTracker {
    epoch: usize,
    loss:  f64,
}

impl Default for BestTracker {
    fn default() -> Self {
        Self { epoch: 0, loss: f64::INFINITY }
    }
}

impl BestTracker {
    /// The first epoch always takes the slot, so `model_best` exists even
    /// when validation diverges; later epochs must beat it.
    fn observe(&mut self, row: &EpochMetrics) -> bool {
        let is_best = self.epoch == 0 || row.is_improvement(self.loss);
        if is_best {
            self.epoch = row.epoch;
            self.loss  = row.valid.loss;
        }
        is_best
    }
}

/// Running averages for one pass over a loader.
#[derive(Debug, Default)]
struct PhaseMeters {
    loss: AverageMeter,
    top1: AverageMeter,
    top5: AverageMeter,
}

impl PhaseMeters {
    fn update(&mut self, loss: f64, top1: f64, top5: f64, n: usize) {
        self.loss.update(loss, n);
        self.top1.update(top1, n);
        self.top5.update(top5, n);
    }

    fn log_step(&self, phase: &str, step: usize) {
        tracing::info!(
            "{} {} {:e} {:.6} {:.6}",
            phase, step, self.loss.avg, self.top1.avg, self.top5.avg
        );
    }

    fn finish(&self) -> PhaseMetrics {
        PhaseMetrics {
            loss: self.loss.avg,
            top1: self.top1.avg,
            top5: self.top5.avg,
        }
    }
}

pub struct Trainer<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<MobileNetV3<B>, B>,
{
    model:        MobileNetV3<B>,
    optim:        O,
    train_loader: Arc<dyn DataLoader<ImageBatch<B>>>,
    valid_loader: Arc<dyn DataLoader<ImageBatch<B::InnerBackend>>>,
    ckpt:         CheckpointManager,
    metrics:      MetricsLogger,
    settings:     TrainerSettings,
}

impl<B, O> Trainer<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<MobileNetV3<B>, B>,
{
    pub fn new(
        model:        MobileNetV3<B>,
        optim:        O,
        train_loader: Arc<dyn DataLoader<ImageBatch<B>>>,
        valid_loader: Arc<dyn DataLoader<ImageBatch<B::InnerBackend>>>,
        ckpt:         CheckpointManager,
        metrics:      MetricsLogger,
        settings:     TrainerSettings,
    ) -> Self {
        Self { model, optim, train_loader, valid_loader, ckpt, metrics, settings }
    }

    /// Train for `epochs` epochs, checkpointing after each one.
    pub fn train(&mut self, epochs: usize) -> Result<TrainSummary> {
        let mut best    = BestTracker::default();
        let mut history = Vec::with_capacity(epochs);

        for epoch in 1..=epochs {
            tracing::info!("epoch {}", epoch);

            let train = self.train_epoch(epoch)?;
            tracing::info!(
                "train_top1_acc {:.5}, train_top5_acc {:.5}, train_loss {:.5}",
                train.top1, train.top5, train.loss
            );

            let valid = self.valid_epoch(epoch)?;
            tracing::info!(
                "valid_top1_acc {:.5}, valid_top5_acc {:.5}, valid_loss {:.5}",
                valid.top1, valid.top5, valid.loss
            );

            if !valid.loss.is_finite() {
                tracing::warn!("epoch {} validation loss is {}", epoch, valid.loss);
            }

            let row     = EpochMetrics::new(epoch, train, valid);
            let is_best = best.observe(&row);

            self.ckpt.save_model(&self.model, epoch, is_best)?;
            if self.settings.keep_last > 0 {
                self.ckpt.prune(epoch, self.settings.keep_last)?;
            }
            self.metrics.log(&row)?;
            history.push(row);
        }

        Ok(TrainSummary {
            best_epoch:      best.epoch,
            best_valid_loss: best.loss,
            history,
        })
    }

    /// One pass over the training loader with parameter updates.
    pub fn train_epoch(&mut self, epoch: usize) -> Result<PhaseMetrics> {
        let mut meters = PhaseMeters::default();

        for (step, batch) in self.train_loader.iter().enumerate() {
            if batch.is_empty() {
                continue;
            }
            let n = batch.len();
            let (loss, logits) = self.model.forward_classification(
                batch.images,
                batch.targets.clone(),
                self.settings.label_smoothing,
            );
            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &self.model);
            self.model = self.optim.step(self.settings.learning_rate, self.model.clone(), grads);

            let (top1, top5) = batch_accuracy(logits, batch.targets)?;
            meters.update(loss_val, top1, top5, n);

            if self.should_log(step) {
                meters.log_step("train", step);
            }
        }

        tracing::debug!("epoch {} trained on {} samples", epoch, meters.loss.count);
        Ok(meters.finish())
    }

    /// One pass over the validation loader; parameters are untouched.
    pub fn valid_epoch(&self, epoch: usize) -> Result<PhaseMetrics> {
        let model  = self.model.valid();
        let mut meters = PhaseMeters::default();

        for (step, batch) in self.valid_loader.iter().enumerate() {
            if batch.is_empty() {
                continue;
            }
            let n = batch.len();
            let (loss, logits) = model.forward_classification(
                batch.images,
                batch.targets.clone(),
                self.settings.label_smoothing,
            );
            let loss_val: f64 = loss.into_scalar().elem::<f64>();

            let (top1, top5) = batch_accuracy(logits, batch.targets)?;
            meters.update(loss_val, top1, top5, n);

            if self.should_log(step) {
                meters.log_step("valid", step);
            }
        }

        tracing::debug!("epoch {} validated on {} samples", epoch, meters.loss.count);
        Ok(meters.finish())
    }

    fn should_log(&self, step: usize) -> bool {
        self.settings.log_interval > 0 && step % self.settings.log_interval == 0
    }
}

/// Top-1 and top-5 accuracy (percent) of one batch.
pub fn batch_accuracy<B: Backend>(
    logits:  Tensor<B, 2>,
    targets: Tensor<B, 1, Int>,
) -> Result<(f64, f64)> {
    let [_, num_classes] = logits.dims();
    let scores = logits
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow!("Cannot read logits: {e:?}"))?;
    let targets = targets
        .into_data()
        .convert::<i64>()
        .to_vec::<i64>()
        .map_err(|e| anyhow!("Cannot read targets: {e:?}"))?;

    let acc = accuracy(&scores, num_classes, &targets, &[1, 5]);
    Ok((acc[0], acc[1]))
}

/// Heavy-ball momentum without dampening; `None` when `momentum` is 0.
fn sgd_momentum(momentum: f64) -> Option<MomentumConfig> {
    (momentum > 0.0).then(|| {
        MomentumConfig::new()
            .with_momentum(momentum)
            .with_dampening(0.0)
    })
}

/// Build the model, loaders and optimiser for `B`, then run the loop.
pub fn run_training<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    num_classes:   usize,
    train_dataset: ImageDataset,
    valid_dataset: ImageDataset,
    ckpt:          CheckpointManager,
    device:        B::Device,
) -> Result<TrainSummary> {
    B::seed(cfg.seed);

    let model_cfg = ModelConfig::new(num_classes, cfg.variant).with_dropout(cfg.dropout);
    let model: MobileNetV3<B> = model_cfg.init(&device);
    tracing::info!(
        "Model ready: MobileNetV3-{} with {} blocks, {} classes",
        cfg.variant, model.blocks.len(), model.num_classes()
    );

    // ── Training data loader (AutodiffBackend) ────────────────────────────────
    let train_loader = DataLoaderBuilder::new(ImageBatcher::<B>::new(device.clone(), cfg.image_size))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(cfg.num_workers)
        .build(train_dataset);

    // ── Validation data loader (InnerBackend — no autodiff overhead) ──────────
    let valid_loader = DataLoaderBuilder::new(ImageBatcher::<B::InnerBackend>::new(device.clone(), cfg.image_size))
        .batch_size(cfg.batch_size)
        .num_workers(cfg.num_workers)
        .build(valid_dataset);

    let metrics  = MetricsLogger::new(ckpt.dir())?;
    tracing::info!("Writing epoch metrics to '{}'", metrics.csv_path().display());
    let settings = TrainerSettings {
        learning_rate:   cfg.lr,
        label_smoothing: (cfg.label_smoothing > 0.0).then_some(cfg.label_smoothing),
        log_interval:    cfg.log_interval,
        keep_last:       cfg.keep_last,
    };
    let weight_decay = (cfg.weight_decay > 0.0).then(|| WeightDecayConfig::new(cfg.weight_decay));

    match cfg.optimizer {
        OptimizerKind::Sgd => {
            let optim = SgdConfig::new()
                .with_momentum(sgd_momentum(cfg.momentum))
                .with_weight_decay(weight_decay)
                .init();
            Trainer::new(model, optim, train_loader, valid_loader, ckpt, metrics, settings)
                .train(cfg.epochs)
        }
        OptimizerKind::Adam => {
            let optim = AdamConfig::new()
                .with_weight_decay(weight_decay)
                .init();
            Trainer::new(model, optim, train_loader, valid_loader, ckpt, metrics, settings)
                .train(cfg.epochs)
        }
    }
}
