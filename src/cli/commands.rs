// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `train` and `predict`
// and all their configurable flags.
//
// clap's derive macros generate help text, error messages for
// missing args, and string → number conversion.

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::train_use_case::{BackendKind, OptimizerKind, TrainConfig};
use crate::infra::checkpoint::CheckpointSlot;
use crate::ml::model::Variant;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train MobileNetV3 on an image-folder dataset
    Train(TrainArgs),

    /// Classify one image using the best saved checkpoint
    Predict(PredictArgs),
}

fn parse_variant(s: &str) -> Result<Variant, String> {
    s.parse().map_err(|e: anyhow::Error| e.to_string())
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Dataset root holding train/<class>/ and optionally valid/<class>/
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Directory to save checkpoints, metrics and run config
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// Architecture size: small or large
    #[arg(long, default_value = "small", value_parser = parse_variant)]
    pub variant: Variant,

    /// Images are resized to image_size x image_size
    #[arg(long, default_value_t = 224)]
    pub image_size: usize,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 30)]
    pub epochs: usize,

    #[arg(long, default_value_t = 0.05)]
    pub lr: f64,

    #[arg(long, value_enum, default_value_t = OptimizerKind::Sgd)]
    pub optimizer: OptimizerKind,

    /// Heavy-ball SGD momentum (no dampening); 0 disables it
    #[arg(long, default_value_t = 0.9)]
    pub momentum: f64,

    /// L2 penalty; 0 disables it
    #[arg(long, default_value_t = 4e-5)]
    pub weight_decay: f32,

    /// Cross-entropy label smoothing in [0, 1)
    #[arg(long, default_value_t = 0.0)]
    pub label_smoothing: f32,

    /// Dropout before the classifier
    #[arg(long, default_value_t = 0.2)]
    pub dropout: f64,

    /// Background threads decoding images
    #[arg(long, default_value_t = 4)]
    pub num_workers: usize,

    /// Seeds weight init, shuffling and the train/valid split
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Share of train/ kept for training when there is no valid/ folder
    #[arg(long, default_value_t = 0.8)]
    pub train_fraction: f64,

    /// Log running averages every N batches
    #[arg(long, default_value_t = 100)]
    pub log_interval: usize,

    /// Keep only the newest N per-epoch checkpoints (0 keeps all)
    #[arg(long, default_value_t = 0)]
    pub keep_last: usize,

    #[arg(long, value_enum, default_value_t = BackendKind::Wgpu)]
    pub backend: BackendKind,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_dir:        a.data_dir,
            checkpoint_dir:  a.checkpoint_dir,
            variant:         a.variant,
            image_size:      a.image_size,
            batch_size:      a.batch_size,
            epochs:          a.epochs,
            lr:              a.lr,
            optimizer:       a.optimizer,
            momentum:        a.momentum,
            weight_decay:    a.weight_decay,
            label_smoothing: a.label_smoothing,
            dropout:         a.dropout,
            num_workers:     a.num_workers,
            seed:            a.seed,
            train_fraction:  a.train_fraction,
            log_interval:    a.log_interval,
            keep_last:       a.keep_last,
            backend:         a.backend,
        }
    }
}

/// All arguments for the `predict` command
#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Image file to classify
    #[arg(long)]
    pub image: PathBuf,

    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// How many ranked classes to print
    #[arg(long, default_value_t = 5)]
    pub top_k: usize,

    /// Weights to use: the best validation epoch or the last one
    #[arg(long, value_enum, default_value_t = CheckpointSlot::Best)]
    pub checkpoint: CheckpointSlot,

    #[arg(long, value_enum, default_value_t = BackendKind::Wgpu)]
    pub backend: BackendKind,
}

#[cfg(test)]
mod tests {
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_args_into_config() {
        let cli = Cli::try_parse_from([
            "mobilenet-trainer", "train",
            "--data-dir", "imgs",
            "--variant", "large",
            "--optimizer", "adam",
            "--backend", "ndarray",
            "--epochs", "3",
        ])
        .unwrap();

        let super::Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: super::TrainConfig = args.into();
        assert_eq!(cfg.data_dir, std::path::PathBuf::from("imgs"));
        assert_eq!(cfg.variant, super::Variant::Large);
        assert_eq!(cfg.optimizer, super::OptimizerKind::Adam);
        assert_eq!(cfg.backend, super::BackendKind::Ndarray);
        assert_eq!(cfg.epochs, 3);
        assert_eq!(cfg.image_size, 224);
    }

    #[test]
    fn test_unknown_variant_is_rejected() {
        let res = Cli::try_parse_from(["mobilenet-trainer", "train", "--variant", "medium"]);
        assert!(res.is_err());
    }

    #[test]
    fn test_predict_requires_image() {
        assert!(Cli::try_parse_from(["mobilenet-trainer", "predict"]).is_err());
        let cli = Cli::try_parse_from(["mobilenet-trainer", "predict", "--image", "a.png", "--top-k", "3"])
            .unwrap();
        let super::Commands::Predict(args) = cli.command else { panic!("expected predict") };
        assert_eq!(args.top_k, 3);
        assert_eq!(args.checkpoint, super::CheckpointSlot::Best);

        let cli = Cli::try_parse_from([
            "mobilenet-trainer", "predict", "--image", "a.png", "--checkpoint", "latest",
        ])
        .unwrap();
        let super::Commands::Predict(args) = cli.command else { panic!("expected predict") };
        assert_eq!(args.checkpoint, super::CheckpointSlot::Latest);
    }
}
