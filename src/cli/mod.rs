// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`   — trains MobileNetV3 on an image-folder dataset
//   2. `predict` — loads the best checkpoint and classifies an image

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, PredictArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "mobilenet-trainer",
    version,
    about = "Train a MobileNetV3 image classifier, then classify images with it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Predict(args) => run_predict(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on images in: {}", args.data_dir.display());

    let checkpoint_dir = args.checkpoint_dir.clone();
    let summary = TrainUseCase::new(args.into()).execute()?;

    println!(
        "\n{:>5}  {:>10}  {:>8}  {:>10}  {:>8}  {:>8}",
        "epoch", "train_loss", "train@1", "valid_loss", "valid@1", "valid@5"
    );
    for row in &summary.history {
        let marker = if row.epoch == summary.best_epoch { " *" } else { "" };
        println!(
            "{:>5}  {:>10.4}  {:>8.2}  {:>10.4}  {:>8.2}  {:>8.2}{}",
            row.epoch, row.train.loss, row.train.top1,
            row.valid.loss, row.valid.top1, row.valid.top5, marker
        );
    }

    println!(
        "\nTraining complete. Best epoch {} (valid loss {:.4}), checkpoints in '{}'.",
        summary.best_epoch,
        summary.best_valid_loss,
        checkpoint_dir.display()
    );
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    use crate::application::predict_use_case::PredictUseCase;

    let preds = PredictUseCase::new(args.checkpoint_dir, args.backend)
        .with_slot(args.checkpoint)
        .predict(&args.image, args.top_k)?;

    println!("\n{}", args.image.display());
    for (rank, p) in preds.iter().enumerate() {
        println!("  {}. {:<20} {:>6.2}%", rank + 1, p.class_name, p.probability * 100.0);
    }
    Ok(())
}
