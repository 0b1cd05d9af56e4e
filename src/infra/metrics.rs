// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per epoch so learning curves can be
// plotted after (or during) a run.
//
// Output file: <checkpoint_dir>/metrics.csv
//
//   epoch,train_loss,train_top1,train_top5,valid_loss,valid_top1,valid_top5
//   1,2.301200,11.250000,50.000000,2.290100,12.500000,52.000000
//   ...
//
// Accuracies are percentages. If valid_loss climbs while
// train_loss keeps falling, the model is overfitting.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

const HEADER: &str = "epoch,train_loss,train_top1,train_top5,valid_loss,valid_top1,valid_top5";

/// Loss and top-1 / top-5 accuracy of one pass over a dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseMetrics {
    pub loss: f64,
    pub top1: f64,
    pub top5: f64,
}

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,
    pub train: PhaseMetrics,
    pub valid: PhaseMetrics,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train: PhaseMetrics, valid: PhaseMetrics) -> Self {
        Self { epoch, train, valid }
    }

    /// Returns true if this epoch's validation loss beats `best_valid_loss`.
    /// A NaN loss never improves; anything else improves on a NaN best.
    pub fn is_improvement(&self, best_valid_loss: f64) -> bool {
        let loss = self.valid.loss;
        !loss.is_nan() && (best_valid_loss.is_nan() || loss < best_valid_loss)
    }

    fn csv_row(&self) -> String {
        format!(
            "{},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6}",
            self.epoch,
            self.train.loss, self.train.top1, self.train.top5,
            self.valid.loss, self.valid.top1, self.valid.top5,
        )
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet, so
    /// repeated runs append to the same history.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;
        writeln!(f, "{}", m.csv_row())?;
        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn phase(loss: f64, top1: f64, top5: f64) -> PhaseMetrics {
        PhaseMetrics { loss, top1, top5 }
    }

    #[test]
    fn test_is_improvement() {
        let m = EpochMetrics::new(2, phase(2.5, 20.0, 60.0), phase(2.3, 21.0, 61.0));
        assert!(m.is_improvement(3.0));
        assert!(!m.is_improvement(2.0));
        assert!(m.is_improvement(f64::INFINITY));
    }

    #[test]
    fn test_nan_loss_is_never_an_improvement() {
        let diverged = EpochMetrics::new(1, phase(f64::NAN, 0.0, 0.0), phase(f64::NAN, 0.0, 0.0));
        assert!(!diverged.is_improvement(f64::INFINITY));
        assert!(!diverged.is_improvement(f64::NAN));

        let recovered = EpochMetrics::new(2, phase(2.0, 10.0, 50.0), phase(2.1, 9.0, 48.0));
        assert!(recovered.is_improvement(f64::NAN));
    }

    #[test]
    fn test_header_written_once_and_rows_appended() {
        let dir = tempfile::tempdir().unwrap();

        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&EpochMetrics::new(1, phase(1.0, 50.0, 90.0), phase(1.5, 40.0, 80.0))).unwrap();

        // A second logger on the same dir must not rewrite the header
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&EpochMetrics::new(2, phase(0.5, 75.0, 100.0), phase(1.0, 60.0, 95.0))).unwrap();

        let text  = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADER);
        assert_eq!(lines[1], "1,1.000000,50.000000,90.000000,1.500000,40.000000,80.000000");
        assert!(lines[2].starts_with("2,0.500000"));
    }
}
