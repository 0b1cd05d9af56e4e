// ============================================================
// Layer 3 — Training Statistics
// ============================================================
// The numeric bookkeeping of the epoch loop:
//
//   AverageMeter  — running mean weighted by batch size, so the
//                   epoch average is the per-sample mean even when
//                   the last batch is smaller than the others
//
//   topk_correct  — how many samples have their target among the
//                   k highest logits
//
//   accuracy      — top-k accuracy as a percentage for several k
//
// Logits arrive here as a flat row-major slice [n * num_classes]
// copied off the device once per batch.

/// Weighted running average of a per-batch quantity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AverageMeter {
    /// Last value passed to `update`
    pub last: f64,

    /// Sum of `value * n` over all updates
    pub sum: f64,

    /// Total weight seen so far
    pub count: usize,

    /// `sum / count`, or 0.0 before the first update
    pub avg: f64,
}

impl AverageMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `value` observed over `n` samples.
    pub fn update(&mut self, value: f64, n: usize) {
        self.last   = value;
        self.sum   += value * n as f64;
        self.count += n;
        if self.count > 0 {
            self.avg = self.sum / self.count as f64;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Count the rows of `logits` whose target class ranks in the top `k`.
///
/// `logits` is row-major `[targets.len(), num_classes]`. Ties are broken
/// towards the lower class index. `k` larger than `num_classes` is clamped,
/// so top-5 on a 3-class problem counts every sample. A sample whose
/// target score is not finite is never counted.
pub fn topk_correct(logits: &[f32], num_classes: usize, targets: &[i64], k: usize) -> usize {
    if num_classes == 0 || k == 0 {
        return 0;
    }
    let k = k.min(num_classes);

    targets
        .iter()
        .zip(logits.chunks_exact(num_classes))
        .filter(|(target, row)| {
            let Ok(target) = usize::try_from(**target) else { return false };
            let Some(&score) = row.get(target) else { return false };
            // A NaN or infinite score cannot be ranked.
            if !score.is_finite() {
                return false;
            }
            // Rank of the target = classes that beat it outright, plus
            // tied classes with a lower index.
            let rank = row
                .iter()
                .enumerate()
                .filter(|&(i, &s)| s > score || (s == score && i < target))
                .count();
            rank < k
        })
        .count()
}

/// Top-k accuracy percentages, one per entry of `topk`.
///
/// Returns `correct * 100 / n` for each k. An empty batch yields zeros.
pub fn accuracy(logits: &[f32], num_classes: usize, targets: &[i64], topk: &[usize]) -> Vec<f64> {
    let n = targets.len();
    topk.iter()
        .map(|&k| {
            if n == 0 {
                0.0
            } else {
                topk_correct(logits, num_classes, targets, k) as f64 * 100.0 / n as f64
            }
        })
        .collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meter_weighted_by_batch_size() {
        let mut m = AverageMeter::new();
        m.update(1.0, 3);
        m.update(3.0, 1);
        // (1*3 + 3*1) / 4
        assert!((m.avg - 1.5).abs() < 1e-12);
        assert_eq!(m.count, 4);
        assert_eq!(m.last, 3.0);
    }

    #[test]
    fn test_meter_starts_at_zero() {
        let m = AverageMeter::new();
        assert_eq!(m.avg, 0.0);
        assert_eq!(m.count, 0);
    }

    #[test]
    fn test_meter_reset() {
        let mut m = AverageMeter::new();
        m.update(5.0, 2);
        m.reset();
        assert_eq!(m, AverageMeter::default());
    }

    #[test]
    fn test_top1_and_top2() {
        // 2 samples, 3 classes
        let logits = [
            0.1, 0.7, 0.2, // predicts 1, second choice 2
            0.5, 0.1, 0.4, // predicts 0, second choice 2
        ];
        let targets = [1, 2];
        assert_eq!(topk_correct(&logits, 3, &targets, 1), 1);
        assert_eq!(topk_correct(&logits, 3, &targets, 2), 2);
    }

    #[test]
    fn test_k_clamped_to_num_classes() {
        let logits  = [0.0, 1.0, 2.0];
        let targets = [0];
        assert_eq!(topk_correct(&logits, 3, &targets, 5), 1);
    }

    #[test]
    fn test_ties_prefer_lower_index() {
        let logits = [1.0, 1.0, 1.0];
        assert_eq!(topk_correct(&logits, 3, &[0], 1), 1);
        assert_eq!(topk_correct(&logits, 3, &[2], 1), 0);
        assert_eq!(topk_correct(&logits, 3, &[2], 3), 1);
    }

    #[test]
    fn test_out_of_range_target_never_correct() {
        let logits = [0.3, 0.7];
        assert_eq!(topk_correct(&logits, 2, &[5], 2), 0);
        assert_eq!(topk_correct(&logits, 2, &[-1], 2), 0);
    }

    #[test]
    fn test_accuracy_percentages() {
        let logits  = [0.9, 0.1, 0.2, 0.8, 0.6, 0.4, 0.3, 0.7];
        let targets = [0, 1, 1, 1];
        let acc = accuracy(&logits, 2, &targets, &[1, 5]);
        // rows predict 0, 1, 0, 1 → 3 of 4 correct
        assert!((acc[0] - 75.0).abs() < 1e-9);
        assert!((acc[1] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_finite_scores_are_never_correct() {
        let logits = [f32::NAN; 4];
        assert_eq!(accuracy(&logits, 2, &[0, 1], &[1, 5]), vec![0.0, 0.0]);

        let logits = [f32::INFINITY, 0.0, 0.2, 0.8];
        assert_eq!(topk_correct(&logits, 2, &[0, 1], 1), 1);
    }

    #[test]
    fn test_accuracy_empty_batch() {
        assert_eq!(accuracy(&[], 10, &[], &[1, 5]), vec![0.0, 0.0]);
    }
}
