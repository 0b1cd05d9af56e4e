// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting persistence used by both the training and the
// prediction workflows:
//
//   checkpoint.rs — model weights (Burn's CompactRecorder), the
//                   latest/best epoch pointers, the run config and
//                   the class list, all under one directory
//
//   metrics.rs    — per-epoch loss / top-1 / top-5 rows appended
//                   to a CSV file
//
// Reference: Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;
