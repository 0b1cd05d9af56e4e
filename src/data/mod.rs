// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from image files on disk to tensor batches:
//
//   class folders
//       │
//       ▼
//   ImageFolderLoader  → finds files, assigns class labels
//       │
//       ▼
//   split_train_val    → (only when there is no valid/ folder)
//       │
//       ▼
//   ImageDataset       → Burn Dataset, decodes lazily via
//       │                ImagePreprocessor
//       ▼
//   ImageBatcher       → stacks samples into tensors
//       │
//       ▼
//   DataLoader         → feeds batches to the trainer
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Discovers labelled images in class-per-folder layouts
pub mod loader;

/// Decodes, resizes and normalises images
pub mod preprocessor;

/// Implements Burn's Dataset trait for labelled images
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Seeded train/validation split
pub mod splitter;
