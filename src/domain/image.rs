// ============================================================
// Layer 3 — Labelled Image Domain Types
// ============================================================
// An image file on disk paired with its class index, and the
// collection of such images together with the ordered class
// names the indices refer to.
//
// The label is an index into `class_names`, so two collections
// only agree on labels when they share the same class list.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One image file and the class it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledImage {
    /// Path to the encoded image (png, jpg, bmp)
    pub path: PathBuf,

    /// Index into the owning collection's `class_names`
    pub label: usize,
}

impl LabeledImage {
    pub fn new(path: impl Into<PathBuf>, label: usize) -> Self {
        Self { path: path.into(), label }
    }
}

/// Every labelled image found by an `ImageSource`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageCollection {
    /// Class names ordered by label index
    pub class_names: Vec<String>,

    /// All images, in discovery order
    pub items: Vec<LabeledImage>,
}

impl ImageCollection {
    pub fn new(class_names: Vec<String>, items: Vec<LabeledImage>) -> Self {
        Self { class_names, items }
    }

    pub fn num_classes(&self) -> usize {
        self.class_names.len()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of images per class, indexed by label
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.class_names.len()];
        for item in &self.items {
            if let Some(c) = counts.get_mut(item.label) {
                *c += 1;
            }
        }
        counts
    }
}
