// ============================================================
// Layer 4 — Image Folder Loader
// ============================================================
// Discovers labelled images laid out one folder per class:
//
//   root/
//     cat/  0001.png  0002.jpg ...
//     dog/  0001.png ...
//
// Class folders are sorted by name, and the position in that
// order becomes the label index. Only the file header is read
// here (to reject files the decoder cannot open); full decoding
// happens lazily in the dataset.
//
// Reference: Rust Book §9 (Error Handling)

use anyhow::{bail, Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::image::{ImageCollection, LabeledImage};
use crate::domain::traits::ImageSource;

/// File extensions the image decoder is built with.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Loads every image under a class-per-folder directory.
pub struct ImageFolderLoader {
    root:    PathBuf,
    /// Pinned class ordering; `None` means derive it from the folders
    classes: Option<Vec<String>>,
}

impl ImageFolderLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), classes: None }
    }

    /// Use an existing class list so labels match another split.
    /// Folders not in the list are skipped.
    pub fn with_classes(mut self, classes: Vec<String>) -> Self {
        self.classes = Some(classes);
        self
    }

    fn class_dirs(&self) -> Result<Vec<(String, PathBuf)>> {
        let mut dirs = Vec::new();
        for entry in fs::read_dir(&self.root)
            .with_context(|| format!("Cannot read directory '{}'", self.root.display()))?
        {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                dirs.push((name.to_string(), path.clone()));
            }
        }
        dirs.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(dirs)
    }
}

impl ImageSource for ImageFolderLoader {
    fn load_all(&self) -> Result<ImageCollection> {
        if !self.root.is_dir() {
            bail!("Image directory '{}' does not exist", self.root.display());
        }

        let dirs = self.class_dirs()?;
        let class_names: Vec<String> = match &self.classes {
            Some(pinned) => pinned.clone(),
            None         => dirs.iter().map(|(name, _)| name.clone()).collect(),
        };

        let mut items = Vec::new();
        for (name, dir) in &dirs {
            let Some(label) = class_names.iter().position(|c| c == name) else {
                tracing::warn!("Skipping folder '{}': not a known class", dir.display());
                continue;
            };

            let mut files: Vec<PathBuf> = fs::read_dir(dir)
                .with_context(|| format!("Cannot read directory '{}'", dir.display()))?
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_supported(p))
                .collect();
            files.sort();

            for path in files {
                match image::image_dimensions(&path) {
                    Ok(_)  => items.push(LabeledImage::new(path, label)),
                    Err(e) => tracing::warn!("Skipping '{}': {}", path.display(), e),
                }
            }
        }

        tracing::info!(
            "Found {} images in {} classes under '{}'",
            items.len(),
            class_names.len(),
            self.root.display()
        );
        Ok(ImageCollection::new(class_names, items))
    }
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
