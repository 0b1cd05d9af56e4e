// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer asks for images through `ImageSource`
// and never sees how they were discovered. The folder loader
// in Layer 4 is the only implementation today.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use crate::domain::image::ImageCollection;

// ─── ImageSource ──────────────────────────────────────────────────────────────
/// Any component that can enumerate labelled images.
pub trait ImageSource {
    /// Discover every labelled image this source knows about.
    fn load_all(&self) -> Result<ImageCollection>;
}
