// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs and traits that describe the problem:
// labelled images, the collections they live in, and the
// numeric bookkeeping the training loop performs on them.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file decoding or tensor code
//   - Only plain Rust structs, enums, traits and pure functions
//
// Because nothing here touches a tensor, running averages and
// top-k accuracy are unit-tested without any backend.
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// A labelled image on disk and the collection of them
pub mod image;

// Running averages and top-k accuracy
pub mod stats;

// Core abstractions (traits) that other layers implement
pub mod traits;
