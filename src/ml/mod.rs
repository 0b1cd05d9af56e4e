// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn module definitions and the code that drives them.
//
//   activation.rs     — relu6, hard-sigmoid, hard-swish
//   squeeze_excite.rs — channel gating block
//   sep_conv.rs       — depthwise-separable 3x3 convolution
//   block.rs          — inverted-residual block with optional SE
//   model.rs          — MobileNetV3 small / large
//   trainer.rs        — epoch train / validate loop, checkpointing
//   inferencer.rs     — best checkpoint → single-image prediction
//
// The model knows nothing about training: the trainer calls
// forward / forward_classification and owns everything else.
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Howard et al. (2019) Searching for MobileNetV3

/// Gating non-linearities
pub mod activation;

/// Squeeze-and-excite channel attention
pub mod squeeze_excite;

/// Depthwise-separable convolution
pub mod sep_conv;

/// Inverted-residual block
pub mod block;

/// MobileNetV3 architecture
pub mod model;

/// Training loop with validation and checkpointing
pub mod trainer;

/// Prediction from the best checkpoint
pub mod inferencer;
