#![recursion_limit = "256"]
//! MobileNetV3 image classification on Burn.
//!
//! The crate is split into the same six layers the `mobilenet-trainer`
//! binary drives:
//!
//! - `cli`: clap commands (`train`, `predict`)
//! - `application`: training and prediction workflows
//! - `domain`: labelled images, running averages, top-k accuracy
//! - `data`: image discovery, decoding, Burn datasets and batchers
//! - `ml`: hard activations, squeeze-and-excite, separable conv,
//!   inverted-residual blocks, MobileNetV3, the training loop
//! - `infra`: checkpoints and the metrics CSV
//!
//! Building blocks that neither variant table uses (`SepConv2d`,
//! `Relu6`, `BlockSpec::with_nl_code`) are exported for custom
//! architectures.

pub mod application;
pub mod cli;
pub mod data;
pub mod domain;
pub mod infra;
pub mod ml;
