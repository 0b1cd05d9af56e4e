use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        loss::CrossEntropyLossConfig,
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig},
        BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d,
    },
    prelude::*,
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::ml::activation::{HardSwish, NonLinearity::{HardSwish as HS, Relu as RE}};
use crate::ml::block::{Block, BlockSpec};

/// Width of the stem convolution, which is also the first block's input.
const STEM_CHANNELS: usize = 16;

// in, kernel, hidden (expansion), out, SE, NL, stride
const SMALL_BLOCKS: [BlockSpec; 11] = [
    BlockSpec::new(16, 3, 16,  16, true,  RE, 2),
    BlockSpec::new(16, 3, 72,  24, false, RE, 2),
    BlockSpec::new(24, 3, 88,  24, false, RE, 1),
    BlockSpec::new(24, 5, 96,  40, true,  HS, 2),
    BlockSpec::new(40, 5, 240, 40, true,  HS, 1),
    BlockSpec::new(40, 5, 240, 40, true,  HS, 1),
    BlockSpec::new(40, 5, 120, 48, true,  HS, 1),
    BlockSpec::new(48, 5, 144, 48, true,  HS, 1),
    BlockSpec::new(48, 5, 288, 96, true,  HS, 2),
    BlockSpec::new(96, 5, 576, 96, true,  HS, 1),
    BlockSpec::new(96, 5, 576, 96, true,  HS, 1),
];

const LARGE_BLOCKS: [BlockSpec; 15] = [
    BlockSpec::new(16,  3, 16,  16,  false, RE, 1),
    BlockSpec::new(16,  3, 64,  24,  false, RE, 2),
    BlockSpec::new(24,  3, 72,  24,  false, RE, 1),
    BlockSpec::new(24,  5, 72,  40,  true,  RE, 2),
    BlockSpec::new(40,  5, 120, 40,  true,  RE, 1),
    BlockSpec::new(40,  5, 120, 40,  true,  RE, 1),
    BlockSpec::new(40,  3, 240, 80,  false, HS, 2),
    BlockSpec::new(80,  3, 200, 80,  false, HS, 1),
    BlockSpec::new(80,  3, 184, 80,  false, HS, 1),
    BlockSpec::new(80,  3, 184, 80,  false, HS, 1),
    BlockSpec::new(80,  3, 480, 112, true,  HS, 1),
    BlockSpec::new(112, 3, 672, 112, true,  HS, 1),
    BlockSpec::new(112, 5, 672, 160, true,  HS, 2),
    BlockSpec::new(160, 5, 960, 160, true,  HS, 1),
    BlockSpec::new(160, 5, 960, 160, true,  HS, 1),
];

/// The two published MobileNetV3 sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Small,
    Large,
}

impl Variant {
    pub fn blocks(&self) -> &'static [BlockSpec] {
        match self {
            Variant::Small => &SMALL_BLOCKS,
            Variant::Large => &LARGE_BLOCKS,
        }
    }

    /// Channels of the 1x1 conv after the last block.
    pub fn last_channels(&self) -> usize {
        match self {
            Variant::Small => 576,
            Variant::Large => 960,
        }
    }

    /// Width of the hidden classifier layer.
    pub fn head_channels(&self) -> usize {
        match self {
            Variant::Small => 1024,
            Variant::Large => 1280,
        }
    }
}

impl FromStr for Variant {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "small" => Ok(Variant::Small),
            "large" => Ok(Variant::Large),
            other   => anyhow::bail!("Unknown MobileNetV3 variant '{other}' (expected small or large)"),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Small => f.write_str("small"),
            Variant::Large => f.write_str("large"),
        }
    }
}

#[derive(Config, Debug)]
pub struct ModelConfig {
    pub num_classes: usize,
    pub variant:     Variant,
    #[config(default = 0.2)]
    pub dropout:     f64,
}

impl ModelConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> MobileNetV3<B> {
        let stem = Conv2dConfig::new([3, STEM_CHANNELS], [3, 3])
            .with_stride([2, 2])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .with_bias(false)
            .init(device);

        let specs = self.variant.blocks();
        let blocks: Vec<Block<B>> = specs.iter().map(|s| s.init(device)).collect();
        let block_out = specs.last().map(|s| s.out_dim).unwrap_or(STEM_CHANNELS);

        let last_channels = self.variant.last_channels();
        let head_channels = self.variant.head_channels();

        let last_conv = Conv2dConfig::new([block_out, last_channels], [1, 1])
            .with_bias(false)
            .init(device);

        MobileNetV3 {
            stem,
            stem_norm:  BatchNormConfig::new(STEM_CHANNELS).init(device),
            blocks,
            last_conv,
            last_norm:  BatchNormConfig::new(last_channels).init(device),
            pool:       AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            head:       LinearConfig::new(last_channels, head_channels).init(device),
            activation: HardSwish::new(),
            dropout:    DropoutConfig::new(self.dropout).init(),
            classifier: LinearConfig::new(head_channels, self.num_classes).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct MobileNetV3<B: Backend> {
    pub stem:       Conv2d<B>,
    pub stem_norm:  BatchNorm<B, 2>,
    pub blocks:     Vec<Block<B>>,
    pub last_conv:  Conv2d<B>,
    pub last_norm:  BatchNorm<B, 2>,
    pub pool:       AdaptiveAvgPool2d,
    pub head:       Linear<B>,
    pub activation: HardSwish,
    pub dropout:    Dropout,
    pub classifier: Linear<B>,
}

impl<B: Backend> MobileNetV3<B> {
    /// images: [batch, 3, height, width] → logits: [batch, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = self.activation.forward(self.stem_norm.forward(self.stem.forward(images)));
        for block in &self.blocks {
            x = block.forward(x);
        }
        let x = self.activation.forward(self.last_norm.forward(self.last_conv.forward(x)));

        let [batch, channels, _, _] = x.dims();
        let x = self.pool.forward(x).reshape([batch, channels]);

        let x = self.dropout.forward(self.activation.forward(self.head.forward(x)));
        self.classifier.forward(x)
    }

    /// Forward pass plus mean cross-entropy against `targets`.
    pub fn forward_classification(
        &self,
        images:          Tensor<B, 4>,
        targets:         Tensor<B, 1, Int>,
        label_smoothing: Option<f32>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(images);
        let loss = CrossEntropyLossConfig::new()
            .with_smoothing(label_smoothing)
            .init(&logits.device())
            .forward(logits.clone(), targets);
        (loss, logits)
    }

    pub fn num_classes(&self) -> usize {
        self.classifier.weight.dims()[1]
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type TestBackend = NdArray;

    #[test]
    fn test_tables_chain_channels() {
        for variant in [Variant::Small, Variant::Large] {
            let blocks = variant.blocks();
            assert_eq!(blocks[0].in_dim, STEM_CHANNELS);
            for pair in blocks.windows(2) {
                assert_eq!(pair[0].out_dim, pair[1].in_dim, "{variant} table breaks");
            }
        }
    }

    #[test]
    fn test_small_forward_shape() {
        let device = Default::default();
        let model  = ModelConfig::new(7, Variant::Small).init::<TestBackend>(&device);
        let images = Tensor::<TestBackend, 4>::random([2, 3, 32, 32], Distribution::Default, &device);
        assert_eq!(model.forward(images).dims(), [2, 7]);
        assert_eq!(model.num_classes(), 7);
    }

    #[test]
    fn test_classification_loss_is_finite() {
        let device  = Default::default();
        let model   = ModelConfig::new(3, Variant::Small).init::<TestBackend>(&device);
        let images  = Tensor::<TestBackend, 4>::random([2, 3, 32, 32], Distribution::Default, &device);
        let targets = Tensor::<TestBackend, 1, Int>::from_ints([0, 2], &device);

        let (loss, logits) = model.forward_classification(images, targets, Some(0.1));
        let loss: f32 = loss.into_scalar().elem();
        assert!(loss.is_finite() && loss > 0.0);
        assert_eq!(logits.dims(), [2, 3]);
    }

    #[test]
    fn test_variant_parsing() {
        assert_eq!("Large".parse::<Variant>().unwrap(), Variant::Large);
        assert!("tiny".parse::<Variant>().is_err());
        assert_eq!(Variant::Small.to_string(), "small");
    }
}
