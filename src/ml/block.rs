// ============================================================
// Layer 5 — Inverted-Residual Block
// ============================================================
// The MobileNetV3 building block ("bneck"):
//
//   1x1 conv  in → hidden          BatchNorm           (expand)
//   kxk conv  hidden → hidden      depthwise, stride s
//   [squeeze-and-excite]           optional
//   BatchNorm, non-linearity
//   1x1 conv  hidden → out         BatchNorm, non-linearity
//
//   + x   when stride == 1 and in == out
//
// Convolutions carry no bias because a BatchNorm follows each.

use anyhow::Result;
use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        BatchNorm, BatchNormConfig, PaddingConfig2d,
    },
    prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::ml::activation::NonLinearity;
use crate::ml::squeeze_excite::{SqueezeExcite, SqueezeExciteConfig};

/// One row of a MobileNetV3 architecture table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSpec {
    pub in_dim:      usize,
    pub out_dim:     usize,
    pub hidden_dim:  usize,
    pub kernel_size: usize,
    pub stride:      usize,
    pub nl:          NonLinearity,
    pub se:          bool,
}

impl BlockSpec {
    pub const fn new(
        in_dim:      usize,
        kernel_size: usize,
        hidden_dim:  usize,
        out_dim:     usize,
        se:          bool,
        nl:          NonLinearity,
        stride:      usize,
    ) -> Self {
        Self { in_dim, out_dim, hidden_dim, kernel_size, stride, nl, se }
    }

    /// Parse the non-linearity from its table code (`HS` / `RE`).
    pub fn with_nl_code(
        in_dim:      usize,
        out_dim:     usize,
        hidden_dim:  usize,
        kernel_size: usize,
        stride:      usize,
        nl:          &str,
        se:          bool,
    ) -> Result<Self> {
        let nl = nl.parse::<NonLinearity>()?;
        Ok(Self { in_dim, out_dim, hidden_dim, kernel_size, stride, nl, se })
    }

    pub fn has_skip_connection(&self) -> bool {
        self.stride == 1 && self.in_dim == self.out_dim
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Block<B> {
        let pad = self.kernel_size / 2;

        let expand = Conv2dConfig::new([self.in_dim, self.hidden_dim], [1, 1])
            .with_bias(false)
            .init(device);
        let depthwise = Conv2dConfig::new([self.hidden_dim, self.hidden_dim], [self.kernel_size, self.kernel_size])
            .with_stride([self.stride, self.stride])
            .with_padding(PaddingConfig2d::Explicit(pad, pad))
            .with_groups(self.hidden_dim)
            .with_bias(false)
            .init(device);
        let project = Conv2dConfig::new([self.hidden_dim, self.out_dim], [1, 1])
            .with_bias(false)
            .init(device);

        Block {
            expand,
            expand_norm:    BatchNormConfig::new(self.hidden_dim).init(device),
            depthwise,
            squeeze_excite: self.se.then(|| SqueezeExciteConfig::new(self.hidden_dim).init(device)),
            depthwise_norm: BatchNormConfig::new(self.hidden_dim).init(device),
            project,
            project_norm:   BatchNormConfig::new(self.out_dim).init(device),
            hard_swish:     self.nl == NonLinearity::HardSwish,
            skip:           self.has_skip_connection(),
        }
    }
}

#[derive(Module, Debug)]
pub struct Block<B: Backend> {
    pub expand:         Conv2d<B>,
    pub expand_norm:    BatchNorm<B, 2>,
    pub depthwise:      Conv2d<B>,
    pub squeeze_excite: Option<SqueezeExcite<B>>,
    pub depthwise_norm: BatchNorm<B, 2>,
    pub project:        Conv2d<B>,
    pub project_norm:   BatchNorm<B, 2>,
    pub hard_swish:     bool,
    pub skip:           bool,
}

impl<B: Backend> Block<B> {
    pub fn non_linearity(&self) -> NonLinearity {
        if self.hard_swish { NonLinearity::HardSwish } else { NonLinearity::Relu }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let nl = self.non_linearity();

        let out = self.expand_norm.forward(self.expand.forward(x.clone()));
        let mut out = self.depthwise.forward(out);
        if let Some(se) = &self.squeeze_excite {
            out = se.forward(out);
        }
        let out = nl.apply(self.depthwise_norm.forward(out));
        let out = nl.apply(self.project_norm.forward(self.project.forward(out)));

        if self.skip { out + x } else { out }
    }
}
