// ============================================================
// Layer 5 — Gating Non-linearities
// ============================================================
// The piecewise-linear activations MobileNetV3 uses in place of
// sigmoid and swish:
//
//   relu6(x)        = min(max(x, 0), 6)
//   hard_sigmoid(x) = relu6(x + 3) / 6          ∈ [0, 1]
//   hard_swish(x)   = x * hard_sigmoid(x)
//
// Reference: Howard et al. (2019) Searching for MobileNetV3 §5.2

use anyhow::{bail, Result};
use burn::prelude::*;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

pub fn relu6<B: Backend, const D: usize>(x: Tensor<B, D>) -> Tensor<B, D> {
    x.clamp(0.0, 6.0)
}

pub fn hard_sigmoid<B: Backend, const D: usize>(x: Tensor<B, D>) -> Tensor<B, D> {
    relu6(x.add_scalar(3.0)).div_scalar(6.0)
}

pub fn hard_swish<B: Backend, const D: usize>(x: Tensor<B, D>) -> Tensor<B, D> {
    x.clone() * hard_sigmoid(x)
}

#[derive(Module, Clone, Debug, Default)]
pub struct Relu6;

impl Relu6 {
    pub fn new() -> Self {
        Self
    }

    pub fn forward<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        relu6(x)
    }
}

#[derive(Module, Clone, Debug, Default)]
pub struct HardSigmoid;

impl HardSigmoid {
    pub fn new() -> Self {
        Self
    }

    pub fn forward<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        hard_sigmoid(x)
    }
}

#[derive(Module, Clone, Debug, Default)]
pub struct HardSwish;

impl HardSwish {
    pub fn new() -> Self {
        Self
    }

    pub fn forward<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        hard_swish(x)
    }
}

/// Which non-linearity a block applies, written `HS` or `RE` in the
/// MobileNetV3 tables. `RE` is the bounded ReLU6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NonLinearity {
    #[serde(rename = "HS")]
    HardSwish,
    #[serde(rename = "RE")]
    Relu,
}

impl NonLinearity {
    pub fn apply<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            NonLinearity::HardSwish => hard_swish(x),
            NonLinearity::Relu      => relu6(x),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            NonLinearity::HardSwish => "HS",
            NonLinearity::Relu      => "RE",
        }
    }
}

impl FromStr for NonLinearity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "HS" => Ok(NonLinearity::HardSwish),
            "RE" => Ok(NonLinearity::Relu),
            other => bail!("Non-linearity must be either HS or RE, got '{other}'"),
        }
    }
}

impl fmt::Display for NonLinearity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
