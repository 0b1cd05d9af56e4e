// ============================================================
// Layer 5 — Squeeze-and-Excite
// ============================================================
// Channel attention: each feature map is summarised by its
// spatial mean ("squeeze"), a small two-layer MLP turns the
// summaries into per-channel gates in [0, 1] ("excite"), and
// the input is rescaled channel-wise by those gates.
//
//   x [n, c, h, w] → avg pool → [n, c]
//                  → Linear(c, c/r) → ReLU
//                  → Linear(c/r, c) → hard-sigmoid
//                  → [n, c, 1, 1] * x
//
// Reference: Hu et al. (2018) Squeeze-and-Excitation Networks

use burn::{
    nn::{
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig},
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::relu,
};

use crate::ml::activation::HardSigmoid;

#[derive(Config, Debug)]
pub struct SqueezeExciteConfig {
    pub channels: usize,
    #[config(default = 4)]
    pub reduce_factor: usize,
}

impl SqueezeExciteConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SqueezeExcite<B> {
        // Never squeeze to zero units, even for tiny test widths.
        let squeezed = (self.channels / self.reduce_factor.max(1)).max(1);
        SqueezeExcite {
            pool:   AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            reduce: LinearConfig::new(self.channels, squeezed).init(device),
            expand: LinearConfig::new(squeezed, self.channels).init(device),
            gate:   HardSigmoid::new(),
        }
    }
}

#[derive(Module, Debug)]
pub struct SqueezeExcite<B: Backend> {
    pub pool:   AdaptiveAvgPool2d,
    pub reduce: Linear<B>,
    pub expand: Linear<B>,
    pub gate:   HardSigmoid,
}

impl<B: Backend> SqueezeExcite<B> {
    /// x: [batch, channels, height, width] → same shape
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let [n, c, _, _] = x.dims();

        let y = self.pool.forward(x.clone()).reshape([n, c]);
        let y = relu(self.reduce.forward(y));
        let y = self.gate.forward(self.expand.forward(y));

        x * y.reshape([n, c, 1, 1])
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
    fn test_output_shape_matches_input() {
        let device = Default::default();
        let se = SqueezeExciteConfig::new(16).init::<TestBackend>(&device);
        let x  = Tensor::<TestBackend, 4>::random([2, 16, 5, 7], Distribution::Default, &device);
        assert_eq!(se.forward(x).dims(), [2, 16, 5, 7]);
    }

    #[test]
    fn test_gates_only_shrink_magnitudes() {
        // Gates are in [0, 1], so |SE(x)| <= |x| elementwise.
        let device = Default::default();
        let se = SqueezeExciteConfig::new(8).init::<TestBackend>(&device);
        let x  = Tensor::<TestBackend, 4>::random([1, 8, 3, 3], Distribution::Uniform(-2.0, 2.0), &device);

        let out    = se.forward(x.clone()).abs().into_data().to_vec::<f32>().unwrap();
        let before = x.abs().into_data().to_vec::<f32>().unwrap();
        for (o, b) in out.iter().zip(&before) {
            assert!(*o <= *b + 1e-6);
        }
    }

    #[test]
    fn test_reduce_factor_never_zero_width() {
        let device = Default::default();
        let se = SqueezeExciteConfig::new(2).with_reduce_factor(4).init::<TestBackend>(&device);
        let x  = Tensor::<TestBackend, 4>::ones([1, 2, 2, 2], &device);
        assert_eq!(se.forward(x).dims(), [1, 2, 2, 2]);
    }
}
