// ============================================================
// Layer 5 — Depthwise-Separable Convolution
// ============================================================
// A 3x3 depthwise convolution (one filter per input channel,
// padding 1 so spatial size is kept) followed by a 3x3
// convolution that mixes channels in → out without padding,
// so each spatial dimension shrinks by 2.

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        PaddingConfig2d,
    },
    prelude::*,
};

#[derive(Config, Debug)]
pub struct SepConv2dConfig {
    pub in_channels:  usize,
    pub out_channels: usize,
}

impl SepConv2dConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SepConv2d<B> {
        let depthwise = Conv2dConfig::new([self.in_channels, self.in_channels], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .with_groups(self.in_channels)
            .init(device);
        let pointwise = Conv2dConfig::new([self.in_channels, self.out_channels], [3, 3])
            .init(device);
        SepConv2d { depthwise, pointwise }
    }
}

#[derive(Module, Debug)]
pub struct SepConv2d<B: Backend> {
    pub depthwise: Conv2d<B>,
    pub pointwise: Conv2d<B>,
}

impl<B: Backend> SepConv2d<B> {
    /// [n, in, h, w] → [n, out, h - 2, w - 2]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.pointwise.forward(self.depthwise.forward(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn test_shape() {
        let device = Default::default();
        let conv = SepConv2dConfig::new(4, 6).init::<NdArray>(&device);
        let x    = Tensor::<NdArray, 4>::ones([2, 4, 8, 10], &device);
        assert_eq!(conv.forward(x).dims(), [2, 6, 6, 8]);
    }
}
