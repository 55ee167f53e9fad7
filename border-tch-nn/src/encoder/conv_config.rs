use crate::{
    error::NnError,
    layers::{Activation, InitType, NormType},
    util::OutDim,
};
use anyhow::Result;
use serde::{Deserialize, Serialize};

fn relu() -> Activation {
    Activation::Relu
}

fn channels() -> Vec<i64> {
    vec![32, 64, 64]
}

fn kernel_sizes() -> Vec<i64> {
    vec![8, 4, 3]
}

fn strides() -> Vec<i64> {
    vec![4, 2, 1]
}

/// Configuration of [`ConvEncoder`](super::ConvEncoder).
///
/// The default stack of convolutions is that of the DQN Nature paper.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ConvEncoderConfig {
    /// Shape of an observation, `[channels, height, width]`.
    pub(super) obs_shape: Vec<i64>,
    #[serde(default = "channels")]
    pub(super) channels: Vec<i64>,
    #[serde(default = "kernel_sizes")]
    pub(super) kernel_sizes: Vec<i64>,
    #[serde(default = "strides")]
    pub(super) strides: Vec<i64>,
    pub(super) out_dim: i64,
    #[serde(default = "relu")]
    pub(super) activation: Activation,
    #[serde(default)]
    pub(super) norm_type: Option<NormType>,
    #[serde(default)]
    pub(super) init_type: InitType,

    /// If `true`, the input is scaled by 1 / 255 for normalizing pixel intensities.
    #[serde(default)]
    pub(super) pixel_input: bool,
}

impl ConvEncoderConfig {
    /// Creates a configuration with the default stack of convolutions.
    pub fn new(obs_shape: Vec<i64>, out_dim: i64) -> Self {
        Self {
            obs_shape,
            channels: channels(),
            kernel_sizes: kernel_sizes(),
            strides: strides(),
            out_dim,
            activation: relu(),
            norm_type: None,
            init_type: InitType::default(),
            pixel_input: false,
        }
    }

    /// Sets output channels, kernel sizes and strides of convolutions.
    pub fn convs(mut self, channels: Vec<i64>, kernel_sizes: Vec<i64>, strides: Vec<i64>) -> Self {
        self.channels = channels;
        self.kernel_sizes = kernel_sizes;
        self.strides = strides;
        self
    }

    pub fn activation(mut self, v: Activation) -> Self {
        self.activation = v;
        self
    }

    pub fn norm_type(mut self, v: NormType) -> Self {
        self.norm_type = Some(v);
        self
    }

    pub fn init_type(mut self, v: InitType) -> Self {
        self.init_type = v;
        self
    }

    pub fn pixel_input(mut self, v: bool) -> Self {
        self.pixel_input = v;
        self
    }

    /// Returns the dimension of the flattened output of the convolutions.
    pub fn flatten_dim(&self) -> Result<i64> {
        let shape_err = |expected: &str, actual: Vec<i64>| NnError::ShapeMismatch {
            expected: expected.to_string(),
            actual,
        };

        if self.obs_shape.len() != 3 {
            return Err(shape_err("[channels, height, width]", self.obs_shape.clone()).into());
        }
        let n = self.channels.len();
        if self.kernel_sizes.len() != n || self.strides.len() != n {
            let lens = vec![n as i64, self.kernel_sizes.len() as i64, self.strides.len() as i64];
            return Err(shape_err("the same number of channels, kernel sizes and strides", lens).into());
        }

        let (mut h, mut w) = (self.obs_shape[1], self.obs_shape[2]);
        for (&k, &s) in self.kernel_sizes.iter().zip(self.strides.iter()) {
            if h < k || w < k {
                return Err(shape_err("spatial size not smaller than kernel size", vec![h, w]).into());
            }
            h = (h - k) / s + 1;
            w = (w - k) / s + 1;
        }

        let c = *self.channels.last().unwrap_or(&self.obs_shape[0]);
        Ok(c * h * w)
    }
}

impl OutDim for ConvEncoderConfig {
    fn get_out_dim(&self) -> i64 {
        self.out_dim
    }

    fn set_out_dim(&mut self, v: i64) {
        self.out_dim = v;
    }
}
