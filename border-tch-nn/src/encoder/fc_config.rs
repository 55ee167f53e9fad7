use crate::{
    layers::{Activation, InitType, NormType},
    util::OutDim,
};
use serde::{Deserialize, Serialize};

fn relu() -> Activation {
    Activation::Relu
}

/// Configuration of [`FcEncoder`](super::FcEncoder).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct FcEncoderConfig {
    pub(super) in_dim: i64,
    #[serde(default)]
    pub(super) units: Vec<i64>,
    pub(super) out_dim: i64,
    #[serde(default = "relu")]
    pub(super) activation: Activation,
    #[serde(default)]
    pub(super) norm_type: Option<NormType>,
    #[serde(default)]
    pub(super) init_type: InitType,
}

impl FcEncoderConfig {
    /// Creates a configuration with ReLU activation.
    ///
    /// `units` are the dimensions of hidden layers between `in_dim` and `out_dim`.
    pub fn new(in_dim: i64, units: Vec<i64>, out_dim: i64) -> Self {
        Self {
            in_dim,
            units,
            out_dim,
            activation: relu(),
            norm_type: None,
            init_type: InitType::default(),
        }
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
}

impl OutDim for FcEncoderConfig {
    fn get_out_dim(&self) -> i64 {
        self.out_dim
    }

    fn set_out_dim(&mut self, out_dim: i64) {
        self.out_dim = out_dim;
    }
}
