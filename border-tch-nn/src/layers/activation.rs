use serde::{Deserialize, Serialize};
use tch::Tensor;

/// Element-wise non-linearity placed at the end of a block.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    /// Rectified linear unit.
    Relu,

    /// Leaky ReLU with the given negative slope.
    LeakyRelu(f64),

    /// Hyperbolic tangent.
    Tanh,

    /// Logistic sigmoid.
    Sigmoid,

    /// Gaussian error linear unit.
    Gelu,
}

impl Activation {
    /// Returns the negative slope used by kaiming initialization.
    pub fn negative_slope(&self) -> Option<f64> {
        match self {
            Self::LeakyRelu(slope) => Some(*slope),
            _ => None,
        }
    }

    /// Applies the activation.
    pub fn apply(&self, xs: &Tensor) -> Tensor {
        match self {
            Self::Relu => xs.relu(),
            Self::LeakyRelu(slope) => xs.relu() - xs.neg().relu() * *slope,
            Self::Tanh => xs.tanh(),
            Self::Sigmoid => xs.sigmoid(),
            Self::Gelu => xs.gelu("none"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_leaky_relu() {
        let xs = Tensor::from_slice(&[-2.0_f32, 0.0, 3.0]);
        let ys = Activation::LeakyRelu(0.5).apply(&xs);
        let expected = Tensor::from_slice(&[-1.0_f32, 0.0, 3.0]);
        assert!(ys.allclose(&expected, 1e-6, 1e-6, false));
        assert_eq!(Activation::LeakyRelu(0.5).negative_slope(), Some(0.5));
        assert_eq!(Activation::Relu.negative_slope(), None);
    }

    #[test]
    fn test_serde_activation() {
        let act: Activation = serde_yaml::from_str("leaky_relu: 0.2").unwrap();
        assert_eq!(act, Activation::LeakyRelu(0.2));
        let act: Activation = serde_yaml::from_str("relu").unwrap();
        assert_eq!(act, Activation::Relu);
    }
}
