use crate::error::NnError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tch::{nn, nn::ModuleT, Tensor};

/// Normalization placed after a convolutional or linear layer.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Copy)]
pub enum NormType {
    /// Batch normalization.
    #[serde(rename = "BN")]
    BatchNorm,

    /// Instance normalization with affine parameters.
    #[serde(rename = "IN")]
    InstanceNorm,
}

impl FromStr for NormType {
    type Err = NnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BN" => Ok(Self::BatchNorm),
            "IN" => Ok(Self::InstanceNorm),
            _ => Err(NnError::InvalidNormType(s.to_string())),
        }
    }
}

/// Normalization layer built by [`build_normalization`].
#[derive(Debug)]
pub enum Norm {
    /// Batch normalization.
    BatchNorm(nn::BatchNorm),

    /// Instance normalization.
    InstanceNorm {
        /// Scale.
        ws: Tensor,
        /// Shift.
        bs: Tensor,
    },
}

impl ModuleT for Norm {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        match self {
            Self::BatchNorm(bn) => bn.forward_t(xs, train),
            Self::InstanceNorm { ws, bs } => xs.instance_norm(
                Some(ws),
                Some(bs),
                None::<&Tensor>,
                None::<&Tensor>,
                true,
                0.1,
                1e-5,
                false,
            ),
        }
    }
}

/// Builds a normalization layer over `num_features` channels.
///
/// `dim` is the number of spatial dimensions of the input plus one, i.e.,
/// 1 for `[batch, features]` or `[batch, channels, length]` and 2 for
/// `[batch, channels, height, width]`.
pub fn build_normalization(
    p: &nn::Path,
    norm_type: NormType,
    dim: usize,
    num_features: i64,
) -> Result<Norm> {
    match (norm_type, dim) {
        (NormType::BatchNorm, 1) => Ok(Norm::BatchNorm(nn::batch_norm1d(
            p,
            num_features,
            Default::default(),
        ))),
        (NormType::BatchNorm, 2) => Ok(Norm::BatchNorm(nn::batch_norm2d(
            p,
            num_features,
            Default::default(),
        ))),
        (NormType::InstanceNorm, 1) | (NormType::InstanceNorm, 2) => Ok(Norm::InstanceNorm {
            ws: p.ones("weight", &[num_features]),
            bs: p.zeros("bias", &[num_features]),
        }),
        _ => Err(NnError::InvalidNormType(format!("{:?} with dim {}", norm_type, dim)).into()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tch::Device;

    #[test]
    fn test_parse_norm_type() {
        assert_eq!("BN".parse::<NormType>(), Ok(NormType::BatchNorm));
        assert_eq!("IN".parse::<NormType>(), Ok(NormType::InstanceNorm));
        assert_eq!(
            "SyncBN".parse::<NormType>(),
            Err(NnError::InvalidNormType("SyncBN".to_string()))
        );
    }

    #[test]
    fn test_instance_norm() -> Result<()> {
        let vs = nn::VarStore::new(Device::Cpu);
        let norm = build_normalization(&(vs.root() / "norm"), NormType::InstanceNorm, 2, 3)?;
        let xs = Tensor::randn([2, 3, 5, 5], tch::kind::FLOAT_CPU) * 4.0 + 1.0;
        let ys = norm.forward_t(&xs, true);
        assert_eq!(ys.size(), [2, 3, 5, 5]);
        let mean = ys.mean_dim([2_i64, 3].as_slice(), false, tch::Kind::Float);
        assert!(mean.abs().max().double_value(&[]) < 1e-4);
        Ok(())
    }

    #[test]
    fn test_invalid_dim() {
        let vs = nn::VarStore::new(Device::Cpu);
        assert!(build_normalization(&vs.root(), NormType::BatchNorm, 3, 4).is_err());
    }
}
