use super::Activation;
use crate::error::NnError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tch::{Kind, Tensor};

/// Weight initialization scheme.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum InitType {
    /// Xavier (Glorot) normal initialization.
    Xavier,

    /// Kaiming (He) normal initialization in `fan_in` mode.
    Kaiming,

    /// Orthogonal initialization.
    Orthogonal,
}

impl Default for InitType {
    fn default() -> Self {
        Self::Xavier
    }
}

impl FromStr for InitType {
    type Err = NnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "xavier" => Ok(Self::Xavier),
            "kaiming" => Ok(Self::Kaiming),
            "orthogonal" => Ok(Self::Orthogonal),
            _ => Err(NnError::InvalidInitType(s.to_string())),
        }
    }
}

// (fan_in, fan_out) of a weight tensor laid out as [out, in, kernel...].
fn fans(size: &[i64]) -> Result<(i64, i64)> {
    if size.len() < 2 {
        return Err(NnError::ShapeMismatch {
            expected: "at least 2 dimensions".to_string(),
            actual: size.to_vec(),
        }
        .into());
    }
    let receptive: i64 = size[2..].iter().product();
    Ok((size[1] * receptive, size[0] * receptive))
}

fn orthogonal(size: &[i64], weight: &Tensor) -> Tensor {
    let rows = size[0];
    let cols: i64 = size[1..].iter().product();
    let flat = Tensor::randn([rows, cols], (Kind::Float, weight.device()));
    let flat = if rows < cols { flat.transpose(0, 1) } else { flat };

    // Sign correction makes the decomposition unique
    let (q, r) = Tensor::linalg_qr(&flat, "reduced");
    let d = r.diagonal(0, 0, 1).sign();
    let q = q * d;
    let q = if rows < cols { q.transpose(0, 1) } else { q };

    q.contiguous().reshape(size)
}

/// Initializes `weight` in place according to `init_type`.
///
/// `activation` is the non-linearity following the layer. It is required by
/// [`InitType::Kaiming`], where the negative slope of [`Activation::LeakyRelu`]
/// is taken into account.
pub fn weight_init_(
    weight: &mut Tensor,
    init_type: InitType,
    activation: Option<&Activation>,
) -> Result<()> {
    let size = weight.size();
    let (fan_in, fan_out) = fans(&size)?;
    let options = (Kind::Float, weight.device());

    let init = match init_type {
        InitType::Xavier => {
            let std = (2.0 / (fan_in + fan_out) as f64).sqrt();
            Tensor::randn(size.as_slice(), options) * std
        }
        InitType::Kaiming => {
            let a = activation
                .ok_or(NnError::MissingActivation)?
                .negative_slope()
                .unwrap_or(0.0);
            let gain = (2.0 / (1.0 + a * a)).sqrt();
            let std = gain / (fan_in as f64).sqrt();
            Tensor::randn(size.as_slice(), options) * std
        }
        InitType::Orthogonal => orthogonal(&size, weight),
    };

    tch::no_grad(|| weight.copy_(&init.to_kind(weight.kind())));
    Ok(())
}
