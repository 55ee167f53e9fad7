//! Utilities.
use crate::error::NnError;
use anyhow::Result;
use log::trace;
use tch::{nn::VarStore, Tensor};

/// Interface for handling output dimensions.
pub trait OutDim {
    /// Returns the output dimension.
    fn get_out_dim(&self) -> i64;

    /// Sets the  output dimension.
    fn set_out_dim(&mut self, v: i64);
}

/// Concatenates slices.
pub fn concat_slices(s1: &[i64], s2: &[i64]) -> Vec<i64> {
    let mut v = Vec::from(s1);
    v.append(&mut Vec::from(s2));
    v
}

/// Back-propagates `loss` and checks that every trainable variable in
/// `var_store` received a gradient.
pub fn is_differentiable(loss: &Tensor, var_store: &VarStore) -> Result<()> {
    loss.backward();

    let mut names = var_store.variables().into_iter().collect::<Vec<_>>();
    names.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, v) in names.iter() {
        if v.requires_grad() {
            if !v.grad().defined() {
                return Err(NnError::NotDifferentiable(name.clone()).into());
            }
            trace!("{} has gradient", name);
        }
    }

    Ok(())
}

/// Returns the size of a tensor of shape `[batch, channels, height, width]`.
pub(crate) fn size4(xs: &Tensor) -> Result<[i64; 4]> {
    match xs.size().as_slice() {
        &[b, c, h, w] => Ok([b, c, h, w]),
        size => Err(NnError::ShapeMismatch {
            expected: "[batch, channels, height, width]".to_string(),
            actual: size.to_vec(),
        }
        .into()),
    }
}
