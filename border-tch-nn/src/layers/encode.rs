use crate::error::NnError;
use anyhow::Result;
use tch::{Kind, Tensor};

/// Converts an integer tensor to its one-hot encoding.
///
/// `val` is a tensor of an integer kind whose elements are states in
/// `[0, num - 1]`. The code dimension is appended as the last dimension, or
/// inserted as the first one if `num_first` is `true`. The returned tensor is
/// of float type.
///
/// ```
/// # use border_tch_nn::layers::one_hot;
/// # use tch::Tensor;
/// # fn main() -> anyhow::Result<()> {
/// let val = Tensor::from_slice(&[2_i64, 2, 2, 2]).view([2, 2]);
/// assert_eq!(one_hot(&val, 3, false)?.size(), [2, 2, 3]);
/// assert_eq!(one_hot(&val, 3, true)?.size(), [3, 2, 2]);
/// # Ok(())
/// # }
/// ```
pub fn one_hot(val: &Tensor, num: i64, num_first: bool) -> Result<Tensor> {
    match val.kind() {
        Kind::Uint8 | Kind::Int8 | Kind::Int16 | Kind::Int | Kind::Int64 => {}
        kind => return Err(NnError::NonIntegerKind(kind).into()),
    }
    let val = val.to_kind(Kind::Int64);
    if val.numel() > 0 {
        let min = val.min().int64_value(&[]);
        let max = val.max().int64_value(&[]);
        if min < 0 || max >= num {
            return Err(NnError::OneHotOutOfRange { num, min, max }.into());
        }
    }

    let code = val.one_hot(num).to_kind(Kind::Float);
    if num_first {
        let last = code.dim() as i64 - 1;
        let dims = std::iter::once(last).chain(0..last).collect::<Vec<_>>();
        Ok(code.permute(dims.as_slice()).contiguous())
    } else {
        Ok(code)
    }
}

/// Converts elements of a tensor to their binary representations.
///
/// Elements are clamped to `[0, max_val]` and encoded with
/// `floor(log2(max_val)) + 1` bits, most significant bit first.
/// The bits are stacked at dimension 1.
///
/// ```
/// # use border_tch_nn::layers::binary_encode;
/// # use tch::Tensor;
/// # fn main() -> anyhow::Result<()> {
/// let bits = binary_encode(&Tensor::from_slice(&[3_i64, 2]), 8)?;
/// let expected = Tensor::from_slice(&[0_i64, 0, 1, 1, 0, 0, 1, 0]).view([2, 4]);
/// assert!(bits.equal(&expected));
/// # Ok(())
/// # }
/// ```
pub fn binary_encode(ys: &Tensor, max_val: i64) -> Result<Tensor> {
    if max_val <= 0 {
        return Err(NnError::NonPositive {
            name: "max_val",
            value: max_val,
        }
        .into());
    }
    if ys.dim() == 0 {
        return Err(NnError::ShapeMismatch {
            expected: "at least 1 dimension".to_string(),
            actual: vec![],
        }
        .into());
    }

    let n_bits = (64 - max_val.leading_zeros()) as i64;
    let mut xs = ys.clamp(0, max_val);
    let bits = (0..n_bits)
        .map(|i| {
            let num = 1_i64 << (n_bits - i - 1);
            let bit = xs.ge(num).to_kind(xs.kind());
            xs = &xs - &bit * num;
            bit
        })
        .collect::<Vec<_>>();

    Ok(Tensor::stack(&bits, 1))
}
