use crate::{error::NnError, util::size4};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tch::Tensor;

/// Multiplier for the spatial size of an image.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Copy)]
pub struct ScaleFactor {
    /// Multiplier of height.
    pub h: f64,

    /// Multiplier of width.
    pub w: f64,
}

impl From<f64> for ScaleFactor {
    fn from(v: f64) -> Self {
        Self { h: v, w: v }
    }
}

impl From<(f64, f64)> for ScaleFactor {
    fn from((h, w): (f64, f64)) -> Self {
        Self { h, w }
    }
}

impl ScaleFactor {
    fn validate(self) -> Result<Self> {
        if self.h > 0.0 && self.w > 0.0 {
            Ok(self)
        } else {
            Err(NnError::InvalidUpsampleScale(self.h, self.w).into())
        }
    }

    // Output spatial size for the input.
    fn output_size(&self, xs: &Tensor) -> Result<[i64; 2]> {
        let [_, _, h, w] = size4(xs)?;
        Ok([
            (h as f64 * self.h).floor() as i64,
            (w as f64 * self.w).floor() as i64,
        ])
    }
}

/// Upsamples images with nearest neighbor interpolation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestUpsample {
    scale_factor: ScaleFactor,
}

impl NearestUpsample {
    /// Constructs [`NearestUpsample`] with a positive scale factor.
    pub fn new(scale_factor: impl Into<ScaleFactor>) -> Result<Self> {
        Ok(Self {
            scale_factor: scale_factor.into().validate()?,
        })
    }

    /// Returns the upsampled input of shape `[batch, channels, height, width]`.
    pub fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let size = self.scale_factor.output_size(xs)?;
        Ok(xs.upsample_nearest2d(size, self.scale_factor.h, self.scale_factor.w))
    }
}

/// Upsamples images with bilinear interpolation, without aligning corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BilinearUpsample {
    scale_factor: ScaleFactor,
}

impl BilinearUpsample {
    /// Constructs [`BilinearUpsample`] with a positive scale factor.
    pub fn new(scale_factor: impl Into<ScaleFactor>) -> Result<Self> {
        Ok(Self {
            scale_factor: scale_factor.into().validate()?,
        })
    }

    /// Returns the upsampled input of shape `[batch, channels, height, width]`.
    pub fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let size = self.scale_factor.output_size(xs)?;
        Ok(xs.upsample_bilinear2d(size, false, self.scale_factor.h, self.scale_factor.w))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_nearest_upsample() -> Result<()> {
        let xs = Tensor::from_slice(&[1.0_f32, 2.0, 3.0, 4.0]).view([1, 1, 2, 2]);
        let ys = NearestUpsample::new(2.0)?.forward(&xs)?;
        let expected = Tensor::from_slice(&[
            1.0_f32, 1.0, 2.0, 2.0, //
            1.0, 1.0, 2.0, 2.0, //
            3.0, 3.0, 4.0, 4.0, //
            3.0, 3.0, 4.0, 4.0,
        ])
        .view([1, 1, 4, 4]);
        assert!(ys.equal(&expected));
        Ok(())
    }

    #[test]
    fn test_bilinear_upsample() -> Result<()> {
        let xs = Tensor::randn([2, 3, 5, 4], tch::kind::FLOAT_CPU);
        let ys = BilinearUpsample::new((2.0, 1.5))?.forward(&xs)?;
        assert_eq!(ys.size(), [2, 3, 10, 6]);

        // Constant images stay constant
        let xs = Tensor::ones([1, 1, 3, 3], tch::kind::FLOAT_CPU);
        let ys = BilinearUpsample::new(3.0)?.forward(&xs)?;
        assert!(ys.allclose(&Tensor::ones([1, 1, 9, 9], tch::kind::FLOAT_CPU), 1e-6, 1e-6, false));
        Ok(())
    }

    #[test]
    fn test_upsample_errors() {
        assert!(NearestUpsample::new(0.0).is_err());
        assert!(BilinearUpsample::new((1.0, -2.0)).is_err());
        let up = NearestUpsample::new(2.0).unwrap();
        assert!(up.forward(&Tensor::zeros([3, 3], tch::kind::FLOAT_CPU)).is_err());
    }
}
