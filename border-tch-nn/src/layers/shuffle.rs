use crate::{error::NnError, util::size4};
use anyhow::Result;
use tch::Tensor;

/// Channel shuffle of [ShuffleNet](https://arxiv.org/abs/1707.01083).
///
/// Channels are split into `group_num` groups and interleaved, so that the
/// `j`-th channel of group `i` is moved to position `j * group_num + i`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelShuffle {
    group_num: i64,
}

impl ChannelShuffle {
    /// Constructs [`ChannelShuffle`] exchanging `group_num` groups.
    pub fn new(group_num: i64) -> Result<Self> {
        if group_num <= 0 {
            return Err(NnError::NonPositive {
                name: "group_num",
                value: group_num,
            }
            .into());
        }
        Ok(Self { group_num })
    }

    /// Returns the shuffled input of shape `[batch, channels, height, width]`.
    pub fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let [b, c, h, w] = size4(xs)?;
        let g = self.group_num;
        if c % g != 0 {
            return Err(NnError::IndivisibleChannels {
                channels: c,
                groups: g,
            }
            .into());
        }

        Ok(xs
            .view([b, g, c / g, h, w])
            .permute([0, 2, 1, 3, 4])
            .contiguous()
            .view([b, c, h, w]))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_channel_shuffle() -> Result<()> {
        let xs = Tensor::arange(6, tch::kind::FLOAT_CPU).view([1, 6, 1, 1]);
        let ys = ChannelShuffle::new(2)?.forward(&xs)?;
        let expected = Tensor::from_slice(&[0.0_f32, 3.0, 1.0, 4.0, 2.0, 5.0]).view([1, 6, 1, 1]);
        assert!(ys.equal(&expected));

        // Shuffling with a single group is the identity
        let ys = ChannelShuffle::new(1)?.forward(&xs)?;
        assert!(ys.equal(&xs));
        Ok(())
    }

    #[test]
    fn test_channel_shuffle_errors() -> Result<()> {
        let shuffle = ChannelShuffle::new(4)?;
        let err = shuffle
            .forward(&Tensor::zeros([2, 6, 3, 3], tch::kind::FLOAT_CPU))
            .unwrap_err();
        assert_eq!(
            err.downcast::<NnError>()?,
            NnError::IndivisibleChannels {
                channels: 6,
                groups: 4
            }
        );
        assert!(shuffle
            .forward(&Tensor::zeros([2, 8], tch::kind::FLOAT_CPU))
            .is_err());
        assert!(ChannelShuffle::new(0).is_err());
        Ok(())
    }
}
