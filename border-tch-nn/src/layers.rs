//! Primitive layers and tensor utilities.
//!
//! Block factories return a [`Block`], a [`tch::nn::SequentialT`] remembering
//! the number of its output channels.
mod activation;
mod block;
mod encode;
mod init;
mod norm;
mod shuffle;
mod upsample;
pub use activation::Activation;
pub use block::{
    conv1d_block, conv2d_block, deconv2d_block, fc_block, Block, Conv1dBlockConfig,
    Conv2dBlockConfig, Deconv2dBlockConfig, FcBlockConfig, PadType,
};
pub use encode::{binary_encode, one_hot};
pub use init::{weight_init_, InitType};
pub use norm::{build_normalization, Norm, NormType};
pub use shuffle::ChannelShuffle;
pub use upsample::{BilinearUpsample, NearestUpsample, ScaleFactor};
