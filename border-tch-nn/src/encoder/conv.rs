use super::ConvEncoderConfig;
use crate::{
    layers::{conv2d_block, fc_block, Conv2dBlockConfig, FcBlockConfig},
    model::SubModel,
};
use anyhow::Result;
use log::trace;
use tch::{nn, nn::ModuleT, Device, Kind, Tensor};

/// Convolutional feature extractor for image observations.
///
/// The input of shape `[batch, channels, height, width]` goes through
/// convolutional blocks, is flattened and then mapped to the embedding by a
/// fully-connected block.
pub struct ConvEncoder {
    config: ConvEncoderConfig,
    device: Device,
    seq: nn::SequentialT,
}

impl ConvEncoder {
    fn create_net(var_store: &nn::VarStore, config: &ConvEncoderConfig) -> Result<nn::SequentialT> {
        let flatten_dim = config.flatten_dim()?;
        let p = &(var_store.root() / "encoder");
        let mut seq = nn::seq_t();

        if config.pixel_input {
            seq = seq.add_fn(|xs| xs.to_kind(Kind::Float) / 255);
        }

        let mut in_channels = config.obs_shape[0];
        let convs = config
            .channels
            .iter()
            .zip(config.kernel_sizes.iter())
            .zip(config.strides.iter());
        for (i, ((&out_channels, &kernel_size), &stride)) in convs.enumerate() {
            let mut block_config = Conv2dBlockConfig::new(in_channels, out_channels, kernel_size)
                .stride(stride)
                .init_type(config.init_type)
                .activation(config.activation);
            if let Some(norm_type) = config.norm_type {
                block_config = block_config.norm_type(norm_type);
            }
            let block = conv2d_block(&(p / format!("conv{}", i)), &block_config)?;
            in_channels = block.out_channels();
            seq = seq.add(block);
        }

        trace!("Flattened dimension of ConvEncoder: {}", flatten_dim);
        let fc_config = FcBlockConfig::new(flatten_dim, config.out_dim)
            .init_type(config.init_type)
            .activation(config.activation)
            .norm_type_opt(config.norm_type);

        Ok(seq
            .add_fn(|xs| xs.flat_view())
            .add(fc_block(&(p / "fc"), &fc_config)?))
    }
}

impl SubModel for ConvEncoder {
    type Config = ConvEncoderConfig;
    type Input = Tensor;
    type Output = Tensor;

    fn forward_t(&self, x: &Self::Input, train: bool) -> Tensor {
        self.seq.forward_t(&x.to(self.device), train)
    }

    fn build(var_store: &nn::VarStore, config: Self::Config) -> Result<Self> {
        let device = var_store.device();
        let seq = Self::create_net(var_store, &config)?;

        Ok(Self {
            config,
            device,
            seq,
        })
    }

    fn clone_with_var_store(&self, var_store: &nn::VarStore) -> Result<Self> {
        Self::build(var_store, self.config.clone())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_conv_encoder() -> Result<()> {
        let vs = nn::VarStore::new(Device::Cpu);
        let encoder = ConvEncoder::build(&vs, ConvEncoderConfig::new(vec![3, 64, 64], 32))?;
        let xs = Tensor::randn([4, 3, 64, 64], tch::kind::FLOAT_CPU);
        assert_eq!(encoder.forward(&xs).size(), [4, 32]);
        Ok(())
    }

    #[test]
    fn test_conv_encoder_pixel_input() -> Result<()> {
        let vs = nn::VarStore::new(Device::Cpu);
        let config = ConvEncoderConfig::new(vec![4, 84, 84], 512).pixel_input(true);
        let encoder = ConvEncoder::build(&vs, config)?;
        let xs = Tensor::randint(256, [2, 4, 84, 84], (Kind::Uint8, Device::Cpu));
        let ys = encoder.forward(&xs);
        assert_eq!(ys.size(), [2, 512]);
        assert_eq!(ys.kind(), Kind::Float);
        Ok(())
    }
}
