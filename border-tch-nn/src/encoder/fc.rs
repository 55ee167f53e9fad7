use super::FcEncoderConfig;
use crate::{
    layers::{fc_block, FcBlockConfig},
    model::SubModel,
};
use anyhow::Result;
use std::iter::once;
use tch::{nn, nn::ModuleT, Device, Tensor};

/// Stack of fully-connected blocks, each followed by the activation.
pub struct FcEncoder {
    config: FcEncoderConfig,
    device: Device,
    seq: nn::SequentialT,
}

impl FcEncoder {
    fn create_net(var_store: &nn::VarStore, config: &FcEncoderConfig) -> Result<nn::SequentialT> {
        let p = &(var_store.root() / "encoder");
        let mut seq = nn::seq_t();
        let mut in_dim = config.in_dim;

        for (i, &out_dim) in config.units.iter().chain(once(&config.out_dim)).enumerate() {
            let block_config = FcBlockConfig::new(in_dim, out_dim)
                .init_type(config.init_type)
                .activation(config.activation)
                .norm_type_opt(config.norm_type);
            seq = seq.add(fc_block(&(p / format!("fc{}", i)), &block_config)?);
            in_dim = out_dim;
        }

        Ok(seq)
    }
}

impl SubModel for FcEncoder {
    type Config = FcEncoderConfig;
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
    use crate::layers::{Activation, NormType};

    #[test]
    fn test_fc_encoder() -> Result<()> {
        let vs = nn::VarStore::new(Device::Cpu);
        let config = FcEncoderConfig::new(10, vec![32, 16], 8)
            .activation(Activation::Tanh)
            .norm_type(NormType::BatchNorm);
        let encoder = FcEncoder::build(&vs, config)?;
        let xs = Tensor::randn([5, 10], tch::kind::FLOAT_CPU);
        let ys = encoder.forward_t(&xs, true);
        assert_eq!(ys.size(), [5, 8]);
        assert!(ys.abs().max().double_value(&[]) <= 1.0);

        // 3 linear layers and 3 batch norms
        assert_eq!(vs.trainable_variables().len(), 3 * 2 + 3 * 2);
        Ok(())
    }
}
