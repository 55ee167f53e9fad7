use super::DqnModelConfig;
use crate::{
    head::{ActionDim, Head, Logit},
    model::{ModelBase, SubModel},
    util::OutDim,
};
use anyhow::{Context, Result};
use log::{info, trace};
use tch::{nn, Device, Tensor};

/// Action-value function of DQN agents.
///
/// An observation is converted to an embedding by the encoder `E`,
/// then mapped to action values by a (dueling) head.
pub struct DqnModel<E>
where
    E: SubModel<Input = Tensor, Output = Tensor>,
    E::Config: OutDim,
{
    device: Device,
    var_store: nn::VarStore,
    embedding_dim: i64,
    encoder: E,
    head: Head,
}

impl<E> DqnModel<E>
where
    E: SubModel<Input = Tensor, Output = Tensor>,
    E::Config: OutDim,
{
    /// Constructs [`DqnModel`].
    pub fn build(config: DqnModelConfig<E::Config>, device: Device) -> Result<Self> {
        let encoder_config = config.encoder_config.context("encoder_config is not set.")?;
        let head_config = config.head_config.context("head_config is not set.")?;
        let embedding_dim = encoder_config.get_out_dim();
        let var_store = nn::VarStore::new(device);
        let encoder = E::build(&var_store, encoder_config)?;
        let head = Head::build(&(var_store.root() / "head"), embedding_dim, head_config)?;

        info!(
            "Build DQN model with embedding_dim {} and action_dim {:?}",
            embedding_dim,
            head.action_dim()
        );
        for (name, _) in var_store.variables().iter() {
            trace!("Variable {}", name);
        }

        Ok(Self {
            device,
            var_store,
            embedding_dim,
            encoder,
            head,
        })
    }

    /// Outputs action values given a batch of observations.
    ///
    /// Each tensor of the output is of shape `[batch_size, n_actions]`.
    pub fn forward_t(&self, obs: &Tensor, train: bool) -> Logit {
        let x = self.encoder.forward_t(obs, train);
        debug_assert_eq!(x.size().as_slice()[1], self.embedding_dim);
        self.head.forward_t(&x, train)
    }

    /// Outputs action values in evaluation mode.
    pub fn forward(&self, obs: &Tensor) -> Logit {
        self.forward_t(obs, false)
    }

    /// Returns the action dimension.
    pub fn action_dim(&self) -> &ActionDim {
        self.head.action_dim()
    }

    /// Returns a model with a copy of the parameters, e.g., a target network.
    pub fn try_clone(&self) -> Result<Self> {
        let mut var_store = nn::VarStore::new(self.device);
        let encoder = self.encoder.clone_with_var_store(&var_store)?;
        let head = self.head.clone_with_path(&(var_store.root() / "head"))?;
        var_store.copy(&self.var_store)?;

        Ok(Self {
            device: self.device,
            var_store,
            embedding_dim: self.embedding_dim,
            encoder,
            head,
        })
    }
}

impl<E> ModelBase for DqnModel<E>
where
    E: SubModel<Input = Tensor, Output = Tensor>,
    E::Config: OutDim,
{
    fn get_var_store_mut(&mut self) -> &mut nn::VarStore {
        &mut self.var_store
    }

    fn get_var_store(&self) -> &nn::VarStore {
        &self.var_store
    }
}
