use super::DrqnModelConfig;
use crate::{
    error::NnError,
    head::{ActionDim, Head, Logit},
    lstm::{Lstm, LstmConfig, LstmState},
    model::{ModelBase, SubModel},
    util::{concat_slices, OutDim},
};
use anyhow::{Context, Result};
use log::{info, trace};
use tch::{nn, Device, Tensor};

/// Output of [`DrqnModel`].
#[derive(Debug)]
pub struct DrqnOutput {
    /// Action values.
    pub logit: Logit,

    /// Recurrent states after the input, one for each sample in the batch.
    pub next_state: Vec<LstmState>,
}

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Recurrent action-value function of DRQN agents.
///
/// ```mermaid
/// graph LR
///     A[obs] --> B[encoder]
///     B --> C[LSTM]
///     D[prev_state] --> C
///     C --> E[head]
///     E --> F[logit]
///     C --> G[next_state]
/// ```
///
/// The recurrent state is handled per sample: `prev_state` has an element for
/// each sample in the batch and `None` starts a new episode with a zero state.
pub struct DrqnModel<E>
where
    E: SubModel<Input = Tensor, Output = Tensor>,
    E::Config: OutDim,
{
    device: Device,
    var_store: nn::VarStore,
    lstm_config: LstmConfig,
    encoder: E,
    lstm: Lstm,
    head: Head,
}

impl<E> DrqnModel<E>
where
    E: SubModel<Input = Tensor, Output = Tensor>,
    E::Config: OutDim,
{
    /// Constructs [`DrqnModel`].
    pub fn build(config: DrqnModelConfig<E::Config>, device: Device) -> Result<Self> {
        let encoder_config = config.encoder_config.context("encoder_config is not set.")?;
        let head_config = config.head_config.context("head_config is not set.")?;
        let embedding_dim = encoder_config.get_out_dim();
        let hidden_dim = config.hidden_dim.unwrap_or(embedding_dim);
        for (name, value) in [("hidden_dim", hidden_dim), ("num_layers", config.num_layers)] {
            if value <= 0 {
                return Err(NnError::NonPositive { name, value }.into());
            }
        }
        let lstm_config = LstmConfig::new(embedding_dim, hidden_dim).num_layers(config.num_layers);

        let var_store = nn::VarStore::new(device);
        let encoder = E::build(&var_store, encoder_config)?;
        let lstm = Lstm::build(&(var_store.root() / "lstm"), lstm_config.clone());
        let head = Head::build(&(var_store.root() / "head"), hidden_dim, head_config)?;

        info!(
            "Build DRQN model with embedding_dim {}, hidden_dim {} and action_dim {:?}",
            embedding_dim,
            hidden_dim,
            head.action_dim()
        );
        for (name, _) in var_store.variables().iter() {
            trace!("Variable {}", name);
        }

        Ok(Self {
            device,
            var_store,
            lstm_config,
            encoder,
            lstm,
            head,
        })
    }

    /// Processes a single timestep of observations of shape `[batch_size, ..]`.
    ///
    /// `prev_state` must have `batch_size` elements.
    pub fn forward_t(
        &self,
        obs: &Tensor,
        prev_state: &[Option<LstmState>],
        train: bool,
    ) -> Result<DrqnOutput> {
        let x = self.encoder.forward_t(obs, train);
        let (y, next_state) = self.lstm.forward(&x.unsqueeze(0), prev_state)?;
        let logit = self.head.forward_t(&y.squeeze_dim(0), train);

        Ok(DrqnOutput { logit, next_state })
    }

    pub fn forward(&self, obs: &Tensor, prev_state: &[Option<LstmState>]) -> Result<DrqnOutput> {
        self.forward_t(obs, prev_state, false)
    }

    /// Processes a sequence of observations of shape `[seq_len, batch_size, ..]`
    /// at once.
    ///
    /// The encoder and the head are applied to all timesteps in a single batch.
    /// Each tensor of the output is of shape `[seq_len, batch_size, n_actions]`.
    pub fn forward_seq_t(
        &self,
        obs: &Tensor,
        prev_state: &[Option<LstmState>],
        train: bool,
    ) -> Result<DrqnOutput> {
        let size = obs.size();
        if size.len() < 3 {
            return Err(NnError::ShapeMismatch {
                expected: "[seq_len, batch_size, ..]".to_string(),
                actual: size,
            }
            .into());
        }
        let (seq_len, batch_size) = (size[0], size[1]);

        let x = obs.reshape(concat_slices(&[seq_len * batch_size], &size[2..]).as_slice());
        let x = self.encoder.forward_t(&x, train).view([seq_len, batch_size, -1]);
        let (y, next_state) = self.lstm.forward(&x, prev_state)?;
        let logit = self
            .head
            .forward_t(&y.view([seq_len * batch_size, -1]), train)
            .map(|q| q.view([seq_len, batch_size, -1]));

        Ok(DrqnOutput { logit, next_state })
    }

    pub fn forward_seq(
        &self,
        obs: &Tensor,
        prev_state: &[Option<LstmState>],
    ) -> Result<DrqnOutput> {
        self.forward_seq_t(obs, prev_state, false)
    }

    /// Returns the action dimension.
    pub fn action_dim(&self) -> &ActionDim {
        self.head.action_dim()
    }

    /// Returns the dimension of the hidden state of the LSTM.
    pub fn hidden_dim(&self) -> i64 {
        self.lstm.hidden_dim()
    }

    /// Returns a model with a copy of the parameters.
    pub fn try_clone(&self) -> Result<Self> {
        let mut var_store = nn::VarStore::new(self.device);
        let encoder = self.encoder.clone_with_var_store(&var_store)?;
        let lstm = Lstm::build(&(var_store.root() / "lstm"), self.lstm_config.clone());
        let head = self.head.clone_with_path(&(var_store.root() / "head"))?;
        var_store.copy(&self.var_store)?;

        Ok(Self {
            device: self.device,
            var_store,
            lstm_config: self.lstm_config.clone(),
            encoder,
            lstm,
            head,
        })
    }
}

impl<E> ModelBase for DrqnModel<E>
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
