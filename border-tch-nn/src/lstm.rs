//! LSTM core with recurrent states kept per sample.
use crate::error::NnError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tch::{nn, nn::RNN, Device, Kind, Tensor};

/// Recurrent state of a single sample.
///
/// Both `h` and `c` are of shape `[num_layers, hidden_dim]`.
#[derive(Debug)]
pub struct LstmState {
    /// Hidden state.
    pub h: Tensor,

    /// Cell state.
    pub c: Tensor,
}

impl LstmState {
    /// Returns a copy detached from the computation graph.
    pub fn detach(&self) -> Self {
        Self {
            h: self.h.detach(),
            c: self.c.detach(),
        }
    }
}

fn one() -> i64 {
    1
}

/// Configuration of [`Lstm`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct LstmConfig {
    pub(crate) in_dim: i64,
    pub(crate) hidden_dim: i64,
    #[serde(default = "one")]
    pub(crate) num_layers: i64,
}

impl LstmConfig {
    /// Creates a configuration of a single-layer LSTM.
    pub fn new(in_dim: i64, hidden_dim: i64) -> Self {
        Self {
            in_dim,
            hidden_dim,
            num_layers: 1,
        }
    }

    pub fn num_layers(mut self, v: i64) -> Self {
        self.num_layers = v;
        self
    }
}

/// LSTM taking inputs of shape `[seq_len, batch, in_dim]`.
///
/// The recurrent states are given and returned as a list with an element for
/// each sample in the batch. `None` denotes the beginning of an episode,
/// for which the state is initialized with zeros.
pub struct Lstm {
    config: LstmConfig,
    device: Device,
    lstm: nn::LSTM,
}

impl Lstm {
    /// Builds an LSTM registering its parameters under `p`.
    pub fn build(p: &nn::Path, config: LstmConfig) -> Self {
        let rnn_config = nn::RNNConfig {
            num_layers: config.num_layers,
            batch_first: false,
            ..Default::default()
        };
        let lstm = nn::lstm(p, config.in_dim, config.hidden_dim, rnn_config);

        Self {
            config,
            device: p.device(),
            lstm,
        }
    }

    /// Dimension of the output.
    pub fn hidden_dim(&self) -> i64 {
        self.config.hidden_dim
    }

    fn zero_state(&self) -> LstmState {
        let shape = [self.config.num_layers, self.config.hidden_dim];
        LstmState {
            h: Tensor::zeros(shape, (Kind::Float, self.device)),
            c: Tensor::zeros(shape, (Kind::Float, self.device)),
        }
    }

    // Stacks per-sample states into [num_layers, batch, hidden_dim].
    fn merge(&self, prev_state: &[Option<LstmState>]) -> Result<nn::LSTMState> {
        let shape = [self.config.num_layers, self.config.hidden_dim];
        let mut hs = Vec::with_capacity(prev_state.len());
        let mut cs = Vec::with_capacity(prev_state.len());
        for s in prev_state.iter() {
            match s {
                Some(s) => {
                    for t in [&s.h, &s.c] {
                        if t.size() != shape {
                            return Err(NnError::ShapeMismatch {
                                expected: format!("{:?}", shape),
                                actual: t.size(),
                            }
                            .into());
                        }
                    }
                    hs.push(s.h.to_device(self.device));
                    cs.push(s.c.to_device(self.device));
                }
                None => {
                    let s = self.zero_state();
                    hs.push(s.h);
                    cs.push(s.c);
                }
            }
        }
        Ok(nn::LSTMState((Tensor::stack(&hs, 1), Tensor::stack(&cs, 1))))
    }

    fn split(state: &nn::LSTMState) -> Vec<LstmState> {
        let (h, c) = (state.h(), state.c());
        let batch_size = h.size()[1];
        (0..batch_size)
            .map(|i| LstmState {
                h: h.select(1, i),
                c: c.select(1, i),
            })
            .collect()
    }

    /// Runs the LSTM over the sequence `xs` of shape `[seq_len, batch, in_dim]`.
    ///
    /// Returns the outputs of shape `[seq_len, batch, hidden_dim]` and the
    /// states after the last step.
    pub fn forward(
        &self,
        xs: &Tensor,
        prev_state: &[Option<LstmState>],
    ) -> Result<(Tensor, Vec<LstmState>)> {
        let size = xs.size();
        if size.len() != 3 || size[2] != self.config.in_dim {
            return Err(NnError::ShapeMismatch {
                expected: format!("[seq_len, batch, {}]", self.config.in_dim),
                actual: size,
            }
            .into());
        }
        let batch_size = size[1];
        if batch_size == 0 {
            return Err(NnError::NonPositive {
                name: "batch_size",
                value: batch_size,
            }
            .into());
        }
        if prev_state.len() as i64 != batch_size {
            return Err(NnError::BatchSizeMismatch {
                batch_size,
                n_states: prev_state.len(),
            }
            .into());
        }

        let state = self.merge(prev_state)?;
        let (ys, next_state) = self.lstm.seq_init(&xs.to_device(self.device), &state);
        debug_assert_eq!(
            ys.size().as_slice(),
            &[size[0], batch_size, self.config.hidden_dim]
        );

        Ok((ys, Self::split(&next_state)))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn none_states(n: usize) -> Vec<Option<LstmState>> {
        (0..n).map(|_| None).collect()
    }

    #[test]
    fn test_lstm_states() -> Result<()> {
        let vs = nn::VarStore::new(Device::Cpu);
        let lstm = Lstm::build(&(vs.root() / "lstm"), LstmConfig::new(8, 16).num_layers(2));
        let xs = Tensor::randn([5, 3, 8], tch::kind::FLOAT_CPU);

        let (ys, next_state) = lstm.forward(&xs, &none_states(3))?;
        assert_eq!(ys.size(), [5, 3, 16]);
        assert_eq!(next_state.len(), 3);
        for s in next_state.iter() {
            assert_eq!(s.h.size(), [2, 16]);
            assert_eq!(s.c.size(), [2, 16]);
        }

        // The hidden state of the last layer equals the last output
        assert!(next_state[1].h.get(1).allclose(&ys.get(4).get(1), 1e-5, 1e-5, false));
        Ok(())
    }

    #[test]
    fn test_lstm_step_by_step() -> Result<()> {
        let vs = nn::VarStore::new(Device::Cpu);
        let lstm = Lstm::build(&vs.root(), LstmConfig::new(4, 6));
        let xs = Tensor::randn([3, 2, 4], tch::kind::FLOAT_CPU);

        let (ys, _) = lstm.forward(&xs, &none_states(2))?;
        let mut state = none_states(2);
        for t in 0..3 {
            let (y, next_state) = lstm.forward(&xs.narrow(0, t, 1), &state)?;
            assert!(y.squeeze_dim(0).allclose(&ys.get(t), 1e-5, 1e-5, false));
            state = next_state.into_iter().map(Some).collect();
        }
        Ok(())
    }

    #[test]
    fn test_lstm_invalid_states() -> Result<()> {
        let vs = nn::VarStore::new(Device::Cpu);
        let lstm = Lstm::build(&vs.root(), LstmConfig::new(4, 6).num_layers(2));
        let xs = Tensor::randn([1, 2, 4], tch::kind::FLOAT_CPU);

        // A state of a single-layer LSTM
        let state = LstmState {
            h: Tensor::zeros([1, 6], tch::kind::FLOAT_CPU),
            c: Tensor::zeros([1, 6], tch::kind::FLOAT_CPU),
        };
        let err = lstm.forward(&xs, &[None, Some(state)]).unwrap_err();
        assert_eq!(
            err.downcast::<NnError>()?,
            NnError::ShapeMismatch {
                expected: "[2, 6]".to_string(),
                actual: vec![1, 6]
            }
        );

        let xs = Tensor::randn([1, 0, 4], tch::kind::FLOAT_CPU);
        let err = lstm.forward(&xs, &[]).unwrap_err();
        assert_eq!(
            err.downcast::<NnError>()?,
            NnError::NonPositive {
                name: "batch_size",
                value: 0
            }
        );
        Ok(())
    }

    #[test]
    fn test_lstm_state_detach() -> Result<()> {
        let vs = nn::VarStore::new(Device::Cpu);
        let lstm = Lstm::build(&vs.root(), LstmConfig::new(4, 6));
        let xs = Tensor::randn([2, 3, 4], tch::kind::FLOAT_CPU);
        let (_, next_state) = lstm.forward(&xs, &none_states(3))?;
        assert!(next_state[0].h.requires_grad());

        let detached = next_state[0].detach();
        assert!(!detached.h.requires_grad());
        assert!(!detached.c.requires_grad());
        assert!(detached.h.equal(&next_state[0].h));
        Ok(())
    }

    #[test]
    fn test_lstm_batch_mismatch() {
        let vs = nn::VarStore::new(Device::Cpu);
        let lstm = Lstm::build(&vs.root(), LstmConfig::new(4, 6));
        let xs = Tensor::randn([1, 2, 4], tch::kind::FLOAT_CPU);
        assert!(lstm.forward(&xs, &none_states(3)).is_err());
        assert!(lstm.forward(&Tensor::randn([2, 4], tch::kind::FLOAT_CPU), &none_states(2)).is_err());
    }
}
