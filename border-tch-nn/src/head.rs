//! Heads mapping embeddings to action values.
use crate::{
    error::NnError,
    layers::{fc_block, Activation, FcBlockConfig, InitType, NormType},
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tch::{nn, nn::ModuleT, Kind, Tensor};

/// Dimension of discrete actions.
///
/// [`ActionDim::Multi`] represents a multi-discrete action space, for which a
/// network outputs action values of each sub-action.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
#[serde(untagged)]
pub enum ActionDim {
    /// The number of actions.
    Single(i64),

    /// The numbers of actions of sub-actions.
    Multi(Vec<i64>),
}

impl From<i64> for ActionDim {
    fn from(v: i64) -> Self {
        Self::Single(v)
    }
}

impl From<Vec<i64>> for ActionDim {
    fn from(v: Vec<i64>) -> Self {
        Self::Multi(v)
    }
}

impl From<&[i64]> for ActionDim {
    fn from(v: &[i64]) -> Self {
        Self::Multi(v.to_vec())
    }
}

impl ActionDim {
    /// Checks the dimensions and unwraps a list with a single element.
    pub fn normalize(self) -> Result<Self> {
        let dims = self.dims();
        if dims.is_empty() || dims.iter().any(|&d| d <= 0) {
            return Err(NnError::InvalidActionDim(dims).into());
        }

        Ok(match self {
            Self::Multi(v) if v.len() == 1 => Self::Single(v[0]),
            _ => self,
        })
    }

    /// Returns the numbers of actions as a list.
    pub fn dims(&self) -> Vec<i64> {
        match self {
            Self::Single(n) => vec![*n],
            Self::Multi(v) => v.clone(),
        }
    }

    /// Returns `true` for multi-discrete actions.
    pub fn is_multi(&self) -> bool {
        matches!(self, Self::Multi(_))
    }
}

/// Output of Q-networks.
#[derive(Debug)]
pub enum Logit {
    /// Action values of shape `[.., n_actions]`.
    Single(Tensor),

    /// Action values for each sub-action.
    Multi(Vec<Tensor>),
}

impl Logit {
    /// Returns the number of tensors.
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Multi(ts) => ts.len(),
        }
    }

    /// Returns `true` if there is no tensor.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns references to the tensors.
    pub fn tensors(&self) -> Vec<&Tensor> {
        match self {
            Self::Single(t) => vec![t],
            Self::Multi(ts) => ts.iter().collect(),
        }
    }

    /// Returns the tensor of a single action space.
    pub fn single(&self) -> Option<&Tensor> {
        match self {
            Self::Single(t) => Some(t),
            Self::Multi(_) => None,
        }
    }

    /// Takes the tensors.
    pub fn into_vec(self) -> Vec<Tensor> {
        match self {
            Self::Single(t) => vec![t],
            Self::Multi(ts) => ts,
        }
    }

    /// Sum of all elements of all tensors.
    pub fn sum(&self) -> Tensor {
        let sums = self
            .tensors()
            .iter()
            .map(|t| t.sum(Kind::Float))
            .collect::<Vec<_>>();
        Tensor::stack(&sums, 0).sum(Kind::Float)
    }

    pub(crate) fn map<F: Fn(&Tensor) -> Tensor>(self, f: F) -> Self {
        match self {
            Self::Single(t) => Self::Single(f(&t)),
            Self::Multi(ts) => Self::Multi(ts.iter().map(f).collect()),
        }
    }
}

/// Type of heads.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum HeadType {
    /// Action values directly computed from the embedding.
    Discrete,

    /// State value and advantages, `q = v + a - mean(a)`.
    Dueling,
}

impl Default for HeadType {
    fn default() -> Self {
        Self::Dueling
    }
}

fn one() -> usize {
    1
}

fn relu() -> Activation {
    Activation::Relu
}

/// Configuration of [`Head`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct HeadConfig {
    #[serde(default)]
    pub(crate) head_type: HeadType,
    pub(crate) action_dim: ActionDim,

    /// Number of hidden layers before the output layer.
    #[serde(default = "one")]
    pub(crate) layer_num: usize,
    #[serde(default = "relu")]
    pub(crate) activation: Activation,
    #[serde(default)]
    pub(crate) norm_type: Option<NormType>,
    #[serde(default)]
    pub(crate) init_type: InitType,
}

impl HeadConfig {
    /// Creates a configuration of a dueling head with a hidden layer.
    pub fn new(action_dim: impl Into<ActionDim>) -> Self {
        Self {
            head_type: HeadType::default(),
            action_dim: action_dim.into(),
            layer_num: 1,
            activation: relu(),
            norm_type: None,
            init_type: InitType::default(),
        }
    }

    pub fn head_type(mut self, v: HeadType) -> Self {
        self.head_type = v;
        self
    }

    pub fn action_dim(mut self, v: impl Into<ActionDim>) -> Self {
        self.action_dim = v.into();
        self
    }

    pub fn layer_num(mut self, v: usize) -> Self {
        self.layer_num = v;
        self
    }

    pub fn activation(mut self, v: Activation) -> Self {
        self.activation = v;
        self
    }

    pub fn norm_type(mut self, v: NormType) -> Self {
        self.norm_type = Some(v);
        self
    }

    pub fn init_type(mut self, v: InitType) -> Self {
        self.init_type = v;
        self
    }
}

#[derive(Debug)]
enum Branch {
    Discrete(nn::SequentialT),
    Dueling {
        a: nn::SequentialT,
        v: nn::SequentialT,
    },
}

impl Branch {
    fn mlp(p: &nn::Path, in_dim: i64, out_dim: i64, config: &HeadConfig) -> Result<nn::SequentialT> {
        let mut seq = nn::seq_t();
        for i in 0..config.layer_num {
            let block_config = FcBlockConfig::new(in_dim, in_dim)
                .init_type(config.init_type)
                .activation(config.activation)
                .norm_type_opt(config.norm_type);
            seq = seq.add(fc_block(&(p / format!("fc{}", i)), &block_config)?);
        }

        // Kaiming needs an activation, which the output layer does not have
        let out_init_type = match config.init_type {
            InitType::Kaiming => InitType::Xavier,
            init_type => init_type,
        };
        let out_config = FcBlockConfig::new(in_dim, out_dim).init_type(out_init_type);

        Ok(seq.add(fc_block(&(p / "out"), &out_config)?))
    }

    fn build(p: &nn::Path, in_dim: i64, n_actions: i64, config: &HeadConfig) -> Result<Self> {
        Ok(match config.head_type {
            HeadType::Discrete => Self::Discrete(Self::mlp(&(p / "q"), in_dim, n_actions, config)?),
            HeadType::Dueling => Self::Dueling {
                a: Self::mlp(&(p / "a"), in_dim, n_actions, config)?,
                v: Self::mlp(&(p / "v"), in_dim, 1, config)?,
            },
        })
    }

    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        match self {
            Self::Discrete(q) => q.forward_t(xs, train),
            Self::Dueling { a, v } => {
                let a = a.forward_t(xs, train);
                let v = v.forward_t(xs, train);
                let a_mean = a.mean_dim([-1_i64].as_slice(), true, Kind::Float);
                v + a - a_mean
            }
        }
    }
}

/// Maps an embedding of shape `[batch, in_dim]` to action values.
///
/// For [`ActionDim::Multi`], a branch is built for each sub-action.
#[derive(Debug)]
pub struct Head {
    config: HeadConfig,
    in_dim: i64,
    branches: Vec<Branch>,
}

impl Head {
    /// Builds a head registering its parameters under `p`.
    pub fn build(p: &nn::Path, in_dim: i64, config: HeadConfig) -> Result<Self> {
        let mut config = config;
        config.action_dim = config.action_dim.normalize()?;
        let branches = config
            .action_dim
            .dims()
            .iter()
            .enumerate()
            .map(|(i, &n)| Branch::build(&(p / format!("branch{}", i)), in_dim, n, &config))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            config,
            in_dim,
            branches,
        })
    }

    /// Builds a head of the same configuration under `p`.
    pub fn clone_with_path(&self, p: &nn::Path) -> Result<Self> {
        Self::build(p, self.in_dim, self.config.clone())
    }

    /// Returns the normalized action dimension.
    pub fn action_dim(&self) -> &ActionDim {
        &self.config.action_dim
    }

    /// Returns action values.
    pub fn forward_t(&self, xs: &Tensor, train: bool) -> Logit {
        debug_assert_eq!(xs.size().last(), Some(&self.in_dim));
        match self.config.action_dim {
            ActionDim::Single(_) => Logit::Single(self.branches[0].forward_t(xs, train)),
            ActionDim::Multi(_) => Logit::Multi(
                self.branches
                    .iter()
                    .map(|b| b.forward_t(xs, train))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tch::Device;

    #[test]
    fn test_normalize_action_dim() -> Result<()> {
        assert_eq!(ActionDim::from(vec![6]).normalize()?, ActionDim::Single(6));
        assert_eq!(
            ActionDim::from(vec![4, 8]).normalize()?,
            ActionDim::Multi(vec![4, 8])
        );
        assert!(ActionDim::from(Vec::<i64>::new()).normalize().is_err());
        assert!(ActionDim::from(vec![3, 0]).normalize().is_err());
        assert!(ActionDim::from(-1).normalize().is_err());
        Ok(())
    }

    #[test]
    fn test_serde_action_dim() -> Result<()> {
        let dim: ActionDim = serde_yaml::from_str("6")?;
        assert_eq!(dim, ActionDim::Single(6));
        let dim: ActionDim = serde_yaml::from_str("[4, 8]")?;
        assert_eq!(dim, ActionDim::Multi(vec![4, 8]));
        Ok(())
    }

    #[test]
    fn test_dueling_head() -> Result<()> {
        let vs = nn::VarStore::new(Device::Cpu);
        let head = Head::build(&(vs.root() / "head"), 16, HeadConfig::new(5))?;
        let q = head.forward_t(&Tensor::randn([3, 16], tch::kind::FLOAT_CPU), false);
        let q = q.single().unwrap();
        assert_eq!(q.size(), [3, 5]);
        Ok(())
    }

    #[test]
    fn test_multi_discrete_head() -> Result<()> {
        let vs = nn::VarStore::new(Device::Cpu);
        let config = HeadConfig::new(vec![4, 8])
            .head_type(HeadType::Discrete)
            .layer_num(2);
        let head = Head::build(&(vs.root() / "head"), 16, config)?;
        assert!(head.action_dim().is_multi());

        let logit = head.forward_t(&Tensor::randn([3, 16], tch::kind::FLOAT_CPU), false);
        let sizes = logit.tensors().iter().map(|t| t.size()).collect::<Vec<_>>();
        assert_eq!(sizes, vec![vec![3, 4], vec![3, 8]]);
        assert_eq!(logit.sum().size(), Vec::<i64>::new());
        Ok(())
    }
}
