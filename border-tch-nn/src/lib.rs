//! Neural network building blocks and Q-networks implemented with [tch](https://crates.io/crates/tch).
//!
//! The crate has two layers:
//!
//! * [`layers`] provides factories of convolutional and fully-connected blocks,
//!   weight initialization, upsampling, channel shuffle and one-hot/binary encoding.
//! * [`dqn`] and [`drqn`] compose [`encoder`]s, [`head`]s and an [`lstm`] core into
//!   Q-value networks used by DQN-like agents.
//!
//! ```no_run
//! use border_tch_nn::{dqn::DqnModelConfig, FcDqn};
//! use tch::{Device, Tensor};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = DqnModelConfig::fc(32, vec![4, 8], 64);
//! let model = FcDqn::build(config, Device::Cpu)?;
//! let obs = Tensor::randn([4, 32], tch::kind::FLOAT_CPU);
//! let logit = model.forward(&obs);
//! assert_eq!(logit.len(), 2);
//! # Ok(())
//! # }
//! ```
pub mod dqn;
pub mod drqn;
pub mod encoder;
pub mod error;
pub mod head;
pub mod layers;
pub mod lstm;
pub mod model;
pub mod util;

pub use error::NnError;
pub use head::{ActionDim, Logit};
pub use lstm::LstmState;

/// DQN with a fully-connected encoder.
pub type FcDqn = dqn::DqnModel<encoder::FcEncoder>;

/// DQN with a convolutional encoder.
pub type ConvDqn = dqn::DqnModel<encoder::ConvEncoder>;

/// DRQN with a fully-connected encoder.
pub type FcDrqn = drqn::DrqnModel<encoder::FcEncoder>;

/// DRQN with a convolutional encoder.
pub type ConvDrqn = drqn::DrqnModel<encoder::ConvEncoder>;
