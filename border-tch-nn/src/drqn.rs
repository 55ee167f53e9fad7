//! Recurrent Q-networks of DRQN.
mod base;
mod config;
pub use base::{DrqnModel, DrqnOutput};
pub use config::DrqnModelConfig;
