//! Definition of interfaces of neural networks.
use anyhow::Result;
use tch::nn::VarStore;

/// Base interface of networks owning their [`VarStore`].
pub trait ModelBase {
    /// Returns `var_store` as mutable reference.
    fn get_var_store_mut(&mut self) -> &mut VarStore;

    /// Returns `var_store`.
    fn get_var_store(&self) -> &VarStore;
}

/// Neural network model that can be initialized with [`VarStore`] and configuration.
///
/// Modules, which consist a neural network, share a [`VarStore`].
/// To do this, structs implementing this trait are initialized with a given [`VarStore`],
/// registering their parameters under their own prefix.
/// This trait also provides the ability to clone with a given [`VarStore`],
/// which is useful when creating a target network.
///
/// [`VarStore`]: https://docs.rs/tch/0.16.0/tch/nn/struct.VarStore.html
pub trait SubModel: Sized {
    /// Configuration from which [`SubModel`] is constructed.
    type Config;

    /// Input of the [`SubModel`].
    type Input;

    /// Output of the [`SubModel`].
    type Output;

    /// Builds [`SubModel`] with [`VarStore`] and [`SubModel::Config`].
    fn build(var_store: &VarStore, config: Self::Config) -> Result<Self>;

    /// Clones [`SubModel`] with [`VarStore`].
    ///
    /// Parameters are not copied. Use [`VarStore::copy`] for that.
    fn clone_with_var_store(&self, var_store: &VarStore) -> Result<Self>;

    /// A generalized forward function with a flag of train mode,
    /// which switches batch normalization and dropout.
    fn forward_t(&self, input: &Self::Input, train: bool) -> Self::Output;

    /// Forward function in evaluation mode.
    fn forward(&self, input: &Self::Input) -> Self::Output {
        self.forward_t(input, false)
    }
}
