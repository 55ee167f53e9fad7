//! Errors in the library.
use tch::Kind;
use thiserror::Error;

/// Errors raised when building or applying network components.
#[derive(Error, Debug, PartialEq)]
pub enum NnError {
    /// Unknown key of weight initialization.
    #[error("Invalid value in init type: {0}")]
    InvalidInitType(String),

    /// Kaiming initialization needs the activation following the layer.
    #[error("Kaiming initialization requires an activation")]
    MissingActivation,

    /// Unknown padding type.
    #[error("Invalid padding type: {0}")]
    InvalidPadType(String),

    /// Unknown or unsupported normalization type.
    #[error("Invalid normalization type: {0}")]
    InvalidNormType(String),

    /// Number of channels is not a multiple of the number of groups.
    #[error("Number of channels {channels} is not divisible by group number {groups}")]
    IndivisibleChannels {
        /// Number of channels of the input.
        channels: i64,
        /// Number of groups.
        groups: i64,
    },

    /// A tensor or a configuration has an unexpected shape.
    #[error("Shape mismatch: expected {expected}, got {actual:?}")]
    ShapeMismatch {
        /// Description of the expected shape.
        expected: String,
        /// Actual shape.
        actual: Vec<i64>,
    },

    /// Values given to one-hot encoding are out of `[0, num - 1]`.
    #[error("One-hot values must be in [0, {num}), got min {min} and max {max}")]
    OneHotOutOfRange {
        /// Number of states.
        num: i64,
        /// Minimum value of the input.
        min: i64,
        /// Maximum value of the input.
        max: i64,
    },

    /// A tensor of integer values is required.
    #[error("Expected a tensor of an integer kind, got {0:?}")]
    NonIntegerKind(Kind),

    /// Non-positive argument where a positive one is required.
    #[error("{name} must be positive, got {value}")]
    NonPositive {
        /// Name of the argument.
        name: &'static str,
        /// Given value.
        value: i64,
    },

    /// Non-positive scale factor of upsampling.
    #[error("Scale factor must be positive, got ({0}, {1})")]
    InvalidUpsampleScale(f64, f64),

    /// Invalid action dimension.
    #[error("Invalid action dimension: {0:?}")]
    InvalidActionDim(Vec<i64>),

    /// Length of the previous recurrent states differs from the batch size.
    #[error("Batch size {batch_size} does not match the number of previous states {n_states}")]
    BatchSizeMismatch {
        /// Batch size of the observation.
        batch_size: i64,
        /// Number of given previous states.
        n_states: usize,
    },

    /// A trainable parameter did not receive a gradient.
    #[error("Parameter {0} is not differentiable")]
    NotDifferentiable(String),
}
