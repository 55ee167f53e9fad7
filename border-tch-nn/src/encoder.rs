//! Feature extractors converting observations into embedding vectors.
mod conv;
mod conv_config;
mod fc;
mod fc_config;
pub use conv::ConvEncoder;
pub use conv_config::ConvEncoderConfig;
pub use fc::FcEncoder;
pub use fc_config::FcEncoderConfig;
