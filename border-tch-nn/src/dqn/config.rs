use crate::{
    encoder::{ConvEncoderConfig, FcEncoderConfig},
    head::{ActionDim, HeadConfig},
    util::OutDim,
};
use anyhow::Result;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`DqnModel`](super::DqnModel).
///
/// The type parameter `E` is the configuration of the encoder.
pub struct DqnModelConfig<E> {
    pub(super) encoder_config: Option<E>,
    pub(super) head_config: Option<HeadConfig>,
}

impl<E> Default for DqnModelConfig<E> {
    fn default() -> Self {
        Self {
            encoder_config: None,
            head_config: None,
        }
    }
}

impl<E> DqnModelConfig<E>
where
    E: DeserializeOwned + Serialize + OutDim,
{
    /// Sets configurations for the encoder.
    pub fn encoder_config(mut self, v: E) -> Self {
        self.encoder_config = Some(v);
        self
    }

    /// Sets configurations for the head.
    pub fn head_config(mut self, v: HeadConfig) -> Self {
        self.head_config = Some(v);
        self
    }

    /// Sets the dimension of the embedding, the output of the encoder.
    pub fn embedding_dim(mut self, v: i64) -> Self {
        if let Some(encoder_config) = &mut self.encoder_config {
            encoder_config.set_out_dim(v);
        }
        self
    }

    /// Sets the action dimension of the head.
    pub fn action_dim(mut self, v: impl Into<ActionDim>) -> Self {
        self.head_config = Some(match self.head_config {
            None => HeadConfig::new(v),
            Some(head_config) => head_config.action_dim(v),
        });
        self
    }

    /// Constructs [`DqnModelConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`DqnModelConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

impl DqnModelConfig<FcEncoderConfig> {
    /// DQN for vector observations of dimension `obs_dim`.
    pub fn fc(obs_dim: i64, action_dim: impl Into<ActionDim>, embedding_dim: i64) -> Self {
        Self::default()
            .encoder_config(FcEncoderConfig::new(obs_dim, vec![], embedding_dim))
            .action_dim(action_dim)
    }
}

impl DqnModelConfig<ConvEncoderConfig> {
    /// DQN for image observations of shape `[channels, height, width]`.
    pub fn conv(obs_shape: Vec<i64>, action_dim: impl Into<ActionDim>, embedding_dim: i64) -> Self {
        Self::default()
            .encoder_config(ConvEncoderConfig::new(obs_shape, embedding_dim))
            .action_dim(action_dim)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::head::HeadType;
    use tempdir::TempDir;

    #[test]
    fn test_serde_dqn_model_config() -> Result<()> {
        let config = DqnModelConfig::conv(vec![3, 64, 64], vec![4, 8], 32)
            .embedding_dim(64)
            .head_config(HeadConfig::new(vec![4, 8]).head_type(HeadType::Discrete));

        let dir = TempDir::new("dqn_model_config")?;
        let path = dir.path().join("dqn_model_config.yaml");
        println!("{:?}", path);

        config.save(&path)?;
        let config_ = DqnModelConfig::<ConvEncoderConfig>::load(&path)?;
        assert_eq!(config, config_);
        assert_eq!(config_.encoder_config.as_ref().map(|c| c.get_out_dim()), Some(64));

        let yaml = serde_yaml::to_string(&config)?;
        println!("{}", yaml);

        Ok(())
    }
}
