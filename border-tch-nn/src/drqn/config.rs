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

fn one() -> i64 {
    1
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`DrqnModel`](super::DrqnModel).
///
/// The type parameter `E` is the configuration of the encoder.
pub struct DrqnModelConfig<E> {
    pub(super) encoder_config: Option<E>,
    pub(super) head_config: Option<HeadConfig>,

    /// Dimension of the hidden state of the LSTM.
    /// If `None`, the embedding dimension is used.
    #[serde(default)]
    pub(super) hidden_dim: Option<i64>,

    #[serde(default = "one")]
    pub(super) num_layers: i64,
}

impl<E> Default for DrqnModelConfig<E> {
    fn default() -> Self {
        Self {
            encoder_config: None,
            head_config: None,
            hidden_dim: None,
            num_layers: 1,
        }
    }
}

impl<E> DrqnModelConfig<E>
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

    /// Sets the dimension of the hidden state of the LSTM.
    pub fn hidden_dim(mut self, v: i64) -> Self {
        self.hidden_dim = Some(v);
        self
    }

    /// Sets the number of layers of the LSTM.
    pub fn num_layers(mut self, v: i64) -> Self {
        self.num_layers = v;
        self
    }

    /// Constructs [`DrqnModelConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`DrqnModelConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

impl DrqnModelConfig<FcEncoderConfig> {
    /// DRQN for vector observations of dimension `obs_dim`.
    pub fn fc(obs_dim: i64, action_dim: impl Into<ActionDim>, embedding_dim: i64) -> Self {
        Self::default()
            .encoder_config(FcEncoderConfig::new(obs_dim, vec![], embedding_dim))
            .action_dim(action_dim)
    }
}

impl DrqnModelConfig<ConvEncoderConfig> {
    /// DRQN for image observations of shape `[channels, height, width]`.
    pub fn conv(obs_shape: Vec<i64>, action_dim: impl Into<ActionDim>, embedding_dim: i64) -> Self {
        Self::default()
            .encoder_config(ConvEncoderConfig::new(obs_shape, embedding_dim))
            .action_dim(action_dim)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_serde_drqn_model_config() -> Result<()> {
        let config = DrqnModelConfig::fc(32, 6, 64).hidden_dim(128).num_layers(2);

        let dir = TempDir::new("drqn_model_config")?;
        let path = dir.path().join("drqn_model_config.yaml");
        config.save(&path)?;
        let config_ = DrqnModelConfig::<FcEncoderConfig>::load(&path)?;
        assert_eq!(config, config_);

        Ok(())
    }

    #[test]
    fn test_default_num_layers() -> Result<()> {
        let yaml = "encoder_config:\n  in_dim: 8\n  out_dim: 16\nhead_config:\n  action_dim: 4\n";
        let config: DrqnModelConfig<FcEncoderConfig> = serde_yaml::from_str(yaml)?;
        assert_eq!(config, DrqnModelConfig::fc(8, 4, 16));
        Ok(())
    }
}
