use super::{build_normalization, weight_init_, Activation, InitType, NormType};
use crate::error::NnError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tch::{nn, nn::ModuleT, Tensor};

/// A sequence of layers with the number of its output channels.
#[derive(Debug)]
pub struct Block {
    seq: nn::SequentialT,
    out_channels: i64,
}

impl Block {
    /// Number of output channels (or features) of the block.
    pub fn out_channels(&self) -> i64 {
        self.out_channels
    }

    fn pack(
        seq: nn::SequentialT,
        p: &nn::Path,
        out_channels: i64,
        dim: usize,
        norm_type: Option<NormType>,
        activation: Option<Activation>,
    ) -> Result<Self> {
        let mut seq = seq;
        if let Some(norm_type) = norm_type {
            seq = seq.add(build_normalization(&(p / "norm"), norm_type, dim, out_channels)?);
        }
        if let Some(act) = activation {
            seq = seq.add_fn(move |xs| act.apply(xs));
        }
        Ok(Self { seq, out_channels })
    }
}

impl ModuleT for Block {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        self.seq.forward_t(xs, train)
    }
}

/// The way to pad the input of a 2-d convolution.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum PadType {
    /// Zero padding done by the convolution itself.
    Zero,

    /// Reflection of the input boundary.
    Reflect,

    /// Replication of the input boundary.
    Replication,
}

impl Default for PadType {
    fn default() -> Self {
        Self::Zero
    }
}

impl FromStr for PadType {
    type Err = NnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zero" => Ok(Self::Zero),
            "reflect" => Ok(Self::Reflect),
            "replication" => Ok(Self::Replication),
            _ => Err(NnError::InvalidPadType(s.to_string())),
        }
    }
}

fn one() -> i64 {
    1
}

/// Configuration of [`conv1d_block`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct Conv1dBlockConfig {
    pub in_channels: i64,
    pub out_channels: i64,
    pub kernel_size: i64,
    #[serde(default = "one")]
    pub stride: i64,
    #[serde(default)]
    pub padding: i64,
    #[serde(default = "one")]
    pub dilation: i64,
    #[serde(default = "one")]
    pub groups: i64,
    #[serde(default)]
    pub init_type: InitType,
    #[serde(default)]
    pub activation: Option<Activation>,
    #[serde(default)]
    pub norm_type: Option<NormType>,
}

impl Conv1dBlockConfig {
    pub fn new(in_channels: i64, out_channels: i64, kernel_size: i64) -> Self {
        Self {
            in_channels,
            out_channels,
            kernel_size,
            stride: 1,
            padding: 0,
            dilation: 1,
            groups: 1,
            init_type: InitType::default(),
            activation: None,
            norm_type: None,
        }
    }

    pub fn stride(mut self, v: i64) -> Self {
        self.stride = v;
        self
    }

    pub fn padding(mut self, v: i64) -> Self {
        self.padding = v;
        self
    }

    pub fn dilation(mut self, v: i64) -> Self {
        self.dilation = v;
        self
    }

    pub fn groups(mut self, v: i64) -> Self {
        self.groups = v;
        self
    }

    pub fn init_type(mut self, v: InitType) -> Self {
        self.init_type = v;
        self
    }

    pub fn activation(mut self, v: Activation) -> Self {
        self.activation = Some(v);
        self
    }

    pub fn norm_type(mut self, v: NormType) -> Self {
        self.norm_type = Some(v);
        self
    }
}

/// Configuration of [`conv2d_block`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct Conv2dBlockConfig {
    pub in_channels: i64,
    pub out_channels: i64,
    pub kernel_size: i64,
    #[serde(default = "one")]
    pub stride: i64,
    #[serde(default)]
    pub padding: i64,
    #[serde(default = "one")]
    pub dilation: i64,
    #[serde(default = "one")]
    pub groups: i64,
    #[serde(default)]
    pub init_type: InitType,
    #[serde(default)]
    pub pad_type: PadType,
    #[serde(default)]
    pub activation: Option<Activation>,
    #[serde(default)]
    pub norm_type: Option<NormType>,
}

impl Conv2dBlockConfig {
    pub fn new(in_channels: i64, out_channels: i64, kernel_size: i64) -> Self {
        Self {
            in_channels,
            out_channels,
            kernel_size,
            stride: 1,
            padding: 0,
            dilation: 1,
            groups: 1,
            init_type: InitType::default(),
            pad_type: PadType::default(),
            activation: None,
            norm_type: None,
        }
    }

    pub fn stride(mut self, v: i64) -> Self {
        self.stride = v;
        self
    }

    pub fn padding(mut self, v: i64) -> Self {
        self.padding = v;
        self
    }

    pub fn dilation(mut self, v: i64) -> Self {
        self.dilation = v;
        self
    }

    pub fn groups(mut self, v: i64) -> Self {
        self.groups = v;
        self
    }

    pub fn init_type(mut self, v: InitType) -> Self {
        self.init_type = v;
        self
    }

    pub fn pad_type(mut self, v: PadType) -> Self {
        self.pad_type = v;
        self
    }

    pub fn activation(mut self, v: Activation) -> Self {
        self.activation = Some(v);
        self
    }

    pub fn norm_type(mut self, v: NormType) -> Self {
        self.norm_type = Some(v);
        self
    }
}

/// Configuration of [`deconv2d_block`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct Deconv2dBlockConfig {
    pub in_channels: i64,
    pub out_channels: i64,
    pub kernel_size: i64,
    #[serde(default = "one")]
    pub stride: i64,
    #[serde(default)]
    pub padding: i64,
    #[serde(default)]
    pub output_padding: i64,
    #[serde(default = "one")]
    pub groups: i64,
    #[serde(default)]
    pub init_type: InitType,
    #[serde(default)]
    pub activation: Option<Activation>,
    #[serde(default)]
    pub norm_type: Option<NormType>,
}

impl Deconv2dBlockConfig {
    pub fn new(in_channels: i64, out_channels: i64, kernel_size: i64) -> Self {
        Self {
            in_channels,
            out_channels,
            kernel_size,
            stride: 1,
            padding: 0,
            output_padding: 0,
            groups: 1,
            init_type: InitType::default(),
            activation: None,
            norm_type: None,
        }
    }

    pub fn stride(mut self, v: i64) -> Self {
        self.stride = v;
        self
    }

    pub fn padding(mut self, v: i64) -> Self {
        self.padding = v;
        self
    }

    pub fn output_padding(mut self, v: i64) -> Self {
        self.output_padding = v;
        self
    }

    pub fn groups(mut self, v: i64) -> Self {
        self.groups = v;
        self
    }

    pub fn init_type(mut self, v: InitType) -> Self {
        self.init_type = v;
        self
    }

    pub fn activation(mut self, v: Activation) -> Self {
        self.activation = Some(v);
        self
    }

    pub fn norm_type(mut self, v: NormType) -> Self {
        self.norm_type = Some(v);
        self
    }
}

fn half() -> f64 {
    0.5
}

/// Configuration of [`fc_block`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct FcBlockConfig {
    pub in_channels: i64,
    pub out_channels: i64,
    #[serde(default)]
    pub init_type: InitType,
    #[serde(default)]
    pub activation: Option<Activation>,
    #[serde(default)]
    pub norm_type: Option<NormType>,
    #[serde(default)]
    pub use_dropout: bool,
    /// Probability of an element to be zeroed.
    #[serde(default = "half")]
    pub dropout_probability: f64,
}

impl FcBlockConfig {
    pub fn new(in_channels: i64, out_channels: i64) -> Self {
        Self {
            in_channels,
            out_channels,
            init_type: InitType::default(),
            activation: None,
            norm_type: None,
            use_dropout: false,
            dropout_probability: 0.5,
        }
    }

    pub fn init_type(mut self, v: InitType) -> Self {
        self.init_type = v;
        self
    }

    pub fn activation(mut self, v: Activation) -> Self {
        self.activation = Some(v);
        self
    }

    /// Sets an optional activation.
    pub fn activation_opt(mut self, v: Option<Activation>) -> Self {
        self.activation = v;
        self
    }

    pub fn norm_type(mut self, v: NormType) -> Self {
        self.norm_type = Some(v);
        self
    }

    pub fn norm_type_opt(mut self, v: Option<NormType>) -> Self {
        self.norm_type = v;
        self
    }

    /// Enables dropout with the given probability.
    pub fn dropout(mut self, probability: f64) -> Self {
        self.use_dropout = true;
        self.dropout_probability = probability;
        self
    }
}

/// Creates a 1-d convolution followed by optional normalization and activation.
pub fn conv1d_block(p: &nn::Path, config: &Conv1dBlockConfig) -> Result<Block> {
    let conv_config = nn::ConvConfig {
        stride: config.stride,
        padding: config.padding,
        dilation: config.dilation,
        groups: config.groups,
        ..Default::default()
    };
    let mut conv = nn::conv1d(
        p / "conv",
        config.in_channels,
        config.out_channels,
        config.kernel_size,
        conv_config,
    );
    weight_init_(&mut conv.ws, config.init_type, config.activation.as_ref())?;

    Block::pack(
        nn::seq_t().add(conv),
        p,
        config.out_channels,
        1,
        config.norm_type,
        config.activation,
    )
}

/// Creates a 2-d convolution followed by optional normalization and activation.
///
/// With [`PadType::Reflect`] or [`PadType::Replication`], a padding layer is put
/// in front of the convolution, which then does not pad by itself.
pub fn conv2d_block(p: &nn::Path, config: &Conv2dBlockConfig) -> Result<Block> {
    let pad = config.padding;
    let (seq, padding) = match config.pad_type {
        PadType::Zero => (nn::seq_t(), pad),
        PadType::Reflect => (
            nn::seq_t().add_fn(move |xs| xs.reflection_pad2d([pad, pad, pad, pad])),
            0,
        ),
        PadType::Replication => (
            nn::seq_t().add_fn(move |xs| xs.replication_pad2d([pad, pad, pad, pad])),
            0,
        ),
    };
    let conv_config = nn::ConvConfig {
        stride: config.stride,
        padding,
        dilation: config.dilation,
        groups: config.groups,
        ..Default::default()
    };
    let mut conv = nn::conv2d(
        p / "conv",
        config.in_channels,
        config.out_channels,
        config.kernel_size,
        conv_config,
    );
    weight_init_(&mut conv.ws, config.init_type, config.activation.as_ref())?;

    Block::pack(
        seq.add(conv),
        p,
        config.out_channels,
        2,
        config.norm_type,
        config.activation,
    )
}

/// Creates a 2-d transposed convolution followed by optional normalization and activation.
pub fn deconv2d_block(p: &nn::Path, config: &Deconv2dBlockConfig) -> Result<Block> {
    let deconv_config = nn::ConvTransposeConfig {
        stride: config.stride,
        padding: config.padding,
        output_padding: config.output_padding,
        groups: config.groups,
        ..Default::default()
    };
    let mut deconv = nn::conv_transpose2d(
        p / "deconv",
        config.in_channels,
        config.out_channels,
        config.kernel_size,
        deconv_config,
    );
    weight_init_(&mut deconv.ws, config.init_type, config.activation.as_ref())?;

    Block::pack(
        nn::seq_t().add(deconv),
        p,
        config.out_channels,
        2,
        config.norm_type,
        config.activation,
    )
}

/// Creates a fully-connected block.
///
/// `x -> fc -> norm -> act -> dropout -> out`, where normalization is done
/// across features and dropout is active only in train mode.
pub fn fc_block(p: &nn::Path, config: &FcBlockConfig) -> Result<Block> {
    if config.norm_type == Some(NormType::InstanceNorm) {
        return Err(
            NnError::InvalidNormType("IN is not supported in fully-connected blocks".into()).into(),
        );
    }

    let mut fc = nn::linear(
        p / "fc",
        config.in_channels,
        config.out_channels,
        Default::default(),
    );
    weight_init_(&mut fc.ws, config.init_type, config.activation.as_ref())?;

    let mut block = Block::pack(
        nn::seq_t().add(fc),
        p,
        config.out_channels,
        1,
        config.norm_type,
        config.activation,
    )?;
    if config.use_dropout {
        let prob = config.dropout_probability;
        block.seq = block.seq.add_fn_t(move |xs, train| xs.dropout(prob, train));
    }

    Ok(block)
}

#[cfg(test)]
mod test {
    use super::*;
    use tch::{Device, Kind};

    #[test]
    fn test_conv2d_block_pad_types() -> Result<()> {
        let vs = nn::VarStore::new(Device::Cpu);
        let xs = Tensor::randn([2, 3, 16, 16], tch::kind::FLOAT_CPU);

        for (i, pad_type) in ["zero", "reflect", "replication"].iter().enumerate() {
            let config = Conv2dBlockConfig::new(3, 8, 3)
                .padding(1)
                .pad_type(pad_type.parse()?)
                .activation(Activation::Relu)
                .norm_type(NormType::BatchNorm);
            let block = conv2d_block(&(vs.root() / format!("b{}", i)), &config)?;
            assert_eq!(block.out_channels(), 8);
            let ys = block.forward_t(&xs, true);
            assert_eq!(ys.size(), [2, 8, 16, 16]);
            assert!(ys.min().double_value(&[]) >= 0.0);
        }

        assert_eq!(
            "circular".parse::<PadType>(),
            Err(NnError::InvalidPadType("circular".to_string()))
        );
        Ok(())
    }

    // 3x3 all-ones kernel without bias over an all-ones 4x4 image
    fn ones_conv_output(pad_type: PadType) -> Result<Tensor> {
        let vs = nn::VarStore::new(Device::Cpu);
        let config = Conv2dBlockConfig::new(1, 1, 3).padding(1).pad_type(pad_type);
        let block = conv2d_block(&vs.root(), &config)?;
        tch::no_grad(|| {
            for (name, mut v) in vs.variables() {
                let value = if name.ends_with("weight") { 1.0 } else { 0.0 };
                let _ = v.fill_(value);
            }
        });
        Ok(block.forward_t(&Tensor::ones([1, 1, 4, 4], tch::kind::FLOAT_CPU), false))
    }

    #[test]
    fn test_conv2d_block_padding_values() -> Result<()> {
        let nines = Tensor::full([1, 1, 4, 4], 9.0, tch::kind::FLOAT_CPU);
        for pad_type in [PadType::Reflect, PadType::Replication] {
            let ys = ones_conv_output(pad_type)?;
            assert!(ys.allclose(&nines, 1e-5, 1e-5, false));
        }

        let ys = ones_conv_output(PadType::Zero)?;
        assert_eq!(ys.size(), [1, 1, 4, 4]);
        assert!((ys.double_value(&[0, 0, 0, 0]) - 4.0).abs() < 1e-5);
        assert!((ys.double_value(&[0, 0, 0, 1]) - 6.0).abs() < 1e-5);
        assert!((ys.double_value(&[0, 0, 1, 1]) - 9.0).abs() < 1e-5);
        Ok(())
    }

    #[test]
    fn test_conv1d_block() -> Result<()> {
        let vs = nn::VarStore::new(Device::Cpu);
        let config = Conv1dBlockConfig::new(4, 6, 3)
            .stride(2)
            .padding(1)
            .norm_type(NormType::InstanceNorm)
            .activation(Activation::LeakyRelu(0.01))
            .init_type(InitType::Kaiming);
        let block = conv1d_block(&vs.root(), &config)?;
        let ys = block.forward_t(&Tensor::randn([2, 4, 10], tch::kind::FLOAT_CPU), false);
        assert_eq!(ys.size(), [2, 6, 5]);
        Ok(())
    }

    #[test]
    fn test_deconv2d_block() -> Result<()> {
        let vs = nn::VarStore::new(Device::Cpu);
        let config = Deconv2dBlockConfig::new(8, 4, 4)
            .stride(2)
            .padding(1)
            .init_type(InitType::Orthogonal)
            .activation(Activation::Tanh);
        let block = deconv2d_block(&vs.root(), &config)?;
        let ys = block.forward_t(&Tensor::randn([1, 8, 7, 7], tch::kind::FLOAT_CPU), false);
        assert_eq!(ys.size(), [1, 4, 14, 14]);
        assert_eq!(block.out_channels(), 4);
        Ok(())
    }

    #[test]
    fn test_fc_block_dropout() -> Result<()> {
        let vs = nn::VarStore::new(Device::Cpu);
        let config = FcBlockConfig::new(16, 32)
            .activation(Activation::Relu)
            .norm_type(NormType::BatchNorm)
            .dropout(0.5);
        let block = fc_block(&vs.root(), &config)?;
        let xs = Tensor::randn([64, 16], tch::kind::FLOAT_CPU);

        // Dropout is the identity in eval mode
        let y1 = block.forward_t(&xs, false);
        let y2 = block.forward_t(&xs, false);
        assert_eq!(y1.size(), [64, 32]);
        assert!(y1.allclose(&y2, 1e-6, 1e-6, false));

        let y = block.forward_t(&xs, true);
        let n_zeros = y.eq(0.0).to_kind(Kind::Float).sum(Kind::Float).double_value(&[]);
        assert!(n_zeros > 0.0);
        Ok(())
    }

    #[test]
    fn test_fc_block_rejects_instance_norm() {
        let vs = nn::VarStore::new(Device::Cpu);
        let config = FcBlockConfig::new(4, 4).norm_type(NormType::InstanceNorm);
        assert!(fc_block(&vs.root(), &config).is_err());
    }
}
