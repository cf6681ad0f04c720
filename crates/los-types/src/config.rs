// ─────────────────────────────────────────────────────────────────────
// SCPN LOS Transformer — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::{BN_LOW_MOMENTUM, BN_MOMENTUM, DEFAULT_MAX_LEN, EXTRA_TIME_CHANNELS};
use crate::error::{LosError, LosResult};

/// Hyper-parameters of the length-of-stay transformer.
/// Field names match the experiment JSON files so they load unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Embedding width of the encoder.
    pub d_model: usize,
    pub n_layers: usize,
    pub n_heads: usize,
    /// Hidden width of each encoder layer's feed-forward block.
    pub feedforward_size: usize,
    pub trans_dropout_rate: f64,
    pub main_dropout_rate: f64,
    pub diagnosis_size: usize,
    pub batchnorm: BatchNormMode,
    pub last_linear_size: usize,
    /// Skip the exponential link and clamp the raw score directly.
    pub no_exp: bool,
    /// Capacity of the positional table (longest admissible sequence).
    pub max_len: usize,
    pub loss: LossKind,
    pub sum_losses: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            d_model: 16,
            n_layers: 6,
            n_heads: 2,
            feedforward_size: 256,
            trans_dropout_rate: 0.0,
            main_dropout_rate: 0.45,
            diagnosis_size: 64,
            batchnorm: BatchNormMode::MyBatchNorm,
            last_linear_size: 17,
            no_exp: false,
            max_len: DEFAULT_MAX_LEN,
            loss: LossKind::Msle,
            sum_losses: true,
        }
    }
}

impl ModelConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_file(path: &str) -> LosResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> LosResult<()> {
        let widths = [
            ("d_model", self.d_model),
            ("n_layers", self.n_layers),
            ("n_heads", self.n_heads),
            ("feedforward_size", self.feedforward_size),
            ("diagnosis_size", self.diagnosis_size),
            ("last_linear_size", self.last_linear_size),
            ("max_len", self.max_len),
        ];
        for (name, value) in widths {
            if value == 0 {
                return Err(LosError::ConfigError(format!("{name} must be >= 1")));
            }
        }
        if self.d_model % self.n_heads != 0 {
            return Err(LosError::ConfigError(format!(
                "d_model ({}) must be divisible by n_heads ({})",
                self.d_model, self.n_heads
            )));
        }
        for (name, rate) in [
            ("trans_dropout_rate", self.trans_dropout_rate),
            ("main_dropout_rate", self.main_dropout_rate),
        ] {
            if !rate.is_finite() || !(0.0..1.0).contains(&rate) {
                return Err(LosError::ConfigError(format!(
                    "{name} must lie in [0, 1), got {rate}"
                )));
            }
        }
        Ok(())
    }
}

/// Widths of the raw inputs, known only once the dataset is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDims {
    /// F: time-series features; the series carries 2F + 2 channels.
    pub features: usize,
    /// D: diagnosis vector width (0 disables the diagnosis branch).
    pub diagnoses: usize,
    /// S: static admission features.
    pub flat: usize,
}

impl InputDims {
    /// Channel count of the time-series tensor (features, presence masks, index, hour).
    pub fn channels(&self) -> usize {
        2 * self.features + EXTRA_TIME_CHANNELS
    }
}

/// How a fusion-head stage normalises its activations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormKind {
    Identity,
    /// Batch statistics in training, running statistics in evaluation.
    Standard,
    /// Batch statistics in both modes.
    BatchStatistics,
}

/// `batchnorm` selector: which fusion-head stages normalise, and how.
///
/// `MyBatchNorm`, `PointOnly` and `LowMomentum` normalise with the moments
/// of the current batch even in evaluation. Those moments pool every fused
/// (sequence, timestep) row, padded and later timesteps included, so a
/// prediction at time t can move when inputs after t or in another sequence
/// change. Only `None`, and `Default` in evaluation, keep predictions causal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BatchNormMode {
    None,
    MyBatchNorm,
    Default,
    PointOnly,
    LowMomentum,
}

impl BatchNormMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchNormMode::None => "none",
            BatchNormMode::MyBatchNorm => "mybatchnorm",
            BatchNormMode::Default => "default",
            BatchNormMode::PointOnly => "pointonly",
            BatchNormMode::LowMomentum => "low_momentum",
        }
    }

    pub fn momentum(&self) -> f64 {
        match self {
            BatchNormMode::LowMomentum => BN_LOW_MOMENTUM,
            _ => BN_MOMENTUM,
        }
    }

    /// Normalisation applied after the diagnosis encoder.
    pub fn diagnosis_stage(&self) -> NormKind {
        match self {
            BatchNormMode::MyBatchNorm | BatchNormMode::LowMomentum => NormKind::BatchStatistics,
            BatchNormMode::Default => NormKind::Standard,
            BatchNormMode::None | BatchNormMode::PointOnly => NormKind::Identity,
        }
    }

    /// Normalisation applied after the point-wise projection.
    pub fn point_stage(&self) -> NormKind {
        match self {
            BatchNormMode::MyBatchNorm | BatchNormMode::PointOnly | BatchNormMode::LowMomentum => {
                NormKind::BatchStatistics
            }
            BatchNormMode::Default => NormKind::Standard,
            BatchNormMode::None => NormKind::Identity,
        }
    }
}

impl FromStr for BatchNormMode {
    type Err = LosError;

    fn from_str(s: &str) -> LosResult<Self> {
        match s {
            "none" => Ok(BatchNormMode::None),
            "mybatchnorm" => Ok(BatchNormMode::MyBatchNorm),
            "default" => Ok(BatchNormMode::Default),
            "pointonly" => Ok(BatchNormMode::PointOnly),
            "low_momentum" => Ok(BatchNormMode::LowMomentum),
            other => Err(LosError::UnknownBatchNorm(other.to_string())),
        }
    }
}

impl TryFrom<String> for BatchNormMode {
    type Error = LosError;

    fn try_from(value: String) -> LosResult<Self> {
        value.parse()
    }
}

impl From<BatchNormMode> for String {
    fn from(mode: BatchNormMode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for BatchNormMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-element error metric of the masked sequence loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LossKind {
    Mse,
    /// Squared error of natural logarithms.
    Msle,
}

impl LossKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LossKind::Mse => "mse",
            LossKind::Msle => "msle",
        }
    }
}

impl FromStr for LossKind {
    type Err = LosError;

    fn from_str(s: &str) -> LosResult<Self> {
        match s {
            "mse" => Ok(LossKind::Mse),
            "msle" => Ok(LossKind::Msle),
            other => Err(LosError::UnknownLossKind(other.to_string())),
        }
    }
}

impl TryFrom<String> for LossKind {
    type Error = LosError;

    fn try_from(value: String) -> LosResult<Self> {
        value.parse()
    }
}

impl From<LossKind> for String {
    fn from(kind: LossKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for LossKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
