use thiserror::Error;

#[derive(Error, Debug)]
pub enum LosError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unknown loss kind '{0}', expected one of: mse, msle")]
    UnknownLossKind(String),

    #[error("Unknown batchnorm selector '{0}', expected one of: none, mybatchnorm, default, pointonly, low_momentum")]
    UnknownBatchNorm(String),

    #[error("Sequence length {len} exceeds positional table capacity {max_len}")]
    SequenceTooLong { len: usize, max_len: usize },

    #[error("Sequence length {len} leaves no prediction timesteps (need more than {min})")]
    SequenceTooShort { len: usize, min: usize },

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Numeric domain error: {0}")]
    NumericDomain(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type LosResult<T> = Result<T, LosError>;
