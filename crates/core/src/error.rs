use thiserror::Error;

pub type FunnelResult<T> = Result<T, FunnelError>;

#[derive(Error, Debug)]
pub enum FunnelError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Input validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
