use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("configuration serialization failed: {0}")]
    Serde(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
