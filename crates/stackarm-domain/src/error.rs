use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("environment endpoint '{0}' is missing or empty")]
    MissingEndpoint(&'static str),

    #[error("unknown environment endpoint key '{0}'")]
    UnknownEndpointKey(String),

    #[error("environment suffix '{key}' must start with '.', got {value:?}")]
    InvalidSuffix { key: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
