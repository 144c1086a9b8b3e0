use stackarm_domain::DomainError;
use thiserror::Error;

/// Failure to discover the environment of the target cloud. Always fatal.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("metadata request to {url} failed: HTTP status {status}")]
    HttpFailure { url: String, status: u16 },

    #[error("metadata document is empty or malformed: {reason}")]
    EmptyOrMalformed { reason: String },

    #[error("metadata document has no value at '{path}'")]
    MissingField { path: &'static str },

    #[error("metadata request to {url} timed out")]
    Timeout { url: String },

    #[error("metadata request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("invalid environment descriptor: {0}")]
    Descriptor(#[from] DomainError),
}

/// Invalid credential configuration detected while building a session.
#[derive(Debug, Error)]
pub enum AuthConfigError {
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    #[error("invalid authority host '{url}': {reason}")]
    InvalidAuthority { url: String, reason: String },

    #[error("http client: {0}")]
    Client(String),
}

/// Failure reported by a resource-management or secret collaborator.
#[derive(Debug, Error)]
pub enum ArmError {
    #[error("{method} {url}: resource not found")]
    NotFound { method: &'static str, url: String },

    #[error("{method} {url}: status {status}: {message}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
        message: String,
    },

    #[error("{method} {url}: {message}")]
    Request {
        method: &'static str,
        url: String,
        message: String,
    },

    #[error("token acquisition failed: {0}")]
    Token(String),

    #[error("decode {what}: {message}")]
    Decode { what: &'static str, message: String },

    #[error("operation failed: {0}")]
    OperationFailed(String),
}

impl ArmError {
    /// True when the target resource does not exist, i.e. there is nothing to act on.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ArmError::NotFound { .. })
    }

    pub(crate) fn decode(what: &'static str, message: impl Into<String>) -> Self {
        ArmError::Decode { what, message: message.into() }
    }
}
