//! Error types for registry lookups and digest scans

pub mod handlers;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FinderError>;

/// Every failure the finder can report.
///
/// Errors are `Clone` so a per-tag failure can be carried inside a
/// [`TagCheckResult`](crate::concurrency::TagCheckResult) and inspected by
/// more than one consumer. Transport failures keep only their message for
/// that reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FinderError {
    /// The image string cannot be mapped to a registry and repository
    #[error("Invalid image reference '{reference}': {reason}")]
    InvalidReference { reference: String, reason: String },

    /// The target digest is not a sha256 digest
    #[error("Invalid digest '{0}': expected 64 hex characters with optional sha256: prefix")]
    InvalidDigest(String),

    /// The `WWW-Authenticate` challenge is missing or not a usable Bearer challenge
    #[error("Malformed auth challenge: {0}")]
    AuthHeaderMalformed(String),

    /// The token endpoint did not hand out a token
    #[error("Token request failed: {0}")]
    TokenRequestFailed(String),

    /// Registry answered with an unexpected status or an undecodable body
    #[error("Registry returned status {status}: {message}")]
    Registry { status: u16, message: String },

    /// Manifest lookup succeeded but carried no content digest header
    #[error("No Docker-Content-Digest header for tag {tag}")]
    MissingDigestHeader { tag: String },

    /// Connection, timeout or other HTTP transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Invalid runtime configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl FinderError {
    pub fn registry(status: u16, message: impl Into<String>) -> Self {
        FinderError::Registry {
            status,
            message: message.into(),
        }
    }

    /// Status code for registry failures, `None` for everything else
    pub fn status(&self) -> Option<u16> {
        match self {
            FinderError::Registry { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FinderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FinderError::Transport(format!("request timed out: {}", err))
        } else {
            FinderError::Transport(err.to_string())
        }
    }
}

impl From<url::ParseError> for FinderError {
    fn from(err: url::ParseError) -> Self {
        FinderError::Config(format!("invalid URL: {}", err))
    }
}
