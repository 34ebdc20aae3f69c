//! Error types for the registry push workflow

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PushError>;

/// Exit code for failures reported by the registry itself (rejected login or
/// an error record in the push stream). EX_UNAVAILABLE from sysexits.
pub const REMOTE_ERROR_EXIT_CODE: i32 = 69;

#[derive(Error, Debug)]
pub enum PushError {
    /// The registry rejected the login or the push stream carried an error record
    #[error("Remote error: {0}")]
    Remote(String),
    /// The pre-push image test step failed; the push was never attempted
    #[error("Image tests failed: {0}")]
    Preflight(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PushError {
    /// Process exit code for this failure. Remote failures get a fixed
    /// distinguished code so callers can tell them apart from local ones.
    pub fn exit_code(&self) -> i32 {
        match self {
            PushError::Remote(_) => REMOTE_ERROR_EXIT_CODE,
            _ => 1,
        }
    }
}

impl From<url::ParseError> for PushError {
    fn from(err: url::ParseError) -> Self {
        PushError::Config(format!("invalid endpoint URL: {}", err))
    }
}
