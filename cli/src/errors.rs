//! Error types for the Dock CLI

use thiserror::Error;

/// Main error type for the Dock CLI
#[derive(Error, Debug)]
pub enum CliError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Non-2xx response from the platform API.
    #[error("{status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("You are not logged in. Run `dock login` first.")]
    NotLoggedIn,

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Packaging error: {0}")]
    PackageError(String),

    #[error("Archive error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("Invalid ignore pattern: {0}")]
    PatternError(#[from] globset::Error),

    #[error("Prompt error: {0}")]
    PromptError(#[from] dialoguer::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::Internal(err.to_string())
    }
}

impl CliError {
    /// HTTP status of the underlying API response, when this error is one.
    pub fn api_status(&self) -> Option<u16> {
        match self {
            CliError::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }
}
