//! Error type shared by configuration, path and logging helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// Config file present but unusable
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// One of the endpoint URLs failed to parse
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Home directory could not be resolved
    #[error("Path error: {0}")]
    Path(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
