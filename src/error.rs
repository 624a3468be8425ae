use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Job submission failed: {0}")]
    Submission(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid table: {0}")]
    InvalidTable(String),

    #[error("Invalid target table name: {0}")]
    InvalidTarget(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
}

impl From<reqwest::Error> for LoadError {
    fn from(err: reqwest::Error) -> Self {
        LoadError::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LoadError>;
