// src/handlers/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
    #[error("Missing required column: {0}")]
    MissingColumn(String),
    #[error("Key {0} is reserved for rolling returns")]
    ReservedKey(String),
    #[error("Invalid ticker symbol: {0}")]
    InvalidSymbol(String),
    #[error("No price data for {0}")]
    EmptySeries(String),
    #[error("Invalid configuration value for {key}: {value}")]
    Config { key: String, value: String },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
