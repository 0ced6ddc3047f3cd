use std::io;
use thiserror::Error;

/// Errors raised while loading configuration or reading a capture.
#[derive(Debug, Error)]
pub enum DecoderError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("line {line}: malformed SPI event: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("line {line}: expected a single 8-bit word, got {len} bytes")]
    InvalidWord { line: usize, len: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, DecoderError>;
