//! Error taxonomy (§7): configuration errors, I/O errors and transport
//! errors. Everything here is fatal to the process that observes it; the
//! protocol never retries.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DenoiserError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("line {line}: expected {expected} pixels, found {found}")]
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("pixel at ({row}, {col}) is {value}, expected -1 or 1")]
    InvalidPixel { row: usize, col: usize, value: i32 },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, DenoiserError>;
