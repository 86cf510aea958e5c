// Errors raised while reading kernel accounting sources

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StatError>;

/// Failure of a single parser call. Never fatal to the sampler loop.
#[derive(Debug, Error)]
pub enum StatError {
    /// The source could not be opened or read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Expected structure is missing entirely (e.g. no aggregate cpu line).
    #[error("format error: {0}")]
    Format(String),

    /// A positional field is not a valid unsigned integer.
    #[error("failed to parse field `{field}`: {value:?}")]
    Parse { field: &'static str, value: String },

    /// The stream itself is malformed (e.g. not valid UTF-8).
    #[error("scan error: {0}")]
    Scan(String),
}

impl StatError {
    /// Classify an error raised while iterating lines of an already-open source.
    pub(crate) fn from_read(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::InvalidData => StatError::Scan(e.to_string()),
            _ => StatError::Io(e),
        }
    }
}
