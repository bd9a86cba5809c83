use thiserror::Error;

/// Errors produced by the on-disc format layer.
#[derive(Debug, Error)]
pub enum FormatError {
    /// A directory record could not be decoded
    #[error("Invalid directory record: {0}")]
    InvalidRecord(String),

    /// A date/time string does not match the expected format
    #[error("'{0}' is not a valid date/time specification")]
    InvalidDate(String),

    /// The path table grew beyond a single sector
    #[error("The path table is larger than one sector. This is currently not supported.")]
    PathTableTooLarge,

    /// A file name contains a character outside the d-character set
    #[error("Illegal character '{ch}' in {what} \"{value}\"")]
    IllegalCharacter {
        ch: char,
        what: &'static str,
        value: String,
    },

    /// Generic format error with message
    #[error("{0}")]
    Other(String),
}

impl FormatError {
    pub fn invalid_record(msg: impl Into<String>) -> Self {
        Self::InvalidRecord(msg.into())
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
