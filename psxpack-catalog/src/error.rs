use thiserror::Error;

/// Errors from catalog parsing and emission.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed catalog content; fatal per the fail-fast policy
    #[error("Syntax error in catalog file: {0}")]
    Syntax(String),

    /// A value failed validation (bad integer, date, LBN range, ...)
    #[error("{0}")]
    InvalidValue(String),

    /// A file referenced by the catalog is missing or unreadable
    #[error("Cannot open file {path}: {source}")]
    HostFile {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    /// Format-layer error (bad file name characters, bad dates)
    #[error(transparent)]
    Format(#[from] psxpack_core::FormatError),
}

impl CatalogError {
    pub fn syntax(msg: impl Into<String>) -> Self {
        Self::Syntax(msg.into())
    }

    pub fn invalid_value(msg: impl Into<String>) -> Self {
        Self::InvalidValue(msg.into())
    }
}
