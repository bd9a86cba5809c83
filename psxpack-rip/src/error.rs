use thiserror::Error;

/// Errors from the rip pipeline.
#[derive(Debug, Error)]
pub enum RipError {
    /// I/O error on the host filesystem
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image driver error (unreadable sector, missing bin, ...)
    #[error(transparent)]
    Image(#[from] psxpack_image::ImageError),

    /// On-disc format error
    #[error(transparent)]
    Format(#[from] psxpack_core::FormatError),

    /// The disc is not something the ripper can process
    #[error("{0}")]
    WrongDiscType(String),

    /// The data track carries no ISO 9660 filesystem
    #[error("No ISO 9660 filesystem on data track")]
    NoFilesystem,
}

impl RipError {
    pub fn wrong_disc(msg: impl Into<String>) -> Self {
        Self::WrongDiscType(msg.into())
    }
}
