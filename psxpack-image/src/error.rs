use std::path::PathBuf;

use thiserror::Error;

/// Errors from the CD image driver.
#[derive(Debug, Error)]
pub enum ImageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A cue sheet line could not be parsed
    #[error("Cue sheet error: {0}")]
    CueSyntax(String),

    /// A bin file referenced by the cue sheet could not be opened
    #[error("Cannot open image file {path}: {source}")]
    BinOpen {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A sector read failed; carries the sector so diagnostics can name it
    #[error("Error reading sector {lsn} of image file: {message}")]
    SectorRead { lsn: u32, message: String },

    /// The image is not something this driver understands
    #[error("{0}")]
    UnsupportedImage(String),
}

impl ImageError {
    pub fn cue_syntax(msg: impl Into<String>) -> Self {
        Self::CueSyntax(msg.into())
    }

    pub fn sector_read(lsn: u32, msg: impl Into<String>) -> Self {
        Self::SectorRead {
            lsn,
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedImage(msg.into())
    }
}
