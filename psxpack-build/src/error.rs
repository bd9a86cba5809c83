use std::path::PathBuf;

use thiserror::Error;

/// Errors from the image build pipeline.
#[derive(Debug, Error)]
pub enum BuildError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A source file could not be opened or read
    #[error("Cannot open file {path}: {source}")]
    HostFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Catalog-level error
    #[error(transparent)]
    Catalog(#[from] psxpack_catalog::CatalogError),

    /// On-disc format error (path table overflow, bad dates, ...)
    #[error(transparent)]
    Format(#[from] psxpack_core::FormatError),

    /// WAV helper error while appending audio tracks
    #[error(transparent)]
    Image(#[from] psxpack_image::ImageError),

    /// Generic build error
    #[error("{0}")]
    Other(String),
}

impl BuildError {
    pub fn host_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::HostFile {
            path: path.into(),
            source,
        }
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
