//! Model download error types

use litefetch_hub::HubError;
use thiserror::Error;

/// Model download errors
#[derive(Error, Debug)]
pub enum ModelError {
    /// Downloaded byte count disagrees with the advertised size.
    /// The server closed the connection early without signalling an error.
    #[error("File size mismatch for {file}: expected {expected} bytes but got {actual} bytes")]
    SizeMismatch {
        file: String,
        expected: u64,
        actual: u64,
    },

    /// A file could not be downloaded within the retry budget
    #[error("Failed to download {file} after {attempts} attempts")]
    FetchFailed {
        file: String,
        attempts: u32,
        #[source]
        source: Box<ModelError>,
    },

    /// Variant id is not registered
    #[error("Unknown model variant: {0}")]
    UnknownVariant(String),

    /// Listing, metadata or transport error
    #[error("Repository error: {0}")]
    Hub(#[from] HubError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Cache directory error
    #[error("Failed to access cache directory: {0}")]
    CacheDirectoryError(String),

    /// The download task ended without reporting a result
    #[error("Download task aborted: {0}")]
    Aborted(String),
}
