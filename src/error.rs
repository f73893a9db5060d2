//! Error types for netdesc.

use thiserror::Error;

/// Main error type for netdesc operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Error reading or parsing a capture file
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    /// Error from the descriptor index
    #[error(transparent)]
    Core(#[from] netdesc_core::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to capture file reading.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// File not found
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// Invalid PCAP or PCAPNG format
    #[error("Invalid capture format: {reason}")]
    InvalidFormat { reason: String },
}

impl From<netdesc_core::DescriptorError> for Error {
    fn from(err: netdesc_core::DescriptorError) -> Self {
        Error::Core(err.into())
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
