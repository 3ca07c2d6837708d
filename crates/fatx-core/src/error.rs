//! Shared error type for the fatx toolkit.

use thiserror::Error;

/// The error type returned by every fatx crate.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error reading the image or writing recovered output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Volume header signature did not match the expected FATX magic.
    #[error("invalid volume header: {0}")]
    InvalidHeader(String),

    /// The drive probe could not recognize the image layout.
    #[error("invalid drive image: {0}")]
    InvalidDrive(String),

    /// A caller-supplied argument was out of the accepted range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Requested partition, file, or directory does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A path was malformed or unsafe to use.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Operation is not supported in the current context.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Operation is invalid given the current state.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Catch-all for messages that don't fit another variant.
    #[error("{0}")]
    Custom(String),
}

/// Result type alias used throughout the fatx crates.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn custom(msg: impl Into<String>) -> Self {
        Error::Custom(msg.into())
    }

    pub fn invalid_header(msg: impl Into<String>) -> Self {
        Error::InvalidHeader(msg.into())
    }

    pub fn invalid_drive(msg: impl Into<String>) -> Self {
        Error::InvalidDrive(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    pub fn invalid_path(msg: impl Into<String>) -> Self {
        Error::InvalidPath(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Error::Unsupported(msg.into())
    }

    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Error::InvalidOperation(msg.into())
    }
}
