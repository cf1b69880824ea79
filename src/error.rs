//! Error types for the paper2md library.
//!
//! Every pipeline stage returns `Result<T, Paper2MdError>` and the
//! orchestrator stops at the first `Err`. The error taxonomy is closed:
//!
//! * [`Paper2MdError::Validation`] — bad arguments, missing configuration,
//!   or an input/output path of the wrong kind. Always raised before any
//!   network call is made.
//! * [`Paper2MdError::NotFound`] — an entity looked up by id does not exist.
//!   Not produced by the conversion pipeline itself.
//! * [`Paper2MdError::System`] — OCR, upload, directory creation or file
//!   writing failed. The message is fixed per stage; the underlying cause is
//!   kept as [`std::error::Error::source`] so `--verbose` can print it.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Boxed cause carried by [`Paper2MdError::System`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Fixed messages for each stage that can fail with a system error.
pub mod messages {
    pub const OCR_FAILED: &str = "OCR processing failed";
    pub const UPLOAD_FAILED: &str = "Image upload failed";
    pub const CREATE_DIR_FAILED: &str = "Failed to create output directory";
    pub const WRITE_FAILED: &str = "Failed to write output file";
    pub const RUNTIME_FAILED: &str = "Failed to start async runtime";
}

/// Discriminant of a [`Paper2MdError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    Validation,
    NotFound,
    System,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "ValidationError",
            ErrorKind::NotFound => "NotFoundError",
            ErrorKind::System => "SystemError",
        };
        f.write_str(name)
    }
}

/// All errors returned by the paper2md library.
#[derive(Debug, Error)]
pub enum Paper2MdError {
    /// Malformed input, missing configuration, or a path of the wrong kind.
    #[error("{0}")]
    Validation(String),

    /// An entity looked up by id does not exist.
    #[error("{0}")]
    NotFound(String),

    /// An external system or the filesystem failed.
    #[error("{message}")]
    System {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl Paper2MdError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// A system error with a fixed message and the cause that triggered it.
    pub fn system(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::System {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::System { .. } => ErrorKind::System,
        }
    }

    /// The human-readable message, without the cause chain.
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(m) | Self::NotFound(m) => m,
            Self::System { message, .. } => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(
            Paper2MdError::validation("x").kind(),
            ErrorKind::Validation
        );
        assert_eq!(Paper2MdError::not_found("x").kind(), ErrorKind::NotFound);
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        assert_eq!(
            Paper2MdError::system(messages::WRITE_FAILED, io).kind(),
            ErrorKind::System
        );
    }

    #[test]
    fn system_display_is_stage_message_only() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "connection reset");
        let e = Paper2MdError::system(messages::OCR_FAILED, io);
        assert_eq!(e.to_string(), "OCR processing failed");
        assert_eq!(e.message(), "OCR processing failed");
    }

    #[test]
    fn system_preserves_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "connection reset");
        let e = Paper2MdError::system(messages::UPLOAD_FAILED, io);
        let cause = e.source().expect("cause should be chained");
        assert!(cause.to_string().contains("connection reset"));
    }

    #[test]
    fn kind_display_names() {
        assert_eq!(ErrorKind::Validation.to_string(), "ValidationError");
        assert_eq!(ErrorKind::NotFound.to_string(), "NotFoundError");
        assert_eq!(ErrorKind::System.to_string(), "SystemError");
    }
}
