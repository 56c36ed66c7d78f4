//! Error types for the digester

use std::path::PathBuf;
use thiserror::Error;

/// Error kinds that can occur while scanning or persisting preferences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanErrorKind {
    /// Permission denied when enumerating a directory or reading a file
    PermissionDenied,
    /// File or directory not found
    NotFound,
    /// Other I/O error during file operations
    IoError,
    /// Every text decoding attempt failed
    DecodeFailure,
    /// File larger than the extraction limit
    OversizeSkip,
    /// Binary, non-text or unknown file type
    TypeSkip,
    /// Fault inside the walk that is not covered by another kind
    UnexpectedFault,
    /// Pre-flight count found no eligible files
    NothingToScan,
    /// Preferences database operation failed
    DatabaseError,
}

/// Represents an error that occurred during scanning
#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {message} (path: {path:?})")]
pub struct ScanError {
    /// The kind of error
    pub kind: ScanErrorKind,
    /// The path where the error occurred
    pub path: Option<PathBuf>,
    /// Human-readable error message
    pub message: String,
}

impl ScanError {
    /// Create a new scan error
    pub fn new(kind: ScanErrorKind, path: Option<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path,
            message: message.into(),
        }
    }

    /// Create a permission denied error
    pub fn permission_denied(path: PathBuf) -> Self {
        Self::new(
            ScanErrorKind::PermissionDenied,
            Some(path.clone()),
            format!("Permission denied: {:?}", path),
        )
    }

    /// Create a not found error
    pub fn not_found(path: PathBuf) -> Self {
        Self::new(
            ScanErrorKind::NotFound,
            Some(path.clone()),
            format!("Not found: {:?}", path),
        )
    }

    /// Create an I/O error
    pub fn io_error(path: Option<PathBuf>, message: impl Into<String>) -> Self {
        Self::new(ScanErrorKind::IoError, path, message)
    }

    /// Create a decode failure for a file
    pub fn decode_failure(path: PathBuf, message: impl Into<String>) -> Self {
        Self::new(ScanErrorKind::DecodeFailure, Some(path), message)
    }

    /// Create an unexpected fault
    pub fn unexpected(path: Option<PathBuf>, message: impl Into<String>) -> Self {
        Self::new(ScanErrorKind::UnexpectedFault, path, message)
    }

    /// Create the rejection returned when nothing is eligible for scanning
    pub fn nothing_to_scan(path: PathBuf) -> Self {
        Self::new(
            ScanErrorKind::NothingToScan,
            Some(path),
            "没有可处理的文件。",
        )
    }

    /// Create a database error
    pub fn database_error(message: impl Into<String>) -> Self {
        Self::new(ScanErrorKind::DatabaseError, None, message)
    }

    /// Attach a path to an error that was created without one
    pub fn with_path(mut self, path: PathBuf) -> Self {
        if self.path.is_none() {
            self.path = Some(path);
        }
        self
    }

    /// Convert a walkdir error, keeping the offending path
    pub fn from_walk(err: &walkdir::Error) -> Self {
        let path = err.path().map(|p| p.to_path_buf());
        let kind = match err.io_error().map(|e| e.kind()) {
            Some(std::io::ErrorKind::PermissionDenied) => match path {
                Some(path) => return Self::permission_denied(path),
                None => ScanErrorKind::PermissionDenied,
            },
            Some(std::io::ErrorKind::NotFound) => ScanErrorKind::NotFound,
            Some(_) => ScanErrorKind::IoError,
            // Loop detection and similar walker-level failures
            None => ScanErrorKind::UnexpectedFault,
        };
        Self::new(kind, path, err.to_string())
    }
}

impl From<std::io::Error> for ScanError {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::PermissionDenied => ScanErrorKind::PermissionDenied,
            std::io::ErrorKind::NotFound => ScanErrorKind::NotFound,
            _ => ScanErrorKind::IoError,
        };
        Self::new(kind, None, err.to_string())
    }
}

impl From<rusqlite::Error> for ScanError {
    fn from(err: rusqlite::Error) -> Self {
        Self::database_error(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_kind_mapping() {
        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "no");
        assert_eq!(ScanError::from(denied).kind, ScanErrorKind::PermissionDenied);

        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(ScanError::from(missing).kind, ScanErrorKind::NotFound);

        let other = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        assert_eq!(ScanError::from(other).kind, ScanErrorKind::IoError);
    }

    #[test]
    fn test_with_path_keeps_existing() {
        let err = ScanError::not_found(PathBuf::from("/a")).with_path(PathBuf::from("/b"));
        assert_eq!(err.path, Some(PathBuf::from("/a")));

        let err = ScanError::io_error(None, "x").with_path(PathBuf::from("/b"));
        assert_eq!(err.path, Some(PathBuf::from("/b")));
    }
}
