//! # Error Module
//!
//! User-friendly error types for the photo sorter.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, file names, what went wrong
//! - **Per-item failures** never abort the whole batch; only
//!   [`SortError::NoInputFiles`] stops a run before anything is touched

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum SortError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("No supported media files to sort. Please specify files to sort!")]
    NoInputFiles,

    #[error("Timestamp error: {0}")]
    Timestamp(#[from] TimestampError),

    #[error("Checksum error: {0}")]
    Digest(#[from] DigestError),

    #[error("Move error: {0}")]
    Move(#[from] MoveError),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors that occur while discovering input files
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Path not found: {path}")]
    PathNotFound { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur while deriving a destination from a capture time
#[derive(Error, Debug)]
pub enum TimestampError {
    #[error("Unparseable capture time {value:?} for {path}")]
    Unparseable { path: PathBuf, value: String },

    #[error("No capture time could be determined for {path}: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A timestamp that does not name a real calendar date
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid timestamp: {0:?}")]
pub struct InvalidTimestamp(pub String);

/// Errors that occur while computing a content digest
#[derive(Error, Debug)]
pub enum DigestError {
    #[error("Failed to read {path} for checksum: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur while moving a file into place
#[derive(Error, Debug)]
pub enum MoveError {
    #[error("Destination already exists: {path}. The file was left in place.")]
    DestinationOccupied { path: PathBuf },

    #[error("Failed to create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Source file not found: {path}")]
    SourceMissing { path: PathBuf },

    #[error("Unable to move {source_path} to {destination}: {source}")]
    Transfer {
        source_path: PathBuf,
        destination: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the optional parity archiver. Always advisory.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Failed to launch {program}: {source}. Is it installed and on PATH?")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status} while archiving {path}")]
    Failed {
        program: String,
        status: String,
        path: PathBuf,
    },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, SortError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_error_includes_path() {
        let error = ScanError::PathNotFound {
            path: PathBuf::from("/photos/vacation"),
        };
        assert!(error.to_string().contains("/photos/vacation"));
    }

    #[test]
    fn timestamp_error_includes_value_and_path() {
        let error = TimestampError::Unparseable {
            path: PathBuf::from("/photos/broken.jpg"),
            value: "0000:00:00 00:00:00".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("/photos/broken.jpg"));
        assert!(message.contains("0000:00:00"));
    }

    #[test]
    fn occupied_destination_says_file_stays() {
        let error = MoveError::DestinationOccupied {
            path: PathBuf::from("2020/1/2/img.jpg"),
        };
        assert!(error.to_string().contains("left in place"));
    }

    #[test]
    fn archive_launch_error_suggests_install() {
        let error = ArchiveError::Launch {
            program: "par2".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert!(error.to_string().contains("installed"));
    }
}
