//! # Scanner Module
//!
//! Turns the ordered list of command-line paths into an ordered list of
//! media files.
//!
//! Files named directly are taken as-is (if their extension is supported).
//! Directories are only expanded when recursion is enabled: by default into
//! their immediate child files, or into the whole tree when descent is also
//! enabled. Children are visited in file-name order so a run is reproducible.
//!
//! ## Example
//! ```rust,ignore
//! use photo_sorter::core::scanner::{MediaScanner, ScanConfig, WalkDirScanner};
//!
//! let scanner = WalkDirScanner::new(ScanConfig { recursive: true, ..Default::default() });
//! let result = scanner.scan(&["/Users/me/Import".into()])?;
//! ```

mod filter;
mod walker;

pub use filter::{MediaFilter, DEFAULT_EXTENSIONS};
pub use walker::{ScanConfig, WalkDirScanner};

use crate::error::ScanError;
use crate::events::EventSender;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Represents a discovered media file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFile {
    /// Path as given or as found while walking
    pub path: PathBuf,
    /// Broad category derived from the extension
    pub kind: MediaKind,
}

/// Broad media categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Raw,
    Video,
    Sidecar,
    Other,
}

impl MediaKind {
    /// Detect kind from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" | "png" | "heic" | "heif" | "gif" | "tif" | "tiff" | "webp" => {
                MediaKind::Image
            }
            "cr2" | "cr3" | "nef" | "dng" | "arw" | "raf" | "orf" | "raw" => MediaKind::Raw,
            "avi" | "mov" | "mp4" | "m4v" | "mkv" => MediaKind::Video,
            "aae" | "xmp" | "thm" => MediaKind::Sidecar,
            _ => MediaKind::Other,
        }
    }
}

/// Result of a scan operation
#[derive(Debug)]
pub struct ScanResult {
    /// Discovered files, in a stable order
    pub files: Vec<MediaFile>,
    /// Errors that occurred during scanning (non-fatal)
    pub errors: Vec<ScanError>,
}

/// Trait for media scanners
///
/// Implement this trait to create custom scanners (e.g., for testing).
pub trait MediaScanner {
    /// Scan the given paths and return discovered media files
    fn scan(&self, paths: &[PathBuf]) -> Result<ScanResult, ScanError>;

    /// Scan with progress reporting via events
    fn scan_with_events(
        &self,
        paths: &[PathBuf],
        events: &EventSender,
    ) -> Result<ScanResult, ScanError>;
}
