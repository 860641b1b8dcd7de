//! File filtering logic for the scanner.

use super::MediaKind;
use std::collections::HashSet;
use std::path::Path;

/// Extensions sorted out of the box.
///
/// `aae` is Apple's photo-edit sidecar; it is what usually rides along with an
/// image as a dependent.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "heic", "cr2", "nef", "dng", "raw", "aae", "avi", "mov", "mp4",
];

/// Filters files to determine if they are supported media
pub struct MediaFilter {
    /// Lowercase file extensions to include
    extensions: HashSet<String>,
    /// Whether to include hidden files
    include_hidden: bool,
}

impl MediaFilter {
    /// Create a new filter with the default supported extensions
    pub fn new() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            include_hidden: false,
        }
    }

    /// Include hidden files (starting with .)
    pub fn with_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Override the list of extensions to accept
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    /// Check the extension only
    pub fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.contains(&e.to_lowercase()))
            .unwrap_or(false)
    }

    /// Check if a file found while walking a directory should be included
    pub fn should_include(&self, path: &Path) -> bool {
        if !self.include_hidden && is_hidden(path) {
            return false;
        }
        self.is_supported(path)
    }

    /// Whether hidden entries are allowed through
    pub fn includes_hidden(&self) -> bool {
        self.include_hidden
    }

    /// Get the media kind for a path
    pub fn kind_of(&self, path: &Path) -> MediaKind {
        path.extension()
            .and_then(|e| e.to_str())
            .map(MediaKind::from_extension)
            .unwrap_or(MediaKind::Other)
    }
}

impl Default for MediaFilter {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}
