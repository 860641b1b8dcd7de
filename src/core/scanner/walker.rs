//! Input expansion using walkdir.

use super::filter::{is_hidden, MediaFilter};
use super::{MediaFile, MediaScanner, ScanResult};
use crate::error::ScanError;
use crate::events::{Event, EventSender, ScanEvent};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Configuration for input expansion
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Expand directory arguments into the files they contain
    pub recursive: bool,
    /// When expanding, also walk into subdirectories
    pub descend: bool,
    /// Maximum depth when descending (None = unlimited)
    pub max_depth: Option<usize>,
    /// Whether to follow symbolic links while walking
    pub follow_symlinks: bool,
    /// Whether to include hidden files and directories found while walking
    pub include_hidden: bool,
    /// Custom extensions to include (None = use defaults)
    pub extensions: Option<Vec<String>>,
}

/// Scanner implementation using the walkdir crate
pub struct WalkDirScanner {
    config: ScanConfig,
    filter: MediaFilter,
}

impl WalkDirScanner {
    /// Create a new scanner with the given configuration
    pub fn new(config: ScanConfig) -> Self {
        let mut filter = MediaFilter::new().with_hidden(config.include_hidden);

        if let Some(ref extensions) = config.extensions {
            filter = filter.with_extensions(extensions.clone());
        }

        Self { config, filter }
    }

    fn walk_depth(&self) -> usize {
        if self.config.descend {
            self.config.max_depth.unwrap_or(usize::MAX)
        } else {
            1
        }
    }

    /// Expand one directory argument in file-name order
    fn expand_directory(
        &self,
        root: &Path,
        events: &EventSender,
        found: &mut Vec<PathBuf>,
        errors: &mut Vec<ScanError>,
    ) {
        // The root was named explicitly, so only entries below it can be hidden
        let include_hidden = self.filter.includes_hidden();
        let walker = WalkDir::new(root)
            .min_depth(1)
            .max_depth(self.walk_depth())
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |e| e.depth() == 0 || include_hidden || !is_hidden(e.path()));

        for entry_result in walker {
            match entry_result {
                Ok(entry) => {
                    if entry.file_type().is_file() && self.filter.should_include(entry.path()) {
                        found.push(entry.into_path());
                    }
                }
                Err(e) => {
                    let path = e.path().map(|p| p.to_path_buf()).unwrap_or_default();
                    let error = if e.io_error().map(|e| e.kind())
                        == Some(std::io::ErrorKind::PermissionDenied)
                    {
                        ScanError::PermissionDenied { path: path.clone() }
                    } else {
                        ScanError::ReadDirectory {
                            path: path.clone(),
                            source: std::io::Error::other(e.to_string()),
                        }
                    };

                    tracing::warn!("{}", error);
                    events.send(Event::Scan(ScanEvent::Error {
                        path,
                        message: error.to_string(),
                    }));
                    errors.push(error);
                }
            }
        }
    }
}

impl MediaScanner for WalkDirScanner {
    fn scan(&self, paths: &[PathBuf]) -> Result<ScanResult, ScanError> {
        self.scan_with_events(paths, &crate::events::null_sender())
    }

    fn scan_with_events(
        &self,
        paths: &[PathBuf],
        events: &EventSender,
    ) -> Result<ScanResult, ScanError> {
        events.send(Event::Scan(ScanEvent::Started {
            paths: paths.to_vec(),
        }));

        let mut found = Vec::new();
        let mut errors = Vec::new();

        for path in paths {
            if path.is_file() {
                if self.filter.is_supported(path) {
                    found.push(path.clone());
                } else {
                    tracing::debug!("Skipping unsupported file {}", path.display());
                }
            } else if path.is_dir() {
                if self.config.recursive {
                    self.expand_directory(path, events, &mut found, &mut errors);
                } else {
                    tracing::debug!(
                        "Skipping directory {} (recursion disabled)",
                        path.display()
                    );
                }
            } else {
                let error = ScanError::PathNotFound { path: path.clone() };
                tracing::warn!("{}", error);
                events.send(Event::Scan(ScanEvent::Error {
                    path: path.clone(),
                    message: error.to_string(),
                }));
                errors.push(error);
            }
        }

        // The same file named twice must only enter the batch once
        let mut seen = HashSet::new();
        let files: Vec<MediaFile> = found
            .into_iter()
            .filter(|p| seen.insert(p.clone()))
            .map(|path| {
                events.send(Event::Scan(ScanEvent::FileFound { path: path.clone() }));
                MediaFile {
                    kind: self.filter.kind_of(&path),
                    path,
                }
            })
            .collect();

        events.send(Event::Scan(ScanEvent::Completed {
            total_files: files.len(),
        }));

        Ok(ScanResult { files, errors })
    }
}
