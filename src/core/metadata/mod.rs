//! # Metadata Module
//!
//! Works out when a media file was captured.
//!
//! Two collaborators are involved:
//! - a [`MetadataExtractor`] that reads a *trusted* capture time (EXIF
//!   `DateTimeOriginal`, falling back to `DateTime`), and
//! - a [`FallbackClock`] that supplies the file's modification time when no
//!   trusted time exists.
//!
//! Timestamps are kept as the text they were read as. Turning them into a
//! calendar date is the classifier's job, so a corrupt EXIF value surfaces as
//! an unparseable timestamp for that file instead of vanishing here.

use chrono::{DateTime, Local};
use exif::{In, Reader, Tag, Value};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

/// Format used for timestamps produced by the fallback clock (same as EXIF)
pub const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// A capture timestamp in its textual form, e.g. `2020:01:02 10:11:12`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaptureTime(String);

impl CaptureTime {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CaptureTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where an item's capture time came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSource {
    /// Read from the file's own metadata
    Exif,
    /// Copied from the primary this file is grouped under
    Inherited,
    /// File modification time
    FileModified,
}

/// Reads a trusted capture time from a file.
///
/// Implementations must return `None` on any failure (unreadable file, no
/// metadata, missing tag) and never panic.
pub trait MetadataExtractor {
    fn extract(&self, path: &Path) -> Option<CaptureTime>;
}

/// Supplies a timestamp for files without trusted metadata.
pub trait FallbackClock {
    fn mtime(&self, path: &Path) -> std::io::Result<CaptureTime>;
}

/// EXIF reader backed by kamadak-exif
#[derive(Debug, Default, Clone, Copy)]
pub struct ExifExtractor;

impl MetadataExtractor for ExifExtractor {
    fn extract(&self, path: &Path) -> Option<CaptureTime> {
        let file = File::open(path).ok()?;
        let mut bufreader = BufReader::new(file);
        let exif = Reader::new().read_from_container(&mut bufreader).ok()?;

        [Tag::DateTimeOriginal, Tag::DateTime]
            .into_iter()
            .filter_map(|tag| exif.get_field(tag, In::PRIMARY))
            .find_map(|field| ascii_value(&field.value))
            .map(CaptureTime::new)
    }
}

/// Local-time file modification clock
#[derive(Debug, Default, Clone, Copy)]
pub struct FileModifiedClock;

impl FallbackClock for FileModifiedClock {
    fn mtime(&self, path: &Path) -> std::io::Result<CaptureTime> {
        let modified = fs::metadata(path)?.modified()?;
        let local: DateTime<Local> = modified.into();
        Ok(CaptureTime::new(
            local.format(EXIF_DATETIME_FORMAT).to_string(),
        ))
    }
}

/// Helper to extract a non-empty string from an EXIF ASCII value
fn ascii_value(value: &Value) -> Option<String> {
    if let Value::Ascii(ref vec) = value {
        if let Some(bytes) = vec.first() {
            if let Ok(s) = std::str::from_utf8(bytes) {
                let trimmed = s.trim_end_matches('\0').trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
        }
    }
    None
}
