//! Types for the organize module.

use crate::core::metadata::{CaptureTime, TimeSource};
use crate::core::scanner::{MediaFile, MediaKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Position of an item in the batch's scan order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub usize);

/// What happens to an item in the move phase.
///
/// Transitions only ever go `Pending -> Proceed` or `Pending -> SkipDuplicate`.
/// An item that was renamed is `Proceed` with a `dest_stem` different from its
/// source stem.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    #[default]
    Pending,
    Proceed,
    SkipDuplicate,
}

/// Operation mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OperationMode {
    /// Move files to destination
    #[default]
    Move,
    /// Copy files to destination (keep originals)
    Copy,
}

/// One discovered candidate file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    pub source_path: PathBuf,
    pub source_dir: PathBuf,
    pub stem: String,
    /// Extension as written on disk (case preserved, no dot)
    pub extension: String,
    pub kind: MediaKind,
    pub capture_time: Option<CaptureTime>,
    pub time_source: Option<TimeSource>,
    /// Date folder derived from the capture time (primaries only)
    pub target_dir: Option<PathBuf>,
    pub dest_dir: Option<PathBuf>,
    pub dest_stem: Option<String>,
    pub decision: Decision,
    /// The primary this item rides along with
    pub associate_of: Option<ItemId>,
    /// Dependents grouped under this primary
    pub associates: Vec<ItemId>,
    /// Existing file with identical content, when skipped as a duplicate
    pub duplicate_of: Option<PathBuf>,
    /// Why this item will not be moved
    pub failure: Option<String>,
}

impl MediaItem {
    pub fn new(source_path: PathBuf, kind: MediaKind) -> Self {
        let source_dir = source_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let stem = source_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = source_path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            source_path,
            source_dir,
            stem,
            extension,
            kind,
            capture_time: None,
            time_source: None,
            target_dir: None,
            dest_dir: None,
            dest_stem: None,
            decision: Decision::Pending,
            associate_of: None,
            associates: Vec::new(),
            duplicate_of: None,
            failure: None,
        }
    }

    /// File name this item would have with the given stem
    pub fn file_name_with(&self, stem: &str) -> String {
        if self.extension.is_empty() {
            stem.to_string()
        } else {
            format!("{}.{}", stem, self.extension)
        }
    }

    /// Capture time read from the file itself
    pub fn has_trusted_time(&self) -> bool {
        self.time_source == Some(TimeSource::Exif)
    }

    pub fn is_primary(&self) -> bool {
        self.associate_of.is_none()
    }

    pub fn is_dependent(&self) -> bool {
        self.associate_of.is_some()
    }

    pub fn is_decided(&self) -> bool {
        self.decision != Decision::Pending
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    pub fn is_renamed(&self) -> bool {
        self.decision == Decision::Proceed
            && self.dest_stem.as_deref().is_some_and(|s| s != self.stem)
    }

    /// Final destination path, once resolved
    pub fn destination(&self) -> Option<PathBuf> {
        let dir = self.dest_dir.as_ref()?;
        let stem = self.dest_stem.as_ref()?;
        Some(dir.join(self.file_name_with(stem)))
    }

    /// Same directory, same stem, different extension
    pub fn shares_stem_with(&self, other: &MediaItem) -> bool {
        self.source_dir == other.source_dir
            && self.stem == other.stem
            && !self.extension.eq_ignore_ascii_case(&other.extension)
    }
}

/// The whole batch, in scan order.
///
/// Every phase (dating, grouping, resolving, moving) takes the batch by
/// reference; there is no other shared state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Batch {
    items: Vec<MediaItem>,
}

impl Batch {
    pub fn from_files(files: Vec<MediaFile>) -> Self {
        Self {
            items: files
                .into_iter()
                .map(|f| MediaItem::new(f.path, f.kind))
                .collect(),
        }
    }

    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            items: paths
                .into_iter()
                .map(|p| {
                    let path: PathBuf = p.into();
                    let kind = path
                        .extension()
                        .and_then(|e| e.to_str())
                        .map(MediaKind::from_extension)
                        .unwrap_or(MediaKind::Other);
                    MediaItem::new(path, kind)
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: ItemId) -> &MediaItem {
        &self.items[id.0]
    }

    pub fn get_mut(&mut self, id: ItemId) -> &mut MediaItem {
        &mut self.items[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = (ItemId, &MediaItem)> {
        self.items.iter().enumerate().map(|(i, item)| (ItemId(i), item))
    }

    pub fn ids(&self) -> impl Iterator<Item = ItemId> {
        (0..self.items.len()).map(ItemId)
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    /// Make `dependent` ride along with `primary`, inheriting its capture time
    pub(crate) fn attach(&mut self, dependent: ItemId, primary: ItemId) {
        let capture_time = self.get(primary).capture_time.clone();
        let item = self.get_mut(dependent);
        item.associate_of = Some(primary);
        item.capture_time = capture_time;
        item.time_source = Some(TimeSource::Inherited);
        self.get_mut(primary).associates.push(dependent);
    }

    /// Mark an item and everything grouped under it as failed
    pub(crate) fn fail_group(&mut self, id: ItemId, message: &str) {
        let associates = self.get(id).associates.clone();
        self.get_mut(id).failure = Some(message.to_string());
        for dep in associates {
            let item = self.get_mut(dep);
            if item.failure.is_none() {
                item.failure = Some(format!("grouped file failed: {}", message));
            }
        }
    }

    /// Apply a primary's final decision to it and its dependents
    pub(crate) fn finalize_group(
        &mut self,
        id: ItemId,
        dest_dir: &Path,
        final_stem: &str,
        decision: Decision,
        duplicate_of: Option<PathBuf>,
    ) {
        if self.get(id).is_decided() {
            return;
        }
        self.get_mut(id).duplicate_of = duplicate_of;

        let associates = self.get(id).associates.clone();
        for member in std::iter::once(id).chain(associates) {
            let item = self.get_mut(member);
            if item.is_decided() {
                continue;
            }
            item.dest_dir = Some(dest_dir.to_path_buf());
            item.dest_stem = Some(final_stem.to_string());
            item.decision = decision;
        }
    }
}

/// Information about one file in the plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedFile {
    pub source: String,
    pub destination: Option<String>,
    pub filename: String,
    pub kind: MediaKind,
    pub capture_time: Option<String>,
    pub time_source: Option<TimeSource>,
    pub decision: Decision,
    pub renamed: bool,
    /// Source of the primary this file is grouped under
    pub grouped_with: Option<String>,
    pub duplicate_of: Option<String>,
    pub failure: Option<String>,
}

/// The resolved plan (preview)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortPlan {
    pub id: String,
    pub files: Vec<PlannedFile>,
    pub total_files: usize,
    pub to_move: usize,
    pub renamed: usize,
    pub duplicates: usize,
    pub dependents: usize,
    pub failed: usize,
}

/// A per-item failure from any phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemFailure {
    pub path: String,
    pub message: String,
}

/// Result of executing the move phase
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoveReport {
    pub files_moved: usize,
    pub folders_created: usize,
    pub archives_created: usize,
    pub errors: Vec<ItemFailure>,
    /// Advisory archive failures; the moves they relate to stand
    pub archive_warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_derives_dir_stem_and_extension() {
        let item = MediaItem::new(PathBuf::from("A/IMG_0001.CR2"), MediaKind::Raw);
        assert_eq!(item.source_dir, PathBuf::from("A"));
        assert_eq!(item.stem, "IMG_0001");
        assert_eq!(item.extension, "CR2");
        assert_eq!(item.file_name_with("IMG_0001_(1)"), "IMG_0001_(1).CR2");
        assert_eq!(item.decision, Decision::Pending);
    }

    #[test]
    fn bare_file_name_has_empty_dir() {
        let item = MediaItem::new(PathBuf::from("img.jpg"), MediaKind::Image);
        assert_eq!(item.source_dir, PathBuf::from(""));
    }

    #[test]
    fn shares_stem_ignores_extension_case_only() {
        let jpg = MediaItem::new(PathBuf::from("A/img.jpg"), MediaKind::Image);
        let cr2 = MediaItem::new(PathBuf::from("A/img.cr2"), MediaKind::Raw);
        let upper = MediaItem::new(PathBuf::from("A/img.JPG"), MediaKind::Image);
        let other_dir = MediaItem::new(PathBuf::from("B/img.cr2"), MediaKind::Raw);

        assert!(jpg.shares_stem_with(&cr2));
        assert!(!jpg.shares_stem_with(&upper));
        assert!(!jpg.shares_stem_with(&other_dir));
    }

    #[test]
    fn finalize_group_never_overrides_a_decision() {
        let mut batch = Batch::from_paths(["A/img.jpg"]);
        let id = ItemId(0);
        batch.finalize_group(id, Path::new("2020/1/2"), "img", Decision::Proceed, None);
        batch.finalize_group(id, Path::new("2021/1/1"), "img_(1)", Decision::SkipDuplicate, None);

        let item = batch.get(id);
        assert_eq!(item.decision, Decision::Proceed);
        assert_eq!(item.destination(), Some(PathBuf::from("2020/1/2/img.jpg")));
        assert!(!item.is_renamed());
    }
}
