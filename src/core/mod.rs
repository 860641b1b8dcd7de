//! # Core Module
//!
//! The UI-agnostic sorting engine.
//!
//! ## Modules
//! - `scanner` - Expands input paths into media files
//! - `metadata` - Reads capture times from EXIF, with an mtime fallback
//! - `checksum` - Content digests for duplicate detection
//! - `organize` - Grouping, date folders, conflict resolution and moving
//! - `pipeline` - Orchestrates the full workflow

pub mod checksum;
pub mod metadata;
pub mod organize;
pub mod pipeline;
pub mod scanner;

// Re-export commonly used types
pub use checksum::{ChecksumService, ContentDigest};
pub use metadata::{CaptureTime, TimeSource};
pub use organize::{Decision, MediaItem, OperationMode, SortPlan};
pub use pipeline::{SortConfig, SortReport, Sorter, SorterBuilder};
pub use scanner::{MediaFile, MediaKind};
