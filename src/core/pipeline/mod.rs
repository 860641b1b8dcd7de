//! # Pipeline Module
//!
//! Orchestrates a full sorting run.
//!
//! ## Pipeline Stages
//! 1. **Scan** - Expand the given paths into a batch of media files
//! 2. **Date** - Read capture times, group associated files, fall back to mtime
//! 3. **Resolve** - Pick a free, non-duplicate name for every group
//! 4. **Move** - Move or copy resolved files (skipped on a dry run)
//!
//! Nothing is moved until every file in the batch has been resolved.

mod executor;

pub use executor::{SortConfig, SortReport, Sorter, SorterBuilder};
