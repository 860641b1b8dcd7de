//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the sorting pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Scanning phase events
    Scan(ScanEvent),
    /// Conflict resolution phase events
    Resolve(ResolveEvent),
    /// Move phase events
    Move(MoveEvent),
    /// Pipeline-level events
    Pipeline(PipelineEvent),
}

/// Events during the scanning phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Scanning has started
    Started { paths: Vec<PathBuf> },
    /// A supported media file was found
    FileFound { path: PathBuf },
    /// An error occurred but scanning continues
    Error { path: PathBuf, message: String },
    /// Scanning completed
    Completed { total_files: usize },
}

/// Events during conflict resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ResolveEvent {
    /// Resolution has started for the given number of primaries
    Started { total_primaries: usize },
    /// A primary (and its dependents) was assigned a destination
    Accepted {
        source: PathBuf,
        destination: PathBuf,
        renamed: bool,
        dependents: usize,
    },
    /// A primary's content already exists at its destination
    DuplicateSkipped {
        source: PathBuf,
        existing: PathBuf,
    },
    /// Resolution for one item was aborted
    Failed { source: PathBuf, message: String },
    /// Resolution completed
    Completed { resolved: usize, failed: usize },
}

/// Events during the move phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MoveEvent {
    /// Moving has started
    Started { total_files: usize },
    /// A file was moved into place
    Moved {
        source: PathBuf,
        destination: PathBuf,
    },
    /// A file could not be moved and was left where it was
    Failed { source: PathBuf, message: String },
    /// A parity archive was written next to a moved file
    Archived { path: PathBuf },
    /// Moving completed
    Completed { moved: usize, failed: usize },
}

/// Pipeline-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Pipeline has started
    Started,
    /// Moving to a new phase
    PhaseChanged { phase: PipelinePhase },
    /// Pipeline completed successfully
    Completed { summary: PipelineSummary },
    /// Pipeline encountered a fatal error
    Error { message: String },
}

/// Phases of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelinePhase {
    Scanning,
    Dating,
    Grouping,
    Resolving,
    Moving,
}

/// Summary of pipeline results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Total media files in the batch
    pub total_files: usize,
    /// Files moved (or copied) into the date hierarchy
    pub moved: usize,
    /// Files skipped because identical content was already in place
    pub duplicates_skipped: usize,
    /// Files that were given a new name to avoid a clash
    pub renamed: usize,
    /// Files left in place because of an error
    pub failed: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelinePhase::Scanning => write!(f, "Scanning"),
            PipelinePhase::Dating => write!(f, "Reading dates"),
            PipelinePhase::Grouping => write!(f, "Grouping"),
            PipelinePhase::Resolving => write!(f, "Resolving"),
            PipelinePhase::Moving => write!(f, "Moving"),
        }
    }
}
