//! Move phase.
//!
//! The only phase with side effects. Each resolved item is moved (or copied)
//! to its destination; items skipped as duplicates or failed earlier are never
//! touched. The destination is checked again right before each move so a file
//! that appeared since resolution is never overwritten.

use super::archive::Archiver;
use super::types::*;
use crate::error::{MoveError, SortError};
use crate::events::{Event, EventSender, MoveEvent};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Puts one file at its destination
pub trait Mover {
    fn transfer(&self, source: &Path, destination: &Path) -> io::Result<()>;
}

/// Filesystem mover
#[derive(Debug, Clone, Copy, Default)]
pub struct FsMover {
    pub mode: OperationMode,
}

impl FsMover {
    pub fn new(mode: OperationMode) -> Self {
        Self { mode }
    }
}

impl Mover for FsMover {
    fn transfer(&self, source: &Path, destination: &Path) -> io::Result<()> {
        match self.mode {
            OperationMode::Copy => fs::copy(source, destination).map(|_| ()),
            OperationMode::Move => fs::rename(source, destination).or_else(|_| {
                // rename fails across filesystems, fall back to copy+delete
                // with size verification before deleting source
                let source_size = fs::metadata(source)?.len();
                fs::copy(source, destination)?;

                let dest_size = fs::metadata(destination)?.len();
                if dest_size != source_size {
                    let _ = fs::remove_file(destination);
                    return Err(io::Error::other(format!(
                        "Copy verification failed: source {} bytes, dest {} bytes",
                        source_size, dest_size
                    )));
                }

                fs::remove_file(source)
            }),
        }
    }
}

/// Executes the move phase over a resolved batch
pub struct MoveExecutor;

impl MoveExecutor {
    pub fn execute(
        batch: &Batch,
        mover: &dyn Mover,
        archiver: Option<&dyn Archiver>,
        events: &EventSender,
    ) -> MoveReport {
        let mut report = MoveReport::default();
        let mut created_dirs: HashSet<PathBuf> = HashSet::new();

        let movable: Vec<&MediaItem> = batch
            .items()
            .iter()
            .filter(|item| item.decision == Decision::Proceed && !item.is_failed())
            .collect();

        events.send(Event::Move(MoveEvent::Started {
            total_files: movable.len(),
        }));

        for item in movable {
            let Some(destination) = item.destination() else {
                continue;
            };

            match Self::place(item, &destination, mover, &mut created_dirs, &mut report) {
                Ok(()) => {
                    tracing::info!(
                        "{} --> {}",
                        item.source_path.display(),
                        destination.display()
                    );
                    report.files_moved += 1;
                    events.send(Event::Move(MoveEvent::Moved {
                        source: item.source_path.clone(),
                        destination: destination.clone(),
                    }));

                    if let Some(archiver) = archiver {
                        match archiver.archive(&destination) {
                            Ok(path) => {
                                report.archives_created += 1;
                                events.send(Event::Move(MoveEvent::Archived { path }));
                            }
                            Err(e) => {
                                let warning = SortError::from(e);
                                tracing::warn!("{}", warning);
                                report.archive_warnings.push(warning.to_string());
                            }
                        }
                    }
                }
                Err(e) => {
                    let error = SortError::from(e);
                    tracing::warn!("{}", error);
                    events.send(Event::Move(MoveEvent::Failed {
                        source: item.source_path.clone(),
                        message: error.to_string(),
                    }));
                    report.errors.push(ItemFailure {
                        path: item.source_path.display().to_string(),
                        message: error.to_string(),
                    });
                }
            }
        }

        events.send(Event::Move(MoveEvent::Completed {
            moved: report.files_moved,
            failed: report.errors.len(),
        }));

        report
    }

    fn place(
        item: &MediaItem,
        destination: &Path,
        mover: &dyn Mover,
        created_dirs: &mut HashSet<PathBuf>,
        report: &mut MoveReport,
    ) -> Result<(), MoveError> {
        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() && !created_dirs.contains(parent) {
                let existed = parent.is_dir();
                fs::create_dir_all(parent).map_err(|source| MoveError::CreateDirectory {
                    path: parent.to_path_buf(),
                    source,
                })?;
                if !existed {
                    report.folders_created += 1;
                }
                created_dirs.insert(parent.to_path_buf());
            }
        }

        if !item.source_path.exists() {
            return Err(MoveError::SourceMissing {
                path: item.source_path.clone(),
            });
        }

        // Something may have appeared here since resolution
        if destination.symlink_metadata().is_ok() {
            return Err(MoveError::DestinationOccupied {
                path: destination.to_path_buf(),
            });
        }

        mover
            .transfer(&item.source_path, destination)
            .map_err(|source| MoveError::Transfer {
                source_path: item.source_path.clone(),
                destination: destination.to_path_buf(),
                source,
            })
    }
}
