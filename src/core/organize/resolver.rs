//! Conflict resolution.
//!
//! Each primary proposes `dest_dir/stem.ext` and checks it against what is
//! already on disk and against what earlier items in the batch have claimed:
//!
//! ```text
//! PROPOSING -> CHECKING -> Accepted        (nothing there)
//!                       -> DuplicateSkip   (same content already there)
//!                       -> Retry           (different content: increment stem, propose again)
//! ```
//!
//! Earlier items own their names; a later clashing item is the one renamed.
//! Dependents never run this loop: they take the primary's directory, stem
//! and decision, with their own extension.

use super::naming;
use super::types::{Batch, Decision, ItemId, MediaItem};
use crate::core::checksum::ChecksumService;
use crate::error::{DigestError, SortError};
use crate::events::{Event, EventSender, ResolveEvent};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Outcome of one CHECKING step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Accepted,
    DuplicateSkip,
    Retry,
}

/// Final answer for one primary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub final_stem: String,
    pub decision: Decision,
    /// Number of renames it took
    pub attempts: usize,
    /// Path already holding identical content
    pub duplicate_of: Option<PathBuf>,
}

/// Destination paths owned by items already decided `Proceed`
#[derive(Debug, Default, Clone)]
pub struct Claims {
    by_path: HashMap<PathBuf, ItemId>,
}

impl Claims {
    /// Claims held by the already-finalized items of a batch, first in scan order wins
    pub fn from_batch(batch: &Batch) -> Self {
        let mut claims = Self::default();
        for (id, item) in batch.iter() {
            if item.decision == Decision::Proceed {
                if let Some(dest) = item.destination() {
                    claims.by_path.entry(dest).or_insert(id);
                }
            }
        }
        claims
    }

    pub fn owner(&self, path: &Path) -> Option<ItemId> {
        self.by_path.get(path).copied()
    }

    fn claim_group(&mut self, batch: &Batch, primary: ItemId) {
        let members = std::iter::once(primary).chain(batch.get(primary).associates.iter().copied());
        for id in members {
            let item = batch.get(id);
            if item.decision != Decision::Proceed {
                continue;
            }
            if let Some(dest) = item.destination() {
                self.by_path.entry(dest).or_insert(id);
            }
        }
    }
}

/// Counts from a batch resolution pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveSummary {
    pub accepted: usize,
    pub renamed: usize,
    pub duplicates: usize,
    pub failed: usize,
}

/// Drives primaries through the proposing/checking loop
pub struct ConflictResolver<'a> {
    checksums: &'a mut ChecksumService,
}

impl<'a> ConflictResolver<'a> {
    pub fn new(checksums: &'a mut ChecksumService) -> Self {
        Self { checksums }
    }

    /// Resolve one primary against the disk and the given claims.
    ///
    /// Does not modify the batch. An unreadable file (this item's source or
    /// an occupant it must be compared with) aborts with an error instead of
    /// guessing either way.
    pub fn resolve(
        &mut self,
        batch: &Batch,
        claims: &Claims,
        id: ItemId,
        dest_dir: &Path,
    ) -> Result<Resolution, DigestError> {
        let item = batch.get(id);
        let mut stem = item.stem.clone();
        let mut attempts = 0;

        loop {
            let candidate = dest_dir.join(item.file_name_with(&stem));
            match self.check(batch, claims, item, &candidate)? {
                StepOutcome::Accepted if self.group_fits(batch, claims, item, dest_dir, &stem)? => {
                    return Ok(Resolution {
                        final_stem: stem,
                        decision: Decision::Proceed,
                        attempts,
                        duplicate_of: None,
                    });
                }
                StepOutcome::Accepted => {
                    tracing::debug!(
                        "{} is free but a grouped file's name holds different content, renaming the group",
                        candidate.display()
                    );
                }
                StepOutcome::DuplicateSkip => {
                    return Ok(Resolution {
                        final_stem: stem,
                        decision: Decision::SkipDuplicate,
                        attempts,
                        duplicate_of: Some(candidate),
                    });
                }
                StepOutcome::Retry => {
                    tracing::debug!(
                        "{} is taken by different content",
                        candidate.display()
                    );
                }
            }
            stem = naming::increment(&stem);
            attempts += 1;
        }
    }

    /// One CHECKING step for a candidate path
    fn check(
        &mut self,
        batch: &Batch,
        claims: &Claims,
        item: &MediaItem,
        candidate: &Path,
    ) -> Result<StepOutcome, DigestError> {
        let mut occupied = false;
        let mut compare_with: Vec<PathBuf> = Vec::new();

        if candidate.symlink_metadata().is_ok() {
            occupied = true;
            // Directories and other non-files can never hold the same content
            if candidate.is_file() {
                compare_with.push(candidate.to_path_buf());
            }
        }
        if let Some(owner) = claims.owner(candidate) {
            occupied = true;
            compare_with.push(batch.get(owner).source_path.clone());
        }

        if !occupied {
            return Ok(StepOutcome::Accepted);
        }

        for other in &compare_with {
            if self.checksums.same_content(&item.source_path, other)? {
                return Ok(StepOutcome::DuplicateSkip);
            }
        }
        Ok(StepOutcome::Retry)
    }

    /// No dependent's sibling path for `stem` holds different content.
    ///
    /// A sibling already holding identical content does not move the group
    /// to a new name; the move phase leaves that dependent where it is.
    fn group_fits(
        &mut self,
        batch: &Batch,
        claims: &Claims,
        item: &MediaItem,
        dest_dir: &Path,
        stem: &str,
    ) -> Result<bool, DigestError> {
        for dep in &item.associates {
            let dependent = batch.get(*dep);
            let sibling = dest_dir.join(dependent.file_name_with(stem));
            if self.check(batch, claims, dependent, &sibling)? == StepOutcome::Retry {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Resolve every pending primary in scan order, finalizing its group.
    ///
    /// Items already decided are left alone, so running this again on a
    /// finalized batch changes nothing. Items that failed an earlier phase
    /// are skipped; a digest failure marks the item (and its dependents) as
    /// failed and the pass continues with the next one.
    pub fn resolve_batch(&mut self, batch: &mut Batch, events: &EventSender) -> ResolveSummary {
        let mut claims = Claims::from_batch(batch);
        let mut summary = ResolveSummary::default();

        let pending: Vec<ItemId> = batch
            .iter()
            .filter(|(_, item)| item.is_primary() && !item.is_decided() && !item.is_failed())
            .map(|(id, _)| id)
            .collect();

        events.send(Event::Resolve(ResolveEvent::Started {
            total_primaries: pending.len(),
        }));

        for id in pending {
            let Some(dest_dir) = batch.get(id).target_dir.clone() else {
                let message = "no destination directory was derived".to_string();
                batch.fail_group(id, &message);
                summary.failed += 1;
                continue;
            };

            match self.resolve(batch, &claims, id, &dest_dir) {
                Ok(resolution) => {
                    batch.finalize_group(
                        id,
                        &dest_dir,
                        &resolution.final_stem,
                        resolution.decision,
                        resolution.duplicate_of.clone(),
                    );
                    claims.claim_group(batch, id);
                    report(batch, id, &resolution, events, &mut summary);
                }
                Err(e) => {
                    let error = SortError::from(e);
                    tracing::warn!("{}", error);
                    let source = batch.get(id).source_path.clone();
                    batch.fail_group(id, &error.to_string());
                    events.send(Event::Resolve(ResolveEvent::Failed {
                        source,
                        message: error.to_string(),
                    }));
                    summary.failed += 1;
                }
            }
        }

        events.send(Event::Resolve(ResolveEvent::Completed {
            resolved: summary.accepted + summary.duplicates,
            failed: summary.failed,
        }));
        summary
    }
}

fn report(
    batch: &Batch,
    id: ItemId,
    resolution: &Resolution,
    events: &EventSender,
    summary: &mut ResolveSummary,
) {
    let item = batch.get(id);
    match resolution.decision {
        Decision::SkipDuplicate => {
            let existing = resolution.duplicate_of.clone().unwrap_or_default();
            tracing::info!(
                "'{}' already exists as '{}', skipping",
                item.source_path.display(),
                existing.display()
            );
            summary.duplicates += 1;
            events.send(Event::Resolve(ResolveEvent::DuplicateSkipped {
                source: item.source_path.clone(),
                existing,
            }));
        }
        _ => {
            let destination = item.destination().unwrap_or_default();
            let renamed = resolution.attempts > 0;
            if renamed {
                tracing::info!(
                    "'{}' clashes with a different file, renamed to '{}'",
                    item.source_path.display(),
                    destination.display()
                );
                summary.renamed += 1;
            }
            summary.accepted += 1;
            events.send(Event::Resolve(ResolveEvent::Accepted {
                source: item.source_path.clone(),
                destination,
                renamed,
                dependents: item.associates.len(),
            }));
        }
    }
}
