//! Plan building: dates, grouping, date folders and conflict resolution.
//!
//! The phases run in this order over the whole batch before anything is
//! moved, because a file late in the batch can change what an earlier file's
//! dependents inherit:
//!
//! 1. trusted capture times from metadata
//! 2. association grouping
//! 3. modification-time fallback for primaries still without a time
//! 4. date folder per primary
//! 5. conflict resolution

use super::classifier::classify;
use super::grouper;
use super::resolver::{ConflictResolver, ResolveSummary};
use super::types::*;
use crate::core::checksum::ChecksumService;
use crate::core::metadata::{FallbackClock, MetadataExtractor, TimeSource};
use crate::error::{SortError, TimestampError};
use crate::events::{Event, EventSender, PipelineEvent, PipelinePhase};
use std::path::Path;
use uuid::Uuid;

/// Runs the planning phases over a batch
pub struct SortPlanner;

impl SortPlanner {
    /// Phase 1: read trusted capture times
    pub fn assign_trusted_times(batch: &mut Batch, extractor: &dyn MetadataExtractor) -> usize {
        let mut found = 0;
        for id in batch.ids().collect::<Vec<_>>() {
            let item = batch.get_mut(id);
            if item.capture_time.is_some() {
                continue;
            }
            if let Some(time) = extractor.extract(&item.source_path) {
                item.capture_time = Some(time);
                item.time_source = Some(TimeSource::Exif);
                found += 1;
            }
        }
        found
    }

    /// Phase 3: modification time for primaries without a capture time.
    ///
    /// Dependents already carry their primary's time and are left alone.
    pub fn assign_fallback_times(batch: &mut Batch, clock: &dyn FallbackClock) {
        for id in batch.ids().collect::<Vec<_>>() {
            let item = batch.get(id);
            if item.is_dependent() || item.capture_time.is_some() || item.is_failed() {
                continue;
            }
            match clock.mtime(&item.source_path) {
                Ok(time) => {
                    let item = batch.get_mut(id);
                    item.capture_time = Some(time);
                    item.time_source = Some(TimeSource::FileModified);
                }
                Err(source) => {
                    let error = SortError::from(TimestampError::Unavailable {
                        path: item.source_path.clone(),
                        source,
                    });
                    tracing::warn!("{}", error);
                    batch.fail_group(id, &error.to_string());
                }
            }
        }
    }

    /// Phase 4: `root/year/month/day` for every primary.
    ///
    /// An unparseable time fails the primary and its dependents; they are
    /// never filed under a default folder.
    pub fn classify_destinations(batch: &mut Batch, root: &Path) {
        for id in batch.ids().collect::<Vec<_>>() {
            let item = batch.get(id);
            if item.is_dependent() || item.is_failed() || item.target_dir.is_some() {
                continue;
            }
            let Some(time) = item.capture_time.clone() else {
                continue;
            };
            match classify(&time) {
                Ok(date) => {
                    batch.get_mut(id).target_dir = Some(root.join(date.relative_path()));
                }
                Err(invalid) => {
                    let error = SortError::from(TimestampError::Unparseable {
                        path: item.source_path.clone(),
                        value: invalid.0,
                    });
                    tracing::warn!("{}", error);
                    batch.fail_group(id, &error.to_string());
                }
            }
        }
    }

    /// Run phases 1-5 and return the resolution counts
    pub fn prepare(
        batch: &mut Batch,
        root: &Path,
        extractor: &dyn MetadataExtractor,
        clock: &dyn FallbackClock,
        checksums: &mut ChecksumService,
        events: &EventSender,
    ) -> ResolveSummary {
        let enter = |phase| events.send(Event::Pipeline(PipelineEvent::PhaseChanged { phase }));

        enter(PipelinePhase::Dating);
        let trusted = Self::assign_trusted_times(batch, extractor);
        tracing::debug!("{} files carry their own capture time", trusted);

        enter(PipelinePhase::Grouping);
        let dependents = grouper::group(batch);
        tracing::debug!("{} files grouped with a primary", dependents);
        Self::assign_fallback_times(batch, clock);
        Self::classify_destinations(batch, root);

        enter(PipelinePhase::Resolving);
        let summary = ConflictResolver::new(checksums).resolve_batch(batch, events);
        tracing::debug!(
            "resolved: {} accepted ({} renamed), {} duplicates, {} failed; {} files digested",
            summary.accepted,
            summary.renamed,
            summary.duplicates,
            summary.failed,
            checksums.len()
        );
        summary
    }

    /// Snapshot of a batch for previews and reports
    pub fn plan(batch: &Batch) -> SortPlan {
        let files: Vec<PlannedFile> = batch
            .items()
            .iter()
            .map(|item| PlannedFile {
                source: item.source_path.display().to_string(),
                destination: item.destination().map(|d| d.display().to_string()),
                filename: item.file_name_with(item.dest_stem.as_deref().unwrap_or(&item.stem)),
                kind: item.kind,
                capture_time: item.capture_time.as_ref().map(|t| t.to_string()),
                time_source: item.time_source,
                decision: item.decision,
                renamed: item.is_renamed(),
                grouped_with: item
                    .associate_of
                    .map(|p| batch.get(p).source_path.display().to_string()),
                duplicate_of: item.duplicate_of.as_ref().map(|d| d.display().to_string()),
                failure: item.failure.clone(),
            })
            .collect();

        let count = |f: &dyn Fn(&PlannedFile) -> bool| files.iter().filter(|p| f(p)).count();

        SortPlan {
            id: Uuid::new_v4().to_string(),
            total_files: files.len(),
            to_move: count(&|p| p.decision == Decision::Proceed && p.failure.is_none()),
            renamed: count(&|p| p.renamed),
            duplicates: count(&|p| p.decision == Decision::SkipDuplicate),
            dependents: count(&|p| p.grouped_with.is_some()),
            failed: count(&|p| p.failure.is_some()),
            files,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::CaptureTime;
    use crate::events::{null_sender, EventChannel};
    use std::collections::HashMap;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Capture times keyed by file name
    struct FixedExif(HashMap<String, String>);

    impl FixedExif {
        fn new(entries: &[(&str, &str)]) -> Self {
            Self(
                entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            )
        }
    }

    impl MetadataExtractor for FixedExif {
        fn extract(&self, path: &Path) -> Option<CaptureTime> {
            let name = path.file_name()?.to_str()?;
            self.0.get(name).map(CaptureTime::new)
        }
    }

    struct FixedClock(&'static str);

    impl FallbackClock for FixedClock {
        fn mtime(&self, path: &Path) -> std::io::Result<CaptureTime> {
            fs::metadata(path)?;
            Ok(CaptureTime::new(self.0))
        }
    }

    fn setup(files: &[(&str, &[u8])]) -> (TempDir, Vec<PathBuf>) {
        let temp = TempDir::new().unwrap();
        let paths = files
            .iter()
            .map(|(rel, content)| {
                let path = temp.path().join(rel);
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(&path, content).unwrap();
                path
            })
            .collect();
        (temp, paths)
    }

    fn prepare(batch: &mut Batch, root: &Path, exif: &FixedExif) -> ResolveSummary {
        let mut checksums = ChecksumService::new();
        SortPlanner::prepare(
            batch,
            root,
            exif,
            &FixedClock("2019:07:04 12:00:00"),
            &mut checksums,
            &null_sender(),
        )
    }

    #[test]
    fn jpeg_and_raw_land_in_the_same_day_folder() {
        let (temp, paths) = setup(&[("A/img.jpg", b"jpeg"), ("A/img.cr2", b"raw")]);
        let root = temp.path().join("sorted");
        let mut batch = Batch::from_paths(paths);

        prepare(
            &mut batch,
            &root,
            &FixedExif::new(&[("img.jpg", "2020:01:02 08:09:10")]),
        );

        let jpg = batch.get(ItemId(0));
        let cr2 = batch.get(ItemId(1));
        assert_eq!(cr2.associate_of, Some(ItemId(0)));
        assert_eq!(jpg.destination(), Some(root.join("2020/1/2/img.jpg")));
        assert_eq!(cr2.destination(), Some(root.join("2020/1/2/img.cr2")));
        assert_eq!(jpg.decision, Decision::Proceed);
        assert_eq!(cr2.decision, Decision::Proceed);
    }

    #[test]
    fn file_without_exif_falls_back_to_modification_time() {
        let (temp, paths) = setup(&[("clip.mov", b"video")]);
        let root = temp.path().join("sorted");
        let mut batch = Batch::from_paths(paths);

        prepare(&mut batch, &root, &FixedExif::new(&[]));

        let item = batch.get(ItemId(0));
        assert_eq!(item.time_source, Some(TimeSource::FileModified));
        assert_eq!(item.destination(), Some(root.join("2019/7/4/clip.mov")));
    }

    #[test]
    fn dependent_does_not_use_its_own_modification_time() {
        let (temp, paths) = setup(&[("A/img.aae", b"edits"), ("A/img.jpg", b"jpeg")]);
        let root = temp.path().join("sorted");
        let mut batch = Batch::from_paths(paths);

        prepare(
            &mut batch,
            &root,
            &FixedExif::new(&[("img.jpg", "2021:03:04 00:00:00")]),
        );

        let aae = batch.get(ItemId(0));
        assert_eq!(aae.time_source, Some(TimeSource::Inherited));
        assert_eq!(aae.destination(), Some(root.join("2021/3/4/img.aae")));
    }

    #[test]
    fn unparseable_exif_excludes_item_and_dependents() {
        let (temp, paths) = setup(&[
            ("A/img.jpg", b"jpeg"),
            ("A/img.cr2", b"raw"),
            ("A/ok.jpg", b"fine"),
        ]);
        let root = temp.path().join("sorted");
        let mut batch = Batch::from_paths(paths);

        prepare(
            &mut batch,
            &root,
            &FixedExif::new(&[
                ("img.jpg", "0000:00:00 00:00:00"),
                ("ok.jpg", "2020:01:02 00:00:00"),
            ]),
        );

        let plan = SortPlanner::plan(&batch);
        assert_eq!(plan.failed, 2);
        assert_eq!(plan.to_move, 1);
        assert!(plan.files[0]
            .failure
            .as_deref()
            .unwrap()
            .contains("Unparseable"));
        assert!(plan.files[0].destination.is_none());
        assert!(plan.files[1].destination.is_none());
    }

    #[test]
    fn missing_file_fails_at_fallback() {
        let temp = TempDir::new().unwrap();
        let mut batch = Batch::from_paths([temp.path().join("gone.mov")]);

        prepare(&mut batch, temp.path(), &FixedExif::new(&[]));

        let item = batch.get(ItemId(0));
        assert!(item.is_failed());
        assert!(item.target_dir.is_none());
        assert_eq!(item.decision, Decision::Pending);
    }

    #[test]
    fn prepare_announces_each_phase_in_order() {
        let (temp, paths) = setup(&[("A/img.jpg", b"jpeg")]);
        let (sender, receiver) = EventChannel::new();
        let mut checksums = ChecksumService::new();

        SortPlanner::prepare(
            &mut Batch::from_paths(paths),
            &temp.path().join("sorted"),
            &FixedExif::new(&[]),
            &FixedClock("2019:07:04 12:00:00"),
            &mut checksums,
            &sender,
        );

        let phases: Vec<PipelinePhase> = receiver
            .drain()
            .into_iter()
            .filter_map(|e| match e {
                Event::Pipeline(PipelineEvent::PhaseChanged { phase }) => Some(phase),
                _ => None,
            })
            .collect();
        assert_eq!(
            phases,
            vec![
                PipelinePhase::Dating,
                PipelinePhase::Grouping,
                PipelinePhase::Resolving
            ]
        );
    }

    #[test]
    fn plan_counts_each_outcome() {
        let (temp, paths) = setup(&[
            ("A/img.jpg", b"one"),
            ("A/img.cr2", b"raw"),
            ("B/img.jpg", b"two"),
            ("C/img.jpg", b"one"),
        ]);
        let root = temp.path().join("sorted");
        let mut batch = Batch::from_paths(paths);

        prepare(
            &mut batch,
            &root,
            &FixedExif::new(&[("img.jpg", "2020:01:02 00:00:00")]),
        );
        let plan = SortPlanner::plan(&batch);

        assert_eq!(plan.total_files, 4);
        assert_eq!(plan.dependents, 1);
        assert_eq!(plan.to_move, 3);
        assert_eq!(plan.renamed, 1);
        assert_eq!(plan.duplicates, 1);
        assert_eq!(plan.failed, 0);
        assert!(plan.files[2].destination.as_deref().unwrap().ends_with("img_(1).jpg"));
    }
}
