//! Pipeline execution implementation.

use crate::core::checksum::ChecksumService;
use crate::core::metadata::{ExifExtractor, FallbackClock, FileModifiedClock, MetadataExtractor};
use crate::core::organize::{
    Archiver, Batch, FsMover, ItemFailure, MoveExecutor, MoveReport, Mover, OperationMode,
    Par2Archiver, SortPlan, SortPlanner,
};
use crate::core::scanner::{MediaScanner, ScanConfig, WalkDirScanner};
use crate::error::SortError;
use crate::events::{
    null_sender, Event, EventSender, PipelineEvent, PipelinePhase, PipelineSummary,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;

/// Result of a sorting run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortReport {
    /// The resolved plan, one entry per input file
    pub plan: SortPlan,
    /// Move phase outcome (None on a dry run)
    pub moves: Option<MoveReport>,
    /// Non-fatal input problems (missing paths, unreadable directories)
    pub scan_errors: Vec<String>,
    /// Every file left in place because of an error, from any phase
    pub failures: Vec<ItemFailure>,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl SortReport {
    pub fn files_moved(&self) -> usize {
        self.moves.as_ref().map_or(0, |m| m.files_moved)
    }

    fn summary(&self) -> PipelineSummary {
        PipelineSummary {
            total_files: self.plan.total_files,
            moved: self.files_moved(),
            duplicates_skipped: self.plan.duplicates,
            renamed: self.plan.renamed,
            failed: self.failures.len(),
            duration_ms: self.duration_ms,
        }
    }
}

/// Configuration for a sorting run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortConfig {
    /// Files and directories to sort, in order
    pub paths: Vec<PathBuf>,
    /// Root of the `year/month/day` hierarchy
    pub destination: PathBuf,
    /// Input expansion
    pub scan_config: ScanConfig,
    /// Move or copy
    pub operation: OperationMode,
    /// Resolve and report without touching the filesystem
    pub dry_run: bool,
    /// Write a par2 recovery archive with this redundancy (percent) after each move
    pub par2_redundancy: Option<u8>,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            destination: PathBuf::from("."),
            scan_config: ScanConfig::default(),
            operation: OperationMode::Move,
            dry_run: false,
            par2_redundancy: None,
        }
    }
}

/// Builder for sorter configuration
pub struct SorterBuilder {
    config: SortConfig,
    extractor: Option<Box<dyn MetadataExtractor>>,
    clock: Option<Box<dyn FallbackClock>>,
    mover: Option<Box<dyn Mover>>,
    archiver: Option<Box<dyn Archiver>>,
}

impl SorterBuilder {
    /// Create a new sorter builder
    pub fn new() -> Self {
        Self {
            config: SortConfig::default(),
            extractor: None,
            clock: None,
            mover: None,
            archiver: None,
        }
    }

    /// Start from an existing configuration
    pub fn config(mut self, config: SortConfig) -> Self {
        self.config = config;
        self
    }

    /// Files and directories to sort
    pub fn paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.config.paths = paths;
        self
    }

    /// Root of the date hierarchy
    pub fn destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.config.destination = destination.into();
        self
    }

    /// Set scanner configuration
    pub fn scan_config(mut self, config: ScanConfig) -> Self {
        self.config.scan_config = config;
        self
    }

    /// Expand directory arguments
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.config.scan_config.recursive = recursive;
        self
    }

    /// Walk into subdirectories when expanding
    pub fn descend(mut self, descend: bool) -> Self {
        self.config.scan_config.descend = descend;
        self
    }

    /// Include hidden files
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.config.scan_config.include_hidden = include;
        self
    }

    /// Move or copy
    pub fn operation(mut self, operation: OperationMode) -> Self {
        self.config.operation = operation;
        self
    }

    /// Plan only
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.config.dry_run = dry_run;
        self
    }

    /// Archive each moved file with par2
    pub fn par2(mut self, redundancy: u8) -> Self {
        self.config.par2_redundancy = Some(redundancy);
        self
    }

    /// Use a custom capture time source
    pub fn extractor(mut self, extractor: Box<dyn MetadataExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Use a custom fallback clock
    pub fn clock(mut self, clock: Box<dyn FallbackClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Use a custom mover
    pub fn mover(mut self, mover: Box<dyn Mover>) -> Self {
        self.mover = Some(mover);
        self
    }

    /// Use a custom archiver (takes precedence over `par2`)
    pub fn archiver(mut self, archiver: Box<dyn Archiver>) -> Self {
        self.archiver = Some(archiver);
        self
    }

    /// Build the sorter
    pub fn build(self) -> Sorter {
        let archiver = self.archiver.or_else(|| {
            self.config
                .par2_redundancy
                .map(|r| Box::new(Par2Archiver::new(r)) as Box<dyn Archiver>)
        });
        let operation = self.config.operation;

        Sorter {
            extractor: self.extractor.unwrap_or_else(|| Box::new(ExifExtractor)),
            clock: self.clock.unwrap_or_else(|| Box::new(FileModifiedClock)),
            mover: self
                .mover
                .unwrap_or_else(|| Box::new(FsMover::new(operation))),
            archiver,
            config: self.config,
        }
    }
}

impl Default for SorterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The sorting pipeline: scan, date, group, resolve, move
pub struct Sorter {
    config: SortConfig,
    extractor: Box<dyn MetadataExtractor>,
    clock: Box<dyn FallbackClock>,
    mover: Box<dyn Mover>,
    archiver: Option<Box<dyn Archiver>>,
}

impl Sorter {
    /// Create a new sorter builder
    pub fn builder() -> SorterBuilder {
        SorterBuilder::new()
    }

    pub fn config(&self) -> &SortConfig {
        &self.config
    }

    /// Run without events
    pub fn run(&self) -> Result<SortReport, SortError> {
        self.run_with_events(&null_sender())
    }

    /// Run with event reporting
    pub fn run_with_events(&self, events: &EventSender) -> Result<SortReport, SortError> {
        let start_time = Instant::now();
        let enter = |phase| events.send(Event::Pipeline(PipelineEvent::PhaseChanged { phase }));

        events.send(Event::Pipeline(PipelineEvent::Started));

        // Phase 1: Scanning
        enter(PipelinePhase::Scanning);
        let scanner = WalkDirScanner::new(self.config.scan_config.clone());
        let scan_result = scanner.scan_with_events(&self.config.paths, events)?;
        let scan_errors: Vec<String> = scan_result.errors.iter().map(|e| e.to_string()).collect();

        if scan_result.files.is_empty() {
            let error = SortError::NoInputFiles;
            events.send(Event::Pipeline(PipelineEvent::Error {
                message: error.to_string(),
            }));
            return Err(error);
        }

        let mut batch = Batch::from_files(scan_result.files);
        tracing::info!("{} media files in batch", batch.len());

        // Phases 2-3: dates, grouping and conflict resolution
        let mut checksums = ChecksumService::new();
        SortPlanner::prepare(
            &mut batch,
            &self.config.destination,
            self.extractor.as_ref(),
            self.clock.as_ref(),
            &mut checksums,
            events,
        );

        let plan = SortPlanner::plan(&batch);
        let mut failures: Vec<ItemFailure> = plan
            .files
            .iter()
            .filter_map(|f| {
                f.failure.as_ref().map(|message| ItemFailure {
                    path: f.source.clone(),
                    message: message.clone(),
                })
            })
            .collect();

        // Phase 4: Moving
        let moves = if self.config.dry_run {
            None
        } else {
            enter(PipelinePhase::Moving);
            let report = MoveExecutor::execute(
                &batch,
                self.mover.as_ref(),
                self.archiver.as_deref(),
                events,
            );
            failures.extend(report.errors.iter().cloned());
            Some(report)
        };

        let report = SortReport {
            plan,
            moves,
            scan_errors,
            failures,
            duration_ms: start_time.elapsed().as_millis() as u64,
        };

        events.send(Event::Pipeline(PipelineEvent::Completed {
            summary: report.summary(),
        }));

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::CaptureTime;
    use crate::core::organize::Decision;
    use crate::events::{EventChannel, MoveEvent, ResolveEvent};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    struct AllShotOn(&'static str);

    impl MetadataExtractor for AllShotOn {
        fn extract(&self, path: &Path) -> Option<CaptureTime> {
            let ext = path.extension()?.to_str()?.to_lowercase();
            (ext == "jpg").then(|| CaptureTime::new(self.0))
        }
    }

    fn write(dir: &Path, rel: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn empty_input_is_no_input_files() {
        let temp = TempDir::new().unwrap();
        let sorter = Sorter::builder()
            .paths(vec![temp.path().to_path_buf()])
            .recursive(true)
            .build();

        assert!(matches!(sorter.run(), Err(SortError::NoInputFiles)));
    }

    #[test]
    fn unsupported_files_only_is_no_input_files() {
        let temp = TempDir::new().unwrap();
        let txt = write(temp.path(), "notes.txt", b"hello");

        let sorter = Sorter::builder().paths(vec![txt]).build();

        assert!(matches!(sorter.run(), Err(SortError::NoInputFiles)));
    }

    #[test]
    fn pair_is_moved_together() {
        let temp = TempDir::new().unwrap();
        let jpg = write(temp.path(), "A/img.jpg", b"jpeg");
        let cr2 = write(temp.path(), "A/img.cr2", b"raw");
        let dest = temp.path().join("Photos");

        let report = Sorter::builder()
            .paths(vec![jpg.clone(), cr2.clone()])
            .destination(&dest)
            .extractor(Box::new(AllShotOn("2020:01:02 10:00:00")))
            .build()
            .run()
            .unwrap();

        assert_eq!(report.files_moved(), 2);
        assert!(report.failures.is_empty());
        assert!(dest.join("2020/1/2/img.jpg").exists());
        assert!(dest.join("2020/1/2/img.cr2").exists());
        assert!(!jpg.exists());
        assert!(!cr2.exists());
    }

    #[test]
    fn dry_run_touches_nothing() {
        let temp = TempDir::new().unwrap();
        let jpg = write(temp.path(), "A/img.jpg", b"jpeg");
        let dest = temp.path().join("Photos");

        let report = Sorter::builder()
            .paths(vec![jpg.clone()])
            .destination(&dest)
            .dry_run(true)
            .extractor(Box::new(AllShotOn("2020:01:02 10:00:00")))
            .build()
            .run()
            .unwrap();

        assert!(report.moves.is_none());
        assert_eq!(report.plan.to_move, 1);
        assert_eq!(report.plan.files[0].decision, Decision::Proceed);
        assert!(jpg.exists());
        assert!(!dest.exists());
    }

    #[test]
    fn events_cover_resolution_and_moves() {
        let temp = TempDir::new().unwrap();
        let a = write(temp.path(), "A/img.jpg", b"same");
        let b = write(temp.path(), "B/img.jpg", b"same");
        let (sender, receiver) = EventChannel::new();

        Sorter::builder()
            .paths(vec![a, b])
            .destination(temp.path().join("Photos"))
            .extractor(Box::new(AllShotOn("2020:01:02 10:00:00")))
            .build()
            .run_with_events(&sender)
            .unwrap();

        let events = receiver.drain();
        let duplicates = events
            .iter()
            .filter(|e| matches!(e, Event::Resolve(ResolveEvent::DuplicateSkipped { .. })))
            .count();
        let moved = events
            .iter()
            .filter(|e| matches!(e, Event::Move(MoveEvent::Moved { .. })))
            .count();
        assert_eq!(duplicates, 1);
        assert_eq!(moved, 1);
        assert!(matches!(
            events.last(),
            Some(Event::Pipeline(PipelineEvent::Completed { .. }))
        ));
    }

    #[test]
    fn every_phase_is_announced_once() {
        let temp = TempDir::new().unwrap();
        let jpg = write(temp.path(), "A/img.jpg", b"jpeg");
        let (sender, receiver) = EventChannel::new();

        Sorter::builder()
            .paths(vec![jpg])
            .destination(temp.path().join("Photos"))
            .extractor(Box::new(AllShotOn("2020:01:02 10:00:00")))
            .build()
            .run_with_events(&sender)
            .unwrap();

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
                PipelinePhase::Scanning,
                PipelinePhase::Dating,
                PipelinePhase::Grouping,
                PipelinePhase::Resolving,
                PipelinePhase::Moving
            ]
        );
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = SortConfig {
            paths: vec![PathBuf::from("Import")],
            par2_redundancy: Some(5),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: SortConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.destination, PathBuf::from("."));
        assert_eq!(back.par2_redundancy, Some(5));
    }
}
