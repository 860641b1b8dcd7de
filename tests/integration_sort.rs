//! Integration tests for a full sorting run.
//!
//! Capture times are injected through a fixed extractor so the tests do not
//! depend on real EXIF payloads.

use assert_fs::prelude::*;
use assert_fs::TempDir;
use photo_sorter::core::metadata::{CaptureTime, MetadataExtractor};
use photo_sorter::core::organize::{Decision, OperationMode};
use photo_sorter::core::pipeline::Sorter;
use photo_sorter::error::SortError;
use predicates::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Capture times keyed by file name
struct FixedExif(HashMap<String, String>);

impl FixedExif {
    fn boxed(entries: &[(&str, &str)]) -> Box<dyn MetadataExtractor> {
        Box::new(Self(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ))
    }
}

impl MetadataExtractor for FixedExif {
    fn extract(&self, path: &Path) -> Option<CaptureTime> {
        let name = path.file_name()?.to_str()?;
        self.0.get(name).map(CaptureTime::new)
    }
}

fn paths(temp: &TempDir, rels: &[&str]) -> Vec<PathBuf> {
    rels.iter().map(|r| temp.child(r).path().to_path_buf()).collect()
}

#[test]
fn jpeg_and_raw_pair_lands_in_one_day_folder() {
    let temp = TempDir::new().unwrap();
    temp.child("A/img.jpg").write_binary(b"jpeg").unwrap();
    temp.child("A/img.cr2").write_binary(b"raw").unwrap();

    let report = Sorter::builder()
        .paths(paths(&temp, &["A/img.jpg", "A/img.cr2"]))
        .destination(temp.child("Photos").path())
        .extractor(FixedExif::boxed(&[("img.jpg", "2020:01:02 10:11:12")]))
        .build()
        .run()
        .unwrap();

    assert_eq!(report.files_moved(), 2);
    assert_eq!(report.plan.dependents, 1);
    temp.child("Photos/2020/1/2/img.jpg")
        .assert(predicate::path::exists());
    temp.child("Photos/2020/1/2/img.cr2")
        .assert(predicate::path::exists());
    temp.child("A/img.jpg").assert(predicate::path::missing());
    temp.child("A/img.cr2").assert(predicate::path::missing());
}

#[test]
fn different_file_at_destination_gets_incremented_name() {
    let temp = TempDir::new().unwrap();
    temp.child("Photos/2020/1/2/img.jpg")
        .write_binary(b"older shot")
        .unwrap();
    temp.child("A/img.jpg").write_binary(b"new shot").unwrap();
    temp.child("A/img.cr2").write_binary(b"new raw").unwrap();

    let report = Sorter::builder()
        .paths(paths(&temp, &["A/img.jpg", "A/img.cr2"]))
        .destination(temp.child("Photos").path())
        .extractor(FixedExif::boxed(&[("img.jpg", "2020:01:02 10:11:12")]))
        .build()
        .run()
        .unwrap();

    assert_eq!(report.plan.renamed, 2);
    temp.child("Photos/2020/1/2/img.jpg").assert("older shot");
    temp.child("Photos/2020/1/2/img_(1).jpg").assert("new shot");
    temp.child("Photos/2020/1/2/img_(1).cr2").assert("new raw");
}

#[test]
fn identical_content_already_in_place_is_left_alone() {
    let temp = TempDir::new().unwrap();
    temp.child("Photos/2020/1/2/img.jpg")
        .write_binary(b"same bytes")
        .unwrap();
    temp.child("A/img.jpg").write_binary(b"same bytes").unwrap();
    temp.child("A/img.aae").write_binary(b"edits").unwrap();

    let report = Sorter::builder()
        .paths(paths(&temp, &["A/img.jpg", "A/img.aae"]))
        .destination(temp.child("Photos").path())
        .extractor(FixedExif::boxed(&[("img.jpg", "2020:01:02 10:11:12")]))
        .build()
        .run()
        .unwrap();

    assert_eq!(report.files_moved(), 0);
    assert_eq!(report.plan.duplicates, 2);
    assert!(report
        .plan
        .files
        .iter()
        .all(|f| f.decision == Decision::SkipDuplicate));
    temp.child("A/img.jpg").assert(predicate::path::exists());
    temp.child("A/img.aae").assert(predicate::path::exists());
    temp.child("Photos/2020/1/2/img.aae")
        .assert(predicate::path::missing());
}

#[test]
fn identical_raw_in_place_is_not_placed_twice() {
    let temp = TempDir::new().unwrap();
    temp.child("Photos/2020/1/2/img.cr2")
        .write_binary(b"raw")
        .unwrap();
    temp.child("A/img.jpg").write_binary(b"jpeg").unwrap();
    temp.child("A/img.cr2").write_binary(b"raw").unwrap();

    let report = Sorter::builder()
        .paths(paths(&temp, &["A/img.jpg", "A/img.cr2"]))
        .destination(temp.child("Photos").path())
        .extractor(FixedExif::boxed(&[("img.jpg", "2020:01:02 10:11:12")]))
        .build()
        .run()
        .unwrap();

    assert_eq!(report.plan.renamed, 0);
    assert_eq!(report.files_moved(), 1);
    temp.child("Photos/2020/1/2/img.jpg").assert("jpeg");
    temp.child("Photos/2020/1/2/img.cr2").assert("raw");
    temp.child("Photos/2020/1/2/img_(1).jpg")
        .assert(predicate::path::missing());
    temp.child("Photos/2020/1/2/img_(1).cr2")
        .assert(predicate::path::missing());
    temp.child("A/img.cr2").assert(predicate::path::exists());
}

#[test]
fn clashing_names_within_one_batch() {
    let temp = TempDir::new().unwrap();
    temp.child("A/img.jpg").write_binary(b"first").unwrap();
    temp.child("B/img.jpg").write_binary(b"second").unwrap();
    temp.child("C/img.jpg").write_binary(b"first").unwrap();

    let report = Sorter::builder()
        .paths(paths(&temp, &["A/img.jpg", "B/img.jpg", "C/img.jpg"]))
        .destination(temp.child("Photos").path())
        .extractor(FixedExif::boxed(&[("img.jpg", "2020:01:02 10:11:12")]))
        .build()
        .run()
        .unwrap();

    assert_eq!(report.files_moved(), 2);
    assert_eq!(report.plan.duplicates, 1);
    temp.child("Photos/2020/1/2/img.jpg").assert("first");
    temp.child("Photos/2020/1/2/img_(1).jpg").assert("second");
    temp.child("C/img.jpg").assert(predicate::path::exists());
}

#[test]
fn recursive_scan_expands_directories() {
    let temp = TempDir::new().unwrap();
    temp.child("Import/a.jpg").write_binary(b"a").unwrap();
    temp.child("Import/b.jpg").write_binary(b"b").unwrap();
    temp.child("Import/notes.txt").write_str("skip me").unwrap();
    temp.child("Import/nested/c.jpg").write_binary(b"c").unwrap();

    let report = Sorter::builder()
        .paths(paths(&temp, &["Import"]))
        .destination(temp.child("Photos").path())
        .recursive(true)
        .extractor(FixedExif::boxed(&[
            ("a.jpg", "2021:05:06 07:08:09"),
            ("b.jpg", "2021:05:07 07:08:09"),
            ("c.jpg", "2021:05:08 07:08:09"),
        ]))
        .build()
        .run()
        .unwrap();

    assert_eq!(report.plan.total_files, 2);
    temp.child("Photos/2021/5/6/a.jpg")
        .assert(predicate::path::exists());
    temp.child("Photos/2021/5/7/b.jpg")
        .assert(predicate::path::exists());
    temp.child("Import/nested/c.jpg")
        .assert(predicate::path::exists());
    temp.child("Import/notes.txt")
        .assert(predicate::path::exists());
}

#[test]
fn no_supported_files_is_an_error() {
    let temp = TempDir::new().unwrap();
    temp.child("notes.txt").write_str("hello").unwrap();
    temp.child("Import/a.jpg").write_binary(b"a").unwrap();

    // Directory without --recursive is ignored
    let result = Sorter::builder()
        .paths(paths(&temp, &["notes.txt", "Import"]))
        .destination(temp.child("Photos").path())
        .build()
        .run();

    let err = result.unwrap_err();
    assert!(matches!(err, SortError::NoInputFiles));
    assert!(predicate::str::contains("Please specify files to sort").eval(&err.to_string()));
    temp.child("Photos").assert(predicate::path::missing());
    temp.child("Import/a.jpg").assert(predicate::path::exists());
}

#[test]
fn dry_run_reports_without_moving() {
    let temp = TempDir::new().unwrap();
    temp.child("A/img.jpg").write_binary(b"jpeg").unwrap();

    let report = Sorter::builder()
        .paths(paths(&temp, &["A/img.jpg"]))
        .destination(temp.child("Photos").path())
        .dry_run(true)
        .extractor(FixedExif::boxed(&[("img.jpg", "2020:01:02 10:11:12")]))
        .build()
        .run()
        .unwrap();

    assert!(report.moves.is_none());
    assert_eq!(report.plan.to_move, 1);
    let destination = report.plan.files[0].destination.as_deref().unwrap();
    assert!(predicate::str::ends_with("img.jpg").eval(destination));
    temp.child("A/img.jpg").assert(predicate::path::exists());
    temp.child("Photos").assert(predicate::path::missing());
}

#[test]
fn copy_mode_keeps_originals_and_rerun_skips_everything() {
    let temp = TempDir::new().unwrap();
    temp.child("A/img.jpg").write_binary(b"jpeg").unwrap();
    temp.child("A/img.cr2").write_binary(b"raw").unwrap();

    let sorter = Sorter::builder()
        .paths(paths(&temp, &["A/img.jpg", "A/img.cr2"]))
        .destination(temp.child("Photos").path())
        .operation(OperationMode::Copy)
        .extractor(FixedExif::boxed(&[("img.jpg", "2020:01:02 10:11:12")]))
        .build();

    let first = sorter.run().unwrap();
    assert_eq!(first.files_moved(), 2);
    temp.child("A/img.jpg").assert(predicate::path::exists());
    temp.child("Photos/2020/1/2/img.jpg").assert("jpeg");

    let second = sorter.run().unwrap();
    assert_eq!(second.files_moved(), 0);
    assert_eq!(second.plan.duplicates, 2);
    temp.child("Photos/2020/1/2/img_(1).jpg")
        .assert(predicate::path::missing());
}

#[test]
fn unparseable_capture_time_leaves_group_in_place() {
    let temp = TempDir::new().unwrap();
    temp.child("A/bad.jpg").write_binary(b"bad").unwrap();
    temp.child("A/bad.cr2").write_binary(b"bad raw").unwrap();
    temp.child("A/good.jpg").write_binary(b"good").unwrap();

    let report = Sorter::builder()
        .paths(paths(&temp, &["A/bad.jpg", "A/bad.cr2", "A/good.jpg"]))
        .destination(temp.child("Photos").path())
        .extractor(FixedExif::boxed(&[
            ("bad.jpg", "garbage"),
            ("good.jpg", "2020:01:02 10:11:12"),
        ]))
        .build()
        .run()
        .unwrap();

    assert_eq!(report.files_moved(), 1);
    assert_eq!(report.failures.len(), 2);
    assert!(predicate::str::contains("garbage").eval(&report.failures[0].message));
    temp.child("A/bad.jpg").assert(predicate::path::exists());
    temp.child("A/bad.cr2").assert(predicate::path::exists());
    temp.child("Photos/2020/1/2/good.jpg")
        .assert(predicate::path::exists());
}

#[test]
fn missing_argument_is_reported_and_the_rest_is_sorted() {
    let temp = TempDir::new().unwrap();
    temp.child("A/img.jpg").write_binary(b"jpeg").unwrap();

    let report = Sorter::builder()
        .paths(paths(&temp, &["A/img.jpg", "A/gone.jpg"]))
        .destination(temp.child("Photos").path())
        .extractor(FixedExif::boxed(&[("img.jpg", "2020:01:02 10:11:12")]))
        .build()
        .run()
        .unwrap();

    assert_eq!(report.files_moved(), 1);
    assert_eq!(report.scan_errors.len(), 1);
    assert!(predicate::str::contains("gone.jpg").eval(&report.scan_errors[0]));
}
