//! # CLI Module
//!
//! Command-line interface for the photo sorter.
//!
//! ## Usage
//! ```bash
//! # Sort two files into ./year/month/day
//! photo-sort sort IMG_0001.JPG IMG_0001.CR2
//!
//! # Sort a whole import folder into ~/Photos
//! photo-sort sort ~/Import --recursive --descend --dest ~/Photos
//!
//! # See what would happen
//! photo-sort sort ~/Import -r --dry-run
//!
//! # JSON output
//! photo-sort sort ~/Import -r --output json
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use photo_sorter::core::organize::{Decision, OperationMode, PlannedFile};
use photo_sorter::core::pipeline::{SortReport, Sorter};
use photo_sorter::error::{Result, SortError};
use photo_sorter::events::{Event, EventChannel, MoveEvent, PipelineEvent, ResolveEvent, ScanEvent};
use std::path::{Path, PathBuf};
use std::thread;

/// Photo Sorter - File photos and videos by the day they were taken
#[derive(Parser, Debug)]
#[command(name = "photo-sort")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Move media files into year/month/day folders
    Sort {
        /// Files (and, with --recursive, directories) to sort
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Root of the date hierarchy
        #[arg(short, long, default_value = ".")]
        dest: PathBuf,

        /// Expand directories given as arguments
        #[arg(short, long)]
        recursive: bool,

        /// With --recursive, walk into subdirectories too
        #[arg(long, requires = "recursive")]
        descend: bool,

        /// Copy instead of move
        #[arg(long)]
        copy: bool,

        /// Show the plan without touching any file
        #[arg(long)]
        dry_run: bool,

        /// Write a par2 recovery archive next to each moved file
        #[arg(long)]
        par2: bool,

        /// par2 redundancy in percent
        #[arg(long, default_value = "10", requires = "par2")]
        redundancy: u8,

        /// Include hidden files
        #[arg(long)]
        include_hidden: bool,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// Minimal output (destinations only)
    Minimal,
}

struct SortArgs {
    paths: Vec<PathBuf>,
    dest: PathBuf,
    recursive: bool,
    descend: bool,
    copy: bool,
    dry_run: bool,
    par2: Option<u8>,
    include_hidden: bool,
    output: OutputFormat,
    verbose: bool,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Sort {
            paths,
            dest,
            recursive,
            descend,
            copy,
            dry_run,
            par2,
            redundancy,
            include_hidden,
            output,
            verbose,
        } => run_sort(SortArgs {
            paths,
            dest,
            recursive,
            descend,
            copy,
            dry_run,
            par2: par2.then_some(redundancy),
            include_hidden,
            output,
            verbose,
        }),
    }
}

fn run_sort(args: SortArgs) -> Result<()> {
    let term = Term::stderr();
    let pretty = matches!(args.output, OutputFormat::Pretty);

    if pretty {
        term.write_line(&format!(
            "{} {}",
            style("Photo Sorter").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line("").ok();
    }

    if args.dest.exists() && !args.dest.is_dir() {
        return Err(SortError::Config(format!(
            "Destination {} is not a directory",
            args.dest.display()
        )));
    }

    let mut builder = Sorter::builder()
        .paths(args.paths)
        .destination(args.dest)
        .recursive(args.recursive)
        .descend(args.descend)
        .include_hidden(args.include_hidden)
        .operation(if args.copy {
            OperationMode::Copy
        } else {
            OperationMode::Move
        })
        .dry_run(args.dry_run);

    if let Some(redundancy) = args.par2 {
        builder = builder.par2(redundancy);
    }

    let sorter = builder.build();

    // Set up event handling
    let (sender, receiver) = EventChannel::new();

    // Progress bar for pretty output
    let progress = if pretty {
        let pb = ProgressBar::new(0);
        if let Ok(bar_style) =
            ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(bar_style.progress_chars("█▓░"));
        }
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();
    let verbose = args.verbose;

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        let Some(pb) = progress_clone else {
            for _ in receiver.iter() {}
            return;
        };

        for event in receiver.iter() {
            match event {
                Event::Pipeline(PipelineEvent::PhaseChanged { phase }) => {
                    pb.set_position(0);
                    pb.set_message(format!("{}", phase));
                }
                Event::Scan(ScanEvent::Completed { total_files }) => {
                    pb.set_length(total_files as u64);
                }
                Event::Resolve(ResolveEvent::Started { total_primaries }) => {
                    pb.set_length(total_primaries as u64);
                }
                Event::Resolve(
                    ResolveEvent::Accepted { source, .. }
                    | ResolveEvent::DuplicateSkipped { source, .. }
                    | ResolveEvent::Failed { source, .. },
                ) => {
                    pb.inc(1);
                    if verbose {
                        pb.set_message(file_name(&source));
                    }
                }
                Event::Move(MoveEvent::Started { total_files }) => {
                    pb.set_length(total_files as u64);
                }
                Event::Move(
                    MoveEvent::Moved { source, .. } | MoveEvent::Failed { source, .. },
                ) => {
                    pb.inc(1);
                    if verbose {
                        pb.set_message(file_name(&source));
                    }
                }
                Event::Pipeline(PipelineEvent::Completed { .. } | PipelineEvent::Error { .. }) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
    });

    // Run the sorter
    let result = sorter.run_with_events(&sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();

    let report = result?;

    match args.output {
        OutputFormat::Pretty => print_pretty_results(&term, &report, args.verbose),
        OutputFormat::Json => print_json_results(&report)?,
        OutputFormat::Minimal => print_minimal_results(&report),
    }

    Ok(())
}

fn print_pretty_results(term: &Term, report: &SortReport, verbose: bool) {
    let dry_run = report.moves.is_none();

    // One line per file, the way files are reported while moving
    for file in &report.plan.files {
        let Some(destination) = &file.destination else {
            continue;
        };
        match file.decision {
            Decision::Proceed if file.failure.is_none() && !moved_failed(report, file) => {
                let arrow = if dry_run {
                    style("-->").dim()
                } else {
                    style("-->").green()
                };
                term.write_line(&format!(
                    "{} {} {}",
                    display_path(Path::new(&file.source)),
                    arrow,
                    display_path(Path::new(destination))
                ))
                .ok();
                if verbose {
                    print_file_details(term, file);
                }
            }
            Decision::SkipDuplicate => {
                term.write_line(&format!(
                    "{} {} {}",
                    style("=").yellow(),
                    display_path(Path::new(&file.source)),
                    style(duplicate_note(file)).dim()
                ))
                .ok();
            }
            _ => {}
        }
    }

    term.write_line("").ok();
    term.write_line(&format!(
        "{} {}",
        style("✓").green().bold(),
        if dry_run {
            "Dry Run Complete"
        } else {
            "Sort Complete"
        }
    ))
    .ok();
    term.write_line("").ok();

    // Summary
    term.write_line(&format!(
        "  {} files in {:.1}s",
        style(report.plan.total_files).cyan(),
        report.duration_ms as f64 / 1000.0
    ))
    .ok();

    if dry_run {
        term.write_line(&format!(
            "  {} files would be moved",
            style(report.plan.to_move).cyan()
        ))
        .ok();
    } else {
        term.write_line(&format!(
            "  {} files moved",
            style(report.files_moved()).cyan()
        ))
        .ok();
    }

    term.write_line(&format!(
        "  {} renamed to avoid a clash",
        style(report.plan.renamed).cyan()
    ))
    .ok();

    term.write_line(&format!(
        "  {} duplicates left in place",
        style(report.plan.duplicates).yellow()
    ))
    .ok();

    if let Some(moves) = &report.moves {
        if moves.archives_created > 0 {
            term.write_line(&format!(
                "  {} par2 archives written",
                style(moves.archives_created).dim()
            ))
            .ok();
        }
    }

    // Problems
    if !report.scan_errors.is_empty() || !report.failures.is_empty() {
        term.write_line("").ok();
        term.write_line(&format!("{}", style("Problems:").bold().underlined()))
            .ok();
        for message in &report.scan_errors {
            term.write_line(&format!("  {} {}", style("!").yellow(), message))
                .ok();
        }
        for failure in &report.failures {
            term.write_line(&format!(
                "  {} {}: {}",
                style("✗").red(),
                display_path(Path::new(&failure.path)),
                failure.message
            ))
            .ok();
        }
    }

    if let Some(moves) = &report.moves {
        for warning in &moves.archive_warnings {
            term.write_line(&format!("  {} {}", style("!").yellow(), warning))
                .ok();
        }
    }

    if dry_run {
        term.write_line("").ok();
        term.write_line(&format!(
            "{}",
            style("Dry run: no files were moved.").dim()
        ))
        .ok();
    }
}

fn print_file_details(term: &Term, file: &PlannedFile) {
    if let Some(time) = &file.capture_time {
        let source = match file.time_source {
            Some(source) => format!(" ({:?})", source),
            None => String::new(),
        };
        term.write_line(&format!(
            "    {}",
            style(format!("taken {}{}", time, source)).dim()
        ))
        .ok();
    }
    if let Some(primary) = &file.grouped_with {
        term.write_line(&format!(
            "    {}",
            style(format!("grouped with {}", display_path(Path::new(primary)))).dim()
        ))
        .ok();
    }
    if file.renamed {
        term.write_line(&format!(
            "    {}",
            style(format!("renamed to {}", file.filename)).dim()
        ))
        .ok();
    }
}

fn print_json_results(report: &SortReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| SortError::Config(format!("Failed to serialize report: {}", e)))?;
    println!("{}", json);
    Ok(())
}

fn print_minimal_results(report: &SortReport) {
    for file in &report.plan.files {
        if file.decision == Decision::Proceed
            && file.failure.is_none()
            && !moved_failed(report, file)
        {
            if let Some(destination) = &file.destination {
                println!("{}", destination);
            }
        }
    }
}

/// Why a skipped file stays where it is
fn duplicate_note(file: &PlannedFile) -> String {
    match (&file.duplicate_of, &file.grouped_with) {
        (Some(existing), _) => format!("is already at {}", display_path(Path::new(existing))),
        (None, Some(primary)) => format!(
            "stays with {}, which is already in place",
            display_path(Path::new(primary))
        ),
        (None, None) => "is already in place".to_string(),
    }
}

/// The move phase left this file in place
fn moved_failed(report: &SortReport, file: &PlannedFile) -> bool {
    report
        .moves
        .as_ref()
        .is_some_and(|m| m.errors.iter().any(|e| e.path == file.source))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned()
}

fn display_path(path: &Path) -> String {
    let home = dirs::home_dir().unwrap_or_default();
    match path.strip_prefix(&home) {
        Ok(rest) if !home.as_os_str().is_empty() => format!("~/{}", rest.display()),
        _ => path.display().to_string(),
    }
}
