//! # photo-sort CLI
//!
//! Command-line interface for the photo sorter.
//!
//! ## Usage
//! ```bash
//! photo-sort sort IMG_0001.JPG IMG_0001.CR2
//! photo-sort sort ~/Import -r --descend --dest ~/Photos --dry-run
//! ```

mod cli;

use std::process::ExitCode;

fn main() -> ExitCode {
    photo_sorter::init_tracing();

    match cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            ExitCode::FAILURE
        }
    }
}
