//! # Photo Sorter
//!
//! Sorts photos and videos into `year/month/day` folders by capture date.
//!
//! ## Core Philosophy
//! - **Never overwrite** - a name clash with different content gets a new name
//! - **Never duplicate** - a file whose exact content is already in place is skipped
//! - **Keep pairs together** - a RAW and its sidecar land side by side
//!
//! ## Architecture
//! The library is split into a core engine (GUI-agnostic) and presentation layers:
//! - `core` - Scanning, grouping, conflict resolution and moving
//! - `events` - Event-driven progress reporting (GUI-ready)
//! - `error` - User-friendly error types
//! - `cli` - Command-line interface (binary only)

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{Result, SortError};

/// Initialize tracing for the library
///
/// This should be called by the application entry point (CLI or GUI).
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default tracing subscriber");
}
