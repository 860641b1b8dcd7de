//! Photo organization module.
//!
//! Files media into `year/month/day` folders by capture date, keeping RAW
//! and sidecar files with their primary and resolving name clashes across
//! the whole batch.

mod archive;
mod classifier;
mod executor;
mod grouper;
mod naming;
mod planner;
mod resolver;
mod types;

pub use archive::{Archiver, Par2Archiver};
pub use classifier::{classify, DateDir};
pub use executor::{FsMover, MoveExecutor, Mover};
pub use grouper::group;
pub use naming::increment;
pub use planner::SortPlanner;
pub use resolver::{Claims, ConflictResolver, Resolution, ResolveSummary, StepOutcome};
pub use types::*;
