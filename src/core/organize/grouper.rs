//! Association grouping.
//!
//! A file with no trusted capture time of its own (a RAW without EXIF, an
//! `.aae` sidecar, ...) that sits next to a file with the same stem and a
//! trusted time becomes a *dependent* of that file. Dependents inherit the
//! primary's capture time now and its final destination and decision later.
//!
//! Two files that both carry trusted times are never grouped, even if their
//! dates disagree: each is filed independently.

use super::types::{Batch, ItemId};
use std::collections::HashMap;
use std::path::PathBuf;

/// Populate `associate_of`/`associates` across the whole batch.
///
/// Returns the number of newly attached dependents. Running it again on an
/// already grouped batch attaches nothing.
pub fn group(batch: &mut Batch) -> usize {
    // Trusted items by (dir, stem), in scan order
    let mut owners: HashMap<(PathBuf, String), Vec<ItemId>> = HashMap::new();
    for (id, item) in batch.iter() {
        if item.has_trusted_time() {
            owners
                .entry((item.source_dir.clone(), item.stem.clone()))
                .or_default()
                .push(id);
        }
    }

    let mut links = Vec::new();
    for (id, item) in batch.iter() {
        if item.has_trusted_time() || item.is_dependent() {
            continue;
        }
        let key = (item.source_dir.clone(), item.stem.clone());
        let primary = owners.get(&key).and_then(|candidates| {
            candidates
                .iter()
                .copied()
                .find(|p| batch.get(*p).shares_stem_with(item))
        });
        if let Some(primary) = primary {
            links.push((id, primary));
        }
    }

    for &(dependent, primary) in &links {
        tracing::debug!(
            "{} grouped with {}",
            batch.get(dependent).source_path.display(),
            batch.get(primary).source_path.display()
        );
        batch.attach(dependent, primary);
    }

    links.len()
}
