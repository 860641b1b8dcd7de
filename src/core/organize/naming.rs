//! Collision renaming: `IMG_0001` -> `IMG_0001_(1)` -> `IMG_0001_(2)` ...

use regex::Regex;
use std::sync::OnceLock;

fn counter_suffix() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)^(.*)_\((\d+)\)$").expect("valid counter pattern"))
}

/// Next candidate stem after a name clash.
///
/// A stem already ending in `_(n)` with `n >= 1` has its counter bumped,
/// anything else gets `_(1)` appended. The result always differs from the
/// input, which is what guarantees the resolver's retry loop makes progress.
pub fn increment(stem: &str) -> String {
    if let Some(caps) = counter_suffix().captures(stem) {
        let next = caps[2]
            .parse::<u64>()
            .ok()
            .filter(|n| *n >= 1)
            .and_then(|n| n.checked_add(1));
        if let Some(next) = next {
            return format!("{}_({})", &caps[1], next);
        }
    }
    format!("{}_(1)", stem)
}
