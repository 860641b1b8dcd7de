//! Capture time -> `year/month/day` folder.

use crate::core::metadata::CaptureTime;
use crate::error::InvalidTimestamp;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Calendar date a file is filed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateDir {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl DateDir {
    /// Relative folder, e.g. `2020/1/2`
    pub fn relative_path(&self) -> PathBuf {
        [
            self.year.to_string(),
            self.month.to_string(),
            self.day.to_string(),
        ]
        .iter()
        .collect()
    }
}

impl std::fmt::Display for DateDir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.year, self.month, self.day)
    }
}

/// Derive the date folder from a capture time.
///
/// Accepts `YYYY:MM:DD HH:MM:SS` (EXIF) and `YYYY-MM-DD ...`, optionally
/// quoted. Numbers are written without zero padding so the folder names are
/// plain integers. Anything that is not a real date, including the
/// `0000:00:00 00:00:00` placeholder some cameras write, is rejected.
pub fn classify(time: &CaptureTime) -> Result<DateDir, InvalidTimestamp> {
    let invalid = || InvalidTimestamp(time.as_str().to_string());

    let raw = time.as_str().trim().trim_matches('"');
    let date_part = raw.split_whitespace().next().ok_or_else(invalid)?;

    let mut parts = date_part.split([':', '-']);
    let mut next_number = || -> Option<u32> { parts.next()?.trim().parse().ok() };
    let year = next_number().ok_or_else(invalid)?;
    let month = next_number().ok_or_else(invalid)?;
    let day = next_number().ok_or_else(invalid)?;

    let date = i32::try_from(year)
        .ok()
        .and_then(|y| NaiveDate::from_ymd_opt(y, month, day))
        .filter(|d| d.year() > 0)
        .ok_or_else(invalid)?;

    Ok(DateDir {
        year: date.year(),
        month: date.month(),
        day: date.day(),
    })
}
