//! Week window labels.
//!
//! The engine treats week labels as opaque strings; this module only
//! produces the default window callers pass to projection and reconcile.

use chrono::{Duration, NaiveDate};

/// Number of weeks shown by default.
pub const DEFAULT_WEEK_COUNT: usize = 12;

/// `chrono` format of a week label, e.g. `01-Jan`.
pub const WEEK_LABEL_FORMAT: &str = "%d-%b";

/// Returns labels for `start`, `start + 1 week`, ... (`count` labels).
///
/// The window stops early at the last representable date.
pub fn week_window(start: NaiveDate, count: usize) -> Vec<String> {
    (0..count)
        .map_while(|offset| {
            let step = Duration::try_weeks(i64::try_from(offset).ok()?)?;
            start.checked_add_signed(step)
        })
        .map(week_label)
        .collect()
}

/// Formats one date as a week label.
pub fn week_label(date: NaiveDate) -> String {
    date.format(WEEK_LABEL_FORMAT).to_string()
}
