//! Broadcast time formatting shared by the text and JSON reports.

use chrono::NaiveDateTime;
use serde::Serializer;

/// Whole-second broadcast time, e.g. `2022-12-14 19:00:05`.
pub const SECONDS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Millisecond broadcast time, e.g. `2022-12-14 19:00:05.123`.
pub const MILLIS_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

pub fn seconds(time: &NaiveDateTime) -> String {
    time.format(SECONDS_FORMAT).to_string()
}

pub fn millis(time: &NaiveDateTime) -> String {
    time.format(MILLIS_FORMAT).to_string()
}

pub(crate) fn serialize_seconds<S: Serializer>(
    time: &NaiveDateTime,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&time.format(SECONDS_FORMAT))
}

pub(crate) fn serialize_millis<S: Serializer>(
    time: &NaiveDateTime,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&time.format(MILLIS_FORMAT))
}
