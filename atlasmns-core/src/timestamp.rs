//! Microsecond timestamp conversion.
//!
//! The agent stamps measurements with microsecond precision, and the two
//! result stores must agree on that precision exactly. Timestamps cross the
//! store boundary as integer microseconds since the Unix epoch.

use chrono::{DateTime, Utc};

/// Convert a timestamp to integer microseconds since the Unix epoch.
pub fn to_unix_microseconds(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_micros()
}

/// Convert integer microseconds since the Unix epoch back to a timestamp.
/// Returns `None` for values outside the representable range.
pub fn from_unix_microseconds(us: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_micros(us)
}
