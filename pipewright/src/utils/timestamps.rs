//! Wall-clock helpers for event timestamps.

use chrono::{DateTime, TimeZone, Utc};

/// Represents a timestamp that can be serialized/deserialized.
pub type Timestamp = DateTime<Utc>;

/// Returns the current wall-clock time as milliseconds since the Unix epoch.
///
/// Every lifecycle event is stamped with this value at creation.
///
/// # Examples
///
/// ```
/// use pipewright::utils::epoch_millis;
///
/// let first = epoch_millis();
/// let second = epoch_millis();
/// assert!(second >= first);
/// ```
#[must_use]
pub fn epoch_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Converts epoch milliseconds back into a UTC timestamp.
///
/// Returns `None` when the value is outside chrono's representable range.
#[must_use]
pub fn from_epoch_millis(millis: i64) -> Option<Timestamp> {
    Utc.timestamp_millis_opt(millis).single()
}
