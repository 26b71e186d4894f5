//! Human-readable message timestamps.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::fmt;

/// Render a message timestamp relative to `now`, in `now`'s time zone.
///
/// - younger than a minute (or in the future): `just now`
/// - younger than a day: `03:05PM`
/// - older: `01/31/2024 03:05PM`
pub fn format_timestamp<Tz>(timestamp_ms: i64, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let Some(at) = DateTime::<Utc>::from_timestamp_millis(timestamp_ms) else {
        return timestamp_ms.to_string();
    };
    let age = now.clone().signed_duration_since(at);
    let local = at.with_timezone(&now.timezone());

    if age > Duration::hours(24) {
        local.format("%m/%d/%Y %I:%M%p").to_string()
    } else if age > Duration::minutes(1) {
        local.format("%I:%M%p").to_string()
    } else {
        "just now".to_string()
    }
}
