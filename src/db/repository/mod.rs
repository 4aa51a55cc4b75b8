//! Repository layer — entity-scoped database operations.
//!
//! All public functions are re-exported here so callers can stay on
//! `db::repository::*` without caring about the split.

mod assignment;
mod mood;
mod session;
mod user;

use chrono::{DateTime, Duration, NaiveDate, Offset, SecondsFormat, TimeZone, Utc};

use super::DatabaseError;

pub use assignment::*;
pub use mood::*;
pub use session::*;
pub use user::*;

/// Fixed-width RFC 3339 with millisecond precision, always UTC, so
/// stored strings sort lexicographically in chronological order.
pub(crate) fn ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn parse_ts(raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad timestamp {raw:?}: {e}")))
}

/// Window covering one calendar day in the server's local timezone,
/// expressed in UTC. The end bound lands on 23:59:59.999 and is
/// exclusive, so an event stamped exactly there falls outside.
pub fn day_bounds_for(date: NaiveDate, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let offset = now.with_timezone(&chrono::Local).offset().fix();
    let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    let start = offset
        .from_local_datetime(&midnight)
        .single()
        .unwrap_or_else(|| offset.from_utc_datetime(&midnight))
        .with_timezone(&Utc);
    (start, start + Duration::milliseconds(86_399_999))
}

/// Today's window, local to the server.
pub fn local_day_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = now.with_timezone(&chrono::Local).date_naive();
    day_bounds_for(today, now)
}
