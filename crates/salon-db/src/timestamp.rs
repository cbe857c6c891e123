//! Conversion between `DateTime<Utc>` and the INTEGER unix-millisecond
//! columns the ledger uses for instants.
//!
//! Every timestamp read from or written to SQLite goes through here; the
//! rest of the workspace only ever sees `DateTime<Utc>`.

use chrono::{DateTime, Utc};

use crate::error::{DbError, DbResult};

/// Column value for an instant.
#[inline]
pub fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

#[inline]
pub fn to_millis_opt(at: Option<DateTime<Utc>>) -> Option<i64> {
    at.map(to_millis)
}

/// Instant for a column value.
pub fn from_millis(millis: i64) -> DbResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| DbError::Serialization(format!("timestamp out of range: {millis}")))
}

pub fn from_millis_opt(millis: Option<i64>) -> DbResult<Option<DateTime<Utc>>> {
    millis.map(from_millis).transpose()
}
