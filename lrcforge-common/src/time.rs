//! Timestamp utilities

use crate::{Error, Result};
use chrono::{DateTime, Local, NaiveDate, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Today's date in the local timezone (used for the LRC `[by:]` tag)
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parse an RFC 3339 timestamp as stored in the ledger
pub fn parse_rfc3339(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::InvalidInput(format!("Bad timestamp '{}': {}", value, e)))
}
