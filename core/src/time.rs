//! Time related utils.

use chrono::Utc;

/// The datetime used by reqpoll, always in UTC.
pub type DateTime = chrono::DateTime<Utc>;

/// Current UTC time.
pub fn now() -> DateTime {
    Utc::now()
}

/// Current Unix timestamp in seconds.
pub fn unix_timestamp() -> i64 {
    now().timestamp()
}

/// Date format used in credential scope: "20220313".
pub fn format_date(t: DateTime) -> String {
    t.format("%Y%m%d").to_string()
}

/// ISO 8601 basic format used in `x-date`: "20220313T072004Z".
pub fn format_iso8601(t: DateTime) -> String {
    t.format("%Y%m%dT%H%M%SZ").to_string()
}
