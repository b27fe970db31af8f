//! Long-form Indonesian dates for image listings.

use chrono::{DateTime, Datelike, Utc};

const MONTHS: [&str; 12] = [
    "Januari",
    "Februari",
    "Maret",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Agustus",
    "September",
    "Oktober",
    "November",
    "Desember",
];

/// Render an RFC 3339 timestamp as `18 Oktober 2026` (UTC date).
///
/// Unparseable input is returned unchanged.
pub fn long_date_id(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => {
            let date = ts.with_timezone(&Utc).date_naive();
            let month = MONTHS[date.month0() as usize];
            format!("{} {month} {}", date.day(), date.year())
        }
        Err(_) => raw.to_string(),
    }
}
