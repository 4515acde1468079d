//! Human-readable publication dates in Mongolian long form.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

/// Format an ISO-8601 timestamp as `"{year} оны {month}-р сарын {day}"`.
///
/// A missing timestamp renders as an empty string (unpublished drafts);
/// input that does not parse is shown verbatim rather than dropped.
pub fn format_date_mn(iso: Option<&str>) -> String {
    let iso = match iso.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => return String::new(),
    };

    let date = DateTime::parse_from_rfc3339(iso)
        .map(|dt| dt.date_naive())
        .or_else(|_| NaiveDateTime::parse_from_str(iso, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.date()))
        .or_else(|_| NaiveDate::parse_from_str(iso, "%Y-%m-%d"));

    match date {
        Ok(d) => format!("{} оны {}-р сарын {}", d.year(), d.month(), d.day()),
        Err(_) => iso.to_string(),
    }
}
