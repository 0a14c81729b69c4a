//! Response headers that keep CAPTCHA images out of every cache.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hyper::header::{CACHE_CONTROL, CONTENT_TYPE, ETAG, EXPIRES, LAST_MODIFIED, PRAGMA};
use http::response::Builder;
use rand::Rng;
use std::time::{SystemTime, UNIX_EPOCH};

/// An `Expires` value already in the past.
pub const EXPIRED_DATE: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Adds the no-cache header set plus `Content-Type`.
#[must_use]
pub fn no_cache(builder: Builder, content_type: &str) -> Builder {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    builder
        .header(CONTENT_TYPE, content_type)
        .header(EXPIRES, EXPIRED_DATE)
        .header(LAST_MODIFIED, http_date(now))
        .header(CACHE_CONTROL, "no-store, no-cache, must-revalidate")
        .header(CACHE_CONTROL, "post-check=0, pre-check=0")
        .header(CACHE_CONTROL, "max-age=0")
        .header(PRAGMA, "no-cache")
        .header(ETAG, new_etag())
}

/// Strong entity tag, unique per call.
#[must_use]
pub fn new_etag() -> String {
    let random_bytes: [u8; 16] = rand::rng().random();
    format!("\"{}\"", URL_SAFE_NO_PAD.encode(random_bytes))
}

/// Formats a unix timestamp as an IMF-fixdate.
#[must_use]
pub fn http_date(ts: u64) -> String {
    let days = ts / 86400;
    let seconds = ts % 86400;
    let (year, month, day) = date_from_days(days);
    let weekday = WEEKDAYS[usize::try_from((days + 4) % 7).unwrap_or(0)];
    let month = MONTHS[usize::from(month - 1)];
    let hour = seconds / 3600;
    let minute = (seconds % 3600) / 60;
    let second = seconds % 60;
    format!("{weekday}, {day:02} {month} {year:04} {hour:02}:{minute:02}:{second:02} GMT")
}

fn date_from_days(mut days: u64) -> (u64, u8, u8) {
    let mut year = 1970;
    loop {
        let is_leap = (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0);
        let year_days = if is_leap { 366 } else { 365 };
        if days < year_days {
            let days_in_month = [
                31,
                if is_leap { 29 } else { 28 },
                31,
                30,
                31,
                30,
                31,
                31,
                30,
                31,
                30,
                31,
            ];
            let mut month = 1;
            for &dim in &days_in_month {
                if days < dim {
                    return (year, month, u8::try_from(days + 1).unwrap_or(1));
                }
                days -= dim;
                month += 1;
            }
        }
        days -= year_days;
        year += 1;
    }
}
