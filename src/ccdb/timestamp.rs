//! Loose date/time parsing for constant set timestamps.
//!
//! Accepts `YYYY[MM[DD]][hh[mm[ss]]]` with at most one arbitrary
//! non-digit separator between fields: `2013`, `2013-05`,
//! `2013-05-12 15:30`, `20130512153000` all parse. Missing fields default
//! to the end of the period, so `2013` means the last second of 2013.

use std::sync::OnceLock;

use chrono::{Local, NaiveDate, TimeZone};
use regex::Regex;

fn timestamp_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(\d{4})(?:[^\d]?(\d{2})(?:[^\d]?(\d{2}))?)?[^\d]?(?:(\d{2})(?:[^\d]?(\d{2})(?:[^\d]?(\d{2}))?)?)?$",
        )
        .expect("timestamp regex is valid")
    })
}

fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
    let (ny, nm) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let first_next = NaiveDate::from_ymd_opt(ny, nm, 1)?;
    first_next.pred_opt().map(|d| chrono::Datelike::day(&d))
}

/// Parse `input` as local time and return seconds since the epoch.
///
/// Returns 0 when the input does not match or names an invalid date.
pub fn parse_timestamp(input: &str) -> i64 {
    let Some(caps) = timestamp_regex().captures(input) else {
        return 0;
    };
    let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());

    let Some(year) = caps.get(1).and_then(|m| m.as_str().parse::<i32>().ok()) else {
        return 0;
    };

    let mut month = 12;
    let mut day = None;
    let (mut hour, mut minute, mut second) = (23, 59, 59);

    // each field only counts when every coarser field is present
    if let Some(m) = field(2) {
        month = m;
        if let Some(d) = field(3) {
            day = Some(d);
            if let Some(h) = field(4) {
                hour = h;
                if let Some(mi) = field(5) {
                    minute = mi;
                    if let Some(s) = field(6) {
                        second = s;
                    }
                }
            }
        }
    }

    if !(1..=12).contains(&month) {
        return 0;
    }
    let Some(day) = day.or_else(|| last_day_of_month(year, month)) else {
        return 0;
    };

    let Some(naive) = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, second))
    else {
        return 0;
    };

    Local
        .from_local_datetime(&naive)
        .earliest()
        .map_or(0, |dt| dt.timestamp())
}
