//! Calendar helpers: "today" in a configured zone and month arithmetic.

use anyhow::Result;
use chrono::{Datelike, Local, NaiveDate, Utc};
use chrono_tz::Tz;

/// Today's date in an IANA zone like "Asia/Kolkata".
pub fn today_in(tz: &str) -> Result<NaiveDate> {
    let tz: Tz = tz
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid timezone: {tz}"))?;
    Ok(Utc::now().with_timezone(&tz).date_naive())
}

/// Today's date using the platform's local zone.
pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Today in `tz` when given, otherwise the platform's local date.
pub fn session_today(tz: Option<&str>) -> Result<NaiveDate> {
    match tz {
        Some(tz) => today_in(tz),
        None => Ok(local_today()),
    }
}

/// Move `(year, month)` by `delta` months.
pub fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let idx = year * 12 + (month as i32 - 1) + delta;
    (idx.div_euclid(12), (idx.rem_euclid(12) + 1) as u32)
}

/// First and last day of a calendar month.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let (ny, nm) = shift_month(year, month, 1);
    let last = NaiveDate::from_ymd_opt(ny, nm, 1)?.pred_opt()?;
    Some((first, last))
}

/// Bounds of the month containing `date`.
pub fn month_of(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = date.with_day(1).unwrap_or(date);
    let last = month_bounds(date.year(), date.month())
        .map(|(_, l)| l)
        .unwrap_or(date);
    (first, last)
}

/// Parse a calendar date from "YYYY-MM-DD" or a timestamp starting with one.
pub fn parse_calendar_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let head = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}
