//! Date normalization for Spanish documents.
//!
//! Accepts `DD/MM/YYYY`, `DD-MM-YYYY`, `DD.MM.YYYY` and ISO `YYYY-MM-DD`;
//! always outputs ISO.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref DATE_DMY: Regex = Regex::new(r"^(\d{1,2})[./\-](\d{1,2})[./\-](\d{4}|\d{2})$").unwrap();
    static ref DATE_ISO: Regex = Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").unwrap();
}

/// Normalize a date string. Returns `None` for anything unparsable; the
/// caller decides whether that becomes a doubt.
pub fn normalize_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();

    if let Some(caps) = DATE_ISO.captures(input) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Some(caps) = DATE_DMY.captures(input) {
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let year = parse_year(&caps[3]);
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    None
}

/// Render a date as ISO `YYYY-MM-DD`.
pub fn to_iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_year(s: &str) -> i32 {
    let year: i32 = s.parse().unwrap_or(0);
    if year < 100 {
        // Two-digit year: assume 2000s for 00-50, 1900s for 51-99.
        if year <= 50 {
            2000 + year
        } else {
            1900 + year
        }
    } else {
        year
    }
}
