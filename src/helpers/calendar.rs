use chrono::{Datelike, NaiveDate, Weekday};

use crate::error::{BalanceError, Result};

pub fn is_business_day(day: NaiveDate) -> bool {
    !matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
}

/// `(iso_year, iso_week)`; late December dates can belong to week 1 of the
/// following year.
pub fn iso_week_key(day: NaiveDate) -> (i32, u32) {
    let week = day.iso_week();
    (week.year(), week.week())
}

pub fn parse_iso_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| BalanceError::malformed(raw, format!("expected YYYY-MM-DD date: {e}")))
}

pub fn to_human_date(day: NaiveDate) -> String {
    day.format("%d.%m.%Y").to_string()
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
