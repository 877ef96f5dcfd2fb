use chrono::{Datelike, Months, NaiveDate, Weekday};

use crate::error::{BalanceError, Result};
use crate::models::report::SalaryCountdown;

pub fn validate_salary_day(day: u32) -> Result<u32> {
    if (1..=31).contains(&day) {
        Ok(day)
    } else {
        Err(BalanceError::malformed(
            day.to_string(),
            "salary day must be a day of month between 1 and 31",
        ))
    }
}

/// Salary day of the month `date` falls in, clamped to the month's length.
fn salary_day_in_month(date: NaiveDate, salary_day: u32) -> Option<NaiveDate> {
    let first = date.with_day(1)?;
    let last = first.checked_add_months(Months::new(1))?.pred_opt()?;
    first.with_day(salary_day.min(last.day()))
}

/// Payday before any weekend shift. This month's payday applies while
/// today's day of month is before `salary_day`.
pub fn scheduled_salary_date(today: NaiveDate, salary_day: u32) -> Result<NaiveDate> {
    let salary_day = validate_salary_day(salary_day)?;
    let out_of_range = || BalanceError::malformed(today.to_string(), "date out of supported range");

    if today.day() < salary_day {
        return salary_day_in_month(today, salary_day).ok_or_else(out_of_range);
    }

    let next_month = today
        .with_day(1)
        .and_then(|first| first.checked_add_months(Months::new(1)))
        .ok_or_else(out_of_range)?;
    salary_day_in_month(next_month, salary_day).ok_or_else(out_of_range)
}

/// Saturday paydays move to Friday, Sunday paydays to Monday.
pub fn next_salary_date(today: NaiveDate, salary_day: u32) -> Result<NaiveDate> {
    let scheduled = scheduled_salary_date(today, salary_day)?;
    let shifted = match scheduled.weekday() {
        Weekday::Sat => scheduled.pred_opt(),
        Weekday::Sun => scheduled.succ_opt(),
        _ => Some(scheduled),
    };
    shifted.ok_or_else(|| BalanceError::malformed(scheduled.to_string(), "date out of supported range"))
}

pub fn salary_countdown(today: NaiveDate, salary_day: u32) -> Result<SalaryCountdown> {
    let scheduled_date = scheduled_salary_date(today, salary_day)?;
    let payout_date = next_salary_date(today, salary_day)?;
    Ok(SalaryCountdown {
        scheduled_date,
        payout_date,
        days_remaining: (payout_date - today).num_days(),
    })
}
