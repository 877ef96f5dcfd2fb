//! Balancing logged hours against the quota schedule.
//!
//! Two aggregation modes exist. [`by_day`] walks the calendar and is the
//! default; [`by_week`] buckets entries per ISO week and is kept for
//! compatibility with balances computed the old way.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::error::{BalanceError, Result};
use crate::helpers::calendar::{is_business_day, iso_week_key, round2};
use crate::helpers::quota::QuotaSchedule;
use crate::models::harvest::TimeEntry;
use crate::models::report::{Mode, Reconciliation, WeekSummary};

/// Contract constants the balance is computed against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkingHours {
    pub per_day: f64,
    pub per_week: f64,
}

impl WorkingHours {
    pub fn new(per_day: f64, per_week: f64) -> Result<Self> {
        for (name, value) in [("WORK_DAY_HOURS", per_day), ("WORK_WEEK_HOURS", per_week)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(BalanceError::malformed(
                    value.to_string(),
                    format!("{name} must be a positive number of hours"),
                ));
            }
        }
        Ok(Self { per_day, per_week })
    }
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            per_day: 8.4,
            per_week: 42.0,
        }
    }
}

pub fn reconcile(
    mode: Mode,
    entries: &[TimeEntry],
    schedule: &QuotaSchedule,
    hours: WorkingHours,
    today: NaiveDate,
) -> Result<Reconciliation> {
    if let Some(first) = entries.iter().map(|entry| entry.spent_date).min() {
        schedule.check_covers(first)?;
    }

    match mode {
        Mode::Day => by_day(entries, schedule, hours, today),
        Mode::Week => by_week(entries, schedule, hours, today),
    }
}

/// Owed hours are accumulated per business day from the first quota date
/// through `today` inclusive.
pub fn by_day(
    entries: &[TimeEntry],
    schedule: &QuotaSchedule,
    hours: WorkingHours,
    today: NaiveDate,
) -> Result<Reconciliation> {
    let mut cursor = schedule.cursor();
    let mut hours_should_work = 0.0;
    let mut business_days = 0u32;

    for day in schedule.earliest().iter_days().take_while(|day| *day <= today) {
        let quota = cursor.advance_to(day)?;
        if is_business_day(day) {
            business_days += 1;
            hours_should_work += hours.per_day * quota;
        }
    }
    debug!(
        "Counted {} business days since {}",
        business_days,
        schedule.earliest()
    );

    let hours_worked: f64 = entries
        .iter()
        .filter(|entry| entry.spent_date <= today)
        .map(|entry| entry.hours)
        .sum();

    let current_quota = current_quota(schedule, today)?;
    Ok(summarize(
        Mode::Day,
        round2(hours_should_work),
        hours_worked,
        current_quota,
        hours,
        None,
    ))
}

#[derive(Debug, Default)]
struct WeekBucket {
    worked: f64,
    owed: f64,
    delta: f64,
}

/// Legacy weekly balance. Each ISO week owes `per_week × quota`, where the
/// quota is the one in effect on the latest entry of that week.
pub fn by_week(
    entries: &[TimeEntry],
    schedule: &QuotaSchedule,
    hours: WorkingHours,
    today: NaiveDate,
) -> Result<Reconciliation> {
    // Older revisions relied on the API order here, which attributed
    // quotas to the wrong weeks.
    let mut sorted: Vec<&TimeEntry> = entries
        .iter()
        .filter(|entry| entry.spent_date <= today)
        .collect();
    sorted.sort_by_key(|entry| (entry.spent_date, entry.id));

    let mut cursor = schedule.cursor();
    let mut buckets: BTreeMap<(i32, u32), WeekBucket> = BTreeMap::new();

    for entry in sorted {
        let quota = cursor.advance_to(entry.spent_date)?;
        let bucket = buckets.entry(iso_week_key(entry.spent_date)).or_default();
        bucket.worked += entry.hours;
        bucket.owed = hours.per_week * quota;
        bucket.delta = bucket.owed - bucket.worked;
    }

    let hours_worked: f64 = buckets.values().map(|bucket| bucket.worked).sum();
    let hours_should_work: f64 = buckets.values().map(|bucket| bucket.owed).sum();
    let weeks_count = buckets.len();
    let average_hours_per_week = if weeks_count == 0 {
        0.0
    } else {
        round2(hours_worked / weeks_count as f64)
    };
    debug!("Bucketed entries into {} ISO weeks", weeks_count);

    let current_quota = current_quota(schedule, today)?;
    let mut reconciliation = summarize(
        Mode::Week,
        round2(hours_should_work),
        hours_worked,
        current_quota,
        hours,
        Some(WeekSummary {
            weeks_count,
            average_hours_per_week,
        }),
    );
    reconciliation.delta_hours = round2(buckets.values().map(|bucket| bucket.delta).sum());
    reconciliation.compensation_in_days = round2(reconciliation.delta_hours / hours.per_day);
    Ok(reconciliation)
}

fn current_quota(schedule: &QuotaSchedule, today: NaiveDate) -> Result<f64> {
    if today < schedule.earliest() {
        return Ok(schedule.first_fraction());
    }
    schedule.cursor().advance_to(today)
}

fn summarize(
    mode: Mode,
    hours_should_work: f64,
    hours_worked: f64,
    current_quota: f64,
    hours: WorkingHours,
    weeks: Option<WeekSummary>,
) -> Reconciliation {
    let delta_hours = round2(hours_should_work - hours_worked);
    let compensation_in_days = round2(delta_hours / hours.per_day);

    info!(
        "Balance ({} mode): should {}h, worked {}h, delta {}h",
        mode, hours_should_work, hours_worked, delta_hours
    );

    Reconciliation {
        mode,
        hours_should_work,
        hours_worked,
        delta_hours,
        compensation_in_days,
        current_quota,
        weekly_contract_hours: round2(hours.per_day * 5.0 * current_quota),
        weeks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry(id: u64, day: NaiveDate, hours: f64) -> TimeEntry {
        TimeEntry::new(id, day, hours)
    }

    const EIGHT_HOUR_DAYS: WorkingHours = WorkingHours {
        per_day: 8.0,
        per_week: 40.0,
    };

    #[test]
    fn working_hours_must_be_positive() {
        assert!(WorkingHours::new(8.4, 42.0).is_ok());
        assert!(WorkingHours::new(0.0, 42.0).is_err());
        assert!(WorkingHours::new(8.4, f64::NAN).is_err());
    }

    #[test]
    fn balanced_first_days_of_2023() {
        let entries = vec![
            entry(1, date(2023, 1, 2), 8.0),
            entry(2, date(2023, 1, 3), 8.0),
        ];
        let schedule = QuotaSchedule::parse("2023-01-01:100%").unwrap();

        let result = reconcile(
            Mode::Day,
            &entries,
            &schedule,
            EIGHT_HOUR_DAYS,
            date(2023, 1, 3),
        )
        .unwrap();

        assert_eq!(result.hours_should_work, 16.0);
        assert_eq!(result.hours_worked, 16.0);
        assert_eq!(result.delta_hours, 0.0);
        assert_eq!(result.compensation_in_days, 0.0);
        assert_eq!(result.weekly_contract_hours, 40.0);
        assert!(result.weeks.is_none());
    }

    #[test]
    fn constant_quota_over_weekdays_only() {
        // Monday 2024-06-03 through Friday 2024-06-07
        let schedule = QuotaSchedule::parse("2024-06-03:50%").unwrap();
        let result = by_day(&[], &schedule, EIGHT_HOUR_DAYS, date(2024, 6, 7)).unwrap();
        assert_eq!(result.hours_should_work, 5.0 * 8.0 * 0.5);
        assert_eq!(result.delta_hours, 20.0);
        assert_eq!(result.compensation_in_days, 2.5);
    }

    #[test]
    fn weekends_owe_nothing() {
        // Saturday and Sunday only
        let schedule = QuotaSchedule::parse("2024-06-08:100%").unwrap();
        let result = by_day(&[], &schedule, EIGHT_HOUR_DAYS, date(2024, 6, 9)).unwrap();
        assert_eq!(result.hours_should_work, 0.0);
    }

    #[test]
    fn quota_change_mid_week_applies_per_day() {
        // Mon/Tue at 100%, Wed..Fri at 50%
        let schedule = QuotaSchedule::parse("2024-06-03:100%;2024-06-05:50%").unwrap();
        let result = by_day(&[], &schedule, EIGHT_HOUR_DAYS, date(2024, 6, 7)).unwrap();
        assert_eq!(result.hours_should_work, 2.0 * 8.0 + 3.0 * 4.0);
        assert_eq!(result.current_quota, 0.5);
        assert_eq!(result.weekly_contract_hours, 20.0);
    }

    #[test]
    fn today_is_inclusive_and_future_entries_ignored() {
        let entries = vec![
            entry(1, date(2023, 1, 3), 8.0),
            entry(2, date(2023, 1, 4), 8.0),
        ];
        let schedule = QuotaSchedule::parse("2023-01-01:100%").unwrap();
        let result = by_day(&entries, &schedule, EIGHT_HOUR_DAYS, date(2023, 1, 3)).unwrap();
        assert_eq!(result.hours_worked, 8.0);
        assert_eq!(result.hours_should_work, 16.0);
    }

    #[test]
    fn overtime_is_negative_delta() {
        let entries = vec![entry(1, date(2023, 1, 2), 12.0)];
        let schedule = QuotaSchedule::parse("2023-01-01:100%").unwrap();
        let result = by_day(&entries, &schedule, EIGHT_HOUR_DAYS, date(2023, 1, 2)).unwrap();
        assert_eq!(result.delta_hours, -4.0);
        assert_eq!(result.compensation_in_days, -0.5);
        assert!(!result.is_undertime());
    }

    #[test]
    fn compensation_is_rounded_to_two_decimals() {
        let entries = vec![entry(1, date(2023, 1, 2), 1.0)];
        let schedule = QuotaSchedule::parse("2023-01-01:100%").unwrap();
        let hours = WorkingHours {
            per_day: 3.0,
            per_week: 15.0,
        };
        let result = by_day(&entries, &schedule, hours, date(2023, 1, 2)).unwrap();
        assert_eq!(result.delta_hours, 2.0);
        assert_eq!(result.compensation_in_days, 0.67);
    }

    #[test]
    fn entries_before_schedule_are_rejected() {
        let entries = vec![entry(1, date(2018, 8, 15), 8.0)];
        let schedule = QuotaSchedule::parse("2018-09-01:70%;2019-02-01:80%").unwrap();
        for mode in [Mode::Day, Mode::Week] {
            assert!(matches!(
                reconcile(mode, &entries, &schedule, WorkingHours::default(), date(2019, 3, 1)),
                Err(BalanceError::QuotaCoverageGap { .. })
            ));
        }
    }

    #[test]
    fn today_before_schedule_owes_nothing() {
        let schedule = QuotaSchedule::parse("2030-01-01:80%").unwrap();
        let result = by_day(&[], &schedule, EIGHT_HOUR_DAYS, date(2029, 12, 1)).unwrap();
        assert_eq!(result.hours_should_work, 0.0);
        assert_eq!(result.current_quota, 0.8);
    }

    #[test]
    fn weekly_buckets_overwrite_delta_per_week() {
        let entries = vec![
            entry(1, date(2024, 6, 3), 8.0),
            entry(2, date(2024, 6, 4), 8.0),
            entry(3, date(2024, 6, 10), 40.0),
        ];
        let schedule = QuotaSchedule::parse("2024-06-01:100%").unwrap();
        let result = by_week(&entries, &schedule, EIGHT_HOUR_DAYS, date(2024, 6, 14)).unwrap();

        // week 23 owes 40 - 16, week 24 is balanced
        assert_eq!(result.delta_hours, 24.0);
        assert_eq!(result.compensation_in_days, 3.0);
        assert_eq!(result.hours_should_work, 80.0);
        assert_eq!(result.hours_worked, 56.0);
        assert_eq!(
            result.weeks,
            Some(WeekSummary {
                weeks_count: 2,
                average_hours_per_week: 28.0,
            })
        );
    }

    #[test]
    fn weekly_bucket_uses_quota_of_latest_entry() {
        // quota drops on Wednesday; the week is judged at 50%
        let entries = vec![
            entry(2, date(2024, 6, 6), 4.0),
            entry(1, date(2024, 6, 3), 8.0),
        ];
        let schedule = QuotaSchedule::parse("2024-06-01:100%;2024-06-05:50%").unwrap();
        let result = by_week(&entries, &schedule, EIGHT_HOUR_DAYS, date(2024, 6, 7)).unwrap();
        assert_eq!(result.delta_hours, 20.0 - 12.0);
        assert_eq!(result.weeks.as_ref().map(|w| w.weeks_count), Some(1));
    }

    #[test]
    fn weekly_buckets_follow_iso_years() {
        let entries = vec![
            entry(1, date(2024, 12, 31), 8.0),
            entry(2, date(2025, 1, 2), 8.0),
            entry(3, date(2024, 12, 27), 8.0),
        ];
        let schedule = QuotaSchedule::parse("2024-12-01:100%").unwrap();
        let result = by_week(&entries, &schedule, EIGHT_HOUR_DAYS, date(2025, 1, 3)).unwrap();

        // 2024-12-27 is in 2024-W52, the other two share 2025-W01
        assert_eq!(result.weeks.as_ref().map(|w| w.weeks_count), Some(2));
        assert_eq!(result.delta_hours, (40.0 - 8.0) + (40.0 - 16.0));
    }

    #[test]
    fn weekly_mode_without_entries() {
        let schedule = QuotaSchedule::parse("2024-06-01:100%").unwrap();
        let result = by_week(&[], &schedule, EIGHT_HOUR_DAYS, date(2024, 6, 7)).unwrap();
        assert_eq!(result.delta_hours, 0.0);
        assert_eq!(
            result.weeks,
            Some(WeekSummary {
                weeks_count: 0,
                average_hours_per_week: 0.0,
            })
        );
    }
}
