use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{BalanceError, Result};
use crate::helpers::calendar::{parse_iso_date, to_human_date};

pub const QUOTA_FORMAT_HINT: &str = "Example: WORK_QUOTA_DATES=\"2018-09-01:70%;2019-02-01:80%\"";

/// Contract quota history: effective date mapped to the working-time
/// fraction that applies from that day on. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotaSchedule {
    changes: Vec<(NaiveDate, f64)>,
}

impl QuotaSchedule {
    pub fn new(changes: BTreeMap<NaiveDate, f64>) -> Result<Self> {
        if changes.is_empty() {
            return Err(missing_schedule());
        }
        Ok(Self {
            changes: changes.into_iter().collect(),
        })
    }

    /// Parses `date1:quota1%;date2:quota2%`. A quota without `%` is read as
    /// the fraction itself.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim().trim_matches(';');
        if trimmed.trim().is_empty() {
            return Err(missing_schedule());
        }

        let mut changes = BTreeMap::new();
        for segment in trimmed.split(';') {
            let (date, quota) = segment
                .split_once(':')
                .ok_or_else(|| BalanceError::malformed(raw, format!("'{}' has no ':'", segment.trim())))?;

            let date = parse_iso_date(date).map_err(|_| {
                BalanceError::malformed(raw, format!("'{}' is not a YYYY-MM-DD date", date.trim()))
            })?;
            let fraction = parse_fraction(quota).ok_or_else(|| {
                BalanceError::malformed(raw, format!("'{}' is not a valid quota", quota.trim()))
            })?;

            if changes.insert(date, fraction).is_some() {
                return Err(BalanceError::malformed(
                    raw,
                    format!("{date} is listed more than once"),
                ));
            }
        }

        debug!("Parsed quota schedule with {} change(s)", changes.len());
        Self::new(changes)
    }

    pub fn earliest(&self) -> NaiveDate {
        self.changes[0].0
    }

    pub fn first_fraction(&self) -> f64 {
        self.changes[0].1
    }

    pub fn changes(&self) -> &[(NaiveDate, f64)] {
        &self.changes
    }

    pub fn cursor(&self) -> QuotaCursor<'_> {
        QuotaCursor {
            changes: &self.changes,
            position: 0,
        }
    }

    /// Fails when work was logged before the first quota takes effect.
    pub fn check_covers(&self, first_worked: NaiveDate) -> Result<()> {
        if first_worked < self.earliest() {
            return Err(coverage_gap(first_worked, self.earliest()));
        }
        Ok(())
    }
}

fn missing_schedule() -> BalanceError {
    BalanceError::ConfigurationMissing {
        what: "the date you started to work and your work quota".to_string(),
        hint: QUOTA_FORMAT_HINT.to_string(),
    }
}

fn coverage_gap(first_worked: NaiveDate, earliest_quota: NaiveDate) -> BalanceError {
    BalanceError::QuotaCoverageGap {
        first_worked: to_human_date(first_worked),
        earliest_quota: to_human_date(earliest_quota),
    }
}

fn parse_fraction(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let value = match raw.strip_suffix('%') {
        Some(percent) => percent.trim().parse::<f64>().ok()? / 100.0,
        None => raw.parse::<f64>().ok()?,
    };
    (value.is_finite() && value >= 0.0).then_some(value)
}

/// Moves `position` forward while the next change date is on or before
/// `date`. Never moves backward.
pub fn advance(changes: &[(NaiveDate, f64)], mut position: usize, date: NaiveDate) -> usize {
    while position + 1 < changes.len() && changes[position + 1].0 <= date {
        position += 1;
    }
    position
}

/// Single forward-only cursor over a [`QuotaSchedule`]. Callers feed it
/// dates in non-decreasing order.
#[derive(Debug, Clone)]
pub struct QuotaCursor<'a> {
    changes: &'a [(NaiveDate, f64)],
    position: usize,
}

impl QuotaCursor<'_> {
    pub fn advance_to(&mut self, date: NaiveDate) -> Result<f64> {
        let earliest = self.changes[0].0;
        if date < earliest {
            return Err(coverage_gap(date, earliest));
        }
        self.position = advance(self.changes, self.position, date);
        Ok(self.current())
    }

    pub fn current(&self) -> f64 {
        self.changes[self.position].1
    }

    pub fn position(&self) -> usize {
        self.position
    }
}
