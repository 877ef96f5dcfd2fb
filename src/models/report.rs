use chrono::NaiveDate;
use std::{fmt, str::FromStr};

use crate::helpers::calendar::{round2, to_human_date};

/// How the owed hours are aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Walk every calendar day and apply the quota in effect on that day.
    #[default]
    Day,
    /// Legacy behaviour: bucket entries by ISO week.
    Week,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" | "daily" => Ok(Mode::Day),
            "week" | "weekly" => Ok(Mode::Week),
            other => Err(format!("unknown mode '{other}', expected 'day' or 'week'")),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Day => write!(f, "day"),
            Mode::Week => write!(f, "week"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeekSummary {
    pub weeks_count: usize,
    pub average_hours_per_week: f64,
}

/// Outcome of balancing logged hours against the quota schedule.
///
/// A positive `delta_hours` is undertime, a negative one overtime.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub mode: Mode,
    pub hours_should_work: f64,
    pub hours_worked: f64,
    pub delta_hours: f64,
    pub compensation_in_days: f64,
    pub current_quota: f64,
    pub weekly_contract_hours: f64,
    pub weeks: Option<WeekSummary>,
}

impl Reconciliation {
    pub fn is_undertime(&self) -> bool {
        self.delta_hours > 0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SalaryCountdown {
    pub scheduled_date: NaiveDate,
    pub payout_date: NaiveDate,
    pub days_remaining: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BalanceReport {
    pub today: NaiveDate,
    pub reconciliation: Reconciliation,
    pub salary: Option<SalaryCountdown>,
}

impl fmt::Display for BalanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.reconciliation;

        writeln!(
            f,
            "⏱  Your current contract: {}h / week ({}%)",
            r.weekly_contract_hours,
            round2(r.current_quota * 100.0)
        )?;
        writeln!(
            f,
            "💰 You sold {}h of your time working 🤔",
            r.hours_worked.round()
        )?;

        let compensation_type = if r.is_undertime() {
            "🛑 Undertime"
        } else {
            "✅ Overtime"
        };
        writeln!(
            f,
            "{}: {}h ({} working days)",
            compensation_type,
            r.delta_hours.abs(),
            r.compensation_in_days.abs()
        )?;

        if let Some(weeks) = &r.weeks {
            writeln!(
                f,
                "📅 On average {}h / week over {} weeks",
                weeks.average_hours_per_week, weeks.weeks_count
            )?;
        }

        if let Some(salary) = &self.salary {
            writeln!(
                f,
                "💸 Next salary on {}: {} days to go",
                to_human_date(salary.payout_date),
                salary.days_remaining
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconciliation(delta_hours: f64) -> Reconciliation {
        Reconciliation {
            mode: Mode::Day,
            hours_should_work: 100.0,
            hours_worked: 100.0 - delta_hours,
            delta_hours,
            compensation_in_days: round2(delta_hours / 8.4),
            current_quota: 0.7,
            weekly_contract_hours: 29.4,
            weeks: None,
        }
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("Week".parse::<Mode>().unwrap(), Mode::Week);
        assert_eq!("day".parse::<Mode>().unwrap(), Mode::Day);
        assert!("month".parse::<Mode>().is_err());
    }

    #[test]
    fn summary_reports_undertime() {
        let report = BalanceReport {
            today: NaiveDate::from_ymd_opt(2024, 6, 26).unwrap(),
            reconciliation: reconciliation(16.8),
            salary: None,
        };
        let text = report.to_string();
        assert!(text.contains("29.4h / week (70%)"));
        assert!(text.contains("Undertime: 16.8h (2 working days)"));
        assert!(!text.contains("salary"));
    }

    #[test]
    fn summary_reports_overtime_and_salary() {
        let report = BalanceReport {
            today: NaiveDate::from_ymd_opt(2024, 6, 26).unwrap(),
            reconciliation: reconciliation(-4.2),
            salary: Some(SalaryCountdown {
                scheduled_date: NaiveDate::from_ymd_opt(2024, 7, 25).unwrap(),
                payout_date: NaiveDate::from_ymd_opt(2024, 7, 25).unwrap(),
                days_remaining: 29,
            }),
        };
        let text = report.to_string();
        assert!(text.contains("Overtime: 4.2h (0.5 working days)"));
        assert!(text.contains("Next salary on 25.07.2024: 29 days to go"));
    }
}
