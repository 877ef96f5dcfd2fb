use chrono::NaiveDate;
use serde::{de, Deserialize, Deserializer, Serialize};

/// A single tracked time entry. Harvest sends many more fields, only the
/// ones needed for balancing are kept.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TimeEntry {
    pub id: u64,
    pub spent_date: NaiveDate,
    #[serde(deserialize_with = "non_negative_hours")]
    pub hours: f64,
}

fn non_negative_hours<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let hours = f64::deserialize(deserializer)?;
    if hours.is_finite() && hours >= 0.0 {
        Ok(hours)
    } else {
        Err(de::Error::custom(format!(
            "hours must be a non-negative number, got {hours}"
        )))
    }
}

impl TimeEntry {
    pub fn new(id: u64, spent_date: NaiveDate, hours: f64) -> Self {
        Self {
            id,
            spent_date,
            hours,
        }
    }
}

// Response page of `GET /time_entries`
#[derive(Deserialize, Debug)]
pub struct TimeEntriesPage {
    pub time_entries: Vec<TimeEntry>,
    #[serde(default = "first_page")]
    pub page: u32,
    pub total_pages: u32,
}

fn first_page() -> u32 {
    1
}

/// On-disk cache. Older caches are a bare array of entries, newer ones use
/// the same envelope as the API.
#[derive(Serialize, Deserialize, Debug)]
#[serde(untagged)]
pub enum CachedEntries {
    Envelope { time_entries: Vec<TimeEntry> },
    Bare(Vec<TimeEntry>),
}

impl CachedEntries {
    pub fn into_entries(self) -> Vec<TimeEntry> {
        match self {
            CachedEntries::Envelope { time_entries } => time_entries,
            CachedEntries::Bare(entries) => entries,
        }
    }
}
