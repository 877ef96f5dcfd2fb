use chrono::NaiveDate;
use reqwest::Client;
use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::{
    error::{BalanceError, Result},
    helpers::{
        harvest,
        quota::QuotaSchedule,
        reconcile::{reconcile, WorkingHours},
        salary::salary_countdown,
    },
    models::{harvest::TimeEntry, report::BalanceReport},
    Mode,
};

/// Harvest credentials, needed only when entries come from the API.
#[derive(Clone, Debug)]
pub struct HarvestCredentials {
    pub account_id: String,
    pub token: String,
}

/// Where time entries are read from.
#[derive(Clone, Debug)]
pub enum EntrySource {
    Api {
        base_url: String,
        /// Also store the fetched entries in this file.
        save_to: Option<PathBuf>,
    },
    Cache(PathBuf),
}

/// Configuration for one balance run, built once at startup.
#[derive(Clone, Debug)]
pub struct BalanceConfig {
    pub schedule: QuotaSchedule,
    pub hours: WorkingHours,
    pub mode: Mode,
    pub salary_day: Option<u32>,
    pub source: EntrySource,
}

/// Fetches the time entries and balances them against the configured quota
#[derive(Clone, Debug)]
pub struct BalanceService {
    pub harvest_client: Option<Client>,
    pub config: BalanceConfig,
}

impl BalanceService {
    pub fn new(harvest_client: Option<Client>, config: BalanceConfig) -> Self {
        info!("Creating new BalanceService instance");
        Self {
            harvest_client,
            config,
        }
    }

    /// Builds the Harvest client when the source requires one.
    pub fn from_config(
        config: BalanceConfig,
        credentials: Option<HarvestCredentials>,
    ) -> Result<Self> {
        let harvest_client = match (&config.source, credentials) {
            (EntrySource::Api { .. }, Some(credentials)) => Some(harvest::harvest_client_init(
                &credentials.account_id,
                &credentials.token,
            )?),
            (EntrySource::Api { .. }, None) => {
                return Err(BalanceError::ConfigurationMissing {
                    what: "Harvest credentials".to_string(),
                    hint: "You need to provide valid harvest credentials (HARVEST_API_ID and HARVEST_API_BEARER) in the .env file!".to_string(),
                });
            }
            (EntrySource::Cache(_), _) => None,
        };
        Ok(Self::new(harvest_client, config))
    }

    /// All entries sorted by `(spent_date, id)`, each id at most once.
    pub async fn fetch_entries(&self) -> Result<Vec<TimeEntry>> {
        let mut entries = match &self.config.source {
            EntrySource::Api { base_url, save_to } => {
                let client = self.harvest_client.as_ref().ok_or_else(|| {
                    BalanceError::ConfigurationMissing {
                        what: "Harvest client".to_string(),
                        hint: "construct the service with credentials to read from the API"
                            .to_string(),
                    }
                })?;
                let entries = harvest::fetch_all_entries(client, base_url).await?;
                if let Some(path) = save_to {
                    harvest::write_cached_entries(path, &entries)?;
                }
                entries
            }
            EntrySource::Cache(path) => harvest::load_cached_entries(path)?,
        };

        normalize_entries(&mut entries);
        Ok(entries)
    }

    /// Balance as of `today`, inclusive.
    pub fn balance(&self, entries: &[TimeEntry], today: NaiveDate) -> Result<BalanceReport> {
        info!(
            "Balancing {} entries against {} quota change(s) in {} mode",
            entries.len(),
            self.config.schedule.changes().len(),
            self.config.mode
        );

        let reconciliation = reconcile(
            self.config.mode,
            entries,
            &self.config.schedule,
            self.config.hours,
            today,
        )
        .inspect_err(|e| error!("Failed to balance time entries: {}", e))?;

        let salary = self
            .config
            .salary_day
            .map(|day| salary_countdown(today, day))
            .transpose()?;

        Ok(BalanceReport {
            today,
            reconciliation,
            salary,
        })
    }

    pub async fn process(&self, today: NaiveDate) -> Result<BalanceReport> {
        let entries = self.fetch_entries().await?;
        self.balance(&entries, today)
    }
}

/// Sorts chronologically and drops repeated ids, which show up when
/// entries are added while paginating.
pub fn normalize_entries(entries: &mut Vec<TimeEntry>) {
    entries.sort_by_key(|entry| (entry.spent_date, entry.id));

    let before = entries.len();
    let mut seen = std::collections::HashSet::new();
    entries.retain(|entry| seen.insert(entry.id));

    if entries.len() != before {
        warn!("Dropped {} duplicate time entries", before - entries.len());
    }
}
