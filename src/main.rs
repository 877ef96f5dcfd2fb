use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::Parser;
use std::{path::PathBuf, process::ExitCode};
use tracing::info;

use harvest_time_balance::{
    helpers::{harvest::HARVEST_API_URL, salary::validate_salary_day},
    BalanceConfig, BalanceReport, BalanceService, EntrySource, HarvestCredentials, Mode,
    QuotaSchedule, WorkingHours,
};

#[derive(Parser, Debug)]
#[command(
    name = "timecheck",
    about = "Balance your Harvest time entries against your contract quota",
    version
)]
struct Cli {
    /// Harvest account id
    #[arg(long, env = "HARVEST_API_ID", hide_env_values = true)]
    account_id: Option<String>,

    /// Harvest personal access token
    #[arg(long, env = "HARVEST_API_BEARER", hide_env_values = true)]
    token: Option<String>,

    /// Quota history, e.g. "2018-09-01:70%;2019-02-01:80%"
    #[arg(long, env = "WORK_QUOTA_DATES")]
    quota_dates: Option<String>,

    /// Hours of a full-time working day
    #[arg(long, env = "WORK_DAY_HOURS", default_value_t = 8.4)]
    day_hours: f64,

    /// Hours of a full-time working week (week mode)
    #[arg(long, env = "WORK_WEEK_HOURS", default_value_t = 42.0)]
    week_hours: f64,

    /// Day of month the salary is paid on
    #[arg(long, env = "SALARY_DAY")]
    salary_day: Option<u32>,

    /// Anything but "prod" reads entries from the cache file
    #[arg(long = "env", env = "ENV", default_value = "prod")]
    environment: String,

    #[arg(long, env = "TIME_ENTRIES_CACHE", default_value = "data/time_entries.json")]
    cache_file: PathBuf,

    #[arg(long, env = "HARVEST_API_URL", default_value = HARVEST_API_URL)]
    api_url: String,

    /// "day" walks every calendar day, "week" uses the legacy ISO week buckets
    #[arg(long, env = "BALANCE_MODE", default_value = "day")]
    mode: Mode,

    /// Evaluate as of this date instead of today (YYYY-MM-DD)
    #[arg(long)]
    today: Option<NaiveDate>,

    /// Store fetched entries in the cache file
    #[arg(long)]
    save_cache: bool,

    /// Log progress to stderr
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn credentials(&self) -> Option<HarvestCredentials> {
        let account_id = self.account_id.as_deref().filter(|v| !v.trim().is_empty())?;
        let token = self.token.as_deref().filter(|v| !v.trim().is_empty())?;
        Some(HarvestCredentials {
            account_id: account_id.trim().to_string(),
            token: token.trim().to_string(),
        })
    }

    fn config(&self) -> anyhow::Result<BalanceConfig> {
        let schedule = QuotaSchedule::parse(self.quota_dates.as_deref().unwrap_or_default())?;
        let hours = WorkingHours::new(self.day_hours, self.week_hours)?;
        let salary_day = self.salary_day.map(validate_salary_day).transpose()?;

        let source = if self.environment == "prod" {
            EntrySource::Api {
                base_url: self.api_url.clone(),
                save_to: self.save_cache.then(|| self.cache_file.clone()),
            }
        } else {
            EntrySource::Cache(self.cache_file.clone())
        };

        Ok(BalanceConfig {
            schedule,
            hours,
            mode: self.mode,
            salary_day,
            source,
        })
    }
}

async fn run(cli: Cli) -> anyhow::Result<BalanceReport> {
    let config = cli.config()?;
    let service = BalanceService::from_config(config, cli.credentials())?;

    let today = cli.today.unwrap_or_else(|| Local::now().date_naive());
    info!("Computing balance as of {}", today);

    let entries = service
        .fetch_entries()
        .await
        .context("could not load time entries")?;
    Ok(service.balance(&entries, today)?)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match run(cli).await {
        Ok(report) => {
            print!("{report}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
