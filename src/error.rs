use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BalanceError {
    #[error("missing configuration: {what}\n{hint}")]
    ConfigurationMissing { what: String, hint: String },

    #[error("invalid configuration value \"{raw}\": {reason}")]
    ConfigurationMalformed { raw: String, reason: String },

    #[error(
        "you worked on the {first_worked}, but your earliest provided work quota date is {earliest_quota}"
    )]
    QuotaCoverageGap {
        first_worked: String,
        earliest_quota: String,
    },

    #[error("Harvest request failed")]
    Upstream(#[from] reqwest::Error),

    #[error("Harvest API returned status {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("could not parse Harvest response")]
    UpstreamPayload(#[source] serde_json::Error),

    #[error("could not access cache file {}", .path.display())]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse cache file {}", .path.display())]
    CachePayload {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl BalanceError {
    pub(crate) fn malformed(raw: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigurationMalformed {
            raw: raw.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BalanceError>;
